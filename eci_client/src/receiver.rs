//! # Feedback Receiver Module
//!
//! The receiver runs as a background thread for the lifetime of an open session. It owns a
//! dedicated non-blocking receive socket, polls it at a fixed interval (~100 Hz ceiling, a
//! deliberate simplicity/latency tradeoff matching the arms' control-loop rates), commits
//! every exact-length feedback datagram to the shared store, and appends one tab-separated
//! record per valid receipt to the feedback log.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::net::UdpSocket;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::{error, info, warn};

use eci_if::wire::FeedbackPacket;

use crate::feedback::{Feedback, FeedbackStore};
use crate::session::SessionClock;
use crate::EciError;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Everything the receiver loop needs, handed over at spawn time.
pub(crate) struct RxContext {
    pub rx_port: u16,
    pub log_path: PathBuf,
    pub poll_interval: Duration,
    pub clock: SessionClock,
    pub store: Arc<FeedbackStore>,
    pub terminate: Arc<AtomicBool>,
    pub terminated: Arc<AtomicBool>,
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Receiver thread entry point.
///
/// The terminated flag is set on the way out whatever happened inside, so a session close
/// can never hang on a receiver that failed to start.
pub(crate) fn rx_main(ctx: RxContext) {
    rx_loop(&ctx);
    ctx.terminated.store(true, Ordering::Relaxed);
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn rx_loop(ctx: &RxContext) {
    let socket = match bind_rx_socket(ctx.rx_port) {
        Ok(s) => s,
        Err(e) => {
            error!("Feedback receiver could not start: {}", e);
            return;
        }
    };

    // The log is a side effect for offline inspection, losing it is not fatal
    let mut log_writer = match feedback_log_writer(&ctx.log_path) {
        Ok(w) => Some(w),
        Err(e) => {
            warn!("Could not open the feedback log {:?}: {}", ctx.log_path, e);
            None
        }
    };

    info!("Feedback receiver listening on port {}", ctx.rx_port);

    let mut buf = [0u8; 512];

    while !ctx.terminate.load(Ordering::Relaxed) {
        match socket.recv(&mut buf) {
            Ok(len) if len == FeedbackPacket::ENCODED_LEN => {
                if let Ok(packet) = FeedbackPacket::decode(&buf[..len]) {
                    let feedback = ctx.store.commit(&packet, ctx.clock.elapsed_s());

                    if let Some(ref mut writer) = log_writer {
                        if let Err(e) = append_record(writer, &feedback) {
                            warn!("Could not append a feedback record: {}", e);
                        }
                    }
                }
            }
            // Datagrams of any other length are noise, drop them
            Ok(_) => (),
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => (),
            Err(e) => warn!("Feedback socket receive error: {}", e),
        }

        thread::sleep(ctx.poll_interval);
    }

    info!("Feedback receiver terminating");
}

fn bind_rx_socket(rx_port: u16) -> Result<UdpSocket, EciError> {
    let socket = UdpSocket::bind(("0.0.0.0", rx_port)).map_err(EciError::BindError)?;
    socket.set_nonblocking(true).map_err(EciError::BindError)?;

    Ok(socket)
}

fn feedback_log_writer(path: &Path) -> io::Result<csv::Writer<File>> {
    let file = OpenOptions::new().append(true).create(true).open(path)?;

    Ok(csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_writer(file))
}

/// Append one record: receipt time, then every decoded field in wire order.
fn append_record<W: Write>(writer: &mut csv::Writer<W>, feedback: &Feedback) -> csv::Result<()> {
    let mut record = Vec::with_capacity(39);

    record.push(format!("{:.6}", feedback.t_last_update_s));
    push_floats(&mut record, &feedback.tcp_pos_left);
    push_floats(&mut record, &feedback.tcp_pos_right);
    push_floats(&mut record, &feedback.joint_pos_left);
    push_floats(&mut record, &feedback.joint_pos_right);
    push_floats(&mut record, &feedback.joint_vel_left);
    push_floats(&mut record, &feedback.joint_vel_right);
    push_floats(&mut record, &feedback.joint_torque_left);
    push_floats(&mut record, &feedback.joint_torque_right);
    push_floats(&mut record, &feedback.joint_pwm_left);
    push_floats(&mut record, &feedback.joint_pwm_right);

    writer.write_record(&record)?;
    writer.flush()?;

    Ok(())
}

fn push_floats(record: &mut Vec<String>, values: &[f32]) {
    for v in values {
        record.push(v.to_string());
    }
}

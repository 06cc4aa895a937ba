//! # Transport Session Module
//!
//! The session is the umbrella holding the sender and receiver together: it owns the send
//! socket, the background receiver thread handle, and the shared feedback store, and it
//! coordinates startup and shutdown. Exactly two execution contexts exist per open session:
//! the caller's thread (sending references, reading feedback snapshots) and the receiver.
//!
//! Lifecycle: `Unopened -> Open -> Closed`, with `OpenFailed` terminal if resolution or
//! socket creation fails. Shutdown is cooperative: `close` raises the terminate flag and
//! waits a bounded budget for the receiver to confirm, then joins it.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{info, warn};

use eci_if::wire::{ControlMode, ControlRefPacket, NUM_ARM_JOINTS};

use crate::feedback::{Feedback, FeedbackStore};
use crate::params::EciParams;
use crate::receiver::{rx_main, RxContext};
use crate::sender::RefSender;
use crate::EciError;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Monotonic clock pinned to the session's construction time.
///
/// Copies share the same origin, so the receiver thread and the caller agree on elapsed time.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SessionClock {
    origin: Instant,
}

/// A UDP transport session for one dual-arm interface.
pub struct EciSession {
    params: EciParams,
    state: SessionState,
    sender: Option<RefSender>,
    rx_handle: Option<JoinHandle<()>>,
    terminate: Arc<AtomicBool>,
    terminated: Arc<AtomicBool>,
    store: Arc<FeedbackStore>,
    clock: SessionClock,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Unopened,
    Open,
    OpenFailed,
    Closed,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SessionClock {
    fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    /// Seconds elapsed since the session was constructed.
    pub(crate) fn elapsed_s(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

impl EciSession {
    /// Create an unopened session. No sockets exist until [`Self::open`] is called.
    pub fn new(params: EciParams) -> Self {
        Self {
            params,
            state: SessionState::Unopened,
            sender: None,
            rx_handle: None,
            terminate: Arc::new(AtomicBool::new(false)),
            terminated: Arc::new(AtomicBool::new(false)),
            store: Arc::new(FeedbackStore::new()),
            clock: SessionClock::new(),
        }
    }

    /// Open the interface: resolve the destination, bind the send socket, and start the
    /// feedback receiver on `rx_port`.
    ///
    /// Valid only from the unopened state. On a resolution or socket failure the session
    /// transitions to a terminal failed state with no receiver started, and a later
    /// [`Self::close`] is a safe no-op.
    pub fn open(&mut self, host: &str, tx_port: u16, rx_port: u16) -> Result<(), EciError> {
        if self.state != SessionState::Unopened {
            return Err(EciError::AlreadyOpen);
        }

        let sender = match RefSender::new(host, tx_port) {
            Ok(s) => s,
            Err(e) => {
                self.state = SessionState::OpenFailed;
                return Err(e);
            }
        };

        let ctx = RxContext {
            rx_port,
            log_path: self.params.feedback_log_path.clone(),
            poll_interval: Duration::from_millis(self.params.poll_interval_ms),
            clock: self.clock,
            store: self.store.clone(),
            terminate: self.terminate.clone(),
            terminated: self.terminated.clone(),
        };
        self.rx_handle = Some(thread::spawn(move || rx_main(ctx)));

        info!(
            "{}: interface open, references to {}, feedback on port {}",
            self.params.interface_name,
            sender.dest(),
            rx_port
        );

        self.sender = Some(sender);
        self.state = SessionState::Open;

        Ok(())
    }

    /// Close the interface.
    ///
    /// A no-op unless the session is open. The send socket closes immediately; the receiver
    /// is asked to terminate and given a bounded budget to confirm before being reported as
    /// [`EciError::ShutdownTimeout`]. The session counts as closed either way.
    pub fn close(&mut self) -> Result<(), EciError> {
        if self.state != SessionState::Open {
            return Ok(());
        }

        self.terminate.store(true, Ordering::Relaxed);
        self.sender = None;
        self.state = SessionState::Closed;

        let budget = Duration::from_millis(self.params.shutdown_timeout_ms);
        let poll = Duration::from_millis(self.params.poll_interval_ms);
        let start = Instant::now();

        while !self.terminated.load(Ordering::Relaxed) && start.elapsed() < budget {
            thread::sleep(poll);
        }

        if !self.terminated.load(Ordering::Relaxed) {
            warn!(
                "{}: the feedback receiver did not confirm termination",
                self.params.interface_name
            );
            return Err(EciError::ShutdownTimeout(self.params.shutdown_timeout_ms));
        }

        if let Some(handle) = self.rx_handle.take() {
            handle.join().ok();
        }

        info!("{}: interface closed", self.params.interface_name);

        Ok(())
    }

    /// Send a joint position reference for both arms, in radians, to be reached within
    /// `play_time_s` seconds.
    pub fn send_joint_position_ref(
        &self,
        q_left: &[f32; NUM_ARM_JOINTS],
        q_right: &[f32; NUM_ARM_JOINTS],
        play_time_s: f32,
    ) -> Result<(), EciError> {
        let sender = self.sender.as_ref().ok_or(EciError::NotOpen)?;

        sender.send(&ControlRefPacket {
            mode: ControlMode::JointPosition,
            play_time_s,
            ref_tcp_left: [0.0; 3],
            ref_tcp_right: [0.0; 3],
            ref_joints_left: *q_left,
            ref_joints_right: *q_right,
            timestamp_s: self.clock.elapsed_s() as f32,
        })
    }

    /// Send a TCP position reference for both arms, in metres w.r.t. the shoulder base
    /// joints, to be reached within `play_time_s` seconds.
    pub fn send_tcp_position_ref(
        &self,
        p_left: &[f32; 3],
        p_right: &[f32; 3],
        play_time_s: f32,
    ) -> Result<(), EciError> {
        let sender = self.sender.as_ref().ok_or(EciError::NotOpen)?;

        sender.send(&ControlRefPacket {
            mode: ControlMode::TcpPosition,
            play_time_s,
            ref_tcp_left: *p_left,
            ref_tcp_right: *p_right,
            ref_joints_left: [0.0; NUM_ARM_JOINTS],
            ref_joints_right: [0.0; NUM_ARM_JOINTS],
            timestamp_s: self.clock.elapsed_s() as f32,
        })
    }

    /// Snapshot of the latest feedback.
    pub fn feedback(&self) -> Feedback {
        self.store.latest()
    }

    /// True once at least one valid feedback packet has been received.
    pub fn feedback_received(&self) -> bool {
        self.store.received()
    }

    /// Shared handle on the feedback store, for readers that should not borrow the session.
    pub fn feedback_store(&self) -> Arc<FeedbackStore> {
        self.store.clone()
    }

    /// Seconds elapsed since the session was constructed.
    pub fn elapsed_s(&self) -> f64 {
        self.clock.elapsed_s()
    }
}

impl Drop for EciSession {
    fn drop(&mut self) {
        // Best-effort shutdown in case the caller never closed the session
        self.close().ok();
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use eci_if::wire::FeedbackPacket;
    use std::net::UdpSocket;

    fn test_params(name: &str) -> EciParams {
        EciParams {
            interface_name: name.into(),
            feedback_log_path: std::env::temp_dir()
                .join(format!("{}_{}.txt", name, std::process::id())),
            ..Default::default()
        }
    }

    #[test]
    fn test_open_unresolvable_host() {
        let mut session = EciSession::new(test_params("eci_test_resolution"));

        let result = session.open("this-host-does-not-exist.invalid", 23000, 47801);
        assert!(matches!(result, Err(EciError::ResolutionError(_, _))));

        // No receiver was started, close is a safe no-op and sends are rejected
        assert!(session.close().is_ok());
        assert!(matches!(
            session.send_joint_position_ref(&[0.0; NUM_ARM_JOINTS], &[0.0; NUM_ARM_JOINTS], 0.1),
            Err(EciError::NotOpen)
        ));
    }

    #[test]
    fn test_send_joint_position_ref() {
        let sink = UdpSocket::bind("127.0.0.1:47802").unwrap();
        sink.set_read_timeout(Some(Duration::from_secs(1))).unwrap();

        let mut session = EciSession::new(test_params("eci_test_send"));
        session.open("127.0.0.1", 47802, 47803).unwrap();

        let q_left = [-30.0, 10.0, -45.0, -60.0];
        let q_right = [-30.0, -10.0, 45.0, -60.0];
        session
            .send_joint_position_ref(&q_left, &q_right, 0.25)
            .unwrap();

        let mut buf = [0u8; 512];
        let (len, _) = sink.recv_from(&mut buf).unwrap();
        assert_eq!(len, ControlRefPacket::ENCODED_LEN);

        let packet = ControlRefPacket::decode(&buf[..len]).unwrap();
        assert_eq!(packet.mode, ControlMode::JointPosition);
        assert_eq!(packet.play_time_s, 0.25);
        assert_eq!(packet.ref_joints_left, q_left);
        assert_eq!(packet.ref_joints_right, q_right);
        assert_eq!(packet.ref_tcp_left, [0.0; 3]);
        assert_eq!(packet.ref_tcp_right, [0.0; 3]);
        assert!(packet.timestamp_s >= 0.0);

        session.close().unwrap();
    }

    #[test]
    fn test_feedback_injection() {
        let params = test_params("eci_test_feedback");
        let log_path = params.feedback_log_path.clone();
        std::fs::remove_file(&log_path).ok();

        let mut session = EciSession::new(params);
        session.open("127.0.0.1", 47804, 47805).unwrap();
        assert!(!session.feedback_received());

        let packet = FeedbackPacket {
            packet_id: 1,
            tcp_pos_left: [0.5, 0.25, 0.125],
            tcp_pos_right: [-0.5, -0.25, -0.125],
            joint_pos_left: [1.0, 2.0, 3.0, 4.0],
            joint_pos_right: [-1.0, -2.0, -3.0, -4.0],
            joint_vel_left: [0.5; NUM_ARM_JOINTS],
            joint_vel_right: [-0.5; NUM_ARM_JOINTS],
            joint_torque_left: [0.75; NUM_ARM_JOINTS],
            joint_torque_right: [-0.75; NUM_ARM_JOINTS],
            joint_pwm_left: [0.25; NUM_ARM_JOINTS],
            joint_pwm_right: [-0.25; NUM_ARM_JOINTS],
        };

        // Resend until the receiver has observed the packet, it may still be binding its
        // socket just after open. Watch through a shared store handle, as a reader that
        // does not borrow the session would
        let store = session.feedback_store();
        let source = UdpSocket::bind("127.0.0.1:0").unwrap();
        let deadline = Instant::now() + Duration::from_millis(500);
        while !store.received() && Instant::now() < deadline {
            source.send_to(&packet.encode(), "127.0.0.1:47805").unwrap();
            thread::sleep(Duration::from_millis(10));
        }
        assert!(session.feedback_received());

        let feedback = session.feedback();
        assert_eq!(store.latest().joint_pos_left, feedback.joint_pos_left);
        assert_eq!(feedback.tcp_pos_left, packet.tcp_pos_left);
        assert_eq!(feedback.tcp_pos_right, packet.tcp_pos_right);
        assert_eq!(feedback.joint_pos_left, packet.joint_pos_left);
        assert_eq!(feedback.joint_pos_right, packet.joint_pos_right);
        assert_eq!(feedback.joint_pwm_left, packet.joint_pwm_left);
        assert!(feedback.t_last_update_s > 0.0);

        // Closing joins the receiver, so the log record is complete by now
        session.close().unwrap();

        let log = std::fs::read_to_string(&log_path).unwrap();
        let line = log.lines().next().unwrap();
        let fields: Vec<&str> = line.split('\t').collect();
        assert_eq!(fields.len(), 39);
        assert_eq!(fields[1], "0.5"); // tcp_pos_left[0]
        assert_eq!(fields[7], "1"); // joint_pos_left[0]
        assert_eq!(fields[14], "-4"); // joint_pos_right[3]
        assert_eq!(fields[38], "-0.25"); // joint_pwm_right[3]

        std::fs::remove_file(&log_path).ok();
    }

    #[test]
    fn test_wrong_size_datagram_ignored() {
        let mut session = EciSession::new(test_params("eci_test_noise"));
        session.open("127.0.0.1", 47806, 47807).unwrap();

        let source = UdpSocket::bind("127.0.0.1:0").unwrap();
        source.send_to(&[0u8; 10], "127.0.0.1:47807").unwrap();
        source
            .send_to(
                &[0u8; FeedbackPacket::ENCODED_LEN + 1],
                "127.0.0.1:47807",
            )
            .unwrap();

        thread::sleep(Duration::from_millis(100));

        assert!(!session.feedback_received());
        assert_eq!(session.feedback(), Feedback::default());

        session.close().unwrap();
    }

    #[test]
    fn test_close_stops_receiver() {
        let mut session = EciSession::new(test_params("eci_test_close"));
        session.open("127.0.0.1", 47808, 47809).unwrap();

        assert!(session.close().is_ok());
        assert!(session.terminated.load(Ordering::Relaxed));
        assert!(session.rx_handle.is_none());

        // Further sends fail and repeated closes stay no-ops
        assert!(matches!(
            session.send_joint_position_ref(&[0.0; NUM_ARM_JOINTS], &[0.0; NUM_ARM_JOINTS], 0.1),
            Err(EciError::NotOpen)
        ));
        assert!(session.close().is_ok());
    }

    #[test]
    fn test_close_after_bind_failure() {
        // Occupy the feedback port so the receiver's bind fails inside the thread
        let _occupant = UdpSocket::bind("127.0.0.1:47815").unwrap();

        let mut session = EciSession::new(test_params("eci_test_bind_failure"));
        session.open("127.0.0.1", 47816, 47815).unwrap();

        // The failed receiver must still confirm termination, so close returns well
        // within the shutdown budget instead of hanging
        let start = Instant::now();
        assert!(session.close().is_ok());
        assert!(start.elapsed() < Duration::from_millis(500));
        assert!(session.terminated.load(Ordering::Relaxed));
        assert!(session.rx_handle.is_none());
    }

    #[test]
    fn test_double_open_rejected() {
        let mut session = EciSession::new(test_params("eci_test_double_open"));
        session.open("127.0.0.1", 47810, 47811).unwrap();

        assert!(matches!(
            session.open("127.0.0.1", 47810, 47812),
            Err(EciError::AlreadyOpen)
        ));

        session.close().unwrap();
    }

    #[test]
    fn test_send_tcp_position_ref() {
        let sink = UdpSocket::bind("127.0.0.1:47813").unwrap();
        sink.set_read_timeout(Some(Duration::from_secs(1))).unwrap();

        let mut session = EciSession::new(test_params("eci_test_send_tcp"));
        session.open("127.0.0.1", 47813, 47814).unwrap();

        let p_left = [0.3, 0.1, -0.2];
        let p_right = [0.3, -0.1, -0.2];
        session
            .send_tcp_position_ref(&p_left, &p_right, 1.0)
            .unwrap();

        let mut buf = [0u8; 512];
        let (len, _) = sink.recv_from(&mut buf).unwrap();

        let packet = ControlRefPacket::decode(&buf[..len]).unwrap();
        assert_eq!(packet.mode, ControlMode::TcpPosition);
        assert_eq!(packet.ref_tcp_left, p_left);
        assert_eq!(packet.ref_tcp_right, p_right);
        assert_eq!(packet.ref_joints_left, [0.0; NUM_ARM_JOINTS]);

        session.close().unwrap();
    }
}

//! # External Control Interface Demo Executable
//!
//! This executable drives the dual-arm external control interface: it opens a session to the
//! arm controller (a physical robot or a simulated one, addressed by IP and the two UDP
//! ports), streams a sinusoidal joint-position reference to both arms at 50 Hz for a fixed
//! duration while feedback is received in the background, then closes the session.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Result};
use log::{info, warn};
use structopt::StructOpt;

// Internal
use eci_client::{EciParams, EciSession};
use eci_if::wire::NUM_ARM_JOINTS;
use util::logger::{logger_init, LevelFilter};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Sinusoid amplitudes for the left arm joints in radians
const AMPL_LEFT: [f32; NUM_ARM_JOINTS] = [-0.52, 0.17, -0.79, -1.05];

/// Sinusoid amplitudes for the right arm joints in radians
const AMPL_RIGHT: [f32; NUM_ARM_JOINTS] = [-0.52, -0.17, 0.79, -1.05];

/// Sinusoid frequency in hertz
const REF_FREQ_HZ: f64 = 0.25;

/// Reference send period, 50 Hz rate
const SEND_PERIOD: std::time::Duration = std::time::Duration::from_millis(20);

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, StructOpt)]
#[structopt(name = "eci_exec")]
struct Opt {
    /// Hostname or IP address of the arm controller
    dest: String,

    /// UDP port the controller accepts control references on
    tx_port: u16,

    /// Local UDP port the controller sends feedback to
    rx_port: u16,

    /// Optional toml parameter file, defaults apply when omitted
    #[structopt(long)]
    params: Option<std::path::PathBuf>,

    /// Demo duration in seconds
    #[structopt(long, default_value = "10")]
    duration_s: f64,
}

// ------------------------------------------------------------------------------------------------
// MAIN
// ------------------------------------------------------------------------------------------------

fn main() -> Result<()> {
    // ---- EARLY INITIALISATION ----

    let opt = Opt::from_args();

    logger_init(LevelFilter::Info, std::path::Path::new("eci_exec.log"))
        .wrap_err("Failed to initialise logging")?;

    info!("Dual-Arm External Control Interface Demo\n");

    // ---- LOAD PARAMETERS ----

    let params = match &opt.params {
        Some(path) => util::params::load(path).wrap_err("Failed to load the parameter file")?,
        None => EciParams::default(),
    };

    info!("Parameters loaded");

    // ---- SESSION INITIALISATION ----

    let mut session = EciSession::new(params);
    session
        .open(&opt.dest, opt.tx_port, opt.rx_port)
        .wrap_err("Failed to open the external control interface")?;

    // ---- MAIN LOOP ----

    info!(
        "Streaming joint references for {} s at 50 Hz",
        opt.duration_s
    );

    let mut feedback_seen = false;

    while session.elapsed_s() < opt.duration_s {
        let t = session.elapsed_s();
        let phase = (std::f64::consts::TAU * REF_FREQ_HZ * t).sin() as f32;

        let mut q_left = [0.0; NUM_ARM_JOINTS];
        let mut q_right = [0.0; NUM_ARM_JOINTS];
        for k in 0..NUM_ARM_JOINTS {
            q_left[k] = AMPL_LEFT[k] * phase;
            q_right[k] = AMPL_RIGHT[k] * phase;
        }

        if let Err(e) = session.send_joint_position_ref(&q_left, &q_right, 0.25) {
            warn!("Could not send the joint reference: {}", e);
        }

        if session.feedback_received() {
            if !feedback_seen {
                info!("First feedback packet received");
                feedback_seen = true;
            }

            let feedback = session.feedback();
            info!(
                "q_left: {:?} rad, q_right: {:?} rad, rate: {:.1} Hz",
                feedback.joint_pos_left,
                feedback.joint_pos_right,
                1.0 / feedback.elapsed_since_last_s.max(1e-6)
            );
        }

        std::thread::sleep(SEND_PERIOD);
    }

    // ---- SHUTDOWN ----

    session
        .close()
        .wrap_err("Failed to close the external control interface")?;

    info!("External control interface terminated correctly");

    Ok(())
}

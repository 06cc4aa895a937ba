//! # External Control Interface client crate.
//!
//! Provides the UDP transport session for the dual-arm system: a sender for fixed-format
//! control-reference packets and a background receiver which keeps a shared store updated with
//! the latest feedback from the arms.
//!
//! A caller constructs an [`EciSession`], opens it with the controller's address and the two
//! UDP ports, sends references on a timer of its own choosing, reads feedback snapshots at
//! will, and closes the session when done. Delivery is plain UDP: best effort, unordered,
//! unacknowledged.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Feedback state store, written by the receiver and snapshot-read by callers
pub mod feedback;

/// Session parameters
pub mod params;

/// Background feedback receiver loop
mod receiver;

/// Control-reference sender
mod sender;

/// Transport session lifecycle
pub mod session;

// ------------------------------------------------------------------------------------------------
// REEXPORTS
// ------------------------------------------------------------------------------------------------

pub use feedback::{Feedback, FeedbackStore};
pub use params::EciParams;
pub use session::EciSession;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors which can occur in the External Control Interface.
#[derive(Debug, thiserror::Error)]
pub enum EciError {
    #[error("Could not resolve destination \"{0}\": {1}")]
    ResolutionError(String, std::io::Error),

    #[error("Could not create the send socket: {0}")]
    SocketError(std::io::Error),

    #[error("Could not bind the feedback socket: {0}")]
    BindError(std::io::Error),

    #[error("Could not send the control-reference packet: {0}")]
    SendError(std::io::Error),

    #[error("Sent a truncated datagram ({sent} of {expected} bytes)")]
    TruncatedSend { sent: usize, expected: usize },

    #[error("The feedback receiver did not confirm termination within {0} ms")]
    ShutdownTimeout(u64),

    #[error("The session is already open")]
    AlreadyOpen,

    #[error("The session is not open")]
    NotOpen,
}

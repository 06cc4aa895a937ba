//! # External Control Interface definitions crate.
//!
//! Provides the wire-format definitions shared between the dual-arm controller and any client
//! of the external control interface.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Wire codec: packet layouts and the control mode enumeration
pub mod wire;

//! Utility library for the dual-arm External Control Interface software

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod logger;
pub mod params;

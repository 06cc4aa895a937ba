//! # Feedback State Store Module
//!
//! The store holds the decoded contents of the latest valid feedback packet received from the
//! arms, plus the bookkeeping timestamps. It has exactly one writer, the background receiver,
//! and any number of readers. Updates replace the whole struct under the lock, so a reader's
//! snapshot always corresponds to a single received packet, never a half-old, half-new mix.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use eci_if::wire::{FeedbackPacket, NUM_ARM_JOINTS};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// One consistent snapshot of the arms' measured state.
///
/// All fields are zero until the first valid feedback packet arrives.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Feedback {
    /// Cartesian position of the left TCP in metres
    pub tcp_pos_left: [f32; 3],

    /// Cartesian position of the right TCP in metres
    pub tcp_pos_right: [f32; 3],

    /// Left arm joint positions in radians
    pub joint_pos_left: [f32; NUM_ARM_JOINTS],

    /// Right arm joint positions in radians
    pub joint_pos_right: [f32; NUM_ARM_JOINTS],

    /// Left arm joint speeds in radians/second
    pub joint_vel_left: [f32; NUM_ARM_JOINTS],

    /// Right arm joint speeds in radians/second
    pub joint_vel_right: [f32; NUM_ARM_JOINTS],

    /// Left arm joint torques in newton-metres
    pub joint_torque_left: [f32; NUM_ARM_JOINTS],

    /// Right arm joint torques in newton-metres
    pub joint_torque_right: [f32; NUM_ARM_JOINTS],

    /// Left arm joint PWM duty cycles in [-1, 1]
    pub joint_pwm_left: [f32; NUM_ARM_JOINTS],

    /// Right arm joint PWM duty cycles in [-1, 1]
    pub joint_pwm_right: [f32; NUM_ARM_JOINTS],

    /// Session-elapsed time of this update in seconds
    pub t_last_update_s: f64,

    /// Elapsed time between the two most recent updates in seconds
    pub elapsed_since_last_s: f64,
}

/// Shared store for the latest feedback snapshot.
///
/// Single writer, many readers: the receiver commits whole packets, readers clone snapshots
/// out. Neither side holds the lock for longer than a copy.
pub struct FeedbackStore {
    latest: Mutex<Feedback>,
    received: AtomicBool,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl FeedbackStore {
    pub fn new() -> Self {
        Self {
            latest: Mutex::new(Feedback::default()),
            received: AtomicBool::new(false),
        }
    }

    /// Replace the store contents with a newly decoded packet.
    ///
    /// `now_s` is the session-elapsed receipt time. Returns the committed snapshot so the
    /// caller can log it without taking the lock again.
    pub(crate) fn commit(&self, packet: &FeedbackPacket, now_s: f64) -> Feedback {
        let mut guard = self.latest.lock().unwrap_or_else(PoisonError::into_inner);

        let feedback = Feedback {
            tcp_pos_left: packet.tcp_pos_left,
            tcp_pos_right: packet.tcp_pos_right,
            joint_pos_left: packet.joint_pos_left,
            joint_pos_right: packet.joint_pos_right,
            joint_vel_left: packet.joint_vel_left,
            joint_vel_right: packet.joint_vel_right,
            joint_torque_left: packet.joint_torque_left,
            joint_torque_right: packet.joint_torque_right,
            joint_pwm_left: packet.joint_pwm_left,
            joint_pwm_right: packet.joint_pwm_right,
            t_last_update_s: now_s,
            elapsed_since_last_s: now_s - guard.t_last_update_s,
        };

        *guard = feedback;
        drop(guard);

        self.received.store(true, Ordering::Relaxed);

        feedback
    }

    /// Snapshot the latest feedback.
    pub fn latest(&self) -> Feedback {
        *self.latest.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// True once at least one valid feedback packet has been committed.
    pub fn received(&self) -> bool {
        self.received.load(Ordering::Relaxed)
    }
}

impl Default for FeedbackStore {
    fn default() -> Self {
        Self::new()
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

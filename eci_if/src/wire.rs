//! # Wire Codec Module
//!
//! This module defines the two fixed-layout binary packets exchanged with the dual-arm
//! controller: the control-reference packet sent to the arms and the feedback packet received
//! from them. Layouts are packed field-by-field with a pinned little-endian byte order rather
//! than relying on in-memory struct layout, so the format is identical on every target.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::convert::TryFrom;

use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Number of joints in each arm.
pub const NUM_ARM_JOINTS: usize = 4;

/// Size in bytes of an encoded `f32`.
const F32_LEN: usize = 4;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Control modes accepted by the arm controller.
///
/// The joint-space and TCP-space (tool centre point) mode families share the single
/// [`ControlRefPacket`] layout, with the reference family not addressed by the mode left zeroed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum ControlMode {
    /// Joint position control, references in radians
    JointPosition = 1,

    /// Joint speed control, references in radians/second
    JointSpeed = 2,

    /// Joint torque control, references in newton-metres
    JointTorque = 3,

    /// TCP position control, references in metres w.r.t. the shoulder base joint
    TcpPosition = 101,

    /// TCP velocity control, references in metres/second w.r.t. the shoulder base joint
    TcpVelocity = 102,

    /// TCP force control, references in newtons w.r.t. the shoulder base joint
    TcpForce = 103,
}

/// Errors which can occur while decoding a packet.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    #[error("Expected a buffer of exactly {expected} bytes, got {actual}")]
    WrongLength { expected: usize, actual: usize },

    #[error("Unknown control mode byte: {0}")]
    UnknownMode(u8),
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A control-reference packet, sent to the arm controller.
///
/// One packet carries a full reference set for both arms in a single mode, along with the time
/// the controller should take to play the reference out and the sender's session-elapsed
/// timestamp.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlRefPacket {
    /// The control mode the references apply to
    pub mode: ControlMode,

    /// Time in seconds for the arms to reach the reference from their current state
    pub play_time_s: f32,

    /// Left arm TCP reference
    pub ref_tcp_left: [f32; 3],

    /// Right arm TCP reference
    pub ref_tcp_right: [f32; 3],

    /// Left arm joint references
    pub ref_joints_left: [f32; NUM_ARM_JOINTS],

    /// Right arm joint references
    pub ref_joints_right: [f32; NUM_ARM_JOINTS],

    /// Seconds elapsed since the sender's session started
    pub timestamp_s: f32,
}

/// A feedback packet, received from the arm controller.
///
/// Carries the measured Cartesian and joint state of both arms. The leading packet ID byte is
/// an extension point for future packet kinds and is not branched on here.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedbackPacket {
    /// Packet kind identifier
    pub packet_id: u8,

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
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl TryFrom<u8> for ControlMode {
    type Error = WireError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            1 => Ok(ControlMode::JointPosition),
            2 => Ok(ControlMode::JointSpeed),
            3 => Ok(ControlMode::JointTorque),
            101 => Ok(ControlMode::TcpPosition),
            102 => Ok(ControlMode::TcpVelocity),
            103 => Ok(ControlMode::TcpForce),
            b => Err(WireError::UnknownMode(b)),
        }
    }
}

impl ControlRefPacket {
    /// Exact encoded length in bytes: a mode byte followed by 16 `f32` fields.
    pub const ENCODED_LEN: usize = 1 + F32_LEN * (1 + 3 + 3 + 2 * NUM_ARM_JOINTS + 1);

    /// Encode the packet into its fixed wire layout.
    pub fn encode(&self) -> [u8; Self::ENCODED_LEN] {
        let mut buf = [0u8; Self::ENCODED_LEN];

        buf[0] = self.mode as u8;
        LittleEndian::write_f32(&mut buf[1..5], self.play_time_s);
        LittleEndian::write_f32_into(&self.ref_tcp_left, &mut buf[5..17]);
        LittleEndian::write_f32_into(&self.ref_tcp_right, &mut buf[17..29]);
        LittleEndian::write_f32_into(&self.ref_joints_left, &mut buf[29..45]);
        LittleEndian::write_f32_into(&self.ref_joints_right, &mut buf[45..61]);
        LittleEndian::write_f32(&mut buf[61..65], self.timestamp_s);

        buf
    }

    /// Decode a packet from a buffer of exactly [`Self::ENCODED_LEN`] bytes.
    ///
    /// Buffers of any other length are rejected whole, never partially interpreted.
    pub fn decode(buf: &[u8]) -> Result<Self, WireError> {
        if buf.len() != Self::ENCODED_LEN {
            return Err(WireError::WrongLength {
                expected: Self::ENCODED_LEN,
                actual: buf.len(),
            });
        }

        let mut packet = Self {
            mode: ControlMode::try_from(buf[0])?,
            play_time_s: LittleEndian::read_f32(&buf[1..5]),
            ref_tcp_left: [0.0; 3],
            ref_tcp_right: [0.0; 3],
            ref_joints_left: [0.0; NUM_ARM_JOINTS],
            ref_joints_right: [0.0; NUM_ARM_JOINTS],
            timestamp_s: LittleEndian::read_f32(&buf[61..65]),
        };

        LittleEndian::read_f32_into(&buf[5..17], &mut packet.ref_tcp_left);
        LittleEndian::read_f32_into(&buf[17..29], &mut packet.ref_tcp_right);
        LittleEndian::read_f32_into(&buf[29..45], &mut packet.ref_joints_left);
        LittleEndian::read_f32_into(&buf[45..61], &mut packet.ref_joints_right);

        Ok(packet)
    }
}

impl FeedbackPacket {
    /// Exact encoded length in bytes: an ID byte, two TCP triplets, and 8 joint vectors.
    pub const ENCODED_LEN: usize = 1 + F32_LEN * (3 + 3 + 8 * NUM_ARM_JOINTS);

    /// Encode the packet into its fixed wire layout.
    pub fn encode(&self) -> [u8; Self::ENCODED_LEN] {
        let mut buf = [0u8; Self::ENCODED_LEN];

        buf[0] = self.packet_id;
        LittleEndian::write_f32_into(&self.tcp_pos_left, &mut buf[1..13]);
        LittleEndian::write_f32_into(&self.tcp_pos_right, &mut buf[13..25]);
        LittleEndian::write_f32_into(&self.joint_pos_left, &mut buf[25..41]);
        LittleEndian::write_f32_into(&self.joint_pos_right, &mut buf[41..57]);
        LittleEndian::write_f32_into(&self.joint_vel_left, &mut buf[57..73]);
        LittleEndian::write_f32_into(&self.joint_vel_right, &mut buf[73..89]);
        LittleEndian::write_f32_into(&self.joint_torque_left, &mut buf[89..105]);
        LittleEndian::write_f32_into(&self.joint_torque_right, &mut buf[105..121]);
        LittleEndian::write_f32_into(&self.joint_pwm_left, &mut buf[121..137]);
        LittleEndian::write_f32_into(&self.joint_pwm_right, &mut buf[137..153]);

        buf
    }

    /// Decode a packet from a buffer of exactly [`Self::ENCODED_LEN`] bytes.
    ///
    /// Buffers of any other length are rejected whole, never partially interpreted.
    pub fn decode(buf: &[u8]) -> Result<Self, WireError> {
        if buf.len() != Self::ENCODED_LEN {
            return Err(WireError::WrongLength {
                expected: Self::ENCODED_LEN,
                actual: buf.len(),
            });
        }

        let mut packet = Self {
            packet_id: buf[0],
            ..Default::default()
        };

        LittleEndian::read_f32_into(&buf[1..13], &mut packet.tcp_pos_left);
        LittleEndian::read_f32_into(&buf[13..25], &mut packet.tcp_pos_right);
        LittleEndian::read_f32_into(&buf[25..41], &mut packet.joint_pos_left);
        LittleEndian::read_f32_into(&buf[41..57], &mut packet.joint_pos_right);
        LittleEndian::read_f32_into(&buf[57..73], &mut packet.joint_vel_left);
        LittleEndian::read_f32_into(&buf[73..89], &mut packet.joint_vel_right);
        LittleEndian::read_f32_into(&buf[89..105], &mut packet.joint_torque_left);
        LittleEndian::read_f32_into(&buf[105..121], &mut packet.joint_torque_right);
        LittleEndian::read_f32_into(&buf[121..137], &mut packet.joint_pwm_left);
        LittleEndian::read_f32_into(&buf[137..153], &mut packet.joint_pwm_right);

        Ok(packet)
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_encoded_lengths() {
        assert_eq!(ControlRefPacket::ENCODED_LEN, 65);
        assert_eq!(FeedbackPacket::ENCODED_LEN, 153);
    }

    #[test]
    fn test_control_mode_bytes() {
        assert_eq!(ControlMode::JointPosition as u8, 1);
        assert_eq!(ControlMode::JointSpeed as u8, 2);
        assert_eq!(ControlMode::JointTorque as u8, 3);
        assert_eq!(ControlMode::TcpPosition as u8, 101);
        assert_eq!(ControlMode::TcpVelocity as u8, 102);
        assert_eq!(ControlMode::TcpForce as u8, 103);

        for byte in &[1u8, 2, 3, 101, 102, 103] {
            assert_eq!(ControlMode::try_from(*byte).unwrap() as u8, *byte);
        }
        assert_eq!(ControlMode::try_from(42), Err(WireError::UnknownMode(42)));
    }

    #[test]
    fn test_control_ref_round_trip() {
        let packet = ControlRefPacket {
            mode: ControlMode::JointPosition,
            play_time_s: 0.25,
            ref_tcp_left: [0.0, 0.0, 0.0],
            ref_tcp_right: [0.0, 0.0, 0.0],
            ref_joints_left: [-30.0, 10.0, -45.0, -60.0],
            ref_joints_right: [-30.0, -10.0, 45.0, -60.0],
            timestamp_s: 1.5,
        };

        let buf = packet.encode();
        assert_eq!(buf.len(), ControlRefPacket::ENCODED_LEN);
        assert_eq!(buf[0], 1);

        let decoded = ControlRefPacket::decode(&buf).unwrap();
        assert_eq!(decoded, packet);
    }

    #[test]
    fn test_feedback_round_trip() {
        let packet = FeedbackPacket {
            packet_id: 1,
            tcp_pos_left: [0.1, 0.2, 0.3],
            tcp_pos_right: [-0.1, -0.2, -0.3],
            joint_pos_left: [1.0, 2.0, 3.0, 4.0],
            joint_pos_right: [-1.0, -2.0, -3.0, -4.0],
            joint_vel_left: [0.5, 0.6, 0.7, 0.8],
            joint_vel_right: [-0.5, -0.6, -0.7, -0.8],
            joint_torque_left: [1.5, 1.6, 1.7, 1.8],
            joint_torque_right: [-1.5, -1.6, -1.7, -1.8],
            joint_pwm_left: [0.25, 0.5, 0.75, 1.0],
            joint_pwm_right: [-0.25, -0.5, -0.75, -1.0],
        };

        let buf = packet.encode();
        assert_eq!(buf.len(), FeedbackPacket::ENCODED_LEN);
        assert_eq!(buf[0], 1);

        let decoded = FeedbackPacket::decode(&buf).unwrap();
        assert_eq!(decoded, packet);
    }

    #[test]
    fn test_wrong_length_rejected() {
        let buf = [0u8; FeedbackPacket::ENCODED_LEN];

        for len in &[0usize, 1, 64, 66, 152] {
            assert_eq!(
                FeedbackPacket::decode(&buf[..*len]),
                Err(WireError::WrongLength {
                    expected: FeedbackPacket::ENCODED_LEN,
                    actual: *len
                })
            );
        }

        assert_eq!(
            ControlRefPacket::decode(&buf),
            Err(WireError::WrongLength {
                expected: ControlRefPacket::ENCODED_LEN,
                actual: FeedbackPacket::ENCODED_LEN
            })
        );
    }

    #[test]
    fn test_unknown_mode_rejected() {
        let mut buf = [0u8; ControlRefPacket::ENCODED_LEN];
        buf[0] = 0;
        assert_eq!(
            ControlRefPacket::decode(&buf),
            Err(WireError::UnknownMode(0))
        );
    }
}

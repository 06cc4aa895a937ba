//! Synthetic feedback source test, stands in for the arm controller

use std::net::UdpSocket;
use std::thread;
use std::time::{Duration, Instant};

use structopt::StructOpt;

use eci_if::wire::{FeedbackPacket, NUM_ARM_JOINTS};

#[derive(Debug, StructOpt)]
#[structopt(name = "test_feedback_source")]
struct Opt {
    /// Target address to send feedback packets to, for example 127.0.0.1:24000
    target: String,

    /// Send rate in hertz
    #[structopt(long, default_value = "100")]
    rate_hz: f64,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let opt = Opt::from_args();

    // Bind an ephemeral port for sending
    let socket = UdpSocket::bind("0.0.0.0:0")?;
    let period = Duration::from_secs_f64(1.0 / opt.rate_hz);
    let start = Instant::now();

    println!(
        "Sending synthetic feedback to {} at {} Hz",
        opt.target, opt.rate_hz
    );

    let mut count: u64 = 0;

    loop {
        let t = start.elapsed().as_secs_f64();

        // Sinusoidal state, phase-shifted per joint, mirrored between arms
        let mut packet = FeedbackPacket {
            packet_id: 1,
            ..Default::default()
        };
        for k in 0..3 {
            packet.tcp_pos_left[k] = (0.3 * (t + k as f64).sin()) as f32;
            packet.tcp_pos_right[k] = (0.3 * (t - k as f64).sin()) as f32;
        }
        for k in 0..NUM_ARM_JOINTS {
            let phase = t + 0.5 * k as f64;
            packet.joint_pos_left[k] = phase.sin() as f32;
            packet.joint_pos_right[k] = -packet.joint_pos_left[k];
            packet.joint_vel_left[k] = phase.cos() as f32;
            packet.joint_vel_right[k] = -packet.joint_vel_left[k];
            packet.joint_torque_left[k] = (0.1 * phase.sin()) as f32;
            packet.joint_torque_right[k] = -packet.joint_torque_left[k];
            packet.joint_pwm_left[k] = (0.5 * phase.sin()) as f32;
            packet.joint_pwm_right[k] = -packet.joint_pwm_left[k];
        }

        socket.send_to(&packet.encode(), opt.target.as_str())?;

        count += 1;
        if count % 100 == 0 {
            println!("Sent {} packets", count);
        }

        thread::sleep(period);
    }
}

//! Control-reference sink test, prints every decoded reference packet

use std::net::UdpSocket;

use structopt::StructOpt;

use eci_if::wire::ControlRefPacket;

#[derive(Debug, StructOpt)]
#[structopt(name = "test_ref_sink")]
struct Opt {
    /// UDP port to listen for control-reference packets on
    #[structopt(default_value = "23000")]
    port: u16,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let opt = Opt::from_args();

    let socket = UdpSocket::bind(("0.0.0.0", opt.port))?;

    println!("Listening for control references on port {}", opt.port);

    let mut buf = [0u8; 512];

    loop {
        let (len, source) = socket.recv_from(&mut buf)?;

        match ControlRefPacket::decode(&buf[..len]) {
            Ok(packet) => println!("{}: {:?}", source, packet),
            Err(e) => println!("{}: discarded {} byte datagram ({})", source, len, e),
        }
    }
}

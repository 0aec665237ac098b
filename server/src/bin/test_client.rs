//! Bot client: logs in, prints what the server sends, shuffles the
//! inventory and logs out.

use bytes::BytesMut;
use clap::Parser;
use codec::login::{encode_handshake, encode_login_request, LoginRequest};
use codec::{encode_frame, FrameDecoder, Packet, PacketBuilder};
use log::{info, warn};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::sleep;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:43594")]
    server: String,

    /// Account name
    #[arg(short = 'u', long, default_value = "bot")]
    username: String,

    /// Account password
    #[arg(short = 'p', long, default_value = "password")]
    password: String,

    /// Seconds to stay logged in before logging out
    #[arg(short = 'd', long, default_value = "2")]
    duration: u64,
}

const INVENTORY_INTERFACE: u16 = 3214;
const LOGOUT_BUTTON: u16 = 2458;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    let mut stream = TcpStream::connect(&args.server).await?;
    println!("Connected to {}", args.server);

    stream.write_all(&encode_handshake(0)).await?;
    let mut handshake = [0u8; 17];
    stream.read_exact(&mut handshake).await?;
    let mut response = Packet::raw(handshake.to_vec());
    response.skip(9)?;
    let server_key = response.get_long()? as u64;
    info!("Server key {:#018x}", server_key);

    let request = LoginRequest::new(&args.username, &args.password, server_key);
    stream.write_all(&encode_login_request(&request)).await?;

    let mut result = [0u8; 3];
    stream.read_exact(&mut result).await?;
    if result[0] != 2 {
        println!("Login rejected with code {}", result[0]);
        return Ok(());
    }
    println!("Logged in as {} (rights {})", args.username, result[1]);

    let (mut reader, mut writer) = stream.into_split();
    let printer = tokio::spawn(async move {
        let decoder = FrameDecoder::server();
        let mut buffer = BytesMut::with_capacity(4096);
        loop {
            loop {
                match decoder.decode(&mut buffer) {
                    Ok(Some(packet)) => {
                        println!("<- opcode {:3} ({} bytes)", packet.opcode(), packet.len());
                    }
                    Ok(None) => break,
                    Err(e) => {
                        warn!("Undecodable frame: {}", e);
                        return;
                    }
                }
            }
            match reader.read_buf(&mut buffer).await {
                Ok(0) => {
                    println!("Server closed the connection");
                    return;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("Read error: {}", e);
                    return;
                }
            }
        }
    });

    sleep(Duration::from_secs(args.duration)).await;

    let switch = PacketBuilder::new(214)
        .put_le_short_a(INVENTORY_INTERFACE)
        .put_byte_c(0)
        .put_le_short_a(0)
        .put_le_short(1)
        .to_packet();
    println!("-> switch item 0 -> 1");
    writer.write_all(&encode_frame(&switch)).await?;

    let logout = PacketBuilder::new(185).put_short(LOGOUT_BUTTON).to_packet();
    println!("-> logout");
    writer.write_all(&encode_frame(&logout)).await?;

    printer.await?;
    println!("Test client finished");
    Ok(())
}

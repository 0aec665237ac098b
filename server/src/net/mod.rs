//! TCP front end: accepts connections and spawns a reader and a writer per
//! session.

mod connection;
mod session;

pub use connection::{read_loop, write_loop};
pub use session::{Outbound, Session, SessionIo, WriteFuture};

use crate::engine::EngineHandle;
use log::{debug, error, info, warn};
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};

/// Listens for game clients
pub struct NetworkServer {
    listener: TcpListener,
    next_session: u64,
}

impl NetworkServer {
    pub async fn bind(addr: &str) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!("Server listening on {}", listener.local_addr()?);
        Ok(Self {
            listener,
            next_session: 1,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections until the task is cancelled.
    pub async fn run(mut self, engine: EngineHandle) {
        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    let id = self.next_session;
                    self.next_session += 1;
                    info!("Session {} opened from {}", id, addr);
                    spawn_session(stream, addr, id, engine.clone());
                }
                Err(e) => {
                    error!("Error accepting connection: {}", e);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
            }
        }
    }
}

fn spawn_session(stream: TcpStream, addr: SocketAddr, id: u64, engine: EngineHandle) {
    if let Err(e) = stream.set_nodelay(true) {
        warn!("Failed to set TCP_NODELAY for {}: {}", addr, e);
    }
    let (session, io) = Session::new(id, addr);
    let (reader, writer) = stream.into_split();
    let server_key: u64 = rand::random();

    let write_session = session.clone();
    tokio::spawn(async move {
        if let Err(e) = write_loop(writer, io).await {
            debug!("Session {} write error: {}", id, e);
        }
        write_session.close();
    });
    tokio::spawn(read_loop(reader, session, engine, server_key));
}

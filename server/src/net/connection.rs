//! Per-connection reader and writer loops.

use super::session::{Session, SessionIo};
use crate::engine::EngineHandle;
use crate::loader::{return_code, PlayerDetails};
use crate::task::{PacketTask, PlayerLoadTask, SessionClosedTask};
use bytes::BytesMut;
use codec::login::{self, LoginDecoder, LoginEvent, REVISION};
use codec::{encode_frame, FrameDecoder};
use log::{debug, info, warn};
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

const READ_BUFFER_SIZE: usize = 4096;

/// Drains the session's outbound queue onto `writer` until the session
/// closes or every sender is gone.
pub async fn write_loop<W>(mut writer: W, mut io: SessionIo) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    loop {
        tokio::select! {
            biased;
            outbound = io.outbound.recv() => {
                let Some(outbound) = outbound else { break };
                writer.write_all(&encode_frame(&outbound.packet)).await?;
                writer.flush().await?;
                let _ = outbound.completion.send(());
            }
            changed = io.closed.changed() => {
                if changed.is_err() || *io.closed.borrow() {
                    break;
                }
            }
        }
    }

    // Flush whatever was queued before the close so final responses land
    while let Ok(outbound) = io.outbound.try_recv() {
        writer.write_all(&encode_frame(&outbound.packet)).await?;
        let _ = outbound.completion.send(());
    }
    writer.flush().await?;
    writer.shutdown().await
}

/// Decodes the login exchange and then game frames from `reader`, handing
/// each to the engine. Always leaves the session closed and a
/// [`SessionClosedTask`] queued on exit.
pub async fn read_loop<R>(reader: R, session: Session, engine: EngineHandle, server_key: u64)
where
    R: AsyncRead + Unpin,
{
    if let Err(e) = read_frames(reader, &session, &engine, server_key).await {
        debug!("Session {} read error: {}", session.id(), e);
    }
    session.close();
    info!("Session {} closed", session.id());
    engine.push_task(SessionClosedTask::new(session));
}

async fn read_frames<R>(
    mut reader: R,
    session: &Session,
    engine: &EngineHandle,
    server_key: u64,
) -> io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut buffer = BytesMut::with_capacity(READ_BUFFER_SIZE);
    let mut login = LoginDecoder::new();
    let frames = FrameDecoder::client();
    let mut closed = session.subscribe();

    loop {
        if !login.is_done() {
            while let Some(event) = login.decode(&mut buffer).map_err(invalid)? {
                match event {
                    LoginEvent::Handshake { name_hash } => {
                        debug!("Handshake from {} (hash {})", session.addr(), name_hash);
                        let _ = session.write(login::handshake_response(server_key));
                    }
                    LoginEvent::Request(request) => {
                        if request.revision != REVISION {
                            info!("Rejecting {}: client revision {}", session.addr(), request.revision);
                            reject(session, return_code::GAME_UPDATED);
                            let _ = closed.wait_for(|c| *c).await;
                            return Ok(());
                        }
                        if request.server_key != server_key {
                            warn!("Rejecting {}: server key mismatch", session.addr());
                            reject(session, return_code::BAD_SESSION_ID);
                            let _ = closed.wait_for(|c| *c).await;
                            return Ok(());
                        }
                        info!("Login request for {} from {}", request.username, session.addr());
                        engine.push_task(PlayerLoadTask::new(PlayerDetails::new(
                            session.clone(),
                            request,
                        )));
                    }
                }
                if login.is_done() {
                    break;
                }
            }
        }

        if login.is_done() {
            while let Some(packet) = frames.decode(&mut buffer).map_err(invalid)? {
                engine.push_task(PacketTask::new(session.clone(), packet));
            }
        }

        tokio::select! {
            read = reader.read_buf(&mut buffer) => {
                if read? == 0 {
                    debug!("Session {} reached end of stream", session.id());
                    return Ok(());
                }
            }
            _ = closed.wait_for(|c| *c) => return Ok(()),
        }
    }
}

fn reject(session: &Session, code: u8) {
    session
        .write(login::login_response(code, 0))
        .close_on_complete(session.clone());
}

fn invalid(e: codec::CodecError) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, e)
}

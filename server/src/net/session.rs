use codec::Packet;
use log::debug;
use std::fmt;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use tokio::sync::{mpsc, oneshot, watch};

/// A packet on its way to the writer task. `completion` fires once the
/// bytes have been handed to the socket.
#[derive(Debug)]
pub struct Outbound {
    pub packet: Packet,
    pub completion: oneshot::Sender<()>,
}

/// The receiving half of a session, owned by its connection tasks.
#[derive(Debug)]
pub struct SessionIo {
    pub outbound: mpsc::UnboundedReceiver<Outbound>,
    pub closed: watch::Receiver<bool>,
}

#[derive(Debug)]
struct Inner {
    id: u64,
    addr: SocketAddr,
    outbound: mpsc::UnboundedSender<Outbound>,
    player: OnceLock<u16>,
    closed: watch::Sender<bool>,
}

/// Cheaply cloneable handle to one client connection.
#[derive(Clone)]
pub struct Session {
    inner: Arc<Inner>,
}

impl Session {
    pub fn new(id: u64, addr: SocketAddr) -> (Self, SessionIo) {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (closed_tx, closed_rx) = watch::channel(false);
        let session = Self {
            inner: Arc::new(Inner {
                id,
                addr,
                outbound: outbound_tx,
                player: OnceLock::new(),
                closed: closed_tx,
            }),
        };
        let io = SessionIo {
            outbound: outbound_rx,
            closed: closed_rx,
        };
        (session, io)
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn addr(&self) -> SocketAddr {
        self.inner.addr
    }

    /// Queues `packet` for the writer. Writes to a closed session are
    /// dropped and complete as failed.
    pub fn write(&self, packet: Packet) -> WriteFuture {
        let (completion, rx) = oneshot::channel();
        if self.is_closed() {
            debug!("Dropping packet {} for closed session {}", packet.opcode(), self.id());
        } else {
            let _ = self.inner.outbound.send(Outbound { packet, completion });
        }
        WriteFuture { rx }
    }

    /// Idempotent.
    pub fn close(&self) {
        self.inner.closed.send_if_modified(|closed| !std::mem::replace(closed, true));
    }

    pub fn is_closed(&self) -> bool {
        *self.inner.closed.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.inner.closed.subscribe()
    }

    pub fn player_index(&self) -> Option<u16> {
        self.inner.player.get().copied()
    }

    /// Attaches the registered player's index. Only the first call sticks.
    pub fn set_player(&self, index: u16) -> bool {
        self.inner.player.set(index).is_ok()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.inner.id)
            .field("addr", &self.inner.addr)
            .field("player", &self.player_index())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl PartialEq for Session {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Session {}

/// Resolves once a written packet has been flushed.
#[must_use = "dropping a WriteFuture is fine, but usually you wanted to wait on it"]
#[derive(Debug)]
pub struct WriteFuture {
    rx: oneshot::Receiver<()>,
}

impl WriteFuture {
    /// True if the packet reached the socket.
    pub async fn completed(self) -> bool {
        self.rx.await.is_ok()
    }

    /// Closes `session` after this write completes, whether or not it
    /// succeeded.
    pub fn close_on_complete(self, session: Session) {
        tokio::spawn(async move {
            self.completed().await;
            session.close();
        });
    }
}

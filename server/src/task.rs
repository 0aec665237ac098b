//! Units of work executed by the engine loop.

use crate::engine::{EngineError, EngineHandle};
use crate::loader::{return_code, PlayerDetails};
use crate::model::Player;
use crate::net::Session;
use crate::packet::PacketManager;
use crate::world::{reject_login, World};
use codec::login::login_response;
use codec::{CodecError, Packet};
use log::{debug, error, info, warn};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("{0}")]
    Other(String),
}

/// Something the engine loop runs with exclusive access to the world.
pub trait Task: Send + 'static {
    fn execute(self: Box<Self>, ctx: &mut Context) -> Result<(), TaskError>;

    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Everything a task may touch. Only the engine loop ever holds one.
pub struct Context {
    engine: EngineHandle,
    world: World,
    packets: PacketManager,
}

impl Context {
    pub fn new(engine: EngineHandle, world: World, packets: PacketManager) -> Self {
        Self {
            engine,
            world,
            packets,
        }
    }

    pub fn engine(&self) -> &EngineHandle {
        &self.engine
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn packets(&self) -> &PacketManager {
        &self.packets
    }

    pub fn into_world(self) -> World {
        self.world
    }

    /// Routes `packet` to its handler on behalf of `session`.
    pub fn handle_packet(&mut self, session: &Session, packet: Packet) {
        self.packets.handle(session, &mut self.world, packet);
    }

    /// Runs `task`, logging any error or panic instead of propagating it.
    pub fn execute(&mut self, task: Box<dyn Task>) {
        let name = task.name();
        match panic::catch_unwind(AssertUnwindSafe(|| task.execute(self))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("Task {} failed: {}", name, e),
            Err(payload) => error!("Task {} panicked: {}", name, panic_message(payload.as_ref())),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}

/// Wraps a closure as a task.
pub struct FnTask<F> {
    f: F,
}

impl<F> FnTask<F>
where
    F: FnOnce(&mut Context) -> Result<(), TaskError> + Send + 'static,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> Task for FnTask<F>
where
    F: FnOnce(&mut Context) -> Result<(), TaskError> + Send + 'static,
{
    fn execute(self: Box<Self>, ctx: &mut Context) -> Result<(), TaskError> {
        (self.f)(ctx)
    }
}

/// One game cycle: advances every registered player's action queue.
pub struct TickTask;

impl Task for TickTask {
    fn execute(self: Box<Self>, ctx: &mut Context) -> Result<(), TaskError> {
        for player in ctx.world_mut().players_mut().iter_mut() {
            player.process_actions();
        }
        Ok(())
    }
}

/// Hands decoded login details to the world's loader.
pub struct PlayerLoadTask {
    details: PlayerDetails,
}

impl PlayerLoadTask {
    pub fn new(details: PlayerDetails) -> Self {
        Self { details }
    }
}

impl Task for PlayerLoadTask {
    fn execute(self: Box<Self>, ctx: &mut Context) -> Result<(), TaskError> {
        ctx.world().load(self.details)?;
        Ok(())
    }
}

/// Registers a freshly loaded player and sends the login sequence.
pub struct SessionLoginTask {
    player: Player,
}

impl SessionLoginTask {
    pub fn new(player: Player) -> Self {
        Self { player }
    }
}

impl Task for SessionLoginTask {
    fn execute(self: Box<Self>, ctx: &mut Context) -> Result<(), TaskError> {
        let player = self.player;
        let session = player.session().clone();

        if session.is_closed() {
            debug!("Session {} closed before {} could log in", session.id(), player.name());
            return Ok(());
        }

        let world = ctx.world_mut();
        if world.players().contains_name(player.name()) {
            warn!("Rejecting duplicate login for {}", player.name());
            reject_login(session, return_code::ALREADY_LOGGED_IN);
            return Ok(());
        }

        let rights = player.rights().code();
        let index = match world.register(player) {
            Some(index) => index,
            None => {
                warn!("World is full, rejecting session {}", session.id());
                reject_login(session, return_code::WORLD_FULL);
                return Ok(());
            }
        };
        let _ = session.write(login_response(return_code::SUCCESS, rights));
        session.set_player(index);

        if let Some(player) = world.player_mut(index) {
            info!("Registered {} at index {}", player, index);
            player.action_sender().send_login();
        }
        Ok(())
    }
}

/// Tears down whatever a closed session left behind.
pub struct SessionClosedTask {
    session: Session,
}

impl SessionClosedTask {
    pub fn new(session: Session) -> Self {
        Self { session }
    }
}

impl Task for SessionClosedTask {
    fn execute(self: Box<Self>, ctx: &mut Context) -> Result<(), TaskError> {
        if let Some(index) = self.session.player_index() {
            ctx.world_mut().unregister(index);
        }
        Ok(())
    }
}

/// A decoded game packet waiting for dispatch.
pub struct PacketTask {
    session: Session,
    packet: Packet,
}

impl PacketTask {
    pub fn new(session: Session, packet: Packet) -> Self {
        Self { session, packet }
    }
}

impl Task for PacketTask {
    fn execute(self: Box<Self>, ctx: &mut Context) -> Result<(), TaskError> {
        ctx.handle_packet(&self.session, self.packet);
        Ok(())
    }
}

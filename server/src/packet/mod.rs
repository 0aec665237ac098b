//! Opcode dispatch.
//!
//! Every one of the 256 opcodes maps to exactly one handler. Opcodes with
//! no specific handler share a single [`DefaultPacketHandler`].

mod handlers;

pub use handlers::{
    ActionButtonPacketHandler, DefaultPacketHandler, QuietPacketHandler,
    SwitchItemPacketHandler, LOGOUT_BUTTON,
};

use crate::model::Player;
use crate::net::Session;
use crate::world::World;
use codec::{CodecError, Packet};
use log::warn;
use std::sync::Arc;

pub trait PacketHandler: Send + Sync {
    /// Handles one packet. `player` is absent for sessions that have not
    /// logged in yet.
    fn handle(&self, player: Option<&mut Player>, packet: Packet) -> Result<(), CodecError>;
}

pub struct PacketManager {
    handlers: [Arc<dyn PacketHandler>; 256],
    default: Arc<dyn PacketHandler>,
}

impl PacketManager {
    /// A table with every known opcode bound.
    pub fn new() -> Self {
        let mut manager = Self::empty();
        let quiet: Arc<dyn PacketHandler> = Arc::new(QuietPacketHandler);
        for opcode in [0, 3, 86, 121, 202, 241] {
            manager.register(opcode, Arc::clone(&quiet));
        }
        manager.register(185, Arc::new(ActionButtonPacketHandler));
        manager.register(214, Arc::new(SwitchItemPacketHandler));
        manager
    }

    /// A table where every opcode goes to the default handler.
    pub fn empty() -> Self {
        let default: Arc<dyn PacketHandler> = Arc::new(DefaultPacketHandler);
        Self {
            handlers: std::array::from_fn(|_| Arc::clone(&default)),
            default,
        }
    }

    pub fn register(&mut self, opcode: u8, handler: Arc<dyn PacketHandler>) {
        self.handlers[opcode as usize] = handler;
    }

    pub fn handler(&self, opcode: u8) -> &Arc<dyn PacketHandler> {
        &self.handlers[opcode as usize]
    }

    pub fn is_default(&self, opcode: u8) -> bool {
        Arc::ptr_eq(self.handler(opcode), &self.default)
    }

    /// Looks up the session's player and runs the handler. A malformed
    /// packet is logged and dropped.
    pub fn handle(&self, session: &Session, world: &mut World, packet: Packet) {
        let opcode = packet.opcode();
        let player = session
            .player_index()
            .and_then(|index| world.player_mut(index));
        if let Err(e) = self.handler(opcode).handle(player, packet) {
            warn!("Malformed packet {} from session {}: {}", opcode, session.id(), e);
        }
    }
}

impl Default for PacketManager {
    fn default() -> Self {
        Self::new()
    }
}

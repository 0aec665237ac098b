use super::PacketHandler;
use crate::model::container::{INVENTORY_CAPACITY, INVENTORY_INTERFACE};
use crate::model::Player;
use codec::{CodecError, Packet};
use log::debug;

/// Button that logs the player out.
pub const LOGOUT_BUTTON: u16 = 2458;

/// Fallback for opcodes nobody handles.
pub struct DefaultPacketHandler;

impl PacketHandler for DefaultPacketHandler {
    fn handle(&self, _player: Option<&mut Player>, packet: Packet) -> Result<(), CodecError> {
        debug!("Unhandled packet: opcode {} ({} bytes)", packet.opcode(), packet.len());
        Ok(())
    }
}

/// Packets the client sends routinely that need no response.
pub struct QuietPacketHandler;

impl PacketHandler for QuietPacketHandler {
    fn handle(&self, _player: Option<&mut Player>, _packet: Packet) -> Result<(), CodecError> {
        Ok(())
    }
}

pub struct ActionButtonPacketHandler;

impl PacketHandler for ActionButtonPacketHandler {
    fn handle(&self, player: Option<&mut Player>, mut packet: Packet) -> Result<(), CodecError> {
        let Some(player) = player else { return Ok(()) };
        let button = packet.get_unsigned_short()?;
        match button {
            LOGOUT_BUTTON => {
                player.action_sender().send_logout();
            }
            _ => debug!("Unhandled action button {} from {}", button, player),
        }
        Ok(())
    }
}

/// Moves an item between two inventory slots. Anything other than a swap
/// of two distinct, in-range inventory slots is ignored.
pub struct SwitchItemPacketHandler;

impl PacketHandler for SwitchItemPacketHandler {
    fn handle(&self, player: Option<&mut Player>, mut packet: Packet) -> Result<(), CodecError> {
        let Some(player) = player else { return Ok(()) };
        let interface = packet.get_le_short_a()? as u16;
        packet.get_byte_c()?;
        let from = packet.get_le_short_a()? as u16 as usize;
        let to = packet.get_le_short()? as u16 as usize;

        if interface != INVENTORY_INTERFACE {
            return Ok(());
        }
        if from >= INVENTORY_CAPACITY || to >= INVENTORY_CAPACITY || from == to {
            return Ok(());
        }
        player.inventory_mut().swap(from, to);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Item, Location};
    use crate::net::{Session, SessionIo};
    use codec::PacketBuilder;

    fn player() -> (Player, SessionIo) {
        let (session, io) = Session::new(1, "127.0.0.1:1".parse().unwrap());
        let mut player = Player::new(session, "alice", Location::DEFAULT);
        player.action_sender().send_login();
        (player, io)
    }

    fn switch(interface: u16, from: u16, to: u16) -> Packet {
        PacketBuilder::new(214)
            .put_le_short_a(interface)
            .put_byte_c(0)
            .put_le_short_a(from)
            .put_le_short(to)
            .to_packet()
    }

    fn drain(io: &mut SessionIo) -> usize {
        let mut n = 0;
        while io.outbound.try_recv().is_ok() {
            n += 1;
        }
        n
    }

    #[test]
    fn test_switch_item_swaps_slots() {
        let (mut player, mut io) = player();
        player.inventory_mut().add(Item::new(4151, 1));
        drain(&mut io);

        SwitchItemPacketHandler
            .handle(Some(&mut player), switch(INVENTORY_INTERFACE, 0, 27))
            .unwrap();

        assert_eq!(player.inventory().get(27), Some(Item::new(4151, 1)));
        assert_eq!(player.inventory().get(0), None);
        assert_eq!(drain(&mut io), 1);
    }

    #[test]
    fn test_switch_item_ignores_invalid_requests() {
        let (mut player, mut io) = player();
        player.inventory_mut().add(Item::new(4151, 1));
        drain(&mut io);

        for packet in [
            switch(INVENTORY_INTERFACE, 0, 0),
            switch(INVENTORY_INTERFACE, 0, 28),
            switch(INVENTORY_INTERFACE, 28, 0),
            switch(INVENTORY_INTERFACE, 0xFFFF, 1),
            switch(1688, 0, 1),
        ] {
            SwitchItemPacketHandler.handle(Some(&mut player), packet).unwrap();
        }

        assert_eq!(player.inventory().get(0), Some(Item::new(4151, 1)));
        assert_eq!(drain(&mut io), 0);
    }

    #[test]
    fn test_truncated_switch_is_an_error() {
        let (mut player, _io) = player();
        let packet = PacketBuilder::new(214).put_short(1).to_packet();
        assert!(SwitchItemPacketHandler.handle(Some(&mut player), packet).is_err());
    }

    #[tokio::test]
    async fn test_logout_button_sends_logout() {
        let (mut player, mut io) = player();
        drain(&mut io);

        let packet = PacketBuilder::new(185).put_short(LOGOUT_BUTTON).to_packet();
        ActionButtonPacketHandler.handle(Some(&mut player), packet).unwrap();

        let outbound = io.outbound.recv().await.unwrap();
        assert_eq!(outbound.packet.opcode(), 109);
    }

    #[test]
    fn test_handlers_ignore_missing_player() {
        assert!(SwitchItemPacketHandler.handle(None, switch(3214, 0, 1)).is_ok());
        assert!(DefaultPacketHandler.handle(None, PacketBuilder::new(99).to_packet()).is_ok());
    }
}

//! Outgoing messages, composed from codec primitives.

use crate::model::container::{EQUIPMENT_INTERFACE, INVENTORY_INTERFACE};
use crate::model::palette::{PALETTE_PLANES, PALETTE_SIZE};
use crate::model::skills::SKILL_COUNT;
use crate::model::{Container, ContainerListener, Item, Palette, Player};
use crate::net::Session;
use codec::{Packet, PacketBuilder, PacketType};

pub const WELCOME_MESSAGE: &str = "Welcome to RuneScape.";

/// Tab icon and interface pairs sent on login.
pub const SIDEBAR_INTERFACES: [(u8, u16); 13] = [
    (1, 3917),
    (2, 638),
    (3, 3213),
    (4, 1644),
    (5, 5608),
    (6, 1151),
    (8, 5065),
    (9, 5715),
    (10, 2449),
    (11, 4445),
    (12, 147),
    (13, 6299),
    (0, 2423),
];

/// Counts above this are written as `255` followed by a full int.
const SHORT_COUNT_LIMIT: u32 = 254;

/// Writes semantically named messages to one player's session.
pub struct ActionSender<'a> {
    player: &'a mut Player,
}

impl<'a> ActionSender<'a> {
    pub fn new(player: &'a mut Player) -> Self {
        Self { player }
    }

    fn write(&self, packet: Packet) {
        let _ = self.player.session().write(packet);
    }

    /// The full login burst. Leaves the player active with listeners on its
    /// inventory and equipment.
    pub fn send_login(&mut self) -> &mut Self {
        self.player.set_active(true);
        self.send_details()
            .send_message(WELCOME_MESSAGE)
            .send_map_region()
            .send_sidebar_interfaces()
            .send_skills();

        let session = self.player.session().clone();
        self.player
            .inventory_mut()
            .add_listener(Box::new(InterfaceContainerListener::new(
                session.clone(),
                INVENTORY_INTERFACE,
            )));
        self.player
            .equipment_mut()
            .add_listener(Box::new(InterfaceContainerListener::new(
                session,
                EQUIPMENT_INTERFACE,
            )));
        self
    }

    pub fn send_details(&mut self) -> &mut Self {
        let mut details = PacketBuilder::new(249);
        details
            .put_byte_a(u8::from(self.player.is_members()))
            .put_le_short_a(self.player.index());
        self.write(details.to_packet());
        self.write(PacketBuilder::new(107).to_packet());
        self
    }

    pub fn send_message(&mut self, message: &str) -> &mut Self {
        let packet = PacketBuilder::with_type(253, PacketType::Variable)
            .put_rs2_string(message)
            .to_packet();
        self.write(packet);
        self
    }

    pub fn send_map_region(&mut self) -> &mut Self {
        let location = self.player.location();
        self.player.set_last_known_region(location);
        let packet = PacketBuilder::new(73)
            .put_short_a(location.chunk_x())
            .put_short(location.chunk_y())
            .to_packet();
        self.write(packet);
        self
    }

    /// Map region built from copied chunks. Each of the 4x13x13 cells is a
    /// presence bit, followed by the packed source tile when present.
    pub fn send_construct_map_region(&mut self, palette: &Palette) -> &mut Self {
        let location = self.player.location();
        self.player.set_last_known_region(location);

        let mut builder = PacketBuilder::with_type(241, PacketType::VariableShort);
        builder.put_short_a(location.chunk_y());
        {
            let mut bits = builder.bit_access();
            for z in 0..PALETTE_PLANES {
                for x in 0..PALETTE_SIZE {
                    for y in 0..PALETTE_SIZE {
                        match palette.get(x, y, z) {
                            Some(tile) => {
                                bits.put_bit(true);
                                bits.put_bits(26, tile.packed());
                            }
                            None => {
                                bits.put_bit(false);
                            }
                        }
                    }
                }
            }
        }
        builder.put_short(location.chunk_x());
        self.write(builder.to_packet());
        self
    }

    pub fn send_sidebar_interfaces(&mut self) -> &mut Self {
        for (icon, interface) in SIDEBAR_INTERFACES {
            self.send_sidebar_interface(icon, interface);
        }
        self
    }

    pub fn send_sidebar_interface(&mut self, icon: u8, interface: u16) -> &mut Self {
        let packet = PacketBuilder::new(71)
            .put_short(interface)
            .put_byte_a(icon)
            .to_packet();
        self.write(packet);
        self
    }

    pub fn send_skills(&mut self) -> &mut Self {
        for skill in 0..SKILL_COUNT {
            self.send_skill(skill);
        }
        self
    }

    pub fn send_skill(&mut self, skill: usize) -> &mut Self {
        let skills = self.player.skills();
        let packet = PacketBuilder::new(134)
            .put_byte(skill as u8)
            .put_int1(skills.experience(skill) as u32)
            .put_byte(skills.level(skill))
            .to_packet();
        self.write(packet);
        self
    }

    /// Opens `interface` with `inventory_interface` in the side panel.
    pub fn send_inventory_interface(&mut self, interface: u16, inventory_interface: u16) -> &mut Self {
        self.player.interface_state_mut().opened(interface);
        let packet = PacketBuilder::new(248)
            .put_short_a(interface)
            .put_short(inventory_interface)
            .to_packet();
        self.write(packet);
        self
    }

    /// Sends the logout packet and closes the session once it has been
    /// flushed.
    pub fn send_logout(&mut self) -> &mut Self {
        let session = self.player.session().clone();
        session
            .write(PacketBuilder::new(109).to_packet())
            .close_on_complete(session.clone());
        self
    }

    pub fn send_update_items(&mut self, interface: u16, items: &[Option<Item>]) -> &mut Self {
        self.write(update_items_packet(interface, items));
        self
    }

    pub fn send_update_item(&mut self, interface: u16, slot: usize, item: Option<Item>) -> &mut Self {
        self.write(update_slots_packet(interface, &[(slot, item)]));
        self
    }
}

/// Full container redraw (53).
pub fn update_items_packet(interface: u16, items: &[Option<Item>]) -> Packet {
    let mut builder = PacketBuilder::with_type(53, PacketType::VariableShort);
    builder.put_short(interface).put_short(items.len() as u16);
    for item in items {
        match item {
            Some(item) => {
                if item.count > SHORT_COUNT_LIMIT {
                    builder.put_byte(255).put_int2(item.count);
                } else {
                    builder.put_byte(item.count as u8);
                }
                builder.put_le_short_a(item.id.wrapping_add(1));
            }
            None => {
                builder.put_byte(0).put_le_short_a(0);
            }
        }
    }
    builder.to_packet()
}

/// Patch of individual slots (34). Each entry is
/// `[slot][id + 1][count]`, with id 0 for an empty slot.
pub fn update_slots_packet(interface: u16, slots: &[(usize, Option<Item>)]) -> Packet {
    let mut builder = PacketBuilder::with_type(34, PacketType::VariableShort);
    builder.put_short(interface);
    for (slot, item) in slots {
        builder.put_byte(*slot as u8);
        match item {
            Some(item) => {
                builder.put_short(item.id.wrapping_add(1));
                if item.count > SHORT_COUNT_LIMIT {
                    builder.put_byte(255).put_int(item.count);
                } else {
                    builder.put_byte(item.count as u8);
                }
            }
            None => {
                builder.put_short(0).put_byte(0);
            }
        }
    }
    builder.to_packet()
}

/// Mirrors a container onto a client interface.
pub struct InterfaceContainerListener {
    session: Session,
    interface: u16,
}

impl InterfaceContainerListener {
    pub fn new(session: Session, interface: u16) -> Self {
        Self { session, interface }
    }
}

impl ContainerListener for InterfaceContainerListener {
    fn item_changed(&self, container: &Container, slot: usize) {
        self.slots_changed(container, &[slot]);
    }

    fn slots_changed(&self, container: &Container, slots: &[usize]) {
        let entries: Vec<_> = slots.iter().map(|&s| (s, container.get(s))).collect();
        let _ = self.session.write(update_slots_packet(self.interface, &entries));
    }

    fn items_changed(&self, container: &Container) {
        let _ = self
            .session
            .write(update_items_packet(self.interface, container.items()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Location, PaletteTile};
    use crate::net::SessionIo;
    use codec::BitReader;

    fn player() -> (Player, SessionIo) {
        let (session, io) = Session::new(1, "127.0.0.1:1".parse().unwrap());
        (Player::new(session, "alice", Location::DEFAULT), io)
    }

    fn drain(io: &mut SessionIo) -> Vec<Packet> {
        let mut packets = Vec::new();
        while let Ok(outbound) = io.outbound.try_recv() {
            packets.push(outbound.packet);
        }
        packets
    }

    #[test]
    fn test_login_burst_order() {
        let (mut player, mut io) = player();
        player.action_sender().send_login();

        let opcodes: Vec<u8> = drain(&mut io).iter().map(Packet::opcode).collect();
        let mut expected = vec![249, 107, 253, 73];
        expected.extend([71; 13]);
        expected.extend([134; SKILL_COUNT]);
        expected.extend([53, 53]);
        assert_eq!(opcodes, expected);
        assert!(player.is_active());
        assert_eq!(player.last_known_region(), Some(Location::DEFAULT));
    }

    #[test]
    fn test_map_region_payload() {
        let (mut player, mut io) = player();
        player.action_sender().send_map_region();
        let packet = drain(&mut io).remove(0);
        // chunk 402 = 0x0192, short A adds 128 to the low byte
        assert_eq!(&packet.payload()[..], &[0x01, 0x12, 0x01, 0x92]);
    }

    #[test]
    fn test_inventory_listener_patches_slots() {
        let (mut player, mut io) = player();
        player.action_sender().send_login();
        drain(&mut io);

        player.inventory_mut().add(Item::new(995, 1000));
        let packet = drain(&mut io).remove(0);
        assert_eq!(packet.opcode(), 34);
        // interface 3214, slot 0, id 996, 255 + int 1000
        assert_eq!(
            &packet.payload()[..],
            &[0x0C, 0x8E, 0, 0x03, 0xE4, 255, 0, 0, 0x03, 0xE8]
        );
    }

    #[test]
    fn test_update_items_count_boundary() {
        let items = [Some(Item::new(1, 254)), Some(Item::new(1, 255)), None];
        let packet = update_items_packet(3214, &items);
        assert_eq!(
            &packet.payload()[..],
            &[
                0x0C, 0x8E, 0, 3, // interface, count
                254, 130, 0, // 254 fits in a byte
                255, 0, 0, 255, 0, 130, 0, // 255 needs the sentinel
                0, 128, 0, // empty
            ]
        );
    }

    #[test]
    fn test_construct_map_region_bits() {
        let (mut player, mut io) = player();
        let mut palette = Palette::new();
        let tile = PaletteTile::new(400, 401, 0, 1);
        palette.set(0, 0, 0, Some(tile));
        player.action_sender().send_construct_map_region(&palette);

        let packet = drain(&mut io).remove(0);
        assert_eq!(packet.opcode(), 241);
        let payload = packet.payload();
        let total_bits = 4 * 13 * 13 + 26;
        assert_eq!(payload.len(), 2 + (total_bits + 7) / 8 + 2);

        let mut bits = BitReader::new(&payload[2..]);
        assert!(bits.read_bit().unwrap());
        assert_eq!(bits.read_bits(26).unwrap(), tile.packed());
        for _ in 1..4 * 13 * 13 {
            assert!(!bits.read_bit().unwrap());
        }
    }

    #[tokio::test]
    async fn test_logout_closes_after_flush() {
        let (mut player, mut io) = player();
        let session = player.session().clone();
        player.action_sender().send_logout();

        let outbound = io.outbound.recv().await.unwrap();
        assert_eq!(outbound.packet.opcode(), 109);
        assert!(!session.is_closed());
        outbound.completion.send(()).unwrap();

        session.subscribe().wait_for(|c| *c).await.unwrap();
    }

    #[test]
    fn test_inventory_interface_records_state() {
        let (mut player, _io) = player();
        player.action_sender().send_inventory_interface(5292, 5063);
        assert!(player.interface_state().is_open(5292));
    }
}

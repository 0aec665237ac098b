//! Slotted item storage with change notification.

/// An item stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Item {
    pub id: u16,
    pub count: u32,
}

impl Item {
    pub const fn new(id: u16, count: u32) -> Self {
        Self { id, count }
    }
}

/// Whether `add` merges into an existing stack of the same id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackMode {
    /// Every added item takes its own slot.
    Standard,
    /// Items of the same id always share one slot.
    Always,
}

pub const INVENTORY_INTERFACE: u16 = 3214;
pub const INVENTORY_CAPACITY: usize = 28;
pub const EQUIPMENT_INTERFACE: u16 = 1688;
pub const EQUIPMENT_CAPACITY: usize = 14;

/// Observes a container. Each mutation reports exactly one of the three
/// callbacks.
pub trait ContainerListener: Send {
    fn item_changed(&self, container: &Container, slot: usize);
    fn slots_changed(&self, container: &Container, slots: &[usize]);
    fn items_changed(&self, container: &Container);
}

pub struct Container {
    mode: StackMode,
    items: Vec<Option<Item>>,
    listeners: Vec<Box<dyn ContainerListener>>,
}

impl Container {
    pub fn new(mode: StackMode, capacity: usize) -> Self {
        Self {
            mode,
            items: vec![None; capacity],
            listeners: Vec::new(),
        }
    }

    pub fn inventory() -> Self {
        Self::new(StackMode::Standard, INVENTORY_CAPACITY)
    }

    pub fn equipment() -> Self {
        Self::new(StackMode::Standard, EQUIPMENT_CAPACITY)
    }

    pub fn capacity(&self) -> usize {
        self.items.len()
    }

    pub fn mode(&self) -> StackMode {
        self.mode
    }

    /// Registers a listener and immediately gives it the full contents.
    pub fn add_listener(&mut self, listener: Box<dyn ContainerListener>) {
        listener.items_changed(self);
        self.listeners.push(listener);
    }

    pub fn remove_listeners(&mut self) {
        self.listeners.clear();
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn get(&self, slot: usize) -> Option<Item> {
        self.items.get(slot).copied().flatten()
    }

    pub fn items(&self) -> &[Option<Item>] {
        &self.items
    }

    pub fn free_slots(&self) -> usize {
        self.items.iter().filter(|i| i.is_none()).count()
    }

    pub fn is_full(&self) -> bool {
        self.free_slots() == 0
    }

    pub fn contains(&self, id: u16) -> bool {
        self.slot_of(id).is_some()
    }

    pub fn slot_of(&self, id: u16) -> Option<usize> {
        self.items.iter().position(|i| matches!(i, Some(item) if item.id == id))
    }

    /// Total count of `id` across every slot.
    pub fn count(&self, id: u16) -> u64 {
        self.items
            .iter()
            .flatten()
            .filter(|i| i.id == id)
            .map(|i| u64::from(i.count))
            .sum()
    }

    /// Replaces a slot. Returns false if `slot` is out of range.
    pub fn set(&mut self, slot: usize, item: Option<Item>) -> bool {
        let item = item.filter(|i| i.count > 0);
        match self.items.get_mut(slot) {
            Some(existing) => {
                *existing = item;
                self.fire_item_changed(slot);
                true
            }
            None => false,
        }
    }

    /// Adds `item`, merging into an existing stack when the container
    /// always stacks. Returns the slot used, or `None` when there is no
    /// room (or the merged count would overflow).
    pub fn add(&mut self, item: Item) -> Option<usize> {
        if item.count == 0 {
            return None;
        }
        if self.mode == StackMode::Always {
            if let Some(slot) = self.slot_of(item.id) {
                let stack = self.items[slot].as_mut()?;
                stack.count = stack.count.checked_add(item.count)?;
                self.fire_item_changed(slot);
                return Some(slot);
            }
        }
        let slot = self.items.iter().position(Option::is_none)?;
        self.items[slot] = Some(item);
        self.fire_item_changed(slot);
        Some(slot)
    }

    /// Removes up to `item.count` of `item.id`, starting from the first
    /// matching slot. Returns how many were removed.
    pub fn remove(&mut self, item: Item) -> u32 {
        let mut remaining = item.count;
        let mut changed = Vec::new();

        for (slot, entry) in self.items.iter_mut().enumerate() {
            if remaining == 0 {
                break;
            }
            let Some(stack) = entry else { continue };
            if stack.id != item.id {
                continue;
            }
            let taken = stack.count.min(remaining);
            stack.count -= taken;
            remaining -= taken;
            if stack.count == 0 {
                *entry = None;
            }
            changed.push(slot);
        }

        match changed.as_slice() {
            [] => {}
            [slot] => self.fire_item_changed(*slot),
            slots => self.fire_slots_changed(slots),
        }
        item.count - remaining
    }

    /// Swaps two slots. Out-of-range or equal slots are ignored and no
    /// listener fires.
    pub fn swap(&mut self, from: usize, to: usize) -> bool {
        if from == to || from >= self.capacity() || to >= self.capacity() {
            return false;
        }
        self.items.swap(from, to);
        self.fire_slots_changed(&[from, to]);
        true
    }

    pub fn clear(&mut self) {
        self.items.iter_mut().for_each(|i| *i = None);
        self.fire_items_changed();
    }

    fn fire_item_changed(&self, slot: usize) {
        for listener in &self.listeners {
            listener.item_changed(self, slot);
        }
    }

    fn fire_slots_changed(&self, slots: &[usize]) {
        for listener in &self.listeners {
            listener.slots_changed(self, slots);
        }
    }

    fn fire_items_changed(&self) {
        for listener in &self.listeners {
            listener.items_changed(self);
        }
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("mode", &self.mode)
            .field("items", &self.items)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

use super::container::Container;
use super::location::Location;
use super::skills::Skills;
use crate::action::{Action, ActionId, ActionQueue, Admission};
use crate::action_sender::ActionSender;
use crate::net::Session;
use std::fmt;

/// Privilege level, sent to the client in the login response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Rights {
    #[default]
    Player,
    Moderator,
    Administrator,
}

impl Rights {
    pub fn code(self) -> u8 {
        match self {
            Rights::Player => 0,
            Rights::Moderator => 1,
            Rights::Administrator => 2,
        }
    }
}

/// Tracks which main interface the client has open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InterfaceState {
    current: Option<u16>,
}

impl InterfaceState {
    pub fn opened(&mut self, id: u16) {
        self.current = Some(id);
    }

    pub fn closed(&mut self) {
        self.current = None;
    }

    pub fn current(&self) -> Option<u16> {
        self.current
    }

    pub fn is_open(&self, id: u16) -> bool {
        self.current == Some(id)
    }
}

/// A logged-in (or loading) player. After registration only the engine
/// loop touches it.
pub struct Player {
    index: u16,
    name: String,
    session: Session,
    rights: Rights,
    members: bool,
    active: bool,
    location: Location,
    last_known_region: Option<Location>,
    skills: Skills,
    inventory: Container,
    equipment: Container,
    action_queue: ActionQueue,
    interface_state: InterfaceState,
}

impl Player {
    pub fn new(session: Session, name: &str, location: Location) -> Self {
        Self {
            index: 0,
            name: name.to_string(),
            session,
            rights: Rights::Player,
            members: true,
            active: false,
            location,
            last_known_region: None,
            skills: Skills::new(),
            inventory: Container::inventory(),
            equipment: Container::equipment(),
            action_queue: ActionQueue::new(),
            interface_state: InterfaceState::default(),
        }
    }

    /// Registry index, or 0 before registration.
    pub fn index(&self) -> u16 {
        self.index
    }

    pub(crate) fn set_index(&mut self, index: u16) {
        self.index = index;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn rights(&self) -> Rights {
        self.rights
    }

    pub fn set_rights(&mut self, rights: Rights) {
        self.rights = rights;
    }

    pub fn is_members(&self) -> bool {
        self.members
    }

    pub fn set_members(&mut self, members: bool) {
        self.members = members;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub fn location(&self) -> Location {
        self.location
    }

    pub fn set_location(&mut self, location: Location) {
        self.location = location;
    }

    pub fn last_known_region(&self) -> Option<Location> {
        self.last_known_region
    }

    pub fn set_last_known_region(&mut self, location: Location) {
        self.last_known_region = Some(location);
    }

    pub fn skills(&self) -> &Skills {
        &self.skills
    }

    pub fn skills_mut(&mut self) -> &mut Skills {
        &mut self.skills
    }

    pub fn inventory(&self) -> &Container {
        &self.inventory
    }

    pub fn inventory_mut(&mut self) -> &mut Container {
        &mut self.inventory
    }

    pub fn equipment(&self) -> &Container {
        &self.equipment
    }

    pub fn equipment_mut(&mut self) -> &mut Container {
        &mut self.equipment
    }

    pub fn interface_state(&self) -> &InterfaceState {
        &self.interface_state
    }

    pub fn interface_state_mut(&mut self) -> &mut InterfaceState {
        &mut self.interface_state
    }

    pub fn action_queue(&self) -> &ActionQueue {
        &self.action_queue
    }

    pub fn action_sender(&mut self) -> ActionSender<'_> {
        ActionSender::new(self)
    }

    /// Adds experience and sends the updated skill.
    pub fn add_experience(&mut self, skill: usize, amount: f64) -> Option<u8> {
        let gained = self.skills.add_experience(skill, amount)?;
        self.action_sender().send_skill(skill);
        Some(gained)
    }

    pub fn queue_action(&mut self, action: Action) -> Admission {
        let (admission, displaced) = self.action_queue.enqueue(action);
        if let Some(displaced) = displaced {
            displaced.finish(self);
        }
        admission
    }

    /// Stops the action with `id` if it is the active one.
    pub fn stop_action(&mut self, id: ActionId) -> bool {
        match self.action_queue.stop(id) {
            Some(stopped) => {
                stopped.finish(self);
                true
            }
            None => false,
        }
    }

    pub fn clear_actions(&mut self) {
        if let Some(stopped) = self.action_queue.clear() {
            stopped.finish(self);
        }
    }

    /// One tick of the action queue.
    pub fn process_actions(&mut self) {
        let Some(mut action) = self.action_queue.take_due() else {
            return;
        };
        let step = action.fire(self);
        if let Some(retired) = self.action_queue.finish_firing(action, step) {
            retired.finish(self);
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [index={}]", self.name, self.index)
    }
}

impl fmt::Debug for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Player")
            .field("index", &self.index)
            .field("name", &self.name)
            .field("session", &self.session.id())
            .field("rights", &self.rights)
            .field("location", &self.location)
            .field("active", &self.active)
            .finish()
    }
}

//! The world: registered players and the glue to the loader.

use crate::engine::{EngineError, EngineHandle};
use crate::loader::{return_code, PlayerDetails, WorldLoader};
use crate::model::Player;
use crate::net::Session;
use crate::task::SessionLoginTask;
use codec::login::login_response;
use log::{debug, error, info, warn};
use std::sync::Arc;

/// Answers a login with `[code, 0, 0]` and closes the session once that
/// response has been flushed.
pub(crate) fn reject_login(session: Session, code: u8) {
    session.write(login_response(code, 0)).close_on_complete(session);
}

/// Fixed-capacity player slots addressed by 1-based index.
pub struct PlayerRegistry {
    slots: Vec<Option<Player>>,
    len: usize,
}

impl PlayerRegistry {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.min(u16::MAX as usize);
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            len: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == self.slots.len()
    }

    /// Stores `player` in the lowest free slot and stamps it with that index.
    /// Returns `None` when every slot is taken.
    pub fn add(&mut self, mut player: Player) -> Option<u16> {
        let slot = self.slots.iter().position(Option::is_none)?;
        let index = (slot + 1) as u16;
        player.set_index(index);
        self.slots[slot] = Some(player);
        self.len += 1;
        Some(index)
    }

    pub fn remove(&mut self, index: u16) -> Option<Player> {
        let slot = self.slots.get_mut(usize::from(index).checked_sub(1)?)?;
        let player = slot.take()?;
        self.len -= 1;
        Some(player)
    }

    pub fn get(&self, index: u16) -> Option<&Player> {
        self.slots.get(usize::from(index).checked_sub(1)?)?.as_ref()
    }

    pub fn get_mut(&mut self, index: u16) -> Option<&mut Player> {
        self.slots.get_mut(usize::from(index).checked_sub(1)?)?.as_mut()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.slots.iter().flatten()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Player> {
        self.slots.iter_mut().flatten()
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.iter().any(|p| p.name().eq_ignore_ascii_case(name))
    }
}

pub struct World {
    engine: Option<EngineHandle>,
    loader: Arc<dyn WorldLoader>,
    players: PlayerRegistry,
}

impl World {
    pub fn new(loader: Arc<dyn WorldLoader>, capacity: usize) -> Self {
        Self {
            engine: None,
            loader,
            players: PlayerRegistry::new(capacity),
        }
    }

    /// Binds the world to an engine. Allowed exactly once.
    pub fn init(&mut self, engine: EngineHandle) -> Result<(), EngineError> {
        if self.engine.is_some() {
            return Err(EngineError::AlreadyInitialized);
        }
        self.engine = Some(engine);
        Ok(())
    }

    pub fn engine(&self) -> Result<&EngineHandle, EngineError> {
        self.engine.as_ref().ok_or(EngineError::NotInitialized)
    }

    pub fn players(&self) -> &PlayerRegistry {
        &self.players
    }

    pub fn players_mut(&mut self) -> &mut PlayerRegistry {
        &mut self.players
    }

    pub fn player(&self, index: u16) -> Option<&Player> {
        self.players.get(index)
    }

    pub fn player_mut(&mut self, index: u16) -> Option<&mut Player> {
        self.players.get_mut(index)
    }

    /// Loads a player off the engine loop.
    ///
    /// A rejected login is answered from here and the session is closed
    /// once that response has been flushed. An accepted player comes back
    /// to the engine as a [`SessionLoginTask`], which answers only after
    /// checking the registry.
    pub fn load(&self, details: PlayerDetails) -> Result<(), EngineError> {
        let engine = self.engine()?.clone();
        let loader = Arc::clone(&self.loader);

        let job_engine = engine.clone();
        engine.submit_work(move || {
            let result = loader.load_player(&details);
            let session = details.session;

            match result.player {
                Some(player) if result.return_code == return_code::SUCCESS => {
                    debug!("Loaded {}", player);
                    job_engine.push_task(SessionLoginTask::new(player));
                }
                _ => {
                    let code = if result.return_code == return_code::SUCCESS {
                        error!("Loader reported success for {} without a player", details.name);
                        return_code::RETRY
                    } else {
                        result.return_code
                    };
                    info!("Login for {} rejected with code {}", details.name, code);
                    reject_login(session, code);
                }
            }
        });
        Ok(())
    }

    /// Returns `None` when every slot is taken.
    pub fn register(&mut self, player: Player) -> Option<u16> {
        if self.players.is_full() {
            debug!("No free slot for {}", player.name());
            return None;
        }
        let index = self.players.add(player)?;
        info!("Player registered, {} online", self.players.len());
        Some(index)
    }

    /// Removes a player, closes its session and saves it on the bounded
    /// pool.
    pub fn unregister(&mut self, index: u16) -> Option<()> {
        let mut player = self.players.remove(index)?;
        player.clear_actions();
        player.set_active(false);
        player.session().close();
        info!("Unregistered {}, {} online", player, self.players.len());

        match self.engine() {
            Ok(engine) => {
                let engine = engine.clone();
                let loader = Arc::clone(&self.loader);
                tokio::spawn(async move {
                    let name = player.name().to_string();
                    let saved = engine.submit(move || loader.save_player(&player)).await;
                    match saved.await {
                        Ok(true) => debug!("Saved {}", name),
                        Ok(false) => warn!("Failed to save {}", name),
                        Err(e) => error!("Save job for {} failed: {}", name, e),
                    }
                });
            }
            Err(e) => warn!("Not saving {}: {}", player, e),
        }
        Some(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::GenericWorldLoader;
    use crate::model::Location;
    use crate::net::{Session, SessionIo};
    use crate::engine::GameEngine;

    fn player(name: &str) -> (Player, SessionIo) {
        let (session, io) = Session::new(1, "127.0.0.1:1".parse().unwrap());
        (Player::new(session, name, Location::DEFAULT), io)
    }

    #[test]
    fn test_registry_indices_are_one_based() {
        let mut registry = PlayerRegistry::new(3);
        let (a, _a) = player("a");
        let (b, _b) = player("b");

        assert_eq!(registry.add(a), Some(1));
        assert_eq!(registry.add(b), Some(2));
        assert_eq!(registry.get(1).unwrap().index(), 1);
        assert!(registry.get(0).is_none());
        assert!(registry.get(4).is_none());
    }

    #[test]
    fn test_registry_reuses_freed_slots() {
        let mut registry = PlayerRegistry::new(2);
        let (a, _a) = player("a");
        let (b, _b) = player("b");
        let (c, _c) = player("c");

        registry.add(a);
        registry.add(b);
        assert!(registry.is_full());
        assert!(registry.remove(1).is_some());
        assert!(registry.remove(1).is_none());
        assert_eq!(registry.add(c), Some(1));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_registry_full_rejects() {
        let mut registry = PlayerRegistry::new(1);
        let (a, _a) = player("a");
        let (b, _b) = player("b");
        registry.add(a);
        assert_eq!(registry.add(b), None);
    }

    #[test]
    fn test_contains_name_ignores_case() {
        let mut registry = PlayerRegistry::new(1);
        let (a, _a) = player("Alice");
        registry.add(a);
        assert!(registry.contains_name("alice"));
        assert!(!registry.contains_name("bob"));
    }

    #[test]
    fn test_world_requires_init() {
        let world = World::new(Arc::new(GenericWorldLoader), 1);
        assert_eq!(world.engine().err(), Some(EngineError::NotInitialized));
    }

    #[tokio::test]
    async fn test_world_init_twice_fails() {
        let engine = GameEngine::new(1);
        let mut world = World::new(Arc::new(GenericWorldLoader), 1);
        assert!(world.init(engine.handle()).is_ok());
        assert_eq!(
            world.init(engine.handle()),
            Err(EngineError::AlreadyInitialized)
        );
    }

    #[tokio::test]
    async fn test_unregister_closes_session() {
        let engine = GameEngine::new(1);
        let mut world = World::new(Arc::new(GenericWorldLoader), 4);
        world.init(engine.handle()).unwrap();

        let (p, _io) = player("alice");
        let session = p.session().clone();
        let index = world.register(p).unwrap();

        assert!(world.unregister(index).is_some());
        assert!(session.is_closed());
        assert!(world.player(index).is_none());
        assert!(world.unregister(index).is_none());
    }
}

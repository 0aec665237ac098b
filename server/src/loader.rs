//! Loading and saving player profiles.

use crate::model::{Location, Player};
use crate::net::Session;
use codec::login::LoginRequest;
use log::debug;

/// Login response codes understood by the client.
pub mod return_code {
    pub const RETRY: u8 = 1;
    pub const SUCCESS: u8 = 2;
    pub const INVALID_CREDENTIALS: u8 = 3;
    pub const ACCOUNT_DISABLED: u8 = 4;
    pub const ALREADY_LOGGED_IN: u8 = 5;
    pub const GAME_UPDATED: u8 = 6;
    pub const WORLD_FULL: u8 = 7;
    pub const BAD_SESSION_ID: u8 = 10;
}

/// Credentials and client flags taken from a login request.
#[derive(Debug, Clone)]
pub struct PlayerDetails {
    pub session: Session,
    pub name: String,
    pub password: String,
    pub uid: u32,
    pub low_memory: bool,
    pub reconnecting: bool,
}

impl PlayerDetails {
    pub fn new(session: Session, request: LoginRequest) -> Self {
        Self {
            session,
            name: request.username,
            password: request.password,
            uid: request.uid,
            low_memory: request.low_memory,
            reconnecting: request.reconnecting,
        }
    }
}

/// Outcome of a load. `player` is present exactly when the code is
/// [`return_code::SUCCESS`].
pub struct LoadResult {
    pub return_code: u8,
    pub player: Option<Player>,
}

impl LoadResult {
    pub fn success(player: Player) -> Self {
        Self {
            return_code: return_code::SUCCESS,
            player: Some(player),
        }
    }

    pub fn failure(return_code: u8) -> Self {
        Self {
            return_code,
            player: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.player.is_some()
    }
}

/// Storage backend for player profiles. Called from worker threads, never
/// from the engine loop.
pub trait WorldLoader: Send + Sync + 'static {
    fn load_player(&self, details: &PlayerDetails) -> LoadResult;

    /// Persists `player`, returning whether the save succeeded.
    fn save_player(&self, player: &Player) -> bool;
}

/// Accepts any well-formed name with a non-empty password and spawns the
/// player at the default location. Nothing is persisted.
#[derive(Debug, Default, Clone, Copy)]
pub struct GenericWorldLoader;

pub const MAX_NAME_LENGTH: usize = 12;

pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_NAME_LENGTH
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == ' ' || c == '_')
}

impl WorldLoader for GenericWorldLoader {
    fn load_player(&self, details: &PlayerDetails) -> LoadResult {
        if !is_valid_name(&details.name) || details.password.is_empty() {
            return LoadResult::failure(return_code::INVALID_CREDENTIALS);
        }
        let player = Player::new(details.session.clone(), &details.name, Location::DEFAULT);
        LoadResult::success(player)
    }

    fn save_player(&self, player: &Player) -> bool {
        debug!("Discarding save for {}", player);
        true
    }
}

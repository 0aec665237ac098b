//! # RS2 Game Server Core
//!
//! The runtime core of a tile-based multiplayer game server speaking the
//! 317 revision protocol. It accepts client sessions, decodes their packets,
//! serializes every game-state mutation onto one engine loop and encodes the
//! resulting state changes back onto the wire.
//!
//! ## Core Responsibilities
//!
//! ### Single-Writer Game State
//! Players and the world registry are owned by the engine loop. Network
//! readers, worker jobs and the cycle timer never touch that state; they
//! push a [`task::Task`] and the loop runs it. Nothing inside a task or an
//! action needs its own locking.
//!
//! ### Opcode Dispatch
//! Each of the 256 opcodes maps to one [`packet::PacketHandler`]. Known
//! opcodes get specific handlers, everything else goes to a shared default
//! that logs and drops the packet.
//!
//! ### Player Actions
//! Player-initiated activity runs through a per-player
//! [`action::ActionQueue`]: at most one active action, `Always` actions
//! waiting in FIFO order, `Never` actions replacing the active one. Actions
//! tick down once per engine cycle.
//!
//! ### State Sync
//! [`action_sender::ActionSender`] composes outgoing messages (login burst,
//! skills, map regions, container redraws). Container listeners emit the
//! redraw or slot patch whenever an inventory or equipment slot changes.
//!
//! ## Architecture Design
//!
//! ### Engine and Worker Pools
//! [`engine::GameEngine`] drains an unbounded task queue on one Tokio task.
//! Blocking work goes to a bounded pool whose submission waits while the
//! pool is saturated, or to a single-slot pool for jobs that must never
//! overlap (player loads). Results come back as tasks.
//!
//! ### Sessions
//! Each TCP connection gets a reader task (login decoding then frame
//! decoding) and a writer task that drains the session's outbound queue.
//! Every write resolves a completion, so "write then close" waits for the
//! bytes to reach the socket.
//!
//! ## Module Organization
//!
//! - `engine`: scheduler loop, worker pools, cycle driver
//! - `task`: the task trait and the tasks the server schedules
//! - `world` / `loader`: player registry and the load/save seam
//! - `model`: players, locations, skills, containers, palettes
//! - `action` / `action_sender`: action queue and outgoing messages
//! - `packet`: dispatch table and handlers
//! - `net`: TCP listener, sessions, reader and writer loops
//! - `config`: command line configuration
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::engine::{spawn_cycle, GameEngine};
//! use server::loader::GenericWorldLoader;
//! use server::net::NetworkServer;
//! use server::packet::PacketManager;
//! use server::world::World;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut engine = GameEngine::new(4);
//!     let world = World::new(Arc::new(GenericWorldLoader), 2000);
//!     engine.start(world, PacketManager::new())?;
//!
//!     // One game cycle every 600ms
//!     spawn_cycle(engine.handle(), Duration::from_millis(600));
//!
//!     let server = NetworkServer::bind("0.0.0.0:43594").await?;
//!     server.run(engine.handle()).await;
//!     Ok(())
//! }
//! ```

pub mod action;
pub mod action_sender;
pub mod config;
pub mod engine;
pub mod loader;
pub mod model;
pub mod net;
pub mod packet;
pub mod task;
pub mod world;

pub use engine::{EngineError, EngineHandle, GameEngine};
pub use task::{Context, Task, TaskError};
pub use world::World;

//! Game model: players, their position, skills and item containers.

pub mod container;
pub mod location;
pub mod palette;
pub mod player;
pub mod skills;

pub use container::{Container, ContainerListener, Item, StackMode};
pub use location::Location;
pub use palette::{Palette, PaletteTile};
pub use player::{InterfaceState, Player, Rights};
pub use skills::Skills;

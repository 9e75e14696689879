//! Model module - World, Tower, Bell and Coords

pub mod bell;
pub mod coords;
pub mod tower;
pub mod world;

pub use bell::{Accidental, Bell, BellRole, BellSummary, Chime, Weight, WeightError};
pub use coords::Coords;
pub use tower::{Tower, TowerSummary};
pub use world::{LookupRow, SearchError, SearchField, SearchKey, World};

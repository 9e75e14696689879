//! Bellpedia - Dove bell tower data loading, search and chart generation
//!
//! Loads the Dove towers/bells CSV exports into a [`World`] of towers, caches
//! it as a JSON snapshot, and offers search, per-tower summaries, user visit
//! lists (xlsx) and static charts.

pub mod charts;
pub mod cli;
pub mod config;
pub mod data;
pub mod model;
pub mod stats;
pub mod user_list;
pub mod xlsx;

pub use cli::{Cli, Commands};
pub use config::Settings;
pub use data::WorldLoader;
pub use model::{Bell, SearchField, Tower, World};

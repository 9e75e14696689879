//! Data module - Dove CSV loading, field normalisation, snapshots and summary tables

pub mod loader;
pub mod normalize;
pub mod processor;
pub mod snapshot;

pub use loader::{DoveLoader, LoaderError};
pub use normalize::{parse_bell_designation, parse_cast_date, Designation};
pub use processor::{DataProcessor, ProcessorError};
pub use snapshot::{SnapshotError, WorldLoader};

//! Charts module - tower maps and histograms

pub mod histogram;
pub mod regions;
mod renderer;

pub use histogram::Histogram;
pub use regions::{Bounds, Region};
pub use renderer::{bell_colour, ChartError, ChartRenderer, PlotKind, PlotSelection};

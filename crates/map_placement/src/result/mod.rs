//! Placement output: the packed buffer, its class-indexed view, and the future handle.
pub mod buffer;
pub mod future;
pub mod view;

pub use buffer::{PlacementElement, PlacementStats, ResultBuffer};
pub use future::FutureResult;
pub use view::PlacementResult;

pub mod api;
pub mod config;
pub mod runtime;
pub mod state;
pub mod types;
pub mod util;

#[cfg(test)]
mod test_support;

pub use state::{AggregatorConfig, AggregatorEvent, StatusSnapshot, StreamAggregator};
pub use types::{Update, UpdateKind, UpdateType};

pub mod pump;

pub use pump::{pump_stream, PumpOutcome};

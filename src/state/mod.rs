mod aggregator;
pub mod clock;

pub use aggregator::{
    format_tool_calls, format_tool_result, format_updates, AggregatorConfig, AggregatorEvent,
    FormatError, StatusSnapshot, StreamAggregator, ToolSummary, DEFAULT_DOC_DELIMITER,
    DEFAULT_MAX_CONTENT_LENGTH,
};
pub use clock::{Clock, ManualClock, SystemClock};

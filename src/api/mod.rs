pub mod client;
pub mod logging;
#[cfg(test)]
pub mod mock_client;
pub mod normalize;
pub mod stream;

pub use client::{ByteStream, StreamClient};
pub use normalize::{NormalizeError, PayloadNormalizer};
pub use stream::{classify_line, parse_data_line, ControlEvent, DataLine, LineReassembler, SseLine};

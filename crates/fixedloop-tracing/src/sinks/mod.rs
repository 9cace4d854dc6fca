//! Built-in sinks

mod memory;
mod null;
mod tracing_sink;

pub use memory::{CapturedEvent, MemorySink};
pub use null::NullSink;
pub use tracing_sink::TracingSink;

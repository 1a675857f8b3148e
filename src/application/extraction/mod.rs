//! Extraction - 提取链与格式探测

mod chain;
mod probe;

pub use chain::{BackendFailure, ExtractionFailed, ExtractorChain};
pub use probe::{FormatProbe, ProbeError, DEFAULT_PROBE_WINDOW};

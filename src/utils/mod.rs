pub mod channels;
pub mod perf;

pub use channels::AssistantChannels;
pub use perf::LatencyTracker;

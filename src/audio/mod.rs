/// PCM mix graph.
pub mod mix;

pub use mix::{MIX_CHANNELS, MIX_SAMPLE_RATE, MixGraph, frame_to_sample};

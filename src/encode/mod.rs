/// `ffmpeg`-backed MP4 encoder.
pub mod ffmpeg;
/// Encoder contract and in-memory encoder.
pub mod sink;

pub use ffmpeg::{FfmpegEncoder, ensure_parent_dir, is_ffmpeg_on_path};
pub use sink::{AudioSinkConfig, EncoderConfig, InMemoryEncoder, VideoBlob, VideoEncoder};

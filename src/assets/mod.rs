/// Audio decoding.
pub mod audio;
/// Still image decoding.
pub mod image;
/// Per-run handle ownership.
pub mod loader;
/// Asset source resolution.
pub mod source;
/// Narrator clip decoding.
pub mod video;

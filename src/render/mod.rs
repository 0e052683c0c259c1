/// Placeholder narrator and slideshow backdrops.
pub mod avatar;
/// Frame buffers and premultiplied pixel helpers.
pub mod frame;
/// Pan/zoom, entrance and caption timing.
pub mod motion;
/// Per-scene frame state machine.
pub mod scene;
/// Drawing surface.
pub mod surface;
/// Caption layout and glyph drawing.
pub mod text;

pub use frame::FrameRGBA;
pub use motion::KenBurns;
pub use scene::{OverlayAnchor, OverlayPlacement, RenderMode, SceneRenderer, SceneStyle};
pub use surface::Surface;
pub use text::CaptionRenderer;

use std::collections::BTreeMap;
use std::io::Write as _;
use std::sync::Arc;

use crate::assets::audio::{AudioPcm, decode_audio_bytes};
use crate::assets::image::{LoadedImage, decode_image};
use crate::assets::source::MediaSource;
use crate::assets::video::NarratorClip;
use crate::foundation::core::{Canvas, Fps};
use crate::foundation::error::{ReelError, ReelResult};

/// Per-run owner of every decoded media handle.
///
/// Loads are atomic: a handle is only registered after it decoded completely. Everything the
/// loader registered is released by [`MediaLoader::release_all`] or on drop, whichever comes
/// first, so early returns and cancellation never leak decoder processes or temp files.
/// Scene images are also released per scene through [`MediaLoader::release_scene`].
pub struct MediaLoader {
    canvas: Canvas,
    fps: Fps,
    images: Vec<Arc<LoadedImage>>,
    scene_images: BTreeMap<usize, Vec<Arc<LoadedImage>>>,
    narrator: Option<NarratorClip>,
    temp_files: Vec<tempfile::TempPath>,
    released: bool,
}

impl MediaLoader {
    /// Create an empty loader for a run rendering at `canvas` / `fps`.
    pub fn new(canvas: Canvas, fps: Fps) -> Self {
        Self {
            canvas,
            fps,
            images: Vec::new(),
            scene_images: BTreeMap::new(),
            narrator: None,
            temp_files: Vec::new(),
            released: false,
        }
    }

    /// Resolve and decode a still image.
    pub fn load_image(&mut self, src: &MediaSource) -> ReelResult<Arc<LoadedImage>> {
        let img = self.decode_still(src)?;
        self.images.push(img.clone());
        Ok(img)
    }

    fn decode_still(&self, src: &MediaSource) -> ReelResult<Arc<LoadedImage>> {
        self.ensure_live()?;
        let bytes = src.resolve_bytes()?;
        let img = decode_image(&bytes).map_err(|e| ReelError::decode(src.describe(), e))?;
        Ok(Arc::new(img))
    }

    /// Decode every image of one scene, keeping a slot per source.
    ///
    /// Failed slots are `None`; the failure is logged and never propagated. The handles stay
    /// registered under `scene` until [`MediaLoader::release_scene`].
    pub fn load_scene_images(
        &mut self,
        scene: usize,
        sources: &[MediaSource],
    ) -> Vec<Option<Arc<LoadedImage>>> {
        let slots: Vec<Option<Arc<LoadedImage>>> = sources
            .iter()
            .map(|src| match self.decode_still(src) {
                Ok(img) => Some(img),
                Err(e) => {
                    tracing::warn!(scene, source = %src.describe(), error = %e, "scene image skipped");
                    None
                }
            })
            .collect();
        let held = self.scene_images.entry(scene).or_default();
        held.extend(slots.iter().flatten().cloned());
        slots
    }

    /// Drop the loader's references to the images of `scene`.
    pub fn release_scene(&mut self, scene: usize) {
        if let Some(images) = self.scene_images.remove(&scene) {
            tracing::debug!(scene, released = images.len(), "scene images released");
        }
    }

    /// Resolve and decode an audio asset (narration or music).
    ///
    /// Audio is returned by value: the mixer owns it until it finished playing.
    pub fn load_audio(&mut self, src: &MediaSource) -> ReelResult<AudioPcm> {
        self.ensure_live()?;
        let bytes = src.resolve_bytes()?;
        decode_audio_bytes(&bytes).map_err(|e| ReelError::decode(src.describe(), e))
    }

    /// Resolve raw bytes (fonts and other undecoded assets).
    pub fn load_bytes(&mut self, src: &MediaSource) -> ReelResult<Arc<[u8]>> {
        self.ensure_live()?;
        src.resolve_bytes()
    }

    /// Open the narrator clip. Replaces (and releases) a previously opened clip.
    pub fn load_narrator(&mut self, src: &MediaSource) -> ReelResult<()> {
        self.ensure_live()?;
        if let Some(mut old) = self.narrator.take() {
            old.release();
        }

        let path = match src {
            MediaSource::Reference(r) if is_local_reference(r.trim()) => {
                let r = r.trim();
                let p = std::path::PathBuf::from(r.strip_prefix("file://").unwrap_or(r));
                if !p.is_file() {
                    return Err(ReelError::decode(src.describe(), "file not found"));
                }
                p
            }
            _ => {
                // ffmpeg needs a seekable input; spill in-memory clips to a temp file.
                let bytes = src.resolve_bytes()?;
                let mut tmp = tempfile::Builder::new()
                    .prefix("momentreel_narrator_")
                    .tempfile()
                    .map_err(|e| ReelError::decode(src.describe(), e))?;
                tmp.write_all(&bytes)
                    .and_then(|_| tmp.flush())
                    .map_err(|e| ReelError::decode(src.describe(), e))?;
                let tmp_path = tmp.into_temp_path();
                let p = tmp_path.to_path_buf();
                self.temp_files.push(tmp_path);
                p
            }
        };

        let clip = NarratorClip::open(&path, self.canvas, self.fps)
            .map_err(|e| match e {
                ReelError::MediaDecode { cause, .. } => ReelError::decode(src.describe(), cause),
                other => other,
            })?;
        tracing::debug!(
            width = clip.info().width,
            height = clip.info().height,
            duration = ?clip.info().duration_secs,
            "narrator clip opened"
        );
        self.narrator = Some(clip);
        Ok(())
    }

    /// Borrow the narrator clip, if one was loaded.
    pub fn narrator_mut(&mut self) -> Option<&mut NarratorClip> {
        self.narrator.as_mut()
    }

    /// Return `true` when a narrator clip is loaded.
    pub fn has_narrator(&self) -> bool {
        self.narrator.is_some()
    }

    /// Number of handles currently held (images, narrator clip, temp files).
    pub fn live_handles(&self) -> usize {
        self.images.len()
            + self.scene_images.values().map(Vec::len).sum::<usize>()
            + usize::from(self.narrator.is_some()) + self.temp_files.len()
    }

    /// Release every handle. Idempotent; later loads fail.
    pub fn release_all(&mut self) {
        if self.released {
            return;
        }
        let held = self.live_handles();
        self.images.clear();
        self.scene_images.clear();
        if let Some(mut clip) = self.narrator.take() {
            clip.release();
        }
        for tmp in self.temp_files.drain(..) {
            if let Err(e) = tmp.close() {
                tracing::warn!(error = %e, "failed to remove temp media file");
            }
        }
        self.released = true;
        tracing::debug!(released = held, "media handles released");
    }

    fn ensure_live(&self) -> ReelResult<()> {
        if self.released {
            return Err(ReelError::validation(
                "media loader already released for this run",
            ));
        }
        Ok(())
    }
}

fn is_local_reference(r: &str) -> bool {
    !r.starts_with("data:") && !r.starts_with("http://") && !r.starts_with("https://")
}

impl Drop for MediaLoader {
    fn drop(&mut self) {
        self.release_all();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/loader.rs"]
mod tests;

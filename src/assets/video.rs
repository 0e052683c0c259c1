use std::io::Read;
use std::path::Path;
use std::process::{Child, ChildStdout, Command, Stdio};

use crate::encode::ffmpeg::{ffmpeg_bin, ffprobe_bin};
use crate::foundation::core::{Canvas, Fps};
use crate::foundation::error::{ReelError, ReelResult};
use crate::foundation::math::premultiply_rgba8_in_place;
use crate::render::frame::image_from_premul_bytes;

/// Basic metadata about a source video file.
#[derive(Clone, Debug)]
pub struct VideoSourceInfo {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Container duration in seconds, when ffprobe reports one.
    pub duration_secs: Option<f64>,
}

/// Probe source video metadata through `ffprobe`.
pub(crate) fn probe_video(source_path: &Path) -> ReelResult<VideoSourceInfo> {
    #[derive(serde::Deserialize)]
    struct ProbeStream {
        codec_type: Option<String>,
        width: Option<u32>,
        height: Option<u32>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeFormat {
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeOut {
        streams: Vec<ProbeStream>,
        format: Option<ProbeFormat>,
    }

    let out = Command::new(ffprobe_bin())
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_streams",
            "-show_format",
        ])
        .arg(source_path)
        .output()
        .map_err(|e| ReelError::decode("narrator clip", format!("failed to run ffprobe: {e}")))?;
    if !out.status.success() {
        return Err(ReelError::decode(
            "narrator clip",
            format!(
                "ffprobe failed: {}",
                String::from_utf8_lossy(&out.stderr).trim()
            ),
        ));
    }

    let parsed: ProbeOut = serde_json::from_slice(&out.stdout)
        .map_err(|e| ReelError::decode("narrator clip", format!("ffprobe json parse failed: {e}")))?;
    let video_stream = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| ReelError::decode("narrator clip", "no video stream found"))?;
    let (Some(width), Some(height)) = (video_stream.width, video_stream.height) else {
        return Err(ReelError::decode(
            "narrator clip",
            "missing video dimensions from ffprobe",
        ));
    };

    Ok(VideoSourceInfo {
        width,
        height,
        duration_secs: parsed
            .format
            .and_then(|f| f.duration)
            .and_then(|d| d.parse::<f64>().ok()),
    })
}

/// Streaming decoder for the animated narrator clip.
///
/// One `ffmpeg` child scales and crops the clip to the canvas and resamples it to the output
/// frame rate, so each [`NarratorClip::advance`] consumes exactly one output frame. When the
/// clip runs out the last decoded frame is held.
pub struct NarratorClip {
    info: VideoSourceInfo,
    canvas: Canvas,
    child: Option<Child>,
    stdout: Option<ChildStdout>,
    buf: Vec<u8>,
    current: Option<vello_cpu::Image>,
    frames_read: u64,
    exhausted: bool,
    primed: bool,
}

impl std::fmt::Debug for NarratorClip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NarratorClip")
            .field("info", &self.info)
            .field("frames_read", &self.frames_read)
            .field("exhausted", &self.exhausted)
            .finish_non_exhaustive()
    }
}

impl NarratorClip {
    /// Probe `path` and start streaming it at `canvas` size and `fps`.
    pub(crate) fn open(path: &Path, canvas: Canvas, fps: Fps) -> ReelResult<Self> {
        let info = probe_video(path)?;

        let filter = format!(
            "scale={w}:{h}:force_original_aspect_ratio=increase,crop={w}:{h},fps={n}/{d}",
            w = canvas.width,
            h = canvas.height,
            n = fps.num,
            d = fps.den
        );
        let mut child = Command::new(ffmpeg_bin())
            .args(["-v", "error", "-nostdin", "-i"])
            .arg(path)
            .args([
                "-an", "-vf", &filter, "-f", "rawvideo", "-pix_fmt", "rgba", "pipe:1",
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                ReelError::decode("narrator clip", format!("failed to spawn ffmpeg: {e}"))
            })?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ReelError::decode("narrator clip", "failed to open ffmpeg stdout"))?;

        let mut clip = Self {
            info,
            canvas,
            child: Some(child),
            stdout: Some(stdout),
            buf: vec![0u8; canvas.rgba_len()],
            current: None,
            frames_read: 0,
            exhausted: false,
            primed: true,
        };
        // Load is atomic: a clip that cannot produce a single frame is a decode failure.
        clip.read_next()?;
        if clip.current.is_none() {
            clip.release();
            return Err(ReelError::decode(
                "narrator clip",
                "ffmpeg produced no video frames",
            ));
        }
        Ok(clip)
    }

    /// Source metadata.
    pub fn info(&self) -> &VideoSourceInfo {
        &self.info
    }

    /// Number of frames decoded so far.
    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    /// Paint for the current frame.
    pub(crate) fn current(&self) -> Option<&vello_cpu::Image> {
        self.current.as_ref()
    }

    /// Move to the next output frame, holding the last one once the clip is exhausted.
    ///
    /// The first call after opening keeps the frame decoded by `open`.
    pub(crate) fn advance(&mut self) -> ReelResult<()> {
        if std::mem::take(&mut self.primed) {
            return Ok(());
        }
        self.read_next()
    }

    /// Skip `n` output frames (used while transitions play).
    pub(crate) fn skip(&mut self, n: u64) -> ReelResult<()> {
        let pending = u64::from(std::mem::take(&mut self.primed));
        for _ in pending.min(n)..n {
            if self.exhausted {
                break;
            }
            self.read_raw()?;
        }
        Ok(())
    }

    fn read_next(&mut self) -> ReelResult<()> {
        if self.exhausted {
            return Ok(());
        }
        if self.read_raw()? {
            let mut premul = self.buf.clone();
            premultiply_rgba8_in_place(&mut premul);
            self.current = Some(image_from_premul_bytes(
                &premul,
                self.canvas.width,
                self.canvas.height,
            )?);
        }
        Ok(())
    }

    fn read_raw(&mut self) -> ReelResult<bool> {
        let Some(stdout) = self.stdout.as_mut() else {
            self.exhausted = true;
            return Ok(false);
        };
        match stdout.read_exact(&mut self.buf) {
            Ok(()) => {
                self.frames_read += 1;
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                tracing::debug!(
                    frames = self.frames_read,
                    "narrator clip exhausted; holding last frame"
                );
                self.exhausted = true;
                self.release();
                Ok(false)
            }
            Err(e) => {
                self.exhausted = true;
                self.release();
                Err(ReelError::decode(
                    "narrator clip",
                    format!("reading frame from ffmpeg failed: {e}"),
                ))
            }
        }
    }

    /// Stop the decoder process. Idempotent.
    pub(crate) fn release(&mut self) {
        drop(self.stdout.take());
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

impl Drop for NarratorClip {
    fn drop(&mut self) {
        self.release();
    }
}

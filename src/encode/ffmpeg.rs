use std::fs::File;
use std::io::{BufWriter, Read, Write as _};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};

use crate::encode::sink::{AudioSinkConfig, EncoderConfig, VideoBlob, VideoEncoder};
use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{CompositionStage, ReelError, ReelResult};
use crate::foundation::math::mul_div255_u16;
use crate::render::frame::FrameRGBA;

/// Path of the `ffmpeg` binary (`MOMENTREEL_FFMPEG`, default `ffmpeg`).
pub fn ffmpeg_bin() -> PathBuf {
    std::env::var_os("MOMENTREEL_FFMPEG")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("ffmpeg"))
}

/// Path of the `ffprobe` binary (`MOMENTREEL_FFPROBE`, default `ffprobe`).
pub fn ffprobe_bin() -> PathBuf {
    std::env::var_os("MOMENTREEL_FFPROBE")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("ffprobe"))
}

/// Return `true` when `ffmpeg` can be invoked.
pub fn is_ffmpeg_on_path() -> bool {
    Command::new(ffmpeg_bin())
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> ReelResult<()> {
    if let Some(parent) = path.parent() {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

type StderrDrain = std::thread::JoinHandle<std::io::Result<Vec<u8>>>;

struct VideoPass {
    child: Child,
    stdin: Option<ChildStdin>,
    stderr_drain: Option<StderrDrain>,
}

struct AudioPass {
    cfg: AudioSinkConfig,
    writer: BufWriter<File>,
    samples_written: u64,
}

/// Encoder backed by the system `ffmpeg` binary producing an H.264 + AAC MP4.
///
/// Video frames stream into one `ffmpeg` child writing a temporary video-only MP4; audio blocks
/// are appended to a temporary `f32le` file. `finalize` muxes both into the final container and
/// returns its bytes. All temporary files live in a per-run directory removed on drop.
pub struct FfmpegEncoder {
    workdir: Option<tempfile::TempDir>,
    cfg: Option<EncoderConfig>,
    video: Option<VideoPass>,
    audio: Option<AudioPass>,
    scratch: Vec<u8>,
    last_idx: Option<FrameIndex>,
    frames_written: u64,
}

impl Default for FfmpegEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegEncoder {
    /// Create an idle encoder; nothing is spawned until `open_frame_sink`.
    pub fn new() -> Self {
        Self {
            workdir: None,
            cfg: None,
            video: None,
            audio: None,
            scratch: Vec::new(),
            last_idx: None,
            frames_written: 0,
        }
    }

    fn workdir(&mut self, stage: CompositionStage) -> ReelResult<PathBuf> {
        if self.workdir.is_none() {
            let dir = tempfile::Builder::new()
                .prefix("momentreel_encode_")
                .tempdir()
                .map_err(|e| {
                    ReelError::composition(stage, format!("failed to create work dir: {e}"))
                })?;
            self.workdir = Some(dir);
        }
        self.workdir
            .as_ref()
            .map(|d| d.path().to_path_buf())
            .ok_or_else(|| ReelError::composition(stage, "work dir unavailable"))
    }

    fn video_path(dir: &Path) -> PathBuf {
        dir.join("video.mp4")
    }

    fn audio_path(dir: &Path) -> PathBuf {
        dir.join("audio.f32le")
    }

    fn finish_video(&mut self) -> ReelResult<()> {
        let Some(mut pass) = self.video.take() else {
            return Err(ReelError::composition(
                CompositionStage::Finalize,
                "frame sink not opened",
            ));
        };
        drop(pass.stdin.take());
        let status = pass.child.wait().map_err(|e| {
            ReelError::composition(
                CompositionStage::Finalize,
                format!("failed to wait for ffmpeg to finish: {e}"),
            )
        })?;
        let stderr_bytes = join_drain(pass.stderr_drain.take())?;
        if !status.success() {
            return Err(ReelError::composition(
                CompositionStage::Finalize,
                format!(
                    "ffmpeg exited with status {}: {}",
                    status,
                    String::from_utf8_lossy(&stderr_bytes).trim()
                ),
            ));
        }
        Ok(())
    }

    fn mux(&mut self, dir: &Path, out: &Path) -> ReelResult<()> {
        let Some(mut audio) = self.audio.take() else {
            return std::fs::rename(Self::video_path(dir), out).map_err(|e| {
                ReelError::composition(CompositionStage::Finalize, format!("rename failed: {e}"))
            });
        };
        audio.writer.flush().map_err(|e| {
            ReelError::composition(
                CompositionStage::Finalize,
                format!("failed to flush audio: {e}"),
            )
        })?;
        drop(audio.writer);
        if audio.samples_written == 0 {
            return std::fs::rename(Self::video_path(dir), out).map_err(|e| {
                ReelError::composition(CompositionStage::Finalize, format!("rename failed: {e}"))
            });
        }

        let output = Command::new(ffmpeg_bin())
            .args(["-y", "-loglevel", "error", "-nostdin", "-i"])
            .arg(Self::video_path(dir))
            .args([
                "-f",
                "f32le",
                "-ar",
                &audio.cfg.sample_rate.to_string(),
                "-ac",
                &audio.cfg.channels.to_string(),
                "-i",
            ])
            .arg(Self::audio_path(dir))
            .args([
                "-map",
                "0:v:0",
                "-map",
                "1:a:0",
                "-c:v",
                "copy",
                "-c:a",
                "aac",
                "-movflags",
                "+faststart",
            ])
            .arg(out)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| {
                ReelError::composition(
                    CompositionStage::Finalize,
                    format!("failed to spawn ffmpeg mux: {e}"),
                )
            })?;
        if !output.status.success() {
            return Err(ReelError::composition(
                CompositionStage::Finalize,
                format!(
                    "ffmpeg mux exited with status {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            ));
        }
        Ok(())
    }
}

impl VideoEncoder for FfmpegEncoder {
    fn open_frame_sink(&mut self, cfg: &EncoderConfig) -> ReelResult<()> {
        let stage = CompositionStage::OpenEncoder;
        cfg.validate().map_err(|e| e.at_stage(stage))?;
        if self.video.is_some() {
            return Err(ReelError::composition(stage, "frame sink already open"));
        }
        if !is_ffmpeg_on_path() {
            return Err(ReelError::composition(
                stage,
                "ffmpeg is required for MP4 encoding, but was not found (set MOMENTREEL_FFMPEG)",
            ));
        }
        let dir = self.workdir(stage)?;

        let mut cmd = Command::new(ffmpeg_bin());
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        // Frames arrive opaque (flattened in push_frame), so plain rgba is correct input.
        cmd.args([
            "-y",
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "-s",
            &format!("{}x{}", cfg.width, cfg.height),
        ]);
        push_input_fps(&mut cmd, cfg.fps);
        cmd.args([
            "-i",
            "pipe:0",
            "-an",
            "-c:v",
            "libx264",
            "-b:v",
            &cfg.video_bitrate.to_string(),
            "-pix_fmt",
            "yuv420p",
        ])
        .arg(Self::video_path(&dir));

        let mut child = cmd.spawn().map_err(|e| {
            ReelError::composition(stage, format!("failed to spawn ffmpeg: {e}"))
        })?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ReelError::composition(stage, "failed to open ffmpeg stdin"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| ReelError::composition(stage, "failed to open ffmpeg stderr"))?;
        let stderr_drain = std::thread::spawn(move || {
            let mut stderr_bytes = Vec::new();
            stderr.read_to_end(&mut stderr_bytes)?;
            Ok(stderr_bytes)
        });

        tracing::debug!(
            width = cfg.width,
            height = cfg.height,
            fps = cfg.fps.as_f64(),
            bitrate = cfg.video_bitrate,
            "ffmpeg video pass started"
        );
        self.scratch = vec![0u8; cfg.canvas().rgba_len()];
        self.video = Some(VideoPass {
            child,
            stdin: Some(stdin),
            stderr_drain: Some(stderr_drain),
        });
        self.cfg = Some(cfg.clone());
        self.last_idx = None;
        self.frames_written = 0;
        Ok(())
    }

    fn open_audio_sink(&mut self, cfg: &AudioSinkConfig) -> ReelResult<()> {
        let stage = CompositionStage::OpenAudio;
        if cfg.sample_rate == 0 || cfg.channels == 0 {
            return Err(ReelError::composition(
                stage,
                "audio sample rate and channels must be non-zero",
            ));
        }
        let dir = self.workdir(stage)?;
        let file = File::create(Self::audio_path(&dir)).map_err(|e| {
            ReelError::composition(stage, format!("failed to create audio file: {e}"))
        })?;
        self.audio = Some(AudioPass {
            cfg: cfg.clone(),
            writer: BufWriter::new(file),
            samples_written: 0,
        });
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> ReelResult<()> {
        let stage = CompositionStage::PushFrame;
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| ReelError::composition(stage, "frame sink not opened"))?;
        if let Some(last) = self.last_idx
            && idx.0 <= last.0
        {
            return Err(ReelError::composition(stage, "out-of-order frame index"));
        }
        if frame.width != cfg.width || frame.height != cfg.height {
            return Err(ReelError::validation(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, cfg.width, cfg.height
            )));
        }
        flatten_premul_over_bg(&mut self.scratch, &frame.data, cfg.background_rgba)?;

        let Some(stdin) = self.video.as_mut().and_then(|v| v.stdin.as_mut()) else {
            return Err(ReelError::composition(stage, "ffmpeg encoder is already finalized"));
        };
        stdin.write_all(&self.scratch).map_err(|e| {
            ReelError::composition(stage, format!("failed to write frame to ffmpeg stdin: {e}"))
        })?;
        self.last_idx = Some(idx);
        self.frames_written += 1;
        Ok(())
    }

    fn mix_track(&mut self, samples: &[f32]) -> ReelResult<()> {
        let stage = CompositionStage::MixAudio;
        let audio = self
            .audio
            .as_mut()
            .ok_or_else(|| ReelError::composition(stage, "audio sink not opened"))?;
        for s in samples {
            audio.writer.write_all(&s.to_le_bytes()).map_err(|e| {
                ReelError::composition(stage, format!("failed to write audio: {e}"))
            })?;
        }
        audio.samples_written += samples.len() as u64;
        Ok(())
    }

    fn finalize(&mut self) -> ReelResult<VideoBlob> {
        let stage = CompositionStage::Finalize;
        let fps = self
            .cfg
            .as_ref()
            .map(|c| c.fps)
            .ok_or_else(|| ReelError::composition(stage, "frame sink not opened"))?;
        if self.frames_written == 0 {
            self.abort();
            return Err(ReelError::composition(stage, "no frames were encoded"));
        }
        let result = (|| {
            self.finish_video()?;
            let dir = self.workdir(stage)?;
            let out = dir.join("moment-reel.mp4");
            self.mux(&dir, &out)?;
            std::fs::read(&out).map_err(|e| {
                ReelError::composition(stage, format!("failed to read encoded output: {e}"))
            })
        })();
        let frame_count = self.frames_written;
        self.abort();
        let bytes = result?;
        tracing::debug!(bytes = bytes.len(), frames = frame_count, "ffmpeg output muxed");
        Ok(VideoBlob {
            bytes,
            media_type: "video/mp4".to_string(),
            suggested_filename: "moment-reel.mp4".to_string(),
            frame_count,
            duration_secs: fps.frames_to_secs(frame_count),
        })
    }

    fn abort(&mut self) {
        if let Some(mut pass) = self.video.take() {
            drop(pass.stdin.take());
            let _ = pass.child.kill();
            let _ = pass.child.wait();
            let _ = join_drain(pass.stderr_drain.take());
        }
        self.audio = None;
        self.cfg = None;
        if let Some(dir) = self.workdir.take()
            && let Err(e) = dir.close()
        {
            tracing::warn!(error = %e, "failed to remove encoder work dir");
        }
    }
}

impl Drop for FfmpegEncoder {
    fn drop(&mut self) {
        self.abort();
    }
}

fn join_drain(handle: Option<StderrDrain>) -> ReelResult<Vec<u8>> {
    let Some(handle) = handle else {
        return Ok(Vec::new());
    };
    handle
        .join()
        .map_err(|_| {
            ReelError::composition(
                CompositionStage::Finalize,
                "ffmpeg stderr drain thread panicked",
            )
        })?
        .map_err(|e| {
            ReelError::composition(
                CompositionStage::Finalize,
                format!("ffmpeg stderr read failed: {e}"),
            )
        })
}

fn push_input_fps(cmd: &mut Command, fps: Fps) {
    // rawvideo input rate goes before `-i`, as a rational.
    cmd.args(["-r", &format!("{}/{}", fps.num, fps.den)]);
}

fn flatten_premul_over_bg(dst: &mut [u8], src_premul: &[u8], bg_rgba: [u8; 4]) -> ReelResult<()> {
    if dst.len() != src_premul.len() || !dst.len().is_multiple_of(4) {
        return Err(ReelError::validation(
            "flatten expects equal-length rgba8 buffers",
        ));
    }
    let bg = [
        u16::from(bg_rgba[0]),
        u16::from(bg_rgba[1]),
        u16::from(bg_rgba[2]),
    ];
    for (d, s) in dst.chunks_exact_mut(4).zip(src_premul.chunks_exact(4)) {
        if s[3] == 255 {
            d.copy_from_slice(s);
            continue;
        }
        let inv = 255u16 - u16::from(s[3]);
        for c in 0..3 {
            d[c] = (u16::from(s[c]) + mul_div255_u16(bg[c], inv)).min(255) as u8;
        }
        d[3] = 255;
    }
    Ok(())
}

use std::io::Cursor;
use std::sync::Arc;

use anyhow::Context as _;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::foundation::error::ReelResult;

/// Decoded interleaved stereo `f32` PCM at the source sample rate.
#[derive(Clone, Debug)]
pub struct AudioPcm {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Interleaved L/R samples.
    pub interleaved_f32: Arc<Vec<f32>>,
}

impl AudioPcm {
    /// Number of stereo sample frames.
    pub fn frames(&self) -> usize {
        self.interleaved_f32.len() / 2
    }

    /// Duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / f64::from(self.sample_rate)
    }
}

/// Decode encoded audio bytes (MP3, WAV, AAC/M4A, Ogg Vorbis) to stereo PCM.
///
/// Mono input is duplicated to both channels; extra channels beyond two are dropped.
pub(crate) fn decode_audio_bytes(data: &[u8]) -> ReelResult<AudioPcm> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(data.to_vec())), Default::default());
    let probed = symphonia::default::get_probe()
        .format(
            &Hint::new(),
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .context("unsupported audio container")?;

    let mut format = probed.format;
    let track = format.default_track().context("no audio track found")?;
    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .context("unsupported audio codec")?;
    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate.unwrap_or(0);

    let mut samples = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(_)) => break,
            Err(symphonia::core::errors::Error::ResetRequired) => break,
            Err(e) => return Err(anyhow::Error::new(e).context("read audio packet").into()),
        };
        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                if sample_rate == 0 {
                    sample_rate = spec.rate;
                }
                let mut buf =
                    symphonia::core::audio::SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buf.copy_interleaved_ref(decoded);

                let channels = spec.channels.count();
                if channels == 1 {
                    for s in buf.samples() {
                        samples.push(*s);
                        samples.push(*s);
                    }
                } else if channels >= 2 {
                    for chunk in buf.samples().chunks_exact(channels) {
                        samples.push(chunk[0]);
                        samples.push(chunk[1]);
                    }
                }
            }
            // A corrupt packet is skipped; the rest of the stream may still be usable.
            Err(symphonia::core::errors::Error::DecodeError(msg)) => {
                tracing::debug!(msg, "skipping undecodable audio packet");
            }
            Err(e) => return Err(anyhow::Error::new(e).context("decode audio packet").into()),
        }
    }

    if samples.is_empty() || sample_rate == 0 {
        return Err(anyhow::anyhow!("no audio samples decoded").into());
    }
    Ok(AudioPcm {
        sample_rate,
        interleaved_f32: Arc::new(samples),
    })
}

use crate::{
    audio_data::{AudioDataLoader, LoadOptions, LoopSonicAudioData},
    error::{LoopSonicError, Result},
};
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use symphonia::{
    core::{
        audio::SampleBuffer, codecs::DecoderOptions, errors::Error, formats::FormatOptions,
        io::MediaSourceStream, meta::MetadataOptions, probe::Hint,
    },
    default::{get_codecs, get_probe},
};

/// File extensions the default loader accepts, compared case-insensitively.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["wav", "flac", "ogg", "mp3"];

/// Symphonia-backed loader that decodes a whole file into interleaved `f32` samples.
///
/// Files are dispatched on their extension; anything outside
/// [`SUPPORTED_EXTENSIONS`] is rejected before the file is opened.
pub struct DefaultAudioLoader;

impl DefaultAudioLoader {
    fn check_extension(path: &Path) -> Result<()> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        if SUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
            Ok(())
        } else {
            Err(LoopSonicError::AudioFormat(format!(
                "Unsupported file extension {:?} for {}",
                ext,
                path.display()
            )))
        }
    }
}

impl AudioDataLoader for DefaultAudioLoader {
    fn load(&self, path: &Path, options: &LoadOptions) -> Result<Arc<LoopSonicAudioData>> {
        Self::check_extension(path)?;

        let file = File::open(path)?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| {
                LoopSonicError::AudioLoading(format!("Failed to probe audio format: {:?}", e))
            })?;

        let mut format = probed.format;

        let track = format.default_track().ok_or_else(|| {
            LoopSonicError::AudioLoading("No default audio track found".to_string())
        })?;
        let track_id = track.id;

        let sample_rate = track
            .codec_params
            .sample_rate
            .ok_or_else(|| LoopSonicError::AudioLoading("Sample rate not found".to_string()))?;

        let channels = track
            .codec_params
            .channels
            .ok_or_else(|| LoopSonicError::AudioLoading("Channel count not found".to_string()))?
            .count() as u16;

        let mut decoder = get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| {
                LoopSonicError::AudioLoading(format!("Failed to create decoder: {:?}", e))
            })?;

        let max_samples = options
            .max_frames(sample_rate)
            .saturating_mul(channels as usize);
        let mut samples: Vec<f32> = Vec::new();

        while samples.len() < max_samples {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(Error::IoError(_)) => break, // end of stream
                Err(e) => {
                    return Err(LoopSonicError::AudioLoading(format!(
                        "Error reading packet: {:?}",
                        e
                    )));
                }
            };

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(Error::IoError(_)) => break,
                Err(Error::DecodeError(e)) => {
                    log::warn!("Skipping corrupt packet in {}: {}", path.display(), e);
                    continue;
                }
                Err(e) => {
                    return Err(LoopSonicError::AudioLoading(format!(
                        "Error decoding packet: {:?}",
                        e
                    )));
                }
            };

            let spec = *decoded.spec();
            let mut tmp = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
            tmp.copy_interleaved_ref(decoded);

            samples.extend_from_slice(tmp.samples());
        }

        samples.truncate(max_samples);

        log::debug!(
            "Decoded {}: {} Hz, {} channel(s), {} samples",
            path.display(),
            sample_rate,
            channels,
            samples.len()
        );

        Ok(Arc::new(LoopSonicAudioData::from_samples(
            samples,
            sample_rate,
            channels,
        )))
    }
}

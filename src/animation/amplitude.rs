// NEWSREEL Amplitude Analyzer
// Copyright (c) 2026 Xing_The_Creator | NEWSREEL
//
// Per-frame loudness curve for lip sync. The waveform is measured when the
// file decodes; otherwise a synthetic speech/pause pattern stands in.

use hound::{SampleFormat, WavReader};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, info, warn};

use crate::error::{NewsreelError, Result};
use crate::video::encoder::Encoder;

/// Used when the duration can be neither probed nor estimated.
pub const DEFAULT_DURATION_SECS: f64 = 30.0;
/// 128 kbps MP3.
pub const ESTIMATED_BYTES_PER_SEC: f64 = 16_000.0;

const SILENCE_FLOOR_DB: f32 = -50.0;
const NORMALIZE_MIN_PEAK: f32 = 0.1;

const SPEECH_SECS: f64 = 2.0;
const PAUSE_SECS: f64 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmplitudeSource {
    Measured,
    Synthetic,
}

#[derive(Debug, Clone)]
pub struct AmplitudeTrack {
    values: Vec<f32>,
    frame_rate: u32,
    duration: f64,
    source: AmplitudeSource,
}

impl AmplitudeTrack {
    pub fn new(values: Vec<f32>, frame_rate: u32, duration: f64, source: AmplitudeSource) -> Self {
        let values = values.into_iter().map(|v| v.clamp(0.0, 1.0)).collect();
        Self {
            values,
            frame_rate,
            duration,
            source,
        }
    }

    pub fn frame_count_for(duration: f64, frame_rate: u32) -> usize {
        if duration <= 0.0 || frame_rate == 0 {
            return 0;
        }
        (duration * frame_rate as f64).ceil() as usize
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn frame_rate(&self) -> u32 {
        self.frame_rate
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn source(&self) -> AmplitudeSource {
        self.source
    }

    pub fn get(&self, frame: usize) -> f32 {
        self.values.get(frame).copied().unwrap_or(0.0)
    }

    /// Amplitude of the frame before `frame`; the first frame is its own predecessor.
    pub fn previous(&self, frame: usize) -> f32 {
        self.get(frame.saturating_sub(1))
    }

    pub fn time_at(&self, frame: usize) -> f64 {
        frame as f64 / self.frame_rate.max(1) as f64
    }
}

pub struct AmplitudeAnalyzer {
    encoder: Arc<dyn Encoder>,
    frame_rate: u32,
}

impl AmplitudeAnalyzer {
    pub fn new(encoder: Arc<dyn Encoder>, frame_rate: u32) -> Self {
        Self {
            encoder,
            frame_rate: frame_rate.max(1),
        }
    }

    /// Never fails: measurement problems fall back to the synthetic curve.
    ///
    /// Duration comes from ffprobe, then the decoded sample count. The size
    /// estimate and the 30 second default only back the synthetic curve.
    pub async fn analyze(&self, audio: &Path) -> AmplitudeTrack {
        let probed = self.encoder_duration(audio).await;

        match Waveform::decode(audio) {
            Ok(waveform) => {
                let duration = probed.unwrap_or_else(|| {
                    let decoded = waveform.duration();
                    info!("[AMP] Duration {:.2}s from {} decoded samples", decoded, waveform.samples.len());
                    decoded
                });
                let frames = AmplitudeTrack::frame_count_for(duration, self.frame_rate);
                info!("[AMP] Analyzing {:?} ({:.2}s, {} frames)", audio, duration, frames);
                AmplitudeTrack::new(
                    waveform.levels(frames, self.frame_rate),
                    self.frame_rate,
                    duration,
                    AmplitudeSource::Measured,
                )
            }
            Err(e) => {
                warn!("[AMP] ⚠️ Waveform analysis failed for {:?}: {}. Using synthetic lip sync.", audio, e);
                let duration = probed.unwrap_or_else(|| fallback_duration(audio));
                let seed = duration.to_bits();
                AmplitudeTrack::new(
                    synthesize_amplitudes(duration, self.frame_rate, seed),
                    self.frame_rate,
                    duration,
                    AmplitudeSource::Synthetic,
                )
            }
        }
    }

    /// Probe, then size estimate, then the 30 second default.
    pub async fn probe_duration(&self, audio: &Path) -> f64 {
        match self.encoder_duration(audio).await {
            Some(duration) => duration,
            None => fallback_duration(audio),
        }
    }

    async fn encoder_duration(&self, audio: &Path) -> Option<f64> {
        match self.encoder.probe_duration(audio).await {
            Ok(duration) if duration.is_finite() && duration > 0.0 => Some(duration),
            Ok(duration) => {
                warn!("[AMP] Probe returned unusable duration {} for {:?}", duration, audio);
                None
            }
            Err(e) => {
                warn!("[AMP] Duration probe failed for {:?}: {}", audio, e);
                None
            }
        }
    }
}

fn fallback_duration(audio: &Path) -> f64 {
    match std::fs::metadata(audio) {
        Ok(meta) if meta.len() > 0 => {
            let estimate = estimate_duration_from_size(meta.len());
            info!("[AMP] Estimated duration {:.2}s from {} bytes", estimate, meta.len());
            estimate
        }
        _ => {
            warn!("[AMP] Cannot size {:?}, assuming {}s", audio, DEFAULT_DURATION_SECS);
            DEFAULT_DURATION_SECS
        }
    }
}

pub fn estimate_duration_from_size(bytes: u64) -> f64 {
    bytes as f64 / ESTIMATED_BYTES_PER_SEC
}

/// Decoded speech, mixed down to mono.
#[derive(Debug, Clone)]
pub struct Waveform {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl Waveform {
    pub fn decode(audio: &Path) -> Result<Self> {
        let (samples, sample_rate) = decode_mono(audio)?;
        if samples.is_empty() || sample_rate == 0 {
            return Err(NewsreelError::analysis("no audio samples decoded"));
        }
        Ok(Self { samples, sample_rate })
    }

    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate.max(1) as f64
    }

    /// RMS per frame window in dBFS, mapped to [0, 1] and resampled to `frames`.
    pub fn levels(&self, frames: usize, frame_rate: u32) -> Vec<f32> {
        let window = (self.sample_rate as usize / frame_rate.max(1) as usize).max(1);
        let mut levels: Vec<f32> = self
            .samples
            .chunks(window)
            .map(|chunk| {
                let sum_squares: f32 = chunk.iter().map(|s| s * s).sum();
                let rms = (sum_squares / chunk.len() as f32).sqrt();
                let db = 20.0 * rms.max(1e-6).log10();
                ((db - SILENCE_FLOOR_DB) / -SILENCE_FLOOR_DB).clamp(0.0, 1.0)
            })
            .collect();

        let peak = levels.iter().cloned().fold(0.0_f32, f32::max);
        if peak > NORMALIZE_MIN_PEAK {
            for level in &mut levels {
                *level /= peak;
            }
        }
        debug!("[AMP] {} native windows, peak level {:.2}", levels.len(), peak);

        resample_linear(&levels, frames)
    }
}

/// Linear interpolation of `values` onto `target` evenly spaced points.
pub fn resample_linear(values: &[f32], target: usize) -> Vec<f32> {
    if target == 0 || values.is_empty() {
        return vec![0.0; target];
    }
    if values.len() == 1 || target == 1 {
        return vec![values[0]; target];
    }
    let scale = (values.len() - 1) as f64 / (target - 1) as f64;
    (0..target)
        .map(|i| {
            let pos = i as f64 * scale;
            let lo = pos.floor() as usize;
            let hi = (lo + 1).min(values.len() - 1);
            let frac = (pos - lo as f64) as f32;
            values[lo] + (values[hi] - values[lo]) * frac
        })
        .collect()
}

/// Repeating speech/pause pattern; same seed, same curve.
pub fn synthesize_amplitudes(duration: f64, frame_rate: u32, seed: u64) -> Vec<f32> {
    let frames = AmplitudeTrack::frame_count_for(duration, frame_rate);
    let mut rng = StdRng::seed_from_u64(seed);
    let cycle = SPEECH_SECS + PAUSE_SECS;

    (0..frames)
        .map(|i| {
            let t = i as f64 / frame_rate as f64;
            if t.rem_euclid(cycle) < SPEECH_SECS {
                let jitter = 0.12 * (t * 12.0).sin() + 0.05 * (t * 31.0).sin();
                let noise: f64 = rng.gen_range(-0.04..0.04);
                (0.65 + jitter + noise).clamp(0.5, 0.8) as f32
            } else {
                rng.gen_range(0.0..0.1) as f32
            }
        })
        .collect()
}

fn decode_mono(path: &Path) -> Result<(Vec<f32>, u32)> {
    let is_wav = path
        .extension()
        .map(|e| e.eq_ignore_ascii_case("wav"))
        .unwrap_or(false);
    if is_wav {
        if let Ok(decoded) = decode_wav(path) {
            return Ok(decoded);
        }
    }
    decode_with_symphonia(path)
}

fn decode_wav(path: &Path) -> Result<(Vec<f32>, u32)> {
    let mut reader = WavReader::open(path).map_err(|e| NewsreelError::analysis(e.to_string()))?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader.samples::<f32>().map(|s| s.unwrap_or(0.0)).collect(),
        SampleFormat::Int => {
            let full_scale = (1_i64 << (spec.bits_per_sample.max(1) - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.unwrap_or(0) as f32 / full_scale)
                .collect()
        }
    };

    Ok((mix_down(&interleaved, channels), spec.sample_rate))
}

fn decode_with_symphonia(path: &Path) -> Result<(Vec<f32>, u32)> {
    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| NewsreelError::analysis(format!("unsupported audio: {}", e)))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| NewsreelError::analysis("no decodable audio track"))?;
    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate.unwrap_or(0);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| NewsreelError::analysis(e.to_string()))?;

    let mut mono = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(NewsreelError::analysis(e.to_string())),
        };
        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                sample_rate = spec.rate;
                let channels = spec.channels.count().max(1);
                let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buffer.copy_interleaved_ref(decoded);
                mono.extend(mix_down(buffer.samples(), channels));
            }
            // Skip corrupt packets
            Err(SymphoniaError::DecodeError(e)) => debug!("[AMP] Skipping bad packet: {}", e),
            Err(e) => return Err(NewsreelError::analysis(e.to_string())),
        }
    }

    Ok((mono, sample_rate))
}

fn mix_down(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::encoder::EncoderStage;
    use async_trait::async_trait;
    use hound::{WavSpec, WavWriter};
    use std::ffi::OsString;

    /// An encoder host without ffprobe.
    struct NoFfprobe;

    #[async_trait]
    impl Encoder for NoFfprobe {
        async fn run(&self, _stage: EncoderStage, _args: Vec<OsString>) -> Result<()> {
            Ok(())
        }

        async fn probe_duration(&self, _path: &Path) -> Result<f64> {
            Err(NewsreelError::analysis("ffprobe not installed"))
        }
    }

    fn write_tone(path: &Path, seconds: f32, loud_until: f32) {
        write_tone_at(path, 8000, seconds, loud_until);
    }

    fn write_tone_at(path: &Path, sample_rate: u32, seconds: f32, loud_until: f32) {
        let spec = WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(path, spec).unwrap();
        let total = (seconds * sample_rate as f32) as usize;
        for i in 0..total {
            let t = i as f32 / sample_rate as f32;
            let amp = if t < loud_until { 0.8 } else { 0.0 };
            let s = (t * 440.0 * std::f32::consts::TAU).sin() * amp;
            writer.write_sample((s * i16::MAX as f32) as i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_frame_count_is_ceiling() {
        assert_eq!(AmplitudeTrack::frame_count_for(10.0, 30), 300);
        assert_eq!(AmplitudeTrack::frame_count_for(1.01, 30), 31);
        assert_eq!(AmplitudeTrack::frame_count_for(0.0, 30), 0);
    }

    #[test]
    fn test_size_estimate() {
        assert!((estimate_duration_from_size(160_000) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_synthetic_curve_shape() {
        let values = synthesize_amplitudes(7.3, 30, 42);
        assert_eq!(values.len(), 219);
        // Speech phase
        assert!(values[..60].iter().all(|&v| (0.5..=0.8).contains(&v)));
        // Pause phase, 2.0s..2.6s
        assert!(values[61..77].iter().all(|&v| v < 0.1));
        assert_eq!(values, synthesize_amplitudes(7.3, 30, 42));
    }

    #[test]
    fn test_resample_keeps_endpoints() {
        let out = resample_linear(&[0.0, 1.0], 5);
        assert_eq!(out, vec![0.0, 0.25, 0.5, 0.75, 1.0]);
        assert_eq!(resample_linear(&[0.3], 3), vec![0.3, 0.3, 0.3]);
        assert!(resample_linear(&[], 4).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_measured_tone_then_silence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("speech.wav");
        write_tone(&path, 2.0, 1.0);

        let values = Waveform::decode(&path).unwrap().levels(60, 30);
        assert_eq!(values.len(), 60);
        assert!(values[5] > 0.9, "loud half should be near peak: {}", values[5]);
        assert!(values[55] < 0.05, "silent half should be closed: {}", values[55]);
    }

    #[test]
    fn test_garbage_audio_fails_measurement() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.mp3");
        std::fs::write(&path, vec![0x42u8; 4096]).unwrap();
        assert!(Waveform::decode(&path).is_err());
    }

    #[tokio::test]
    async fn test_failed_duration_lookup_uses_decoded_wav_length() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("speech.wav");
        // 16 kHz mono is 32 000 bytes a second, so the size estimate would say 4s
        write_tone_at(&path, 16_000, 2.0, 1.0);

        let analyzer = AmplitudeAnalyzer::new(Arc::new(NoFfprobe), 30);
        let track = analyzer.analyze(&path).await;
        assert_eq!(track.source(), AmplitudeSource::Measured);
        assert!((track.duration() - 2.0).abs() < 1e-3, "duration {}", track.duration());
        assert_eq!(track.len(), 60);
        assert!(track.get(10) > 0.9, "speech should be loud: {}", track.get(10));
        assert!(track.get(45) < 0.05, "tail should be silent: {}", track.get(45));
    }

    #[tokio::test]
    async fn test_undecodable_file_keeps_size_estimate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("speech.mp3");
        std::fs::write(&path, vec![0x42u8; 32_000]).unwrap();

        let analyzer = AmplitudeAnalyzer::new(Arc::new(NoFfprobe), 10);
        let track = analyzer.analyze(&path).await;
        assert_eq!(track.source(), AmplitudeSource::Synthetic);
        assert_eq!(track.duration(), 2.0);
        assert_eq!(track.len(), 20);
    }
}

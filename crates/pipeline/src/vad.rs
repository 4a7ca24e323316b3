//! Voice activity detection
//!
//! Level-based VAD over a mono buffer: RMS against a silence floor, a
//! zero-crossing band that rejects hum below and broadband noise above, and
//! a minimum duration so a single loud click does not count as speech.
//!
//! Pure function: identical inputs produce identical outputs, no external
//! calls, no state.

use driver_assist_core::AudioClip;

/// VAD thresholds
#[derive(Debug, Clone)]
pub struct VadConfig {
    /// RMS below this is silence
    pub silence_threshold_rms: f32,
    /// Buffers shorter than this never count as speech (s)
    pub min_speech_seconds: f32,
    /// Longest in-utterance silence the caller may leave (s); consumed by
    /// the turn detector, carried here so one struct configures the audio side
    pub max_silence_seconds: f32,
    /// Zero-crossing band for voiced audio
    pub zcr_speech_min: f32,
    pub zcr_speech_max: f32,
}

impl Default for VadConfig {
    fn default() -> Self {
        use driver_assist_config::constants::vad::{
            MAX_SILENCE_SECONDS, MIN_SPEECH_SECONDS, SILENCE_THRESHOLD_RMS, ZCR_SPEECH_MAX,
            ZCR_SPEECH_MIN,
        };

        Self {
            silence_threshold_rms: SILENCE_THRESHOLD_RMS,
            min_speech_seconds: MIN_SPEECH_SECONDS,
            max_silence_seconds: MAX_SILENCE_SECONDS,
            zcr_speech_min: ZCR_SPEECH_MIN,
            zcr_speech_max: ZCR_SPEECH_MAX,
        }
    }
}

impl VadConfig {
    /// Build from the settings section
    pub fn from_settings(settings: &driver_assist_config::VadSettings) -> Self {
        Self {
            silence_threshold_rms: settings.silence_threshold_rms,
            min_speech_seconds: settings.min_speech_seconds,
            max_silence_seconds: settings.max_silence_seconds,
            zcr_speech_min: settings.zcr_speech_min,
            zcr_speech_max: settings.zcr_speech_max,
        }
    }
}

/// Classification of a buffer, with the derived stats
#[derive(Debug, Clone, PartialEq)]
pub struct VadReport {
    pub has_speech: bool,
    pub rms: f32,
    pub zero_crossing_rate: f32,
    /// The gate that decided the outcome
    pub reason: &'static str,
}

impl VadReport {
    fn silence(rms: f32, zcr: f32, reason: &'static str) -> Self {
        Self {
            has_speech: false,
            rms,
            zero_crossing_rate: zcr,
            reason,
        }
    }
}

/// Classify a mono f32 buffer
pub fn analyze(samples: &[f32], sample_rate: u32, config: &VadConfig) -> VadReport {
    if samples.is_empty() || sample_rate == 0 {
        return VadReport::silence(0.0, 0.0, "empty buffer");
    }

    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    let rms = (sum_squares / samples.len() as f32).sqrt();

    let crossings = samples
        .windows(2)
        .filter(|pair| (pair[0] >= 0.0) != (pair[1] >= 0.0))
        .count();
    let zcr = crossings as f32 / samples.len() as f32;

    let duration = samples.len() as f32 / sample_rate as f32;

    if rms < config.silence_threshold_rms {
        return VadReport::silence(rms, zcr, "low rms");
    }
    if zcr < config.zcr_speech_min || zcr > config.zcr_speech_max {
        return VadReport::silence(rms, zcr, "zcr outside voice band");
    }
    if duration < config.min_speech_seconds {
        return VadReport::silence(rms, zcr, "too short");
    }

    VadReport {
        has_speech: true,
        rms,
        zero_crossing_rate: zcr,
        reason: "speech",
    }
}

/// Classify a 16-bit PCM byte buffer
pub fn analyze_pcm16(bytes: &[u8], sample_rate: u32, config: &VadConfig) -> VadReport {
    let clip = AudioClip::from_pcm16(bytes, sample_rate);
    analyze(&clip.samples, sample_rate, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: u32 = 16000;

    /// Half a second of a 440 Hz tone at moderate amplitude
    fn voiced(seconds: f32) -> Vec<f32> {
        let count = (RATE as f32 * seconds) as usize;
        (0..count)
            .map(|i| (i as f32 * 440.0 * 2.0 * std::f32::consts::PI / RATE as f32).sin() * 0.5)
            .collect()
    }

    #[test]
    fn test_voiced_tone_is_speech() {
        let report = analyze(&voiced(0.5), RATE, &VadConfig::default());
        assert!(report.has_speech);
        assert_eq!(report.reason, "speech");
        assert!(report.rms > 0.01);
    }

    #[test]
    fn test_zeros_are_silence() {
        let report = analyze(&vec![0.0; RATE as usize], RATE, &VadConfig::default());
        assert!(!report.has_speech);
        assert_eq!(report.reason, "low rms");
    }

    #[test]
    fn test_short_burst_is_not_speech() {
        // loud and voiced, but only 100 ms
        let report = analyze(&voiced(0.1), RATE, &VadConfig::default());
        assert!(!report.has_speech);
        assert_eq!(report.reason, "too short");
    }

    #[test]
    fn test_alternating_noise_fails_zcr_band() {
        // sign flip every sample: zcr ~ 1.0, far above the voice band
        let noise: Vec<f32> = (0..RATE as usize)
            .map(|i| if i % 2 == 0 { 0.5 } else { -0.5 })
            .collect();
        let report = analyze(&noise, RATE, &VadConfig::default());
        assert!(!report.has_speech);
        assert_eq!(report.reason, "zcr outside voice band");
    }

    #[test]
    fn test_deterministic() {
        let samples = voiced(0.4);
        let config = VadConfig::default();
        let a = analyze(&samples, RATE, &config);
        let b = analyze(&samples, RATE, &config);
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_buffer() {
        let report = analyze(&[], RATE, &VadConfig::default());
        assert!(!report.has_speech);
        assert_eq!(report.reason, "empty buffer");
        assert_eq!(report.rms, 0.0);
    }

    #[test]
    fn test_pcm16_path_matches_f32_path() {
        let clip = AudioClip::new(voiced(0.5), RATE);
        let from_bytes = analyze_pcm16(&clip.to_pcm16(), RATE, &VadConfig::default());
        assert!(from_bytes.has_speech);
    }
}

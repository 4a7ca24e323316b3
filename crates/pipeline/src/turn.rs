//! Turn timing
//!
//! Tracks when the caller has been silent long enough to warrant a proactive
//! prompt, and when a spoken utterance has been followed by enough silence
//! to hand the buffer to recognition. Timestamps are passed in explicitly so
//! boundary behavior is unit-testable without sleeping.

use std::time::{Duration, Instant};

/// Timing thresholds for one listening window
#[derive(Debug, Clone, Copy)]
pub struct TimingConfig {
    /// Silence from listening start before a proactive prompt
    pub silence_window: Duration,
    /// Non-speech after a speech-bearing prefix before recognition
    pub end_of_utterance_silence: Duration,
}

impl Default for TimingConfig {
    fn default() -> Self {
        use driver_assist_config::constants::turn::{
            END_OF_UTTERANCE_SILENCE_MS, SILENCE_WINDOW_MS,
        };

        Self {
            silence_window: Duration::from_millis(SILENCE_WINDOW_MS),
            end_of_utterance_silence: Duration::from_millis(END_OF_UTTERANCE_SILENCE_MS),
        }
    }
}

impl TimingConfig {
    pub fn from_settings(settings: &driver_assist_config::TurnConfig) -> Self {
        Self {
            silence_window: Duration::from_millis(settings.silence_window_ms),
            end_of_utterance_silence: Duration::from_millis(settings.end_of_utterance_silence_ms),
        }
    }
}

/// What the current listening window calls for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnSignal {
    /// Keep listening
    None,
    /// Speech followed by enough silence: recognize the buffer
    EndOfUtterance,
    /// Nothing but silence for the whole window: prompt the caller
    SilenceTimeout,
}

/// Per-window timing state
///
/// `observe` feeds VAD classifications as chunks arrive; `poll` asks whether
/// a boundary has been reached. `reset` re-arms after each dispatched turn.
#[derive(Debug)]
pub struct UtteranceDetector {
    config: TimingConfig,
    window_started: Instant,
    last_speech: Option<Instant>,
}

impl UtteranceDetector {
    pub fn new(config: TimingConfig, now: Instant) -> Self {
        Self {
            config,
            window_started: now,
            last_speech: None,
        }
    }

    /// Record the VAD classification of the accumulated buffer
    pub fn observe(&mut self, has_speech: bool, now: Instant) {
        if has_speech {
            self.last_speech = Some(now);
        }
    }

    /// Whether any chunk in this window was classified as speech
    pub fn heard_speech(&self) -> bool {
        self.last_speech.is_some()
    }

    /// Check boundaries; exact threshold durations trigger
    pub fn poll(&self, now: Instant) -> TurnSignal {
        match self.last_speech {
            Some(last) if now.duration_since(last) >= self.config.end_of_utterance_silence => {
                TurnSignal::EndOfUtterance
            }
            Some(_) => TurnSignal::None,
            None if now.duration_since(self.window_started) >= self.config.silence_window => {
                TurnSignal::SilenceTimeout
            }
            None => TurnSignal::None,
        }
    }

    /// Start a fresh listening window
    pub fn reset(&mut self, now: Instant) {
        self.window_started = now;
        self.last_speech = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> TimingConfig {
        TimingConfig {
            silence_window: Duration::from_millis(1500),
            end_of_utterance_silence: Duration::from_millis(1500),
        }
    }

    #[test]
    fn test_silence_window_triggers_at_exact_boundary() {
        let t0 = Instant::now();
        let detector = UtteranceDetector::new(config(), t0);

        assert_eq!(
            detector.poll(t0 + Duration::from_millis(1499)),
            TurnSignal::None
        );
        assert_eq!(
            detector.poll(t0 + Duration::from_millis(1500)),
            TurnSignal::SilenceTimeout
        );
    }

    #[test]
    fn test_end_of_utterance_triggers_at_exact_boundary() {
        let t0 = Instant::now();
        let mut detector = UtteranceDetector::new(config(), t0);

        let spoke_at = t0 + Duration::from_millis(400);
        detector.observe(true, spoke_at);

        assert_eq!(
            detector.poll(spoke_at + Duration::from_millis(1499)),
            TurnSignal::None
        );
        assert_eq!(
            detector.poll(spoke_at + Duration::from_millis(1500)),
            TurnSignal::EndOfUtterance
        );
    }

    #[test]
    fn test_speech_postpones_silence_timeout() {
        let t0 = Instant::now();
        let mut detector = UtteranceDetector::new(config(), t0);

        // speech at 1.4s: the silence window never fires, the utterance clock runs
        detector.observe(true, t0 + Duration::from_millis(1400));
        assert_eq!(
            detector.poll(t0 + Duration::from_millis(1600)),
            TurnSignal::None
        );
        assert_eq!(
            detector.poll(t0 + Duration::from_millis(2900)),
            TurnSignal::EndOfUtterance
        );
    }

    #[test]
    fn test_continued_speech_extends_utterance() {
        let t0 = Instant::now();
        let mut detector = UtteranceDetector::new(config(), t0);

        detector.observe(true, t0 + Duration::from_millis(200));
        detector.observe(true, t0 + Duration::from_millis(1000));

        // 1.5s after the *first* speech, but only 0.7s after the last
        assert_eq!(
            detector.poll(t0 + Duration::from_millis(1700)),
            TurnSignal::None
        );
    }

    #[test]
    fn test_reset_rearms_window() {
        let t0 = Instant::now();
        let mut detector = UtteranceDetector::new(config(), t0);
        detector.observe(true, t0);

        let t1 = t0 + Duration::from_millis(5000);
        detector.reset(t1);
        assert!(!detector.heard_speech());
        assert_eq!(detector.poll(t1 + Duration::from_millis(100)), TurnSignal::None);
        assert_eq!(
            detector.poll(t1 + Duration::from_millis(1500)),
            TurnSignal::SilenceTimeout
        );
    }

    #[test]
    fn test_silence_observations_do_not_mark_speech() {
        let t0 = Instant::now();
        let mut detector = UtteranceDetector::new(config(), t0);
        detector.observe(false, t0 + Duration::from_millis(500));
        assert!(!detector.heard_speech());
    }
}

//! Threshold alerting.
//!
//! Two states (normal, alerting) guarded by a single atomic flag owned by
//! the monitor. The flag is raised at most once per episode; a detached
//! timer thread lowers it unconditionally after the cooldown. The audible
//! cue is fire-and-forget and swallows every failure.

use rodio::source::{SineWave, Source, Zero};
use rodio::{OutputStream, Sink};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::config::ThresholdDirection;

/// Returns true when a reading crosses the configured threshold.
pub fn check(value: f64, threshold: f64, direction: ThresholdDirection) -> bool {
    match direction {
        ThresholdDirection::Above => value >= threshold,
        ThresholdDirection::Below => value <= threshold,
    }
}

/// Shared alert flag. Clones are handles to the same flag; the cooldown
/// timer holds one and flips it exactly once.
#[derive(Clone)]
pub struct AlertState {
    alerting: Arc<AtomicBool>,
}

impl Default for AlertState {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertState {
    pub fn new() -> Self {
        Self {
            alerting: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_alerting(&self) -> bool {
        self.alerting.load(Ordering::SeqCst)
    }

    /// Attempts the normal → alerting transition.
    ///
    /// Returns false when already alerting: repeated qualifying readings
    /// neither re-alert nor extend the cooldown.
    pub fn raise(&self) -> bool {
        !self.alerting.swap(true, Ordering::SeqCst)
    }

    /// Schedules the unconditional reset back to normal after the cooldown.
    pub fn schedule_reset(&self, cooldown: Duration) {
        let alerting = Arc::clone(&self.alerting);
        thread::spawn(move || {
            thread::sleep(cooldown);
            alerting.store(false, Ordering::SeqCst);
            crate::log("Alert reset. Monitoring resumed.");
        });
    }
}

/// Plays the alert cue on a detached thread without blocking the poll loop.
pub fn spawn_alert_sound() {
    thread::spawn(play_alert_sound);
}

/// Three short 880 Hz beeps with equal gaps. Failures are fully
/// suppressed; monitoring never depends on audio being available.
fn play_alert_sound() {
    let Ok((_stream, handle)) = OutputStream::try_default() else {
        return;
    };
    let Ok(sink) = Sink::try_new(&handle) else {
        return;
    };

    for _ in 0..3 {
        sink.append(
            SineWave::new(880.0)
                .take_duration(Duration::from_millis(300))
                .amplify(0.8),
        );
        sink.append(Zero::<f32>::new(1, 44100).take_duration(Duration::from_millis(300)));
    }

    sink.sleep_until_end();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_above() {
        assert!(check(50.0, 50.0, ThresholdDirection::Above));
        assert!(check(50.1, 50.0, ThresholdDirection::Above));
        assert!(!check(49.9, 50.0, ThresholdDirection::Above));
    }

    #[test]
    fn test_check_below() {
        assert!(check(5.0, 5.0, ThresholdDirection::Below));
        assert!(check(4.9, 5.0, ThresholdDirection::Below));
        assert!(!check(5.1, 5.0, ThresholdDirection::Below));
    }

    #[test]
    fn test_check_negative_values() {
        assert!(check(-10.0, -5.0, ThresholdDirection::Below));
        assert!(!check(-10.0, -5.0, ThresholdDirection::Above));
    }

    #[test]
    fn test_raise_transitions_once() {
        let state = AlertState::new();
        assert!(!state.is_alerting());

        assert!(state.raise(), "first raise must transition");
        assert!(state.is_alerting());

        assert!(!state.raise(), "second raise must be ignored");
        assert!(state.is_alerting());
    }

    #[test]
    fn test_reset_rearms_after_cooldown() {
        let state = AlertState::new();
        assert!(state.raise());

        state.schedule_reset(Duration::from_millis(50));
        assert!(state.is_alerting(), "reset must not fire early");

        thread::sleep(Duration::from_millis(150));
        assert!(!state.is_alerting());

        // Re-armed: the next qualifying reading alerts again
        assert!(state.raise());
    }

    #[test]
    fn test_clones_share_the_flag() {
        let state = AlertState::new();
        let handle = state.clone();
        assert!(state.raise());
        assert!(handle.is_alerting());
    }
}

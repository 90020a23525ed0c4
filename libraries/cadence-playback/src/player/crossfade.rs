//! Crossfade curves and time-based fades between the two player slots
//!
//! Fade curve types:
//! - Linear: simple linear fade (3dB dip at the midpoint)
//! - SquareRoot: faster rise than linear
//! - S-Curve: slow start and end
//! - Equal Power: constant perceived loudness (default)

use serde::{Deserialize, Serialize};
use std::f32::consts::PI;
use std::time::Duration;
use tokio::time::Instant;

/// Upper bound of a crossfade
pub const MAX_CROSSFADE_MS: u32 = 10_000;

/// Crossfade curve type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FadeCurve {
    /// Constant amplitude sum, not constant power: dips ~3dB at the midpoint
    Linear,

    /// t^0.5: rises quickly then flattens
    SquareRoot,

    /// Sine-shaped: slow start, fast middle, slow end
    SCurve,

    /// sin/cos pair keeping in² + out² = 1
    #[default]
    EqualPower,
}

impl FadeCurve {
    /// Gain at a normalized position (0.0 to 1.0) of the fade
    ///
    /// `fade_out` selects the outgoing side of the pair.
    #[inline]
    pub fn calculate_gain(&self, position: f32, fade_out: bool) -> f32 {
        let position = position.clamp(0.0, 1.0);
        let t = if fade_out { 1.0 - position } else { position };

        match self {
            FadeCurve::Linear => t,
            FadeCurve::SquareRoot => {
                if t <= 0.0 {
                    0.0
                } else {
                    t.sqrt()
                }
            }
            FadeCurve::SCurve => (1.0 - (PI * t).cos()) * 0.5,
            FadeCurve::EqualPower => (t * PI * 0.5).sin(),
        }
    }

    /// Get a human-readable name for the curve
    pub fn display_name(&self) -> &'static str {
        match self {
            FadeCurve::Linear => "Linear",
            FadeCurve::SquareRoot => "Square Root",
            FadeCurve::SCurve => "S-Curve",
            FadeCurve::EqualPower => "Equal Power",
        }
    }
}

/// Crossfade settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrossfadeSettings {
    /// Whether crossfade is enabled
    pub enabled: bool,

    /// Crossfade duration in milliseconds (0 = gapless, max 10000)
    pub duration_ms: u32,

    /// Fade curve type
    pub curve: FadeCurve,

    /// Also fade on manual skips, not only on natural track ends
    pub on_skip: bool,
}

impl Default for CrossfadeSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            duration_ms: 3000,
            curve: FadeCurve::EqualPower,
            on_skip: false,
        }
    }
}

impl CrossfadeSettings {
    /// Gapless transitions: swap instantly, no overlap
    pub fn gapless() -> Self {
        Self {
            enabled: true,
            duration_ms: 0,
            curve: FadeCurve::Linear,
            on_skip: false,
        }
    }

    /// Create settings with a specific duration
    pub fn with_duration(duration_ms: u32) -> Self {
        Self {
            enabled: true,
            duration_ms: duration_ms.min(MAX_CROSSFADE_MS),
            curve: FadeCurve::EqualPower,
            on_skip: false,
        }
    }

    /// Effective fade length, clamped to the maximum
    pub fn duration(&self) -> Duration {
        Duration::from_millis(u64::from(self.duration_ms.min(MAX_CROSSFADE_MS)))
    }

    /// Whether a transition of this kind should overlap the two slots
    pub fn applies_to(&self, is_manual_skip: bool) -> bool {
        self.enabled && self.duration_ms > 0 && (!is_manual_skip || self.on_skip)
    }
}

/// A fade in progress between the outgoing and the incoming slot
#[derive(Debug, Clone, Copy)]
pub struct Fade {
    /// Slot being faded out
    pub outgoing: usize,
    started: Instant,
    duration: Duration,
    curve: FadeCurve,
}

impl Fade {
    pub fn start(outgoing: usize, settings: &CrossfadeSettings) -> Self {
        Self {
            outgoing,
            started: Instant::now(),
            duration: settings.duration(),
            curve: settings.curve,
        }
    }

    /// Progress from 0.0 to 1.0 at `now`
    pub fn progress(&self, now: Instant) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_duration_since(self.started);
        (elapsed.as_secs_f32() / self.duration.as_secs_f32()).min(1.0)
    }

    /// (outgoing, incoming) gains at `now`
    pub fn gains(&self, now: Instant) -> (f32, f32) {
        let progress = self.progress(now);
        (
            self.curve.calculate_gain(progress, true),
            self.curve.calculate_gain(progress, false),
        )
    }

    pub fn is_complete(&self, now: Instant) -> bool {
        self.progress(now) >= 1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fade_curve_linear() {
        let curve = FadeCurve::Linear;

        assert!((curve.calculate_gain(0.0, false) - 0.0).abs() < 0.001);
        assert!((curve.calculate_gain(0.5, false) - 0.5).abs() < 0.001);
        assert!((curve.calculate_gain(1.0, true) - 0.0).abs() < 0.001);
    }

    #[test]
    fn test_fade_curve_equal_power() {
        let curve = FadeCurve::EqualPower;

        let mid_in = curve.calculate_gain(0.5, false);
        let mid_out = curve.calculate_gain(0.5, true);

        let sum_of_squares = mid_in * mid_in + mid_out * mid_out;
        assert!(
            (sum_of_squares - 1.0).abs() < 0.01,
            "Equal power: sum of squares = {sum_of_squares}, expected ~1.0"
        );
    }

    #[test]
    fn test_fade_curve_scurve_and_sqrt() {
        assert!((FadeCurve::SCurve.calculate_gain(0.5, false) - 0.5).abs() < 0.001);
        assert!(
            FadeCurve::SquareRoot.calculate_gain(0.5, false)
                > FadeCurve::Linear.calculate_gain(0.5, false)
        );
    }

    #[test]
    fn test_settings_applicability() {
        assert!(!CrossfadeSettings::default().applies_to(false));
        assert!(!CrossfadeSettings::gapless().applies_to(false));

        let settings = CrossfadeSettings::with_duration(20_000);
        assert_eq!(settings.duration(), Duration::from_secs(10));
        assert!(settings.applies_to(false));
        assert!(!settings.applies_to(true));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fade_progress_follows_clock() {
        let fade = Fade::start(0, &CrossfadeSettings::with_duration(1000));
        assert!(fade.progress(Instant::now()) < 0.01);

        tokio::time::advance(Duration::from_millis(500)).await;
        assert!((fade.progress(Instant::now()) - 0.5).abs() < 0.01);

        tokio::time::advance(Duration::from_millis(600)).await;
        assert!(fade.is_complete(Instant::now()));
        let (out_gain, in_gain) = fade.gains(Instant::now());
        assert!(out_gain < 0.001 && (in_gain - 1.0).abs() < 0.001);
    }
}

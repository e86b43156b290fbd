//! Scroll-driven reveal of page sections.
//!
//! The host reports how much of a section intersects the viewport; the
//! controller decides whether the section is shown, with a lower exit
//! threshold than entry threshold so it does not flicker at the edge.

use serde::{Deserialize, Serialize};
use serde_with::DeserializeFromStr;
use std::time::Duration;
use strum::{Display as StrumDisplay, EnumString};

pub const THRESHOLD_STEPS: usize = 20;
pub const FADE_UP_OFFSET: f64 = 32.0;
pub const SCALE_IN_FROM: f64 = 0.95;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    DeserializeFromStr,
    EnumString,
    StrumDisplay,
)]
#[strum(ascii_case_insensitive)]
#[serde(rename_all = "kebab-case")]
pub enum RevealVariant {
    #[default]
    #[strum(to_string = "fade-up", serialize = "fadeup")]
    FadeUp,
    #[strum(to_string = "fade-in", serialize = "fadein")]
    FadeIn,
    #[strum(to_string = "scale-in", serialize = "scalein")]
    ScaleIn,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RevealStyle {
    pub opacity: f64,
    pub translate_y: f64,
    pub scale: f64,
}

impl RevealVariant {
    pub fn style(&self, shown: bool) -> RevealStyle {
        let shown_style = RevealStyle {
            opacity: 1.0,
            translate_y: 0.0,
            scale: 1.0,
        };
        if shown {
            return shown_style;
        }
        match self {
            Self::FadeUp => RevealStyle {
                opacity: 0.0,
                translate_y: FADE_UP_OFFSET,
                ..shown_style
            },
            Self::FadeIn => RevealStyle {
                opacity: 0.0,
                ..shown_style
            },
            Self::ScaleIn => RevealStyle {
                opacity: 0.0,
                scale: SCALE_IN_FROM,
                ..shown_style
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RevealSettings {
    pub variant: RevealVariant,
    /// Intersection ratio that shows the section, unless `show_at` is set.
    pub threshold: f64,
    pub show_at: Option<f64>,
    /// Keep the section shown once it has been revealed.
    pub once: bool,
    pub delay_ms: u64,
    /// Hide only at ratio 0; otherwise hide below half the show ratio.
    pub hide_when_fully_out: bool,
}

impl Default for RevealSettings {
    fn default() -> Self {
        Self {
            variant: RevealVariant::FadeUp,
            threshold: 0.15,
            show_at: None,
            once: false,
            delay_ms: 0,
            hide_when_fully_out: true,
        }
    }
}

impl RevealSettings {
    pub fn show_ratio(&self) -> f64 {
        let ratio = self.show_at.unwrap_or(self.threshold);
        if ratio.is_finite() {
            ratio.clamp(0.0, 1.0)
        } else {
            RevealSettings::default().threshold
        }
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// Observation ratios a host should report: every 5% plus the show ratio.
pub fn thresholds(show_ratio: f64) -> Vec<f64> {
    let mut steps: Vec<f64> = (0..=THRESHOLD_STEPS)
        .map(|i| i as f64 / THRESHOLD_STEPS as f64)
        .collect();
    if !steps.contains(&show_ratio) {
        steps.push(show_ratio);
    }
    steps.sort_by(f64::total_cmp);
    steps
}

#[derive(Debug, Clone)]
pub struct RevealController {
    settings: RevealSettings,
    visible: bool,
    ever_visible: bool,
    visible_since: Option<Duration>,
}

impl RevealController {
    pub fn new(settings: RevealSettings) -> Self {
        Self {
            settings,
            visible: false,
            ever_visible: false,
            visible_since: None,
        }
    }

    /// Feeds one intersection ratio observed at `now`. Returns whether visibility flipped.
    pub fn observe(&mut self, ratio: f64, now: Duration) -> bool {
        if !ratio.is_finite() {
            return false;
        }
        let ratio = ratio.clamp(0.0, 1.0);
        let show_ratio = self.settings.show_ratio();

        if ratio >= show_ratio {
            if self.visible {
                return false;
            }
            self.visible = true;
            self.ever_visible = true;
            self.visible_since = Some(now);
            return true;
        }

        if self.settings.once || !self.visible {
            return false;
        }

        let hide = if self.settings.hide_when_fully_out {
            ratio == 0.0
        } else {
            ratio < show_ratio * 0.5
        };
        if hide {
            self.visible = false;
            self.visible_since = None;
        }
        hide
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Visible long enough to have passed the delay, or latched by `once`.
    pub fn is_shown(&self, now: Duration) -> bool {
        (self.settings.once && self.ever_visible)
            || self
                .visible_since
                .is_some_and(|since| now >= since + self.settings.delay())
    }

    /// Visible but still waiting out the delay.
    pub fn is_pending(&self, now: Duration) -> bool {
        self.visible && !self.is_shown(now)
    }

    pub fn style(&self, now: Duration) -> RevealStyle {
        self.settings.variant.style(self.is_shown(now))
    }
}

/// Latches once a section first intersects the viewport; it never unlatches.
#[derive(Debug, Clone, Copy, Default)]
pub struct MountLatch {
    mounted: bool,
}

impl MountLatch {
    pub fn observe(&mut self, intersecting: bool) -> bool {
        let latched = intersecting && !self.mounted;
        self.mounted |= intersecting;
        latched
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: Duration = Duration::ZERO;

    fn controller(settings: RevealSettings) -> RevealController {
        RevealController::new(settings)
    }

    #[test]
    fn test_shows_at_threshold_and_hides_when_fully_out() {
        let mut reveal = controller(RevealSettings::default());

        assert!(!reveal.observe(0.1, T0));
        assert!(!reveal.is_shown(T0));

        assert!(reveal.observe(0.15, T0));
        assert!(reveal.is_shown(T0));

        // partially out keeps it visible
        assert!(!reveal.observe(0.05, T0));
        assert!(reveal.is_visible());

        assert!(reveal.observe(0.0, T0));
        assert!(!reveal.is_shown(T0));
    }

    #[test]
    fn test_half_threshold_hysteresis() {
        let mut reveal = controller(RevealSettings {
            show_at: Some(0.4),
            hide_when_fully_out: false,
            ..RevealSettings::default()
        });

        reveal.observe(0.5, T0);
        assert!(!reveal.observe(0.25, T0));
        assert!(reveal.is_visible());
        assert!(reveal.observe(0.19, T0));
        assert!(!reveal.is_visible());
    }

    #[test]
    fn test_once_never_hides() {
        let mut reveal = controller(RevealSettings {
            once: true,
            delay_ms: 500,
            ..RevealSettings::default()
        });

        reveal.observe(1.0, T0);
        assert!(reveal.is_shown(T0));
        assert!(!reveal.observe(0.0, Duration::from_secs(1)));
        assert!(reveal.is_shown(Duration::from_secs(1)));
    }

    #[test]
    fn test_delay_postpones_showing() {
        let mut reveal = controller(RevealSettings {
            delay_ms: 300,
            ..RevealSettings::default()
        });

        reveal.observe(0.8, Duration::from_millis(100));
        assert!(reveal.is_pending(Duration::from_millis(200)));
        assert_eq!(reveal.style(Duration::from_millis(200)).opacity, 0.0);
        assert!(reveal.is_shown(Duration::from_millis(400)));
        assert!(!reveal.is_pending(Duration::from_millis(400)));
    }

    #[test]
    fn test_non_finite_ratio_is_ignored() {
        let mut reveal = controller(RevealSettings::default());
        assert!(!reveal.observe(f64::NAN, T0));
        assert!(!reveal.is_visible());
    }

    #[test]
    fn test_variant_styles() {
        assert_eq!(RevealVariant::FadeUp.style(false).translate_y, FADE_UP_OFFSET);
        assert_eq!(RevealVariant::ScaleIn.style(false).scale, SCALE_IN_FROM);
        assert_eq!(RevealVariant::FadeIn.style(false).opacity, 0.0);
        assert_eq!(RevealVariant::FadeIn.style(true).opacity, 1.0);
    }

    #[test]
    fn test_variant_deserialization() {
        let cases = vec![
            ("\"fade-up\"", RevealVariant::FadeUp),
            ("\"Fade-In\"", RevealVariant::FadeIn),
            ("\"scalein\"", RevealVariant::ScaleIn),
        ];

        for (json, expected) in cases {
            let deserialized: RevealVariant = serde_json::from_str(json).unwrap();
            assert_eq!(deserialized, expected);
        }
    }

    #[test]
    fn test_thresholds_include_show_ratio() {
        let steps = thresholds(0.33);
        assert_eq!(steps.len(), THRESHOLD_STEPS + 2);
        assert_eq!(steps.first(), Some(&0.0));
        assert_eq!(steps.last(), Some(&1.0));
        assert!(steps.windows(2).all(|w| w[0] <= w[1]));
        assert!(steps.contains(&0.33));

        assert_eq!(thresholds(0.5).len(), THRESHOLD_STEPS + 1);
    }

    #[test]
    fn test_mount_latch() {
        let mut latch = MountLatch::default();
        assert!(!latch.observe(false));
        assert!(latch.observe(true));
        assert!(!latch.observe(true));
        assert!(!latch.observe(false));
        assert!(latch.is_mounted());
    }
}

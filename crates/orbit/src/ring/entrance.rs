use super::ENTRANCE_OFFSET_Y;
use crate::config::RingSettings;
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EntranceFrame {
    pub offset_y: f64,
    pub opacity: f64,
}

impl EntranceFrame {
    pub const HIDDEN: Self = Self {
        offset_y: ENTRANCE_OFFSET_Y,
        opacity: 0.0,
    };
    pub const SETTLED: Self = Self {
        offset_y: 0.0,
        opacity: 1.0,
    };
}

/// Staggered rise-and-fade of the panels after the ring is mounted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Entrance {
    stagger: f64,
    duration: f64,
}

impl Entrance {
    pub fn new(stagger: f64, duration: f64) -> Self {
        Self {
            stagger: stagger.max(0.0),
            duration: duration.max(0.0),
        }
    }

    pub fn from_settings(settings: &RingSettings) -> Self {
        Self::new(settings.stagger_delay, settings.animation_duration)
    }

    pub fn progress(&self, index: usize, elapsed: Duration) -> f64 {
        let local = elapsed.as_secs_f64() - index as f64 * self.stagger;
        if local <= 0.0 {
            return 0.0;
        }
        if self.duration <= 0.0 {
            return 1.0;
        }
        (local / self.duration).min(1.0)
    }

    pub fn at(&self, index: usize, elapsed: Duration) -> EntranceFrame {
        let t = ease_out(self.progress(index, elapsed));
        EntranceFrame {
            offset_y: ENTRANCE_OFFSET_Y * (1.0 - t),
            opacity: t,
        }
    }

    /// True once the last of `count` panels has landed.
    pub fn is_finished(&self, count: usize, elapsed: Duration) -> bool {
        count == 0 || self.progress(count - 1, elapsed) >= 1.0
    }
}

fn ease_out(t: f64) -> f64 {
    1.0 - (1.0 - t).powi(3)
}

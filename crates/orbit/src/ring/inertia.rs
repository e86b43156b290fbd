use super::FULL_TURN;
use std::time::Duration;

/// Exponential glide from a release rotation towards a snapped resting rotation.
///
/// The curve only depends on elapsed time, so the host may tick at any rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Inertia {
    origin: f64,
    target: f64,
    time_constant: Duration,
    rest_delta: f64,
}

impl Inertia {
    /// Projects `origin + boost` and rounds it onto the `step` grid. Without a step
    /// (single panel) the ring rests where it was released.
    pub fn plan(
        origin: f64,
        boost: f64,
        step: Option<f64>,
        time_constant: Duration,
        rest_delta: f64,
    ) -> Self {
        let target = step.map_or(origin, |step| snap_to(origin + boost, step));
        Self {
            origin,
            target,
            time_constant,
            rest_delta,
        }
    }

    pub fn origin(&self) -> f64 {
        self.origin
    }

    pub fn target(&self) -> f64 {
        self.target
    }

    pub fn position(&self, elapsed: Duration) -> f64 {
        let tau = self.time_constant.as_secs_f64();
        if tau <= 0.0 {
            return self.target;
        }
        let decay = (-elapsed.as_secs_f64() / tau).exp();
        self.target - (self.target - self.origin) * decay
    }

    pub fn remaining(&self, elapsed: Duration) -> f64 {
        self.target - self.position(elapsed)
    }

    pub fn is_settled(&self, elapsed: Duration) -> bool {
        self.remaining(elapsed).abs() <= self.rest_delta
    }
}

/// Rounds `value` to the nearest multiple of `step`.
pub fn snap_to(value: f64, step: f64) -> f64 {
    if step > 0.0 && step.is_finite() {
        (value / step).round() * step
    } else {
        value
    }
}

/// Normalizes an angle to `(-180, 180]`.
pub fn wrap_degrees(deg: f64) -> f64 {
    let wrapped = deg.rem_euclid(FULL_TURN);
    if wrapped > FULL_TURN / 2.0 {
        wrapped - FULL_TURN
    } else {
        wrapped
    }
}

use super::entrance::{Entrance, EntranceFrame};
use super::inertia::{Inertia, snap_to};
use super::layout::{self, Frame, LayoutContext, PanelTransform};
use super::panel::ImageRef;
use super::FULL_TURN;
use crate::config::RingSettings;
use serde::Serialize;
use std::collections::VecDeque;
use std::time::Duration;
use strum::{Display as StrumDisplay, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, StrumDisplay)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Idle,
    Dragging,
    Decelerating,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, StrumDisplay)]
#[strum(ascii_case_insensitive)]
pub enum KeyAction {
    #[strum(to_string = "right", serialize = "arrowright", serialize = "advance")]
    Advance,
    #[strum(to_string = "left", serialize = "arrowleft", serialize = "retreat")]
    Retreat,
}

impl KeyAction {
    fn direction(&self) -> f64 {
        match self {
            Self::Advance => 1.0,
            Self::Retreat => -1.0,
        }
    }
}

#[derive(Debug, Clone)]
struct DragSession {
    start_x: f64,
    start_rotation: f64,
    last_x: f64,
    deltas: VecDeque<f64>,
}

impl DragSession {
    fn new(x: f64, rotation: f64) -> Self {
        Self {
            start_x: x,
            start_rotation: rotation,
            last_x: x,
            deltas: VecDeque::new(),
        }
    }

    fn record(&mut self, delta: f64, window: usize) {
        self.deltas.push_back(delta);
        while self.deltas.len() > window.max(1) {
            self.deltas.pop_front();
        }
    }

    /// Mean of the recorded angular deltas, in degrees per move event.
    fn velocity(&self) -> f64 {
        if self.deltas.is_empty() {
            return 0.0;
        }
        self.deltas.iter().sum::<f64>() / self.deltas.len() as f64
    }
}

#[derive(Debug, Clone)]
enum Motion {
    Idle,
    Dragging(DragSession),
    Decelerating { inertia: Inertia, elapsed: Duration },
}

/// Rotation state of one ring of panels and the drag/glide/snap state machine
/// that drives it.
///
/// All mutation goes through the input methods; each returns whether the
/// visible state changed so the host knows when to redraw.
pub struct Ring {
    panels: Vec<ImageRef>,
    settings: RingSettings,
    rotation: f64,
    scale: f64,
    viewport_width: Option<f64>,
    motion: Motion,
    entrance: Entrance,
    entrance_elapsed: Duration,
}

impl Ring {
    pub fn new(panels: Vec<ImageRef>, settings: RingSettings) -> Self {
        let settings = settings.sanitized();
        Self {
            panels,
            rotation: settings.initial_rotation,
            scale: 1.0,
            viewport_width: None,
            motion: Motion::Idle,
            entrance: Entrance::from_settings(&settings),
            entrance_elapsed: Duration::ZERO,
            settings,
        }
    }

    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn panels(&self) -> &[ImageRef] {
        &self.panels
    }

    pub fn settings(&self) -> &RingSettings {
        &self.settings
    }

    pub fn phase(&self) -> Phase {
        match self.motion {
            Motion::Idle => Phase::Idle,
            Motion::Dragging(_) => Phase::Dragging,
            Motion::Decelerating { .. } => Phase::Decelerating,
        }
    }

    /// Angular width of one panel slot, `None` for an empty ring.
    pub fn panel_angle(&self) -> Option<f64> {
        (!self.panels.is_empty()).then(|| FULL_TURN / self.panels.len() as f64)
    }

    /// Grid the ring settles onto. A single panel never needs to snap.
    fn snap_step(&self) -> Option<f64> {
        self.panel_angle().filter(|_| self.panels.len() > 1)
    }

    /// Degrees rotated since the current drag began.
    pub fn drag_offset(&self) -> Option<f64> {
        match &self.motion {
            Motion::Dragging(session) => Some(self.rotation - session.start_rotation),
            _ => None,
        }
    }

    /// Pixels the pointer travelled since the current drag began.
    pub fn drag_distance(&self) -> Option<f64> {
        match &self.motion {
            Motion::Dragging(session) => Some(session.last_x - session.start_x),
            _ => None,
        }
    }

    pub fn pointer_down(&mut self, x: Option<f64>) -> bool {
        let Some(x) = x.filter(|x| x.is_finite()) else {
            return false;
        };
        if !self.settings.draggable || self.panels.is_empty() {
            return false;
        }
        if let Motion::Decelerating { .. } = self.motion {
            log::debug!("Glide interrupted at {:.2}", self.rotation);
        }
        self.motion = Motion::Dragging(DragSession::new(x, self.rotation));
        true
    }

    pub fn pointer_move(&mut self, x: Option<f64>) -> bool {
        let Some(x) = x.filter(|x| x.is_finite()) else {
            return false;
        };
        let Motion::Dragging(session) = &mut self.motion else {
            return false;
        };

        let delta = -(x - session.last_x) * self.settings.drag_sensitivity;
        session.last_x = x;
        session.record(delta, self.settings.velocity_window);
        self.rotation += delta;
        delta != 0.0
    }

    pub fn pointer_up(&mut self) -> bool {
        let Motion::Dragging(session) = &self.motion else {
            return false;
        };
        let velocity = session.velocity();
        self.release(velocity);
        true
    }

    pub fn pointer_cancel(&mut self) -> bool {
        self.pointer_up()
    }

    fn release(&mut self, velocity: f64) {
        if velocity.abs() >= self.settings.release_velocity_threshold {
            self.glide(velocity * self.settings.velocity_multiplier);
        } else {
            if let Some(step) = self.snap_step() {
                self.rotation = snap_to(self.rotation, step);
            }
            self.motion = Motion::Idle;
            log::debug!("Released slowly, snapped to {:.2}", self.rotation);
        }
    }

    fn glide(&mut self, boost: f64) {
        let inertia = Inertia::plan(
            self.rotation,
            boost,
            self.snap_step(),
            self.settings.time_constant(),
            self.settings.rest_delta,
        );
        log::debug!(
            "Gliding from {:.2} to {:.2}",
            inertia.origin(),
            inertia.target()
        );
        self.motion = Motion::Decelerating {
            inertia,
            elapsed: Duration::ZERO,
        };
    }

    /// Nudges by a fraction of a slot. The ring is left where it lands until `settle`.
    pub fn key(&mut self, action: KeyAction) -> bool {
        let Some(angle) = self.panel_angle() else {
            return false;
        };
        if let Motion::Dragging(_) = self.motion {
            return false;
        }
        self.rotation += action.direction() * self.settings.nudge_fraction * angle;
        self.motion = Motion::Idle;
        true
    }

    pub fn key_release(&mut self) -> bool {
        self.settle()
    }

    /// Glides an idle ring that sits between slots onto the nearest one.
    pub fn settle(&mut self) -> bool {
        if !matches!(self.motion, Motion::Idle) {
            return false;
        }
        let Some(step) = self.snap_step() else {
            return false;
        };
        if snap_to(self.rotation, step) == self.rotation {
            return false;
        }
        self.glide(0.0);
        true
    }

    /// Advances the glide and the entrance animation by `dt`.
    pub fn tick(&mut self, dt: Duration) -> bool {
        let entering = !self.entrance.is_finished(self.panels.len(), self.entrance_elapsed);
        self.entrance_elapsed = self.entrance_elapsed.saturating_add(dt);

        let Motion::Decelerating { inertia, elapsed } = &mut self.motion else {
            return entering;
        };
        *elapsed += dt;
        let (inertia, elapsed) = (*inertia, *elapsed);

        if inertia.is_settled(elapsed) {
            self.rotation = inertia.target();
            self.motion = Motion::Idle;
            log::debug!("Settled at {:.2}", self.rotation);
        } else {
            self.rotation = inertia.position(elapsed);
        }
        true
    }

    pub fn is_animating(&self) -> bool {
        matches!(self.motion, Motion::Decelerating { .. })
            || !self.entrance.is_finished(self.panels.len(), self.entrance_elapsed)
    }

    /// Applies the mobile scale when the viewport is at or below the breakpoint.
    pub fn resize(&mut self, viewport_width: f64) -> bool {
        if !viewport_width.is_finite() {
            return false;
        }
        self.viewport_width = Some(viewport_width);
        let scale = if viewport_width <= self.settings.mobile_breakpoint {
            self.settings.mobile_scale_factor
        } else {
            1.0
        };
        let changed = scale != self.scale;
        self.scale = scale;
        changed
    }

    /// Swaps panels and settings in place, keeping the current rotation.
    pub fn reconfigure(&mut self, panels: Vec<ImageRef>, settings: RingSettings) {
        self.settings = settings.sanitized();
        self.entrance = Entrance::from_settings(&self.settings);
        if panels != self.panels {
            self.entrance_elapsed = Duration::ZERO;
        }
        self.panels = panels;
        self.motion = Motion::Idle;
        if let Some(width) = self.viewport_width {
            self.resize(width);
        }
        self.settle();
    }

    pub fn layout(&self) -> Vec<PanelTransform> {
        let ctx = LayoutContext {
            rotation: self.rotation,
            panel_count: self.panels.len(),
            scale: self.scale,
            settings: &self.settings,
        };
        self.panels
            .iter()
            .enumerate()
            .map(|(i, src)| {
                let entrance = self.entrance.at(i, self.entrance_elapsed);
                PanelTransform::calculate(i, src, &ctx, entrance)
            })
            .collect()
    }

    pub fn frontmost(&self) -> Option<usize> {
        layout::frontmost(&self.layout())
    }

    pub fn frame(&self) -> Frame {
        let panels = self.layout();
        Frame {
            rotation: self.rotation,
            phase: self.phase(),
            scale: self.scale,
            frontmost: layout::frontmost(&panels),
            panels,
        }
    }

    pub fn entrance_frame(&self, index: usize) -> EntranceFrame {
        self.entrance.at(index, self.entrance_elapsed)
    }
}

use super::controller::Phase;
use super::entrance::EntranceFrame;
use super::inertia::wrap_degrees;
use super::panel::ImageRef;
use super::{FRONT_OFFSET, FULL_TURN, PARALLAX_DIVISOR};
use crate::config::{ImageFit, RingSettings};
use serde::Serialize;

/// Inputs shared by every panel of one ring for a single frame.
#[derive(Debug, Clone, Copy)]
pub struct LayoutContext<'a> {
    pub rotation: f64,
    pub panel_count: usize,
    pub scale: f64,
    pub settings: &'a RingSettings,
}

impl LayoutContext<'_> {
    pub fn panel_angle(&self) -> f64 {
        if self.panel_count == 0 {
            0.0
        } else {
            FULL_TURN / self.panel_count as f64
        }
    }

    /// Rotation of panel `index` relative to facing the viewer, in `[0, 360)`.
    fn effective_rotation(&self, index: usize) -> f64 {
        if self.panel_count <= 1 {
            return 0.0;
        }
        (self.rotation - FRONT_OFFSET - index as f64 * self.panel_angle()).rem_euclid(FULL_TURN)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PanelTransform {
    pub index: usize,
    pub src: ImageRef,
    /// Fixed placement of the panel on the ring.
    pub offset_deg: f64,
    /// Angle away from the viewer in `(-180, 180]`, 0 is frontmost.
    pub facing_deg: f64,
    pub depth: f64,
    pub origin_depth: f64,
    /// Horizontal image offset for covered panels; `None` keeps the image centered.
    pub parallax_x: Option<f64>,
    pub texture_px: u32,
    pub eager: bool,
    pub entrance: EntranceFrame,
}

impl PanelTransform {
    pub fn calculate(
        index: usize,
        src: &ImageRef,
        ctx: &LayoutContext<'_>,
        entrance: EntranceFrame,
    ) -> Self {
        let distance = ctx.settings.panel_distance * ctx.scale;
        let effective = ctx.effective_rotation(index);

        let parallax_x = match ctx.settings.image_fit {
            ImageFit::Cover => Some(-(effective / FULL_TURN) * (distance / PARALLAX_DIVISOR)),
            ImageFit::Contain => None,
        };

        let texture_px = (ctx.settings.width.round() as u32).min(ctx.settings.texture_size());

        Self {
            index,
            src: src.normalized(),
            offset_deg: -(index as f64) * ctx.panel_angle(),
            facing_deg: wrap_degrees(effective),
            depth: -distance,
            origin_depth: distance,
            parallax_x,
            texture_px,
            eager: index == 0,
            entrance,
        }
    }
}

/// Everything a renderer needs to draw one ring.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame {
    pub rotation: f64,
    pub phase: Phase,
    pub scale: f64,
    pub frontmost: Option<usize>,
    pub panels: Vec<PanelTransform>,
}

/// The panel whose facing angle is closest to zero.
pub fn frontmost(panels: &[PanelTransform]) -> Option<usize> {
    panels
        .iter()
        .min_by(|a, b| a.facing_deg.abs().total_cmp(&b.facing_deg.abs()))
        .map(|p| p.index)
}

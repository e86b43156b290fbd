pub mod controller;
pub mod entrance;
pub mod inertia;
pub mod layout;
pub mod panel;

pub use controller::{KeyAction, Phase, Ring};
pub use entrance::{Entrance, EntranceFrame};
pub use inertia::Inertia;
pub use layout::{Frame, PanelTransform};
pub use panel::ImageRef;

pub const FULL_TURN: f64 = 360.0;
pub const FRONT_OFFSET: f64 = 180.0; // rotation at which panel 0 faces the viewer
pub const PARALLAX_DIVISOR: f64 = 1.5;
pub const MIN_TEXTURE_SIZE: u32 = 512;
pub const MAX_TEXTURE_SIZE: u32 = 2048;
pub const ENTRANCE_OFFSET_Y: f64 = 200.0; // panels rise from this far below

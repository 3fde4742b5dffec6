use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Index of a tip in the colony's tip store.
pub type TipId = usize;

/// Index of a resource in the resource list.
pub type ResourceId = usize;

/// RGBA colour, components in 0..=1.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }
}

/// What a spatial index entry refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Occupant {
    Tip(TipId),
    Resource(ResourceId),
}

/// Fixed attractor point.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct Resource {
    pub position: Vec2,
}

/// One drawable filament piece, produced for active and frozen tips alike.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct RenderSegment {
    pub start: Vec2,
    pub end: Vec2,
    pub color: Rgba,
    pub thickness: f32,
    pub active: bool,
}

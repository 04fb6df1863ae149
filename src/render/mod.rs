mod composite;
mod contour;
mod surface;

pub use composite::{composite_overlay, composited, AlphaPolicy, CanvasRegion, OverlayStyle};
pub use contour::{
    boundary_pixels, trace_contour, ContourOptions, ContourStyle, GridEdge, Membership,
    DOT_MARKER_SIZE,
};
pub use surface::{PathCommand, PathRecorder, PathSurface, RasterSurface, StrokeStyle};

/// Top-left origin, in destination pixels, at which a smaller region is placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Offset {
    pub x: i32,
    pub y: i32,
}

impl Offset {
    pub const ZERO: Offset = Offset { x: 0, y: 0 };

    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Overlay colour. Only the RGB channels are blended.
pub type Color = image::Rgb<u8>;

use super::surface::{PathSurface, StrokeStyle};
use super::Offset;
use crate::error::{check_threshold, Result};
use crate::postprocess::MaskGrid;

/// Side length, in canvas units, of the marker drawn for each boundary cell.
pub const DOT_MARKER_SIZE: f64 = 0.1;

/// Geometry emitted per boundary cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContourStyle {
    /// A tiny `0.1 × 0.1` rectangle at the cell's top-left corner.
    #[default]
    DotMarker,
    /// The full outline of the cell, `scale_x × scale_y` canvas units.
    CellOutline,
}

/// How neighbours beyond the edge of the grid are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GridEdge {
    /// Out-of-grid neighbours count as outside the mask, so a mask touching
    /// the edge is outlined along it.
    #[default]
    Boundary,
    /// Out-of-grid neighbours are ignored.
    Interior,
}

/// Which cell values count as inside the mask.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Membership {
    /// Any nonzero value, negative ones included. NaN is outside.
    #[default]
    Truthy,
    /// Values strictly above the threshold.
    Above(f32),
}

impl Membership {
    pub fn contains(self, value: f32) -> bool {
        match self {
            Membership::Truthy => value != 0.0 && !value.is_nan(),
            Membership::Above(threshold) => value > threshold,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ContourOptions {
    pub style: ContourStyle,
    pub grid_edge: GridEdge,
    pub membership: Membership,
    pub stroke: StrokeStyle,
}

/// Cells inside the mask with at least one 4-neighbour outside it, in
/// row-major order.
pub fn boundary_pixels(
    mask: &MaskGrid,
    membership: Membership,
    grid_edge: GridEdge,
) -> Result<Vec<(usize, usize)>> {
    if let Membership::Above(threshold) = membership {
        check_threshold(threshold)?;
    }

    let (width, height) = mask.dimensions();
    let edge_is_outside = grid_edge == GridEdge::Boundary;
    let outside = |x: usize, y: usize| !membership.contains(mask.get(x, y));

    let mut boundary = Vec::new();
    for y in 0..height {
        for x in 0..width {
            if outside(x, y) {
                continue;
            }
            let left = if x > 0 { outside(x - 1, y) } else { edge_is_outside };
            let right = if x + 1 < width { outside(x + 1, y) } else { edge_is_outside };
            let up = if y > 0 { outside(x, y - 1) } else { edge_is_outside };
            let down = if y + 1 < height { outside(x, y + 1) } else { edge_is_outside };

            if left || right || up || down {
                boundary.push((x, y));
            }
        }
    }

    Ok(boundary)
}

/// Outline `mask` on `surface`, stretched over a `canvas_width × canvas_height`
/// area placed at `offset`.
///
/// All geometry goes into one path: a single `begin_path`, the per-cell
/// shapes, then a single `stroke`. Returns the number of boundary cells.
pub fn trace_contour<S: PathSurface + ?Sized>(
    surface: &mut S,
    mask: &MaskGrid,
    canvas_width: u32,
    canvas_height: u32,
    offset: Offset,
    options: &ContourOptions,
) -> Result<usize> {
    let _span = tracing::debug_span!("contour").entered();

    let boundary = boundary_pixels(mask, options.membership, options.grid_edge)?;

    let (mask_width, mask_height) = mask.dimensions();
    let scale_x = canvas_width as f64 / mask_width as f64;
    let scale_y = canvas_height as f64 / mask_height as f64;

    surface.begin_path();
    for &(x, y) in &boundary {
        let canvas_x = x as f64 * scale_x + offset.x as f64;
        let canvas_y = y as f64 * scale_y + offset.y as f64;

        match options.style {
            ContourStyle::DotMarker => {
                surface.rect(canvas_x, canvas_y, DOT_MARKER_SIZE, DOT_MARKER_SIZE);
            }
            ContourStyle::CellOutline => {
                surface.move_to(canvas_x, canvas_y);
                surface.line_to(canvas_x + scale_x, canvas_y);
                surface.line_to(canvas_x + scale_x, canvas_y + scale_y);
                surface.line_to(canvas_x, canvas_y + scale_y);
                surface.line_to(canvas_x, canvas_y);
            }
        }
    }
    surface.stroke(&options.stroke);

    tracing::debug!(
        "Traced {} boundary cells of {}x{} mask",
        boundary.len(),
        mask_width,
        mask_height
    );

    Ok(boundary.len())
}

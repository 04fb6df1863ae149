use super::grid::MaskGrid;

/// Half-width of the square neighbourhood examined around each cell.
pub const DEFAULT_SMOOTHING_RADIUS: usize = 2;

/// Mean absolute difference to the neighbours above which a cell is
/// re-decided from its neighbourhood average.
pub const DEFAULT_JAGGEDNESS_THRESHOLD: f64 = 0.2;

/// Tunables for [`smooth_mask`]. The defaults were picked empirically for
/// 256×256 decoder masks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothingParams {
    pub radius: usize,
    pub jaggedness_threshold: f64,
}

impl Default for SmoothingParams {
    fn default() -> Self {
        Self {
            radius: DEFAULT_SMOOTHING_RADIUS,
            jaggedness_threshold: DEFAULT_JAGGEDNESS_THRESHOLD,
        }
    }
}

/// Denoise a mask, then close single-cell holes.
///
/// For every cell the `(2r+1)²` window (clipped at the grid edge) is scanned.
/// Cells whose normalized jaggedness exceeds the threshold are replaced by
/// their binarized neighbourhood average; all other cells keep their value.
/// The result is then passed through [`fill_enclosed`].
///
/// Cells are stored as `f32`, but sums and the threshold comparison run in
/// `f64`, so a jaggedness of exactly the threshold is kept.
pub fn smooth_mask(grid: &MaskGrid, params: &SmoothingParams) -> MaskGrid {
    let _span = tracing::debug_span!("smooth").entered();

    let (width, height) = grid.dimensions();
    let radius = params.radius;
    let mut smoothed = grid.clone();
    let mut rewritten = 0usize;

    for y in 0..height {
        let y0 = y.saturating_sub(radius);
        let y1 = (y + radius).min(height - 1);

        for x in 0..width {
            let x0 = x.saturating_sub(radius);
            let x1 = (x + radius).min(width - 1);
            let center = f64::from(grid.get(x, y));

            let mut sum = 0.0f64;
            let mut count = 0usize;
            let mut jaggedness = 0.0f64;

            for ny in y0..=y1 {
                for nx in x0..=x1 {
                    let value = f64::from(grid.get(nx, ny));
                    sum += value;
                    count += 1;
                    if nx != x || ny != y {
                        jaggedness += (center - value).abs();
                    }
                }
            }

            let average = sum / count as f64;
            // A lone cell gives 0/0 = NaN here, which never exceeds the threshold.
            let normalized_jaggedness = jaggedness / (count - 1) as f64;

            if normalized_jaggedness > params.jaggedness_threshold {
                smoothed.set(x, y, if average > 0.5 { 1.0 } else { 0.0 });
                rewritten += 1;
            }
        }
    }

    let filled = fill_enclosed(&mut smoothed);

    tracing::debug!(
        "Smoothed {}x{} mask: {} cells rewritten, {} holes filled",
        width,
        height,
        rewritten,
        filled
    );

    smoothed
}

/// Set every interior `0` cell whose four direct neighbours sum to exactly 4
/// to `1`. Runs in place, row-major, skipping the outer ring. Returns the
/// number of cells flipped.
pub fn fill_enclosed(grid: &mut MaskGrid) -> usize {
    let (width, height) = grid.dimensions();
    let mut filled = 0;

    for y in 1..height.saturating_sub(1) {
        for x in 1..width.saturating_sub(1) {
            if grid.get(x, y) != 0.0 {
                continue;
            }
            let surrounding = f64::from(grid.get(x, y - 1))
                + f64::from(grid.get(x, y + 1))
                + f64::from(grid.get(x - 1, y))
                + f64::from(grid.get(x + 1, y));
            if surrounding == 4.0 {
                grid.set(x, y, 1.0);
                filled += 1;
            }
        }
    }

    filled
}

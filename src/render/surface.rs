use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_line_segment_mut, draw_polygon_mut};
use imageproc::point::Point;
use imageproc::rect::Rect;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeStyle {
    pub color: Rgba<u8>,
    pub line_width: f64,
}

impl Default for StrokeStyle {
    fn default() -> Self {
        Self {
            color: Rgba([255, 255, 255, 255]),
            line_width: 2.0,
        }
    }
}

/// Trait for 2D vector drawing targets
/// Mirrors the path subset of a canvas context: geometry accumulates between
/// `begin_path` and `stroke`
pub trait PathSurface {
    /// Discard the current path
    fn begin_path(&mut self);

    /// Add a closed rectangle subpath
    fn rect(&mut self, x: f64, y: f64, width: f64, height: f64);

    fn move_to(&mut self, x: f64, y: f64);

    fn line_to(&mut self, x: f64, y: f64);

    /// Draw the current path outline
    fn stroke(&mut self, style: &StrokeStyle);
}

#[derive(Debug, Clone, PartialEq)]
pub enum PathCommand {
    BeginPath,
    Rect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    },
    MoveTo {
        x: f64,
        y: f64,
    },
    LineTo {
        x: f64,
        y: f64,
    },
    Stroke(StrokeStyle),
}

/// Records every call, for hosts that replay draw commands elsewhere.
#[derive(Debug, Clone, Default)]
pub struct PathRecorder {
    commands: Vec<PathCommand>,
}

impl PathRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[PathCommand] {
        &self.commands
    }
}

impl PathSurface for PathRecorder {
    fn begin_path(&mut self) {
        self.commands.push(PathCommand::BeginPath);
    }

    fn rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.commands.push(PathCommand::Rect {
            x,
            y,
            width,
            height,
        });
    }

    fn move_to(&mut self, x: f64, y: f64) {
        self.commands.push(PathCommand::MoveTo { x, y });
    }

    fn line_to(&mut self, x: f64, y: f64) {
        self.commands.push(PathCommand::LineTo { x, y });
    }

    fn stroke(&mut self, style: &StrokeStyle) {
        self.commands.push(PathCommand::Stroke(*style));
    }
}

/// Strokes paths straight into an RGBA buffer with `imageproc`.
///
/// Axis-aligned segments become filled rectangles `line_width` thick, with
/// edges rounded to whole pixels; other segments become filled quads.
/// Strokes are opaque, no anti-aliasing.
pub struct RasterSurface<'a> {
    image: &'a mut RgbaImage,
    segments: Vec<((f64, f64), (f64, f64))>,
    cursor: Option<(f64, f64)>,
}

impl<'a> RasterSurface<'a> {
    pub fn new(image: &'a mut RgbaImage) -> Self {
        Self {
            image,
            segments: Vec::new(),
            cursor: None,
        }
    }

    fn stroke_segment(&mut self, from: (f64, f64), to: (f64, f64), half: f64, color: Rgba<u8>) {
        if from.0 == to.0 || from.1 == to.1 {
            let x0 = (from.0.min(to.0) - half).round();
            let x1 = (from.0.max(to.0) + half).round();
            let y0 = (from.1.min(to.1) - half).round();
            let y1 = (from.1.max(to.1) + half).round();
            let width = (x1 - x0).max(1.0) as u32;
            let height = (y1 - y0).max(1.0) as u32;
            let rect = Rect::at(x0 as i32, y0 as i32).of_size(width, height);
            draw_filled_rect_mut(&mut *self.image, rect, color);
            return;
        }

        let (dx, dy) = (to.0 - from.0, to.1 - from.1);
        let length = dx.hypot(dy);
        let (nx, ny) = (-dy / length * half, dx / length * half);
        let mut quad: Vec<Point<i32>> = [
            (from.0 + nx, from.1 + ny),
            (to.0 + nx, to.1 + ny),
            (to.0 - nx, to.1 - ny),
            (from.0 - nx, from.1 - ny),
        ]
        .iter()
        .map(|&(x, y)| Point::new(x.round() as i32, y.round() as i32))
        .collect();
        quad.dedup();

        // Quads thinner than a pixel collapse when rounded.
        if quad.len() >= 3 && quad.first() != quad.last() {
            draw_polygon_mut(&mut *self.image, &quad, color);
        } else {
            draw_line_segment_mut(
                &mut *self.image,
                (from.0 as f32, from.1 as f32),
                (to.0 as f32, to.1 as f32),
                color,
            );
        }
    }
}

impl PathSurface for RasterSurface<'_> {
    fn begin_path(&mut self) {
        self.segments.clear();
        self.cursor = None;
    }

    fn rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        let corners = [
            (x, y),
            (x + width, y),
            (x + width, y + height),
            (x, y + height),
        ];
        for i in 0..4 {
            self.segments.push((corners[i], corners[(i + 1) % 4]));
        }
        self.cursor = Some((x, y));
    }

    fn move_to(&mut self, x: f64, y: f64) {
        self.cursor = Some((x, y));
    }

    fn line_to(&mut self, x: f64, y: f64) {
        if let Some(from) = self.cursor {
            self.segments.push((from, (x, y)));
        }
        self.cursor = Some((x, y));
    }

    fn stroke(&mut self, style: &StrokeStyle) {
        let half = style.line_width.max(0.0) / 2.0;
        let segments = std::mem::take(&mut self.segments);

        for &(from, to) in &segments {
            self.stroke_segment(from, to, half, style.color);
        }

        tracing::debug!("Stroked {} segments", segments.len());
        // The path survives a stroke until the next begin_path.
        self.segments = segments;
    }
}

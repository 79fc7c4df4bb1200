// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stroke painter — turns one decoded stroke into a vector path, applying the
// width, colour and cap rules of its brush family.
//
// Output stays in device coordinates; the compositor maps it to page space.
// Highlighter strokes produce no path and instead yield one synthetic
// highlight covering every sample.

use inkwerk_core::{BrushFamily, Rgb8, Segment, Stroke};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::geometry::{Point, Rect};
use crate::highlight::{Highlight, HighlightStyle};

/// Pencil width multiplier.
const PENCIL_WIDTH: f32 = 0.58;
/// Mechanical pencil width multiplier.
const MECHANICAL_PENCIL_WIDTH: f32 = 1.5;
/// Paint brush base width multiplier and pressure response.
const BRUSH_WIDTH: f32 = 0.75;
const BRUSH_PRESSURE_RANGE: f32 = 0.75;
/// Pen speed at which the paint brush stops depositing ink.
const BRUSH_SPEED_FADE: f32 = 150.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathOpKind {
    Move,
    Line,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CapStyle {
    Round,
    /// Square end flush with the segment endpoint.
    Flat,
}

/// One path instruction with the pen state in effect when it is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathOp {
    pub kind: PathOpKind,
    pub point: Point,
    /// Brush width in device pixels.
    pub width: f32,
    pub color: Rgb8,
    pub cap: CapStyle,
}

/// Result of painting one stroke.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PaintedStroke {
    pub ops: Vec<PathOp>,
    pub highlight: Option<Highlight>,
}

impl PaintedStroke {
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty() && self.highlight.is_none()
    }
}

#[derive(Debug, Clone, Copy)]
struct Pen {
    color: Rgb8,
    width: f32,
    cap: CapStyle,
}

/// Paints strokes one at a time. The pen state is reset at the start of
/// every stroke.
#[derive(Debug, Clone)]
pub struct StrokePainter {
    style: HighlightStyle,
    pen: Pen,
}

impl StrokePainter {
    pub fn new(style: HighlightStyle) -> Self {
        Self {
            style,
            pen: Pen {
                color: Rgb8::BLACK,
                width: 0.0,
                cap: CapStyle::Round,
            },
        }
    }

    pub fn style(&self) -> &HighlightStyle {
        &self.style
    }

    pub fn paint(&mut self, stroke: &Stroke) -> PaintedStroke {
        let Some(first) = stroke.segments.first() else {
            return PaintedStroke::default();
        };

        let family = stroke.brush_type.family();
        match family {
            BrushFamily::Eraser => return PaintedStroke::default(),
            BrushFamily::Highlighter => {
                return PaintedStroke {
                    ops: Vec::new(),
                    highlight: Some(self.highlighter(&stroke.segments)),
                };
            }
            _ => {}
        }

        let base = stroke.brush_color.rgb().unwrap_or_else(|| {
            trace!(color = stroke.brush_color.code(), "unknown brush colour, using black");
            Rgb8::BLACK
        });

        self.pen = Pen {
            color: base,
            width: first.width,
            cap: CapStyle::Round,
        };

        let mut ops = Vec::with_capacity(stroke.segments.len());
        ops.push(self.op(PathOpKind::Move, first));

        for pair in stroke.segments.windows(2) {
            let (prev, segment) = (&pair[0], &pair[1]);
            self.apply_brush(family, base, prev, segment);
            ops.push(self.op(PathOpKind::Line, segment));
        }

        PaintedStroke {
            ops,
            highlight: None,
        }
    }

    fn op(&self, kind: PathOpKind, segment: &Segment) -> PathOp {
        PathOp {
            kind,
            point: Point::new(segment.x, segment.y),
            width: self.pen.width,
            color: self.pen.color,
            cap: self.pen.cap,
        }
    }

    fn apply_brush(&mut self, family: BrushFamily, base: Rgb8, prev: &Segment, segment: &Segment) {
        match family {
            BrushFamily::Pencil => {
                self.pen.color = scale_color(base, segment.pressure);
                self.pen.width = segment.width * PENCIL_WIDTH;
            }
            BrushFamily::MechanicalPencil => {
                self.pen.color = scale_color(base, segment.pressure);
                self.pen.width = segment.width * MECHANICAL_PENCIL_WIDTH;
            }
            BrushFamily::Brush => {
                let modwidth = segment.width * BRUSH_WIDTH;
                let width = modwidth + (segment.pressure - 1.0) * modwidth * BRUSH_PRESSURE_RANGE;
                let pressure = segment.pressure * (1.0 - segment.speed / BRUSH_SPEED_FADE);
                let distance = Point::new(prev.x, prev.y).distance(&Point::new(segment.x, segment.y));

                self.pen.color = scale_color(base, pressure);
                self.pen.width = width;
                self.pen.cap = if distance < width {
                    CapStyle::Round
                } else {
                    CapStyle::Flat
                };
            }
            BrushFamily::Marker => {
                self.pen.width = segment.width;
            }
            BrushFamily::Ballpoint => {
                self.pen.width = segment.width + (segment.pressure - 1.0) * (segment.width / 2.0);
            }
            BrushFamily::Default => {
                self.pen.width = segment.width;
                self.pen.color = scale_color(base, 1.0);
            }
            BrushFamily::Highlighter | BrushFamily::Eraser => {}
        }
    }

    fn highlighter(&self, segments: &[Segment]) -> Highlight {
        let mut squares = segments
            .iter()
            .map(|s| Rect::square_around(Point::new(s.x, s.y), s.width));
        let mut bounds = squares.next().unwrap_or_default();
        for square in squares {
            bounds = bounds.union(&square);
        }
        self.style.highlight(String::new(), bounds, bounds.to_quad_points())
    }
}

/// Fade `base` toward white as pressure drops. Pressure is clamped to
/// [0, 1]; full pressure returns `base` unchanged.
pub fn scale_color(base: Rgb8, pressure: f32) -> Rgb8 {
    let scaler = (pressure.clamp(0.0, 1.0) * 100.0) as u32;
    let channel = |c: u8| {
        let faded = 255 - (255 - u32::from(c)) * scaler / 100;
        u8::try_from(faded).unwrap_or(u8::MAX)
    };
    Rgb8::new(channel(base.r), channel(base.g), channel(base.b))
}

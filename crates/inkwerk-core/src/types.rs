// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Decoded stroke model shared by the archive reader and the renderer.

use serde::{Deserialize, Serialize};

/// Pen tool used for a stroke, as recorded by the device.
///
/// Firmware 3.x and 5.x use different numeric codes for the same tools, so
/// most tools appear twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BrushType {
    Brush,
    TiltPencil,
    BallPoint,
    Marker,
    Fineliner,
    Highlighter,
    Eraser,
    SharpPencil,
    EraseArea,
    EraseAll,
    SelectionBrush,
    SelectionBrushAlt,
    PaintBrushV5,
    MechanicalPencilV5,
    PencilV5,
    BallPointV5,
    MarkerV5,
    FinelinerV5,
    HighlighterV5,
    CalligraphyV5,
    /// A tool code this build does not know about.
    Unknown(u32),
}

/// Rendering policy shared by a group of brush types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BrushFamily {
    Pencil,
    MechanicalPencil,
    Ballpoint,
    Marker,
    Brush,
    Highlighter,
    Eraser,
    /// Base width, full-intensity colour.
    Default,
}

impl BrushType {
    /// Map a raw tool code from the stroke file.
    pub fn from_code(code: u32) -> Self {
        match code {
            0 => Self::Brush,
            1 => Self::TiltPencil,
            2 => Self::BallPoint,
            3 => Self::Marker,
            4 => Self::Fineliner,
            5 => Self::Highlighter,
            6 => Self::Eraser,
            7 => Self::SharpPencil,
            8 => Self::EraseArea,
            9 => Self::EraseAll,
            10 => Self::SelectionBrush,
            11 => Self::SelectionBrushAlt,
            12 => Self::PaintBrushV5,
            13 => Self::MechanicalPencilV5,
            14 => Self::PencilV5,
            15 => Self::BallPointV5,
            16 => Self::MarkerV5,
            17 => Self::FinelinerV5,
            18 => Self::HighlighterV5,
            21 => Self::CalligraphyV5,
            other => Self::Unknown(other),
        }
    }

    /// Raw tool code as written in the stroke file.
    pub fn code(&self) -> u32 {
        match self {
            Self::Brush => 0,
            Self::TiltPencil => 1,
            Self::BallPoint => 2,
            Self::Marker => 3,
            Self::Fineliner => 4,
            Self::Highlighter => 5,
            Self::Eraser => 6,
            Self::SharpPencil => 7,
            Self::EraseArea => 8,
            Self::EraseAll => 9,
            Self::SelectionBrush => 10,
            Self::SelectionBrushAlt => 11,
            Self::PaintBrushV5 => 12,
            Self::MechanicalPencilV5 => 13,
            Self::PencilV5 => 14,
            Self::BallPointV5 => 15,
            Self::MarkerV5 => 16,
            Self::FinelinerV5 => 17,
            Self::HighlighterV5 => 18,
            Self::CalligraphyV5 => 21,
            Self::Unknown(code) => *code,
        }
    }

    /// Which rendering policy applies to this tool.
    pub fn family(&self) -> BrushFamily {
        match self {
            Self::TiltPencil | Self::PencilV5 => BrushFamily::Pencil,
            Self::SharpPencil | Self::MechanicalPencilV5 => BrushFamily::MechanicalPencil,
            Self::BallPoint | Self::BallPointV5 => BrushFamily::Ballpoint,
            Self::Marker | Self::MarkerV5 => BrushFamily::Marker,
            Self::Brush | Self::PaintBrushV5 => BrushFamily::Brush,
            Self::Highlighter | Self::HighlighterV5 => BrushFamily::Highlighter,
            Self::Eraser | Self::EraseArea => BrushFamily::Eraser,
            Self::Fineliner
            | Self::FinelinerV5
            | Self::CalligraphyV5
            | Self::EraseAll
            | Self::SelectionBrush
            | Self::SelectionBrushAlt
            | Self::Unknown(_) => BrushFamily::Default,
        }
    }
}

/// An 8-bit RGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb8 {
    pub const BLACK: Rgb8 = Rgb8::new(0, 0, 0);
    pub const GREY: Rgb8 = Rgb8::new(127, 127, 127);
    pub const WHITE: Rgb8 = Rgb8::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Channels as floats in [0, 1].
    pub fn to_unit(&self) -> [f32; 3] {
        [
            f32::from(self.r) / 255.0,
            f32::from(self.g) / 255.0,
            f32::from(self.b) / 255.0,
        ]
    }
}

/// Ink colour selected on the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BrushColor {
    Black,
    Grey,
    White,
    /// Any colour code outside the three-tone palette.
    Other(u32),
}

impl BrushColor {
    pub fn from_code(code: u32) -> Self {
        match code {
            0 => Self::Black,
            1 => Self::Grey,
            2 => Self::White,
            other => Self::Other(other),
        }
    }

    pub fn code(&self) -> u32 {
        match self {
            Self::Black => 0,
            Self::Grey => 1,
            Self::White => 2,
            Self::Other(code) => *code,
        }
    }

    /// Palette lookup. Colours outside the palette have no defined ink.
    pub fn rgb(&self) -> Option<Rgb8> {
        match self {
            Self::Black => Some(Rgb8::BLACK),
            Self::Grey => Some(Rgb8::GREY),
            Self::White => Some(Rgb8::WHITE),
            Self::Other(_) => None,
        }
    }
}

/// One sampled point of a stroke.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Segment {
    pub x: f32,
    pub y: f32,
    /// Tilt-derived speed scalar.
    pub speed: f32,
    pub direction: f32,
    /// Brush-defined base width at this sample, in device pixels.
    pub width: f32,
    /// Pen pressure in [0, 1].
    pub pressure: f32,
}

/// One continuous pen gesture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub brush_type: BrushType,
    pub brush_color: BrushColor,
    pub brush_size: f32,
    pub segments: Vec<Segment>,
}

impl Stroke {
    pub fn new(brush_type: BrushType, brush_color: BrushColor, segments: Vec<Segment>) -> Self {
        Self {
            brush_type,
            brush_color,
            brush_size: 2.0,
            segments,
        }
    }
}

/// Ordered strokes drawn on one layer of a page.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Layer {
    pub strokes: Vec<Stroke>,
}

/// Fully decoded content of one page stroke file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StrokeData {
    /// Format version recorded in the file header.
    pub version: u32,
    pub layers: Vec<Layer>,
}

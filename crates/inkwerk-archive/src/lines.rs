// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Decoder for the device's binary `.lines` stroke files (versions 3 and 5).
//
// Layout, all integers and floats little-endian:
//   43-byte ASCII header, space padded
//   u32 layer count
//     u32 stroke count
//       u32 brush type, u32 colour, u32 padding, f32 brush size,
//       [v5: u32 unknown], u32 segment count
//         f32 x, y, speed, direction, width, pressure

use inkwerk_core::error::{InkwerkError, Result};
use inkwerk_core::{BrushColor, BrushType, Layer, Segment, Stroke, StrokeData};
use tracing::debug;

use crate::reader::StrokeDecoder;

const HEADER_PREFIX: &str = "reMarkable .lines file, version=";
const HEADER_LEN: usize = 43;
const SEGMENT_LEN: usize = 6 * 4;

/// Format versions understood by [`LinesDecoder`].
pub const SUPPORTED_VERSIONS: [u32; 2] = [3, 5];

/// Decodes `.lines` byte streams into [`StrokeData`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LinesDecoder;

impl StrokeDecoder for LinesDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<StrokeData> {
        let version = parse_header(bytes)?;
        let mut cursor = ByteCursor::new(&bytes[HEADER_LEN..]);

        // Smallest possible stroke record, used to reject absurd counts
        // before allocating.
        let stroke_len = if version >= 5 { 24 } else { 20 };

        let layer_count = cursor.read_count(4)?;
        let mut layers = Vec::with_capacity(layer_count);
        for _ in 0..layer_count {
            let stroke_count = cursor.read_count(stroke_len)?;
            let mut strokes = Vec::with_capacity(stroke_count);
            for _ in 0..stroke_count {
                strokes.push(read_stroke(&mut cursor, version)?);
            }
            layers.push(Layer { strokes });
        }

        if !cursor.is_empty() {
            return Err(InkwerkError::DecodeFailure(format!(
                "{} trailing bytes after last layer",
                cursor.remaining()
            )));
        }

        debug!(version, layers = layers.len(), "stroke data decoded");
        Ok(StrokeData { version, layers })
    }
}

fn parse_header(bytes: &[u8]) -> Result<u32> {
    let header = bytes.get(..HEADER_LEN).ok_or_else(|| {
        InkwerkError::DecodeFailure(format!("stroke file shorter than {HEADER_LEN}-byte header"))
    })?;
    let text = std::str::from_utf8(header)
        .map_err(|_| InkwerkError::DecodeFailure("stroke file header is not ASCII".into()))?;
    let version = text
        .strip_prefix(HEADER_PREFIX)
        .map(str::trim_end)
        .and_then(|v| v.parse::<u32>().ok())
        .ok_or_else(|| {
            InkwerkError::DecodeFailure(format!("unrecognised stroke file header {text:?}"))
        })?;

    if !SUPPORTED_VERSIONS.contains(&version) {
        return Err(InkwerkError::DecodeFailure(format!(
            "stroke file version {version} is not supported"
        )));
    }
    Ok(version)
}

fn read_stroke(cursor: &mut ByteCursor<'_>, version: u32) -> Result<Stroke> {
    let brush_type = BrushType::from_code(cursor.read_u32()?);
    let brush_color = BrushColor::from_code(cursor.read_u32()?);
    let _padding = cursor.read_u32()?;
    let brush_size = cursor.read_f32()?;
    if version >= 5 {
        let _unknown = cursor.read_u32()?;
    }

    let segment_count = cursor.read_count(SEGMENT_LEN)?;
    let mut segments = Vec::with_capacity(segment_count);
    for _ in 0..segment_count {
        segments.push(Segment {
            x: cursor.read_f32()?,
            y: cursor.read_f32()?,
            speed: cursor.read_f32()?,
            direction: cursor.read_f32()?,
            width: cursor.read_f32()?,
            pressure: cursor.read_f32()?,
        });
    }

    Ok(Stroke {
        brush_type,
        brush_color,
        brush_size,
        segments,
    })
}

/// Serialise stroke data as a version 5 `.lines` file.
pub fn encode(data: &StrokeData) -> Vec<u8> {
    let mut out = format!("{HEADER_PREFIX}5").into_bytes();
    out.resize(HEADER_LEN, b' ');

    push_u32(&mut out, data.layers.len());
    for layer in &data.layers {
        push_u32(&mut out, layer.strokes.len());
        for stroke in &layer.strokes {
            out.extend_from_slice(&stroke.brush_type.code().to_le_bytes());
            out.extend_from_slice(&stroke.brush_color.code().to_le_bytes());
            out.extend_from_slice(&0u32.to_le_bytes());
            out.extend_from_slice(&stroke.brush_size.to_le_bytes());
            out.extend_from_slice(&0u32.to_le_bytes());
            push_u32(&mut out, stroke.segments.len());
            for s in &stroke.segments {
                for value in [s.x, s.y, s.speed, s.direction, s.width, s.pressure] {
                    out.extend_from_slice(&value.to_le_bytes());
                }
            }
        }
    }
    out
}

fn push_u32(out: &mut Vec<u8>, count: usize) {
    let count = u32::try_from(count).unwrap_or(u32::MAX);
    out.extend_from_slice(&count.to_le_bytes());
}

/// Bounds-checked little-endian reader over a byte slice.
struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn take4(&mut self) -> Result<[u8; 4]> {
        let bytes = self
            .data
            .get(self.pos..self.pos + 4)
            .ok_or_else(|| {
                InkwerkError::DecodeFailure(format!("stroke data truncated at byte {}", self.pos))
            })?;
        self.pos += 4;
        let mut buf = [0u8; 4];
        buf.copy_from_slice(bytes);
        Ok(buf)
    }

    fn read_u32(&mut self) -> Result<u32> {
        self.take4().map(u32::from_le_bytes)
    }

    fn read_f32(&mut self) -> Result<f32> {
        self.take4().map(f32::from_le_bytes)
    }

    /// Read an element count and check that `count` records of at least
    /// `min_record_len` bytes can still fit in the input.
    fn read_count(&mut self, min_record_len: usize) -> Result<usize> {
        let count = self.read_u32()? as usize;
        if count.saturating_mul(min_record_len) > self.remaining() {
            return Err(InkwerkError::DecodeFailure(format!(
                "count {count} exceeds remaining {} bytes",
                self.remaining()
            )));
        }
        Ok(count)
    }
}

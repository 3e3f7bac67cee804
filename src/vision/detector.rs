//! Flash region detection
//!
//! Scans a screenshot once in row-major order, flood-fills every unvisited
//! flash pixel into a blob, drops blobs that are too thin to be a hotspot and
//! renders an annotated copy with each surviving rectangle outlined and
//! labelled with its corner coordinates.

use super::annotate::{draw_regions, AnnotationStyle};
use super::classifier::FlashPolicy;
use super::flood_fill::{flood_fill, VisitedMask};
use crate::error::{JourneyError, Result};
use image::{DynamicImage, ImageFormat, RgbaImage};
use serde::{Deserialize, Serialize};
use std::io::Cursor;

/// Inclusive pixel bounds of a detected region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rectangle {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

impl Rectangle {
    pub fn new(min_x: u32, min_y: u32, max_x: u32, max_y: u32) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    pub fn width(&self) -> u32 {
        self.max_x.saturating_sub(self.min_x)
    }

    pub fn height(&self) -> u32 {
        self.max_y.saturating_sub(self.min_y)
    }

    /// `(max_x - min_x) * (max_y - min_y)`
    pub fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    pub fn is_well_formed(&self) -> bool {
        self.max_x >= self.min_x && self.max_y >= self.min_y
    }

    /// Point halfway between the corners, in the rectangle's coordinate space
    pub fn center(&self) -> (f64, f64) {
        (
            self.min_x as f64 + self.width() as f64 / 2.0,
            self.min_y as f64 + self.height() as f64 / 2.0,
        )
    }

    pub fn label(&self) -> String {
        format!(
            "({}, {} to {}, {})",
            self.min_x, self.min_y, self.max_x, self.max_y
        )
    }
}

/// A rectangle together with its area, as handed to the element oracle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Region {
    #[serde(flatten)]
    pub bounds: Rectangle,
    pub area: u64,
}

impl From<Rectangle> for Region {
    fn from(bounds: Rectangle) -> Self {
        Self {
            area: bounds.area(),
            bounds,
        }
    }
}

/// Options for one detector instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorOptions {
    /// Which pixels count as flash-coloured
    pub policy: FlashPolicy,

    /// Regions must be strictly wider and taller than this (in `max - min` terms)
    pub min_side: u32,

    /// Negate RGB before classifying (alpha untouched).
    ///
    /// Prototype players flash hotspots in a cool blue; negated, they land in
    /// the warm band the policy looks for.
    pub invert: bool,

    /// In transition detection, ignore pixels that were already flash-coloured before
    pub compare_with_before: bool,

    pub annotation: AnnotationStyle,
}

impl Default for DetectorOptions {
    fn default() -> Self {
        Self {
            policy: FlashPolicy::default(),
            min_side: 10,
            invert: false,
            compare_with_before: true,
            annotation: AnnotationStyle::default(),
        }
    }
}

/// Result of one detection pass
#[derive(Debug, Clone)]
pub struct Detection {
    pub regions: Vec<Region>,
    /// Annotated copy of the (possibly inverted) source image
    pub annotated: RgbaImage,
}

impl Detection {
    pub fn rectangles(&self) -> Vec<Rectangle> {
        self.regions.iter().map(|r| r.bounds).collect()
    }

    pub fn width(&self) -> u32 {
        self.annotated.width()
    }

    pub fn height(&self) -> u32 {
        self.annotated.height()
    }

    /// Encode the annotated image as PNG
    pub fn annotated_png(&self) -> Result<Vec<u8>> {
        encode_png(&self.annotated)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RegionDetector {
    options: DetectorOptions,
}

impl RegionDetector {
    pub fn new(options: DetectorOptions) -> Self {
        Self { options }
    }

    pub fn with_policy(policy: FlashPolicy) -> Self {
        Self::new(DetectorOptions {
            policy,
            ..Default::default()
        })
    }

    pub fn options(&self) -> &DetectorOptions {
        &self.options
    }

    /// Detect flash regions in a flat row-major RGBA buffer.
    ///
    /// The input is never modified; the annotated image is a new buffer.
    pub fn detect(&self, rgba: &[u8], width: u32, height: u32) -> Result<Detection> {
        check_dimensions(rgba, width, height)?;
        let base = self.prepare(rgba);
        let rectangles = self.scan(&base, width, height)?;
        self.finish(base, width, height, rectangles)
    }

    /// Detect regions that are flash-coloured in `after` but were not in `before`.
    ///
    /// With `compare_with_before` disabled this is `detect(after, ..)`.
    pub fn detect_transition(
        &self,
        before: &[u8],
        after: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Detection> {
        check_dimensions(after, width, height)?;
        if !self.options.compare_with_before {
            return self.detect(after, width, height);
        }
        check_dimensions(before, width, height)?;

        let base = self.prepare(after);
        let before = self.prepare(before);

        // alpha 0 never classifies as flash, whatever the policy
        let mut masked = base.clone();
        for (idx, px) in masked.chunks_exact_mut(4).enumerate() {
            if self.options.policy.is_flash_at(&before, idx) {
                px[3] = 0;
            }
        }

        let rectangles = self.scan(&masked, width, height)?;
        self.finish(base, width, height, rectangles)
    }

    /// Decode a PNG/JPEG screenshot and detect regions in it
    pub fn detect_png(&self, bytes: &[u8]) -> Result<Detection> {
        let image = decode_rgba(bytes)?;
        let (width, height) = image.dimensions();
        self.detect(image.as_raw(), width, height)
    }

    /// Decode a before/after screenshot pair and run transition detection
    pub fn detect_transition_png(&self, before: &[u8], after: &[u8]) -> Result<Detection> {
        let before = decode_rgba(before)?;
        let after = decode_rgba(after)?;
        if before.dimensions() != after.dimensions() {
            log::warn!(
                "Screenshot size changed between frames ({:?} -> {:?}), ignoring the before frame",
                before.dimensions(),
                after.dimensions()
            );
            let (width, height) = after.dimensions();
            return self.detect(after.as_raw(), width, height);
        }
        let (width, height) = after.dimensions();
        self.detect_transition(before.as_raw(), after.as_raw(), width, height)
    }

    fn prepare(&self, rgba: &[u8]) -> Vec<u8> {
        let mut buf = rgba.to_vec();
        if self.options.invert {
            for px in buf.chunks_exact_mut(4) {
                px[0] = 255 - px[0];
                px[1] = 255 - px[1];
                px[2] = 255 - px[2];
            }
        }
        buf
    }

    fn scan(&self, rgba: &[u8], width: u32, height: u32) -> Result<Vec<Rectangle>> {
        let policy = &self.options.policy;
        let mut visited = VisitedMask::new(width, height);
        let mut rectangles = Vec::new();

        for y in 0..height {
            for x in 0..width {
                if visited.is_visited(x, y) {
                    continue;
                }
                let idx = y as usize * width as usize + x as usize;
                if !policy.is_flash_at(rgba, idx) {
                    continue;
                }

                let blob = flood_fill(x, y, width, height, rgba, &mut visited, policy)?;
                let bounds = blob.bounds;
                if bounds.width() > self.options.min_side && bounds.height() > self.options.min_side
                {
                    rectangles.push(bounds);
                } else {
                    log::trace!(
                        "Dropping {}x{} fragment at ({}, {})",
                        bounds.width(),
                        bounds.height(),
                        bounds.min_x,
                        bounds.min_y
                    );
                }
            }
        }

        Ok(rectangles)
    }

    fn finish(
        &self,
        base: Vec<u8>,
        width: u32,
        height: u32,
        rectangles: Vec<Rectangle>,
    ) -> Result<Detection> {
        let mut annotated = RgbaImage::from_raw(width, height, base).ok_or_else(|| {
            JourneyError::InvalidInput("Image buffer does not match its dimensions".to_string())
        })?;
        draw_regions(&mut annotated, &rectangles, &self.options.annotation);

        log::debug!(
            "Detected {} flash region(s) in {}x{} image",
            rectangles.len(),
            width,
            height
        );

        Ok(Detection {
            regions: rectangles.into_iter().map(Region::from).collect(),
            annotated,
        })
    }
}

fn check_dimensions(rgba: &[u8], width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(JourneyError::InvalidInput(format!(
            "Failed to get image metadata: {}x{} image",
            width, height
        )));
    }
    let expected = width as usize * height as usize * 4;
    if rgba.len() != expected {
        return Err(JourneyError::InvalidInput(format!(
            "RGBA buffer is {} bytes, expected {} for {}x{}",
            rgba.len(),
            expected,
            width,
            height
        )));
    }
    Ok(())
}

/// Decode any supported screenshot into RGBA8
pub fn decode_rgba(bytes: &[u8]) -> Result<RgbaImage> {
    let image = image::load_from_memory(bytes).map_err(|e| {
        JourneyError::InvalidInput(format!("Failed to get image metadata: {}", e))
    })?;
    let rgba = image.to_rgba8();
    if rgba.width() == 0 || rgba.height() == 0 {
        return Err(JourneyError::InvalidInput(
            "Failed to get image metadata: empty image".to_string(),
        ));
    }
    Ok(rgba)
}

/// Encode an RGBA image as PNG bytes
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    DynamicImage::ImageRgba8(image.clone()).write_to(&mut Cursor::new(&mut out), ImageFormat::Png)?;
    Ok(out)
}

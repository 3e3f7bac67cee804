//! Connected-component expansion over flash pixels

use super::classifier::FlashPolicy;
use super::detector::Rectangle;
use crate::error::{JourneyError, Result};
use std::collections::VecDeque;

/// One visited flag per pixel, row-major, owned by a single detection pass
#[derive(Debug, Clone)]
pub struct VisitedMask {
    width: u32,
    height: u32,
    cells: Vec<bool>,
}

impl VisitedMask {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cells: vec![false; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    #[inline]
    pub fn is_visited(&self, x: u32, y: u32) -> bool {
        self.cells[self.index(x, y)]
    }

    #[inline]
    pub fn mark(&mut self, x: u32, y: u32) {
        let idx = self.index(x, y);
        self.cells[idx] = true;
    }

    pub fn visited_count(&self) -> usize {
        self.cells.iter().filter(|v| **v).count()
    }
}

/// A maximal 4-connected set of flash pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Blob {
    pub bounds: Rectangle,
    /// Pixels dequeued while expanding; each pixel is dequeued exactly once
    pub pixel_count: usize,
}

/// Expand the blob containing `(start_x, start_y)` breadth-first.
///
/// The seed must be an unvisited flash pixel inside the image. It is marked
/// visited first; neighbours (up, down, left, right) are enqueued only when in
/// bounds, unvisited and flash-coloured, and are marked visited on enqueue so
/// no pixel is processed twice.
///
/// A mask sized for a different image, or a seed outside the image, is
/// `InvalidInput`.
pub fn flood_fill(
    start_x: u32,
    start_y: u32,
    width: u32,
    height: u32,
    rgba: &[u8],
    visited: &mut VisitedMask,
    policy: &FlashPolicy,
) -> Result<Blob> {
    if visited.width() != width || visited.height() != height {
        return Err(JourneyError::InvalidInput(format!(
            "Visited mask is {}x{} but the image is {}x{}",
            visited.width(),
            visited.height(),
            width,
            height
        )));
    }
    if start_x >= width || start_y >= height {
        return Err(JourneyError::InvalidInput(format!(
            "Seed ({}, {}) is outside the {}x{} image",
            start_x, start_y, width, height
        )));
    }

    let mut queue = VecDeque::new();
    queue.push_back((start_x, start_y));
    visited.mark(start_x, start_y);

    let mut min_x = start_x;
    let mut max_x = start_x;
    let mut min_y = start_y;
    let mut max_y = start_y;
    let mut pixel_count = 0usize;

    while let Some((cx, cy)) = queue.pop_front() {
        pixel_count += 1;

        min_x = min_x.min(cx);
        max_x = max_x.max(cx);
        min_y = min_y.min(cy);
        max_y = max_y.max(cy);

        let neighbors = [
            (cx.checked_add(1), Some(cy)),
            (cx.checked_sub(1), Some(cy)),
            (Some(cx), cy.checked_add(1)),
            (Some(cx), cy.checked_sub(1)),
        ];

        for (nx, ny) in neighbors {
            let (Some(nx), Some(ny)) = (nx, ny) else {
                continue;
            };
            if nx >= width || ny >= height || visited.is_visited(nx, ny) {
                continue;
            }
            let idx = ny as usize * width as usize + nx as usize;
            if policy.is_flash_at(rgba, idx) {
                visited.mark(nx, ny);
                queue.push_back((nx, ny));
            }
        }
    }

    Ok(Blob {
        bounds: Rectangle::new(min_x, min_y, max_x, max_y),
        pixel_count,
    })
}

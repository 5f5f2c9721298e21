use std::iter::FusedIterator;

use itertools::Itertools as _;

use crate::geometry::{ScreenBlock, ScreenPoint, ScreenSize};

pub trait ScreenBlockExt {
    fn from_size(size: ScreenSize) -> Self;
    fn is_empty(&self) -> bool;
    fn area(&self) -> usize;
    fn internal_points(&self) -> InternalPoints;
    fn tile_ordering(&self, tile_size: u32) -> Vec<ScreenBlock>;
}

impl ScreenBlockExt for ScreenBlock {
    /// Block starting at the origin.
    fn from_size(size: ScreenSize) -> Self {
        ScreenBlock::new(ScreenPoint::origin(), ScreenPoint::from(size))
    }

    fn is_empty(&self) -> bool {
        self.min.x >= self.max.x || self.min.y >= self.max.y
    }

    fn area(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            self.width() as usize * self.height() as usize
        }
    }

    /// Create an iterator over coordinates (x, y) pairs inside the block,
    /// in C order (x changes first, then y)
    fn internal_points(&self) -> InternalPoints {
        if self.is_empty() {
            InternalPoints::empty()
        } else {
            InternalPoints {
                min_x: self.min.x,
                max: self.max,
                cursor: self.min,
            }
        }
    }

    /// Splits the block into tiles of `tile_size` x `tile_size` pixels and orders them
    /// by distance from the center of the block, so that the interesting part of the image
    /// shows up first. Tiles on the right and bottom edges may be smaller.
    fn tile_ordering(&self, tile_size: u32) -> Vec<ScreenBlock> {
        assert!(tile_size > 0);

        if self.is_empty() {
            return Vec::new();
        }

        let center = self.min.cast::<f32>()
            + (self.max - self.min).cast::<f32>() / 2.0;
        let tile_distance = |tile: &ScreenBlock| {
            let tile_center = tile.min.cast::<f32>() + (tile.max - tile.min).cast::<f32>() / 2.0;
            (tile_center - center).norm_squared()
        };

        let xs = (self.min.x..self.max.x).step_by(tile_size as usize);
        let ys = (self.min.y..self.max.y).step_by(tile_size as usize);

        let mut tiles: Vec<_> = ys
            .cartesian_product(xs)
            .map(|(y, x)| {
                ScreenBlock::new(
                    ScreenPoint::new(x, y),
                    ScreenPoint::new(
                        x.saturating_add(tile_size).min(self.max.x),
                        y.saturating_add(tile_size).min(self.max.y),
                    ),
                )
            })
            .collect();
        // Stable sort, ties stay in row order
        tiles.sort_by(|a, b| tile_distance(a).total_cmp(&tile_distance(b)));
        tiles
    }
}

#[derive(Copy, Clone, Debug)]
pub struct InternalPoints {
    min_x: u32,
    max: ScreenPoint,

    cursor: ScreenPoint,
}

impl InternalPoints {
    // Construct an iterator over internal points that returns no points
    fn empty() -> Self {
        InternalPoints {
            min_x: 1,
            max: ScreenPoint::origin(),

            cursor: ScreenPoint::origin(),
        }
    }
}

impl Iterator for InternalPoints {
    type Item = ScreenPoint;

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.len();
        (len, Some(len))
    }

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor.y >= self.max.y {
            return None;
        }

        let ret = self.cursor;

        debug_assert!(self.cursor.x < self.max.x);
        self.cursor.x += 1;
        if self.cursor.x >= self.max.x {
            self.cursor.x = self.min_x;
            self.cursor.y += 1;
        }

        Some(ret)
    }
}

impl ExactSizeIterator for InternalPoints {
    fn len(&self) -> usize {
        if self.cursor.y >= self.max.y {
            0
        } else {
            let whole_rows = (self.max.y - self.cursor.y - 1) as usize;
            let width = (self.max.x - self.min_x) as usize;
            let current_row = (self.max.x - self.cursor.x) as usize;
            whole_rows * width + current_row
        }
    }
}

impl FusedIterator for InternalPoints {}

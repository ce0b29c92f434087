//! Renderer: scales a canvas down to the LED matrix and diffs frames.
//!
//! The canvas is resampled to the matrix size with a Lanczos filter, then
//! pairs of matrix rows fold into half-block cells. The first frame
//! after construction or `reset` is a full frame; later frames are diffs
//! against the previous one.

use image::imageops::{self, FilterType};

use crate::surface::{Canvas, Rgba};
use crate::types::{Cell, CellChange, Frame, MatrixContract, Rgb};

pub struct Renderer {
    contract: MatrixContract,
    prev: Option<Vec<Vec<Cell>>>,
}

impl Renderer {
    pub fn new(contract: MatrixContract) -> Self {
        Self {
            contract,
            prev: None,
        }
    }

    pub fn contract(&self) -> MatrixContract {
        self.contract
    }

    /// Forget the previous frame so the next one is sent in full.
    pub fn reset(&mut self) {
        self.prev = None;
    }

    pub fn frame(&mut self, canvas: &Canvas) -> Frame {
        let grid = grid(canvas, self.contract);
        let frame = match &self.prev {
            Some(prev) => Frame::Diff {
                changes: diff(prev, &grid),
            },
            None => Frame::Full {
                cells: grid.clone(),
            },
        };
        self.prev = Some(grid);
        frame
    }
}

/// Rasterize a canvas onto the matrix cell grid.
pub fn grid(canvas: &Canvas, contract: MatrixContract) -> Vec<Vec<Cell>> {
    let (w, h) = (contract.width as u32, contract.height as u32);
    if w == 0 || h == 0 {
        return Vec::new();
    }
    let scaled = imageops::resize(canvas.image(), w, h, FilterType::Lanczos3);
    let led = |x: u32, y: u32| {
        scaled
            .get_pixel_checked(x, y)
            .map(|p| Rgb::from(Rgba::from(*p)))
            .unwrap_or_default()
    };

    (0..h)
        .step_by(2)
        .map(|y| {
            (0..w)
                .map(|x| Cell {
                    top: led(x, y),
                    bottom: led(x, y + 1),
                })
                .collect()
        })
        .collect()
}

/// Compute a cell-level diff between two grids.
fn diff(prev: &[Vec<Cell>], next: &[Vec<Cell>]) -> Vec<CellChange> {
    let mut changes = Vec::new();
    for (y, (prev_row, next_row)) in prev.iter().zip(next.iter()).enumerate() {
        for (x, (prev_cell, next_cell)) in prev_row.iter().zip(next_row.iter()).enumerate() {
            if prev_cell != next_cell {
                changes.push(CellChange {
                    x: x as u16,
                    y: y as u16,
                    cell: *next_cell,
                });
            }
        }
    }
    changes
}

//! Shared boundary types for the LED matrix emulator.
//!
//! The renderer turns a `Canvas` into `Frame`s of half-block cells and the
//! player writes those frames to the terminal. Frames serialize to JSON so a
//! single snapshot can be dumped from the command line.

use serde::{Deserialize, Serialize};

use crate::surface::Rgba;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl From<Rgba> for Rgb {
    fn from(c: Rgba) -> Self {
        Rgb {
            r: c.r,
            g: c.g,
            b: c.b,
        }
    }
}

/// The emulated LED matrix, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixContract {
    pub width: u16,
    pub height: u16,
}

impl MatrixContract {
    /// Terminal rows needed: two matrix rows share one cell.
    pub fn rows(&self) -> u16 {
        self.height.div_ceil(2)
    }
}

/// One terminal cell showing two vertically stacked LEDs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub top: Rgb,
    pub bottom: Rgb,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellChange {
    pub x: u16,
    pub y: u16,
    pub cell: Cell,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Frame {
    Full { cells: Vec<Vec<Cell>> },
    Diff { changes: Vec<CellChange> },
}

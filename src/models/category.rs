// src/models/category.rs

//! Image categories: orientation crossed with brightness.
//!
//! Every accepted image lands in exactly one of four buckets (`hd`, `hl`,
//! `vd`, `vl`) which name both its store directory and its counter.

use std::fmt;

/// Aspect bucket of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    /// Width >= height. Squares count as wide.
    Wide,
    /// Height > width.
    Tall,
}

impl Orientation {
    /// Single-letter code used in store paths.
    pub fn code(self) -> char {
        match self {
            Orientation::Wide => 'h',
            Orientation::Tall => 'v',
        }
    }

    /// Classify by pixel dimensions. Ties are wide.
    pub fn from_dimensions(width: u32, height: u32) -> Self {
        if width >= height {
            Orientation::Wide
        } else {
            Orientation::Tall
        }
    }
}

/// Brightness bucket of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Brightness {
    Dark,
    Light,
}

impl Brightness {
    /// Single-letter code used in store paths.
    pub fn code(self) -> char {
        match self {
            Brightness::Dark => 'd',
            Brightness::Light => 'l',
        }
    }

    /// Classify by mean perceptual lightness. Values at the threshold are
    /// light.
    pub fn from_mean(mean: f32, threshold: f32) -> Self {
        if mean < threshold {
            Brightness::Dark
        } else {
            Brightness::Light
        }
    }
}

/// One of the four image buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Category {
    pub orientation: Orientation,
    pub brightness: Brightness,
}

impl Category {
    /// All four buckets, in stable order.
    pub const ALL: [Category; 4] = [
        Category {
            orientation: Orientation::Wide,
            brightness: Brightness::Dark,
        },
        Category {
            orientation: Orientation::Wide,
            brightness: Brightness::Light,
        },
        Category {
            orientation: Orientation::Tall,
            brightness: Brightness::Dark,
        },
        Category {
            orientation: Orientation::Tall,
            brightness: Brightness::Light,
        },
    ];

    pub fn new(orientation: Orientation, brightness: Brightness) -> Self {
        Self {
            orientation,
            brightness,
        }
    }

    /// Two-letter code, e.g. `hd` for wide-dark.
    pub fn code(self) -> String {
        let mut code = String::with_capacity(2);
        code.push(self.orientation.code());
        code.push(self.brightness.code());
        code
    }

    /// Parse a two-letter code back into a category.
    pub fn parse(code: &str) -> Option<Self> {
        Category::ALL.into_iter().find(|c| c.code() == code)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.orientation.code(), self.brightness.code())
    }
}

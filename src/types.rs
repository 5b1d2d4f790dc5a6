//! Core data types for slice conversion

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

/// Integer voxel coordinate in index space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Coord {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Coord {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    pub fn to_array(self) -> [i32; 3] {
        [self.x, self.y, self.z]
    }

    pub fn from_array(a: [i32; 3]) -> Self {
        Self::new(a[0], a[1], a[2])
    }

    /// Component-wise minimum
    pub fn min_components(self, other: Self) -> Self {
        Self::new(self.x.min(other.x), self.y.min(other.y), self.z.min(other.z))
    }

    /// Component-wise maximum
    pub fn max_components(self, other: Self) -> Self {
        Self::new(self.x.max(other.x), self.y.max(other.y), self.z.max(other.z))
    }
}

impl Add for Coord {
    type Output = Coord;

    fn add(self, rhs: Self) -> Self::Output {
        Coord::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Coord {
    type Output = Coord;

    fn sub(self, rhs: Self) -> Self::Output {
        Coord::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}, {}]", self.x, self.y, self.z)
    }
}

/// Axis along which the slice stack was taken
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Orientation {
    X,
    Y,
    Z,
    /// Attribute missing, empty or not one of X/Y/Z
    Unknown,
}

impl Orientation {
    /// Interpret a `slicesOrientation` attribute by its first character
    pub fn from_attribute(value: Option<&str>) -> Self {
        match value.and_then(|v| v.chars().next()) {
            Some('X') | Some('x') => Orientation::X,
            Some('Y') | Some('y') => Orientation::Y,
            Some('Z') | Some('z') => Orientation::Z,
            _ => Orientation::Unknown,
        }
    }

    /// Manifest attribute holding the slice count for this orientation.
    ///
    /// `Unknown` falls back to the Y axis (`gridSizeY`).
    pub fn grid_size_attribute(&self) -> &'static str {
        match self {
            Orientation::X => "gridSizeX",
            Orientation::Y | Orientation::Unknown => "gridSizeY",
            Orientation::Z => "gridSizeZ",
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Grid classification, mirroring the usual volumetric grid classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum GridClass {
    #[default]
    Unknown,
    /// Signed-distance narrow band
    LevelSet,
    /// Bounded scalar density
    FogVolume,
    Staggered,
}

impl fmt::Display for GridClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GridClass::Unknown => "unknown",
            GridClass::LevelSet => "level set",
            GridClass::FogVolume => "fog volume",
            GridClass::Staggered => "staggered",
        };
        f.write_str(s)
    }
}

/// Inclusive index-space bounding box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Coord,
    pub max: Coord,
}

impl BoundingBox {
    pub fn new(min: Coord, max: Coord) -> Self {
        Self { min, max }
    }

    /// Grow the box to include `c`
    pub fn expand(&mut self, c: Coord) {
        self.min = self.min.min_components(c);
        self.max = self.max.max_components(c);
    }

    /// Extent in voxels along each axis
    pub fn dim(&self) -> [u32; 3] {
        [
            (self.max.x - self.min.x + 1) as u32,
            (self.max.y - self.min.y + 1) as u32,
            (self.max.z - self.min.z + 1) as u32,
        ]
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.min, self.max)
    }
}

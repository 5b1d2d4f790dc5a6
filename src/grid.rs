//! Sparse volumetric grid
//!
//! Voxels live in 8³ leaf nodes keyed by leaf origin. Only leaves that
//! hold at least one active voxel are allocated; every other coordinate
//! reads as the grid's background value.

use crate::layout::{leaf_offset, leaf_origin, offset_to_local, NodeMask, LEAF_VOXELS};
use crate::types::{BoundingBox, Coord, GridClass};
use num_traits::Float;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Debug;

/// Scalar types a grid can store
pub trait GridValue: Float + Debug + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Type tag recorded in grid files
    const TYPE_NAME: &'static str;
}

impl GridValue for f32 {
    const TYPE_NAME: &'static str = "float";
}

impl GridValue for f64 {
    const TYPE_NAME: &'static str = "double";
}

/// Uniform linear index-to-world transform
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    voxel_size: f64,
}

impl Transform {
    /// Uniform scale of `voxel_size` world units per voxel
    pub fn linear(voxel_size: f64) -> Self {
        Self { voxel_size }
    }

    pub fn voxel_size(&self) -> f64 {
        self.voxel_size
    }

}

impl Default for Transform {
    fn default() -> Self {
        Self::linear(1.0)
    }
}

/// 8³ block of voxel values with an active mask
#[derive(Debug, Clone, PartialEq)]
pub struct LeafNode<T> {
    origin: Coord,
    mask: NodeMask,
    values: Vec<T>,
}

impl<T: GridValue> LeafNode<T> {
    fn new(origin: Coord, background: T) -> Self {
        Self {
            origin,
            mask: NodeMask::new(),
            values: vec![background; LEAF_VOXELS],
        }
    }

    /// Rebuild a leaf from its active mask and the active values in offset order
    pub fn from_active(origin: Coord, mask: NodeMask, active: &[T], background: T) -> Option<Self> {
        if mask.count_on() != active.len() || leaf_origin(origin) != origin {
            return None;
        }
        let mut leaf = Self::new(origin, background);
        for (offset, &value) in mask.iter_on().zip(active) {
            leaf.values[offset] = value;
        }
        leaf.mask = mask;
        Some(leaf)
    }

    pub fn origin(&self) -> Coord {
        self.origin
    }

    pub fn mask(&self) -> &NodeMask {
        &self.mask
    }

    /// Values of active voxels in offset order
    pub fn active_values(&self) -> Vec<T> {
        self.mask.iter_on().map(|o| self.values[o]).collect()
    }

    pub fn active_count(&self) -> usize {
        self.mask.count_on()
    }

    /// Active voxels as global coordinates
    pub fn iter_active(&self) -> impl Iterator<Item = (Coord, T)> + '_ {
        self.mask
            .iter_on()
            .map(move |o| (self.origin + offset_to_local(o), self.values[o]))
    }
}

/// Sparse grid of scalar values
#[derive(Debug, Clone)]
pub struct SparseGrid<T> {
    leaves: HashMap<Coord, LeafNode<T>>,
    background: T,
    transform: Transform,
    grid_class: GridClass,
    name: String,
}

/// Single-precision grid, the type produced by conversion
pub type FloatGrid = SparseGrid<f32>;

impl<T: GridValue> SparseGrid<T> {
    /// Empty grid with the given background value
    pub fn new(background: T) -> Self {
        Self {
            leaves: HashMap::new(),
            background,
            transform: Transform::default(),
            grid_class: GridClass::Unknown,
            name: String::new(),
        }
    }

    pub fn background(&self) -> T {
        self.background
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn set_transform(&mut self, transform: Transform) {
        self.transform = transform;
    }

    pub fn grid_class(&self) -> GridClass {
        self.grid_class
    }

    pub fn set_grid_class(&mut self, grid_class: GridClass) {
        self.grid_class = grid_class;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Set a voxel value and mark it active
    pub fn set_value(&mut self, c: Coord, value: T) {
        let origin = leaf_origin(c);
        let background = self.background;
        let leaf = self
            .leaves
            .entry(origin)
            .or_insert_with(|| LeafNode::new(origin, background));
        let offset = leaf_offset(c);
        leaf.values[offset] = value;
        leaf.mask.set_on(offset);
    }

    /// Value at `c`, background when inactive
    pub fn get_value(&self, c: Coord) -> T {
        self.leaves
            .get(&leaf_origin(c))
            .filter(|leaf| leaf.mask.is_on(leaf_offset(c)))
            .map_or(self.background, |leaf| leaf.values[leaf_offset(c)])
    }

    pub fn is_active(&self, c: Coord) -> bool {
        self.leaves
            .get(&leaf_origin(c))
            .is_some_and(|leaf| leaf.mask.is_on(leaf_offset(c)))
    }

    pub fn active_voxel_count(&self) -> usize {
        self.leaves.values().map(LeafNode::active_count).sum()
    }

    pub fn leaf_count(&self) -> usize {
        self.leaves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active_voxel_count() == 0
    }

    /// Leaves ordered by origin
    pub fn leaves(&self) -> Vec<&LeafNode<T>> {
        let mut leaves: Vec<_> = self.leaves.values().collect();
        leaves.sort_by_key(|leaf| leaf.origin);
        leaves
    }

    /// Insert a leaf, replacing any leaf at the same origin
    pub fn insert_leaf(&mut self, leaf: LeafNode<T>) {
        self.leaves.insert(leaf.origin, leaf);
    }

    /// Active voxels ordered by coordinate
    pub fn active_voxels(&self) -> Vec<(Coord, T)> {
        let mut voxels: Vec<_> = self
            .leaves
            .values()
            .flat_map(LeafNode::iter_active)
            .collect();
        voxels.sort_by_key(|(c, _)| *c);
        voxels
    }

    /// Tight bounding box of active voxels
    pub fn active_bounding_box(&self) -> Option<BoundingBox> {
        let mut voxels = self.leaves.values().flat_map(LeafNode::iter_active);
        let (first, _) = voxels.next()?;
        let mut bbox = BoundingBox::new(first, first);
        for (c, _) in voxels {
            bbox.expand(c);
        }
        Some(bbox)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get() {
        let mut grid = FloatGrid::new(2.0);
        assert_eq!(grid.get_value(Coord::new(0, 0, 0)), 2.0);

        grid.set_value(Coord::new(-1, -1, -1), 1.0);
        grid.set_value(Coord::new(0, 0, 0), 1.0);
        grid.set_value(Coord::new(0, 0, 0), 0.5);

        assert_eq!(grid.get_value(Coord::new(-1, -1, -1)), 1.0);
        assert_eq!(grid.get_value(Coord::new(0, 0, 0)), 0.5);
        assert_eq!(grid.get_value(Coord::new(1, 0, 0)), 2.0);
        assert!(!grid.is_active(Coord::new(1, 0, 0)));
        assert_eq!(grid.active_voxel_count(), 2);
        // The two voxels straddle the origin, so they sit in different leaves
        assert_eq!(grid.leaf_count(), 2);
    }

    #[test]
    fn test_active_voxels_sorted() {
        let mut grid = FloatGrid::new(0.0);
        grid.set_value(Coord::new(9, 0, 0), 1.0);
        grid.set_value(Coord::new(-20, 3, 1), 1.0);
        grid.set_value(Coord::new(0, 0, 0), 1.0);

        let coords: Vec<_> = grid.active_voxels().into_iter().map(|(c, _)| c).collect();
        assert_eq!(
            coords,
            vec![
                Coord::new(-20, 3, 1),
                Coord::new(0, 0, 0),
                Coord::new(9, 0, 0)
            ]
        );

        let bbox = grid.active_bounding_box().unwrap();
        assert_eq!(bbox.min, Coord::new(-20, 0, 0));
        assert_eq!(bbox.max, Coord::new(9, 3, 1));
    }

    #[test]
    fn test_empty_grid() {
        let grid = FloatGrid::new(0.0);
        assert!(grid.is_empty());
        assert_eq!(grid.active_bounding_box(), None);
        assert!(grid.leaves().is_empty());
    }

    #[test]
    fn test_leaf_from_active() {
        let mut mask = NodeMask::new();
        mask.set_on(3);
        mask.set_on(100);
        let leaf = LeafNode::from_active(Coord::new(8, 0, -8), mask, &[1.0f32, 0.25], 0.0).unwrap();
        assert_eq!(leaf.active_values(), vec![1.0, 0.25]);
        assert!(LeafNode::from_active(Coord::new(8, 0, -8), mask, &[1.0f32], 0.0).is_none());
        assert!(LeafNode::from_active(Coord::new(3, 0, 0), mask, &[1.0f32, 1.0], 0.0).is_none());
    }

    #[test]
    fn test_transform() {
        assert_eq!(Transform::linear(0.5).voxel_size(), 0.5);
        assert_eq!(Transform::default(), Transform::linear(1.0));
    }

    #[test]
    fn test_metadata_setters() {
        let mut grid = FloatGrid::new(0.0);
        grid.set_name("density");
        grid.set_grid_class(GridClass::FogVolume);
        grid.set_transform(Transform::linear(0.25));
        assert_eq!(grid.name(), "density");
        assert_eq!(grid.grid_class(), GridClass::FogVolume);
        assert_eq!(grid.transform().voxel_size(), 0.25);
    }
}

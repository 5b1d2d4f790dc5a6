//! svx2vdb - Simple Voxel to sparse volume conversion
//!
//! Converts an SVX archive (a zip container holding an XML manifest and a
//! stack of grayscale PNG slices) into a sparse fog-volume grid file.
//!
//! # Pipeline
//!
//! - [`manifest`] reads the density slice pattern, orientation and slice count
//! - [`slice`] streams and decodes one PNG slice at a time
//! - [`accumulate`] marks every nonzero sample as an occupied voxel, centered
//!   on the slice dimensions and the stack depth
//! - [`convert`] finalizes the grid (fog volume, 0.5 voxel size) and writes it
//!   with [`file::write_grids`]
//!
//! # Example
//!
//! ```rust,no_run
//! use svx2vdb::{convert, ConvertOptions};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let report = convert("model.svx", "model.vdb", ConvertOptions::default())?;
//! println!("{}", report.summary());
//! # Ok(())
//! # }
//! ```

pub mod accumulate;
pub mod archive;
pub mod compression;
pub mod config;
pub mod convert;
pub mod error;
pub mod file;
pub mod grid;
pub mod layout;
pub mod manifest;
pub mod pattern;
pub mod slice;
pub mod types;
pub mod utils;

// Re-exports
pub use archive::{open_archive, MemoryArchive, SliceArchive, ZipArchiveSource};
pub use compression::{CompressionMethod, Compressor};
pub use config::ConvertOptions;
pub use convert::{convert, ConversionReport, Converter};
pub use error::{Result, SvxError};
pub use file::{read_grids, read_header, write_grids};
pub use grid::{FloatGrid, SparseGrid, Transform};
pub use manifest::{read_manifest, ManifestDescriptor};
pub use pattern::SlicePattern;
pub use slice::{load_slice, SliceBuffer};
pub use types::{BoundingBox, Coord, GridClass, Orientation};

/// Version of the converter
pub const SVX2VDB_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Magic number for grid files
pub const GRID_MAGIC: &[u8; 4] = b"SVXG";

/// Grid file format version
pub const GRID_FILE_VERSION: u32 = 1;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!SVX2VDB_VERSION.is_empty());
    }
}

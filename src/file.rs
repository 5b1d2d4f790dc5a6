//! Grid file serialization
//!
//! A grid file holds one or more sparse grids:
//!
//! ```text
//! magic "SVXG" | version (u32 LE) | header length (u32 LE) | JSON header | payloads
//! ```
//!
//! The JSON header describes every grid and the size and checksum of its
//! payload. Each payload is a compressed bincode list of leaf records
//! (origin, active mask, active values), stored in header order.

use crate::compression::{get_compressor, CompressionLevel, CompressionMethod};
use crate::error::{Result, SvxError};
use crate::grid::{GridValue, LeafNode, SparseGrid, Transform};
use crate::layout::NodeMask;
use crate::types::{BoundingBox, Coord, GridClass};
use crate::utils::{calculate_checksum, verify_checksum};
use crate::{GRID_FILE_VERSION, GRID_MAGIC, SVX2VDB_VERSION};
use chrono::{DateTime, Utc};
use log::debug;
use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use uuid::Uuid;

const PREAMBLE_SIZE: usize = 12;

/// File-level header
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridFileHeader {
    pub uuid: Uuid,
    pub created_at: DateTime<Utc>,
    pub library_version: String,
    pub compression: CompressionMethod,
    pub grids: Vec<GridDescriptor>,
}

/// Per-grid header entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridDescriptor {
    pub name: String,
    pub grid_class: GridClass,
    pub value_type: String,
    pub voxel_size: f64,
    pub background: f64,
    pub leaf_count: usize,
    pub active_voxel_count: usize,
    pub bounding_box: Option<BoundingBox>,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub checksum: u32,
}

impl GridDescriptor {
    pub fn summary(&self) -> String {
        let bbox = self
            .bounding_box
            .map_or_else(|| "empty".to_string(), |b| b.to_string());
        format!(
            "{} ({}, {}): {} active voxels in {} leaves, bbox {}, voxel size {}",
            self.name,
            self.grid_class,
            self.value_type,
            self.active_voxel_count,
            self.leaf_count,
            bbox,
            self.voxel_size
        )
    }
}

#[derive(Serialize, Deserialize)]
struct LeafRecord<T> {
    origin: [i32; 3],
    mask: NodeMask,
    values: Vec<T>,
}

fn encode_grid<T: GridValue>(
    grid: &SparseGrid<T>,
    method: CompressionMethod,
    level: CompressionLevel,
) -> Result<(GridDescriptor, Vec<u8>)> {
    let records: Vec<LeafRecord<T>> = grid
        .leaves()
        .into_iter()
        .map(|leaf| LeafRecord {
            origin: leaf.origin().to_array(),
            mask: *leaf.mask(),
            values: leaf.active_values(),
        })
        .collect();

    let raw = bincode::serialize(&records)?;
    let payload = get_compressor(method).compress(&raw, level)?;

    let descriptor = GridDescriptor {
        name: grid.name().to_string(),
        grid_class: grid.grid_class(),
        value_type: T::TYPE_NAME.to_string(),
        voxel_size: grid.transform().voxel_size(),
        background: grid.background().to_f64().unwrap_or(0.0),
        leaf_count: records.len(),
        active_voxel_count: grid.active_voxel_count(),
        bounding_box: grid.active_bounding_box(),
        compressed_size: payload.len() as u64,
        uncompressed_size: raw.len() as u64,
        checksum: calculate_checksum(&payload),
    };
    Ok((descriptor, payload))
}

/// Serialize grids to `path`.
///
/// A failed write leaves no file behind.
pub fn write_grids<T: GridValue>(
    path: impl AsRef<Path>,
    grids: &[&SparseGrid<T>],
    method: CompressionMethod,
    level: CompressionLevel,
) -> Result<GridFileHeader> {
    let path = path.as_ref();

    let mut descriptors = Vec::with_capacity(grids.len());
    let mut payloads = Vec::with_capacity(grids.len());
    for grid in grids {
        let (descriptor, payload) = encode_grid(grid, method, level)?;
        debug!(
            "Encoded grid {}: {} -> {} bytes",
            descriptor.name, descriptor.uncompressed_size, descriptor.compressed_size
        );
        descriptors.push(descriptor);
        payloads.push(payload);
    }

    let header = GridFileHeader {
        uuid: Uuid::new_v4(),
        created_at: Utc::now(),
        library_version: SVX2VDB_VERSION.to_string(),
        compression: method,
        grids: descriptors,
    };
    let header_json = serde_json::to_vec(&header)?;

    let result = File::create(path).and_then(|file| {
        let mut writer = BufWriter::new(file);
        writer.write_all(GRID_MAGIC)?;
        writer.write_all(&GRID_FILE_VERSION.to_le_bytes())?;
        writer.write_all(&(header_json.len() as u32).to_le_bytes())?;
        writer.write_all(&header_json)?;
        for payload in &payloads {
            writer.write_all(payload)?;
        }
        writer.flush()?;
        writer.get_ref().sync_all()
    });

    if let Err(e) = result {
        let _ = fs::remove_file(path);
        return Err(SvxError::write(path, e));
    }

    Ok(header)
}

fn split_preamble(data: &[u8]) -> Result<(GridFileHeader, &[u8])> {
    if data.len() < PREAMBLE_SIZE || &data[0..4] != GRID_MAGIC {
        return Err(SvxError::InvalidFormat("bad magic".to_string()));
    }

    let version = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);
    if version != GRID_FILE_VERSION {
        return Err(SvxError::InvalidFormat(format!(
            "unsupported file version {}",
            version
        )));
    }

    let header_len = u32::from_le_bytes([data[8], data[9], data[10], data[11]]) as usize;
    let body = &data[PREAMBLE_SIZE..];
    if body.len() < header_len {
        return Err(SvxError::InvalidFormat("truncated header".to_string()));
    }

    let header: GridFileHeader = serde_json::from_slice(&body[..header_len])?;
    Ok((header, &body[header_len..]))
}

/// Read only the header of a grid file
pub fn read_header(path: impl AsRef<Path>) -> Result<GridFileHeader> {
    let data = fs::read(path)?;
    split_preamble(&data).map(|(header, _)| header)
}

/// Read every grid from a grid file
pub fn read_grids<T: GridValue>(path: impl AsRef<Path>) -> Result<Vec<SparseGrid<T>>> {
    let data = fs::read(path)?;
    let (header, mut payloads) = split_preamble(&data)?;
    let compressor = get_compressor(header.compression);

    let mut grids = Vec::with_capacity(header.grids.len());
    for descriptor in &header.grids {
        if descriptor.value_type != T::TYPE_NAME {
            return Err(SvxError::InvalidFormat(format!(
                "grid {} holds {} values, expected {}",
                descriptor.name,
                descriptor.value_type,
                T::TYPE_NAME
            )));
        }

        let size = descriptor.compressed_size as usize;
        if payloads.len() < size {
            return Err(SvxError::InvalidFormat(format!(
                "truncated payload for grid {}",
                descriptor.name
            )));
        }
        let (payload, rest) = payloads.split_at(size);
        payloads = rest;

        if !verify_checksum(payload, descriptor.checksum) {
            return Err(SvxError::InvalidFormat(format!(
                "checksum mismatch for grid {}",
                descriptor.name
            )));
        }

        let raw = compressor.decompress(payload, Some(descriptor.uncompressed_size as usize))?;
        let records: Vec<LeafRecord<T>> = bincode::deserialize(&raw)?;

        let background: T = num_traits::cast(descriptor.background).ok_or_else(|| {
            SvxError::InvalidFormat(format!("bad background for grid {}", descriptor.name))
        })?;
        let mut grid = SparseGrid::new(background);
        grid.set_name(descriptor.name.clone());
        grid.set_grid_class(descriptor.grid_class);
        grid.set_transform(Transform::linear(descriptor.voxel_size));

        for record in records {
            let origin = Coord::from_array(record.origin);
            let leaf = LeafNode::from_active(origin, record.mask, &record.values, background)
                .ok_or_else(|| {
                    SvxError::InvalidFormat(format!("malformed leaf at {}", origin))
                })?;
            grid.insert_leaf(leaf);
        }
        grids.push(grid);
    }

    Ok(grids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::FloatGrid;
    use tempfile::TempDir;

    fn sample_grid() -> FloatGrid {
        let mut grid = FloatGrid::new(2.0);
        grid.set_value(Coord::new(-1, -1, -1), 1.0);
        grid.set_value(Coord::new(0, 0, 0), 1.0);
        grid.set_value(Coord::new(40, -17, 3), 0.5);
        grid.set_name("LevelSetSVX");
        grid.set_grid_class(GridClass::FogVolume);
        grid.set_transform(Transform::linear(0.5));
        grid
    }

    #[test]
    fn test_write_and_read_back() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("out.vdb");
        let grid = sample_grid();

        for method in [
            CompressionMethod::None,
            CompressionMethod::Deflate,
            CompressionMethod::Zstd,
        ] {
            let header =
                write_grids(&path, &[&grid], method, CompressionLevel::default()).unwrap();
            assert_eq!(header.grids.len(), 1);
            assert_eq!(header.grids[0].active_voxel_count, 3);

            let grids: Vec<FloatGrid> = read_grids(&path).unwrap();
            assert_eq!(grids.len(), 1);
            let restored = &grids[0];
            assert_eq!(restored.name(), "LevelSetSVX");
            assert_eq!(restored.grid_class(), GridClass::FogVolume);
            assert_eq!(restored.transform().voxel_size(), 0.5);
            assert_eq!(restored.background(), 2.0);
            assert_eq!(restored.active_voxels(), grid.active_voxels());
        }
    }

    #[test]
    fn test_header_only() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("out.vdb");
        write_grids(
            &path,
            &[&sample_grid()],
            CompressionMethod::Zstd,
            CompressionLevel::default(),
        )
        .unwrap();

        let header = read_header(&path).unwrap();
        assert_eq!(header.compression, CompressionMethod::Zstd);
        assert_eq!(header.library_version, SVX2VDB_VERSION);
        let descriptor = &header.grids[0];
        assert_eq!(descriptor.value_type, "float");
        assert_eq!(
            descriptor.bounding_box,
            Some(BoundingBox::new(Coord::new(-1, -17, -1), Coord::new(40, 0, 3)))
        );
        assert!(descriptor.summary().contains("3 active voxels"));
    }

    #[test]
    fn test_rejects_corruption() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("out.vdb");
        write_grids(
            &path,
            &[&sample_grid()],
            CompressionMethod::None,
            CompressionLevel::default(),
        )
        .unwrap();

        let mut data = fs::read(&path).unwrap();
        let last = data.len() - 1;
        data[last] ^= 0xff;
        fs::write(&path, &data).unwrap();
        assert!(matches!(
            read_grids::<f32>(&path),
            Err(SvxError::InvalidFormat(_))
        ));

        fs::write(&path, b"VDB\0 something else").unwrap();
        assert!(matches!(
            read_grids::<f32>(&path),
            Err(SvxError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_value_type_mismatch() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("out.vdb");
        write_grids(
            &path,
            &[&sample_grid()],
            CompressionMethod::Zstd,
            CompressionLevel::default(),
        )
        .unwrap();
        assert!(matches!(
            read_grids::<f64>(&path),
            Err(SvxError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_write_failure_is_write_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("no-such-dir").join("out.vdb");
        let result = write_grids(
            &path,
            &[&sample_grid()],
            CompressionMethod::Zstd,
            CompressionLevel::default(),
        );
        assert!(matches!(result, Err(SvxError::Write { .. })));
        assert!(!path.exists());
    }
}

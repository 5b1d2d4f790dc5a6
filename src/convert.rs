//! Conversion driver - sequences manifest, slices, accumulation and output

use crate::accumulate::{accumulate, depth_index};
use crate::archive::{open_archive, SliceArchive};
use crate::config::ConvertOptions;
use crate::error::Result;
use crate::file::write_grids;
use crate::grid::{FloatGrid, Transform};
use crate::manifest::read_manifest;
use crate::pattern::SlicePattern;
use crate::slice::load_slice;
use crate::types::{BoundingBox, GridClass};
use crate::utils::format_bytes;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};
use std::path::Path;

/// Outcome of one conversion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionReport {
    /// Slices declared by the manifest
    pub slice_count: usize,
    /// Slices read and accumulated
    pub slices_read: usize,
    pub active_voxels: usize,
    pub bounding_box: Option<BoundingBox>,
    pub output_written: bool,
}

impl ConversionReport {
    pub fn summary(&self) -> String {
        if !self.output_written {
            return format!(
                "No output written ({} slices declared)",
                self.slice_count
            );
        }
        let bbox = self
            .bounding_box
            .map_or_else(|| "empty".to_string(), |b| b.to_string());
        format!(
            "{} of {} slices, {} active voxels, bbox {}",
            self.slices_read, self.slice_count, self.active_voxels, bbox
        )
    }
}

/// SVX to grid converter
#[derive(Debug, Clone, Default)]
pub struct Converter {
    options: ConvertOptions,
}

impl Converter {
    pub fn new(options: ConvertOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self { options })
    }

    pub fn options(&self) -> &ConvertOptions {
        &self.options
    }

    /// Convert the SVX file at `input` into a grid file at `output`
    pub fn convert_file(
        &self,
        input: impl AsRef<Path>,
        output: impl AsRef<Path>,
    ) -> Result<ConversionReport> {
        let input = input.as_ref();
        info!("Reading SVX file: {}", input.display());
        let archive = open_archive(input)?;
        self.convert_archive(archive, output)
    }

    /// Convert an opened archive. The archive is released when this returns.
    pub fn convert_archive<A: SliceArchive>(
        &self,
        mut archive: A,
        output: impl AsRef<Path>,
    ) -> Result<ConversionReport> {
        let output = output.as_ref();

        info!("Reading manifest");
        let manifest = read_manifest(&mut archive)?;

        let mut report = ConversionReport {
            slice_count: manifest.slice_count,
            slices_read: 0,
            active_voxels: 0,
            bounding_box: None,
            output_written: false,
        };

        let pattern = match manifest.slice_name_pattern.as_deref() {
            Some(p) if manifest.has_slices() => Some(SlicePattern::parse(p)?),
            _ => None,
        };

        let mut grid = match pattern {
            Some(pattern) => {
                let mut grid = FloatGrid::new(self.options.background);
                info!("Reading voxel slices");
                let depth = manifest.slice_count;
                let progress = self.progress_bar(depth as u64);

                for z in 0..depth {
                    let name = pattern.format(z);
                    let slice = load_slice(&mut archive, &name)?;
                    let set = accumulate(&mut grid, &slice, depth_index(z, depth));
                    debug!("Slice {} ({}): {} voxels set", z, name, set);
                    report.slices_read += 1;
                    progress.inc(1);
                }
                progress.finish_and_clear();
                info!("Read {} of {} slices", report.slices_read, depth);
                grid
            }
            None if self.options.write_empty_grid => {
                info!("Manifest declares no density slices; writing empty grid");
                FloatGrid::new(self.options.background)
            }
            None => {
                info!("Manifest declares no density slices; nothing to convert");
                return Ok(report);
            }
        };

        // The archive is no longer needed once every slice is in the grid
        drop(archive);

        self.finalize(&mut grid, output)?;
        report.active_voxels = grid.active_voxel_count();
        report.bounding_box = grid.active_bounding_box();
        report.output_written = true;
        Ok(report)
    }

    /// Tag the grid as a fog volume, apply transform and name, and write it
    pub fn finalize(&self, grid: &mut FloatGrid, output: &Path) -> Result<()> {
        grid.set_transform(Transform::linear(self.options.voxel_size));
        grid.set_grid_class(GridClass::FogVolume);
        grid.set_name(self.options.grid_name.clone());

        info!("Saving VDB file: {}", output.display());
        let header = write_grids(
            output,
            &[&*grid],
            self.options.compression,
            self.options.level(),
        )?;
        for descriptor in &header.grids {
            debug!("Wrote {}", descriptor.summary());
        }
        if let Ok(metadata) = std::fs::metadata(output) {
            info!("Wrote {} ({})", output.display(), format_bytes(metadata.len()));
        }
        Ok(())
    }

    fn progress_bar(&self, len: u64) -> ProgressBar {
        if !self.options.show_progress {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new(len);
        if let Ok(style) = ProgressStyle::with_template("\tRead slice {pos} of {len} {wide_bar}") {
            bar.set_style(style);
        }
        bar
    }
}

/// Convert `input` to `output` with the given options
pub fn convert(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    options: ConvertOptions,
) -> Result<ConversionReport> {
    Converter::new(options)?.convert_file(input, output)
}

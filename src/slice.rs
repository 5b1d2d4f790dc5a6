//! Slice loading and decoding

use crate::archive::SliceArchive;
use crate::error::{Result, SvxError};
use image::codecs::png::PngDecoder;
use image::DynamicImage;
use log::debug;
use ndarray::Array2;
use std::io::{Cursor, Read};

/// PNG file signature
pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// One decoded slice of 8-bit intensity samples.
///
/// Samples are indexed `[[x, y]]`, column `x` and row `y`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SliceBuffer {
    samples: Array2<u8>,
}

impl SliceBuffer {
    /// Wrap a `(width, height)` sample array
    pub fn new(samples: Array2<u8>) -> Self {
        Self { samples }
    }

    /// Build a slice from a sample function of `(x, y)`
    pub fn from_fn(width: usize, height: usize, f: impl FnMut((usize, usize)) -> u8) -> Self {
        Self::new(Array2::from_shape_fn((width, height), f))
    }

    pub fn width(&self) -> usize {
        self.samples.dim().0
    }

    pub fn height(&self) -> usize {
        self.samples.dim().1
    }

    /// Sample at column `x`, row `y`
    pub fn get(&self, x: usize, y: usize) -> Option<u8> {
        self.samples.get((x, y)).copied()
    }

    pub fn samples(&self) -> &Array2<u8> {
        &self.samples
    }

    /// Number of nonzero samples
    pub fn occupied_count(&self) -> usize {
        self.samples.iter().filter(|&&s| s != 0).count()
    }
}

impl From<image::GrayImage> for SliceBuffer {
    fn from(img: image::GrayImage) -> Self {
        let (width, height) = img.dimensions();
        Self::from_fn(width as usize, height as usize, |(x, y)| {
            img.get_pixel(x as u32, y as u32).0[0]
        })
    }
}

/// Load and decode the slice entry `name`
pub fn load_slice<A: SliceArchive + ?Sized>(archive: &mut A, name: &str) -> Result<SliceBuffer> {
    let reader = archive.open_entry(name)?;
    let slice = decode_slice(name, reader)?;
    debug!(
        "Decoded {}: {}x{}, {} occupied",
        name,
        slice.width(),
        slice.height(),
        slice.occupied_count()
    );
    Ok(slice)
}

/// Decode a PNG stream into 8-bit intensity samples.
///
/// The stream is consumed incrementally; only the signature is buffered
/// ahead of the decoder. Non-gray images are reduced to 8-bit luma, and
/// alpha is discarded. A pixel with any nonzero color channel keeps a
/// sample of at least 1, so faint colors and low 16-bit values still read
/// as occupied.
pub fn decode_slice(name: &str, mut reader: impl Read) -> Result<SliceBuffer> {
    let mut header = [0u8; PNG_SIGNATURE.len()];
    let mut filled = 0;
    while filled < header.len() {
        match reader.read(&mut header[filled..])? {
            0 => break,
            n => filled += n,
        }
    }

    if filled < header.len() || header != PNG_SIGNATURE {
        return Err(SvxError::NotAnImage(name.to_string()));
    }

    let decode_error = |e: image::ImageError| SvxError::Decode {
        name: name.to_string(),
        reason: e.to_string(),
    };

    let stream = Cursor::new(header).chain(reader);
    let decoder = PngDecoder::new(stream).map_err(decode_error)?;
    let image = DynamicImage::from_decoder(decoder).map_err(decode_error)?;

    Ok(reduce(image))
}

fn reduce(image: DynamicImage) -> SliceBuffer {
    if let DynamicImage::ImageLuma8(gray) = image {
        return SliceBuffer::from(gray);
    }

    let native = image.to_rgb16();
    let mut luma = image.into_luma8();
    for (sample, color) in luma.pixels_mut().zip(native.pixels()) {
        if sample.0[0] == 0 && color.0.iter().any(|&c| c != 0) {
            sample.0[0] = 1;
        }
    }
    SliceBuffer::from(luma)
}

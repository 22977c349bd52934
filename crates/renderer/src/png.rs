//! PNG encoding for RGBA rasters.
//!
//! Supports two encoding modes:
//! - **Indexed PNG (color type 3)**: used when the image has at most 256
//!   unique colors (flat previews, small test rasters).
//! - **RGBA PNG (color type 6)**: fallback for everything else.

use std::collections::HashMap;
use std::io::Write;

use thiserror::Error;

/// PNG file signature.
pub const PNG_SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

/// Maximum colors for indexed PNG (PNG8)
const MAX_PALETTE_SIZE: usize = 256;

#[derive(Debug, Error)]
pub enum PngError {
    #[error("pixel buffer holds {actual} bytes, expected {expected} for {width}x{height} RGBA")]
    BufferSize {
        width: usize,
        height: usize,
        expected: usize,
        actual: usize,
    },

    #[error("image dimensions must be non-zero")]
    EmptyImage,

    #[error("IDAT compression failed: {0}")]
    Compression(#[from] std::io::Error),
}

type Palette = Vec<[u8; 4]>;

/// Encode RGBA pixels, choosing indexed encoding when the palette fits.
pub fn create_png_auto(pixels: &[u8], width: usize, height: usize) -> Result<Vec<u8>, PngError> {
    check_buffer(pixels, width, height)?;
    match extract_palette(pixels) {
        Some((palette, indices)) => encode(width, height, ColorData::Indexed(&palette, &indices)),
        None => encode(width, height, ColorData::Rgba(pixels)),
    }
}

/// Encode RGBA pixels as a color type 6 PNG.
pub fn create_png(pixels: &[u8], width: usize, height: usize) -> Result<Vec<u8>, PngError> {
    check_buffer(pixels, width, height)?;
    encode(width, height, ColorData::Rgba(pixels))
}

fn check_buffer(pixels: &[u8], width: usize, height: usize) -> Result<(), PngError> {
    if width == 0 || height == 0 {
        return Err(PngError::EmptyImage);
    }
    let expected = width * height * 4;
    if pixels.len() != expected {
        return Err(PngError::BufferSize {
            width,
            height,
            expected,
            actual: pixels.len(),
        });
    }
    Ok(())
}

/// Palette and per-pixel indices, or `None` when there are too many colors.
fn extract_palette(pixels: &[u8]) -> Option<(Palette, Vec<u8>)> {
    let mut lookup: HashMap<[u8; 4], u8> = HashMap::with_capacity(MAX_PALETTE_SIZE);
    let mut palette: Palette = Vec::with_capacity(MAX_PALETTE_SIZE);
    let mut indices = Vec::with_capacity(pixels.len() / 4);

    for chunk in pixels.chunks_exact(4) {
        let color = [chunk[0], chunk[1], chunk[2], chunk[3]];
        let index = match lookup.get(&color) {
            Some(&idx) => idx,
            None => {
                if palette.len() >= MAX_PALETTE_SIZE {
                    return None;
                }
                let idx = palette.len() as u8;
                palette.push(color);
                lookup.insert(color, idx);
                idx
            }
        };
        indices.push(index);
    }
    Some((palette, indices))
}

enum ColorData<'a> {
    Indexed(&'a [[u8; 4]], &'a [u8]),
    Rgba(&'a [u8]),
}

fn encode(width: usize, height: usize, data: ColorData<'_>) -> Result<Vec<u8>, PngError> {
    let mut png = Vec::new();
    png.extend_from_slice(&PNG_SIGNATURE);

    let color_type = match data {
        ColorData::Indexed(..) => 3,
        ColorData::Rgba(_) => 6,
    };
    let mut ihdr = Vec::with_capacity(13);
    ihdr.extend_from_slice(&(width as u32).to_be_bytes());
    ihdr.extend_from_slice(&(height as u32).to_be_bytes());
    ihdr.extend_from_slice(&[8, color_type, 0, 0, 0]); // depth, type, compression, filter, interlace
    write_chunk(&mut png, b"IHDR", &ihdr);

    let (row_bytes, samples) = match data {
        ColorData::Indexed(palette, indices) => {
            let plte: Vec<u8> = palette.iter().flat_map(|c| [c[0], c[1], c[2]]).collect();
            write_chunk(&mut png, b"PLTE", &plte);
            if palette.iter().any(|c| c[3] < 255) {
                let trns: Vec<u8> = palette.iter().map(|c| c[3]).collect();
                write_chunk(&mut png, b"tRNS", &trns);
            }
            (width, indices)
        }
        ColorData::Rgba(pixels) => (width * 4, pixels),
    };

    write_chunk(&mut png, b"IDAT", &deflate_scanlines(samples, row_bytes, height)?);
    write_chunk(&mut png, b"IEND", &[]);
    Ok(png)
}

/// Prefix each scanline with filter type 0 and zlib-compress.
fn deflate_scanlines(samples: &[u8], row_bytes: usize, height: usize) -> Result<Vec<u8>, PngError> {
    let mut raw = Vec::with_capacity(height * (row_bytes + 1));
    for row in samples.chunks_exact(row_bytes).take(height) {
        raw.push(0);
        raw.extend_from_slice(row);
    }

    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::fast());
    encoder.write_all(&raw)?;
    Ok(encoder.finish()?)
}

/// Write a PNG chunk: length, type, data, CRC over type and data.
fn write_chunk(png: &mut Vec<u8>, chunk_type: &[u8; 4], data: &[u8]) {
    png.extend_from_slice(&(data.len() as u32).to_be_bytes());
    png.extend_from_slice(chunk_type);
    png.extend_from_slice(data);

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(chunk_type);
    hasher.update(data);
    png.extend_from_slice(&hasher.finalize().to_be_bytes());
}

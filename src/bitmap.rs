//! An in-memory RGB image and its two encodings: the uncompressed BMP that
//! goes to the OCR service, and a JPEG preview for people to look at.
//!
//! The BMP layout is fixed and byte-exact:
//!
//! - A 14 byte file header: the magic `BM`, the total file size, four
//!   reserved zero bytes and the offset to the pixel data (always 54).
//! - A 40 byte info header: width, and a *negative* height so that rows are
//!   stored top to bottom, one plane, 24 bits per pixel, no compression, and
//!   a resolution of 2835 pixels per metre (72 DPI) on both axes.
//! - The pixels, row by row from the top, each pixel as blue, green, red,
//!   with every row zero-padded to a multiple of four bytes.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{codecs::jpeg::JpegEncoder, ExtendedColorType, ImageEncoder};
use log::info;
use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
};
use thiserror::Error;

/// A pixel, as red, green, blue
pub type Rgb = [u8; 3];

/// The canvas colour
pub const WHITE: Rgb = [0xFF, 0xFF, 0xFF];
/// The ink colour
pub const BLACK: Rgb = [0x00, 0x00, 0x00];

const BMP_MAGIC: [u8; 2] = *b"BM";
const FILE_HEADER_SIZE: u32 = 14;
const INFO_HEADER_SIZE: u32 = 40;
const PIXEL_DATA_OFFSET: u32 = FILE_HEADER_SIZE + INFO_HEADER_SIZE;
const PLANES: u16 = 1;
const BITS_PER_PIXEL: u16 = 24;
const NO_COMPRESSION: u32 = 0;
// 72 DPI
const PIXELS_PER_METER: i32 = 2835;

/// Things that can go wrong while writing out a [`Bitmap`].
#[derive(Debug, Error)]
pub enum BitmapError {
    /// Writing the file failed
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// The preview encoder rejected the image
    #[error("preview encoding error: {0}")]
    Preview(#[from] image::ImageError),
}

/// A row-major grid of [`Rgb`] pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    width: u32,
    height: u32,
    pixels: Vec<Rgb>,
}

impl Bitmap {
    /// A `width` by `height` image filled with `color`.
    pub(crate) fn filled(width: u32, height: u32, color: Rgb) -> Self {
        Self {
            width,
            height,
            pixels: vec![color; width as usize * height as usize],
        }
    }

    /// Paint one pixel. Coordinates off the canvas are ignored.
    pub(crate) fn set_pixel(&mut self, x: i64, y: i64, color: Rgb) {
        if x < 0 || y < 0 || x >= i64::from(self.width) || y >= i64::from(self.height) {
            return;
        }
        let idx = y as usize * self.width as usize + x as usize;
        self.pixels[idx] = color;
    }

    /// Width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Every pixel, row by row from the top
    pub fn pixels(&self) -> &[Rgb] {
        &self.pixels
    }

    /// The pixel at `(x, y)`, or `None` if that is off the canvas.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    /// Bytes per BMP row, including padding
    pub fn bmp_row_size(&self) -> usize {
        (BITS_PER_PIXEL as usize * self.width as usize).div_ceil(32) * 4
    }

    /// Total size of the BMP encoding, headers included
    pub fn bmp_file_size(&self) -> usize {
        PIXEL_DATA_OFFSET as usize + self.bmp_row_size() * self.height as usize
    }

    /// Write the BMP encoding to `out`.
    pub fn write_bmp(&self, out: &mut impl Write) -> io::Result<()> {
        let file_size = u32::try_from(self.bmp_file_size())
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "bitmap too large"))?;
        let width = i32::try_from(self.width)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "bitmap too wide"))?;
        let height = i32::try_from(self.height)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "bitmap too tall"))?;

        let mut header = Vec::with_capacity(PIXEL_DATA_OFFSET as usize);
        header.extend_from_slice(&BMP_MAGIC);
        header.extend_from_slice(&file_size.to_le_bytes());
        header.extend_from_slice(&[0; 4]);
        header.extend_from_slice(&PIXEL_DATA_OFFSET.to_le_bytes());

        header.extend_from_slice(&INFO_HEADER_SIZE.to_le_bytes());
        header.extend_from_slice(&width.to_le_bytes());
        // Negative height means the rows are stored top-down
        header.extend_from_slice(&(-height).to_le_bytes());
        header.extend_from_slice(&PLANES.to_le_bytes());
        header.extend_from_slice(&BITS_PER_PIXEL.to_le_bytes());
        header.extend_from_slice(&NO_COMPRESSION.to_le_bytes());
        header.extend_from_slice(&0u32.to_le_bytes());
        header.extend_from_slice(&PIXELS_PER_METER.to_le_bytes());
        header.extend_from_slice(&PIXELS_PER_METER.to_le_bytes());
        header.extend_from_slice(&0u32.to_le_bytes());
        header.extend_from_slice(&0u32.to_le_bytes());
        out.write_all(&header)?;

        let row_size = self.bmp_row_size();
        let mut row = Vec::with_capacity(row_size);
        for pixels in self.pixels.chunks(self.width.max(1) as usize) {
            row.clear();
            row.extend(pixels.iter().flat_map(|&[r, g, b]| [b, g, r]));
            row.resize(row_size, 0);
            out.write_all(&row)?;
        }

        Ok(())
    }

    /// The BMP encoding as a byte vector.
    pub fn encode_bmp(&self) -> Result<Vec<u8>, BitmapError> {
        let mut buf = Vec::with_capacity(self.bmp_file_size());
        self.write_bmp(&mut buf)?;
        Ok(buf)
    }

    /// The BMP encoding, base64'd, the way the OCR service wants it.
    pub fn to_base64_bmp(&self) -> Result<String, BitmapError> {
        Ok(STANDARD.encode(self.encode_bmp()?))
    }

    /// A lossy JPEG rendition for display. `quality` is clamped to `1..=100`.
    pub fn encode_preview(&self, quality: u8) -> Result<Vec<u8>, BitmapError> {
        let raw: Vec<u8> = self.pixels.iter().flatten().copied().collect();
        let mut out = Vec::new();
        JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100)).write_image(
            &raw,
            self.width,
            self.height,
            ExtendedColorType::Rgb8,
        )?;
        Ok(out)
    }

    /// Write the BMP encoding to the path provided.
    pub fn save_bmp(&self, path: impl AsRef<Path>) -> Result<(), BitmapError> {
        let path = path.as_ref();
        let mut out = BufWriter::new(File::create(path)?);
        self.write_bmp(&mut out)?;
        out.flush()?;
        info!("Wrote {}x{} bitmap to {}", self.width, self.height, path.display());
        Ok(())
    }

    /// Write the JPEG preview to the path provided.
    pub fn save_preview(&self, path: impl AsRef<Path>, quality: u8) -> Result<(), BitmapError> {
        let path = path.as_ref();
        let bytes = self.encode_preview(quality)?;
        std::fs::write(path, bytes)?;
        info!("Wrote preview to {}", path.display());
        Ok(())
    }
}

//! Data types that flow through the pipeline stages (spec.md §3).

use std::path::PathBuf;

use crate::config::Format;

/// Unit of work carried through every stage, created once by the resolver
/// and consumed once by the save stage.
#[derive(Debug, Clone)]
pub struct FileTask {
    /// Stable ordinal, used by reports and logs.
    pub index: usize,
    pub source_path: PathBuf,
    pub destination_path: PathBuf,
    /// Populated after decode.
    pub width: u32,
    pub height: u32,
    pub mipmap_count: u32,
}

impl FileTask {
    pub fn new(index: usize, source_path: PathBuf, destination_path: PathBuf) -> Self {
        Self {
            index,
            source_path,
            destination_path,
            width: 0,
            height: 0,
            mipmap_count: 0,
        }
    }
}

/// Raw bytes read from disk. An empty buffer means the load failed or the
/// task was skipped by the resolver's incremental policy; every later stage
/// must treat that as a no-op pass-through.
#[derive(Debug, Clone, Default)]
pub struct PngBlob {
    pub index: usize,
    pub bytes: Vec<u8>,
}

impl PngBlob {
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Padding helper: the smallest multiple of 4 greater than or equal to `value`.
pub fn round_up_to_4(value: u32) -> u32 {
    (value + 3) & !3
}

/// A single 2D RGBA8 surface, described as a byte-range view into the
/// parent [`MipmapImage`]'s single allocation. `Image` never owns bytes
/// itself; the allocation backing it must outlive every use.
#[derive(Debug, Clone, Copy)]
pub struct Image {
    pub width: u32,
    pub height: u32,
    pub padded_width: u32,
    pub padded_height: u32,
    offset: usize,
    len: usize,
}

impl Image {
    pub const BYTES_PER_PIXEL: usize = 4;

    fn new(width: u32, height: u32, offset: usize) -> Self {
        let padded_width = round_up_to_4(width.max(1));
        let padded_height = round_up_to_4(height.max(1));
        let len = padded_width as usize * padded_height as usize * Self::BYTES_PER_PIXEL;
        Self {
            width,
            height,
            padded_width,
            padded_height,
            offset,
            len,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Row stride in bytes of the padded buffer.
    pub fn stride(&self) -> usize {
        self.padded_width as usize * Self::BYTES_PER_PIXEL
    }
}

/// A full mipmap chain backed by one contiguous allocation. `mips[0]` is the
/// base level; `mips[k+1]` has dimensions `max(1, w>>1), max(1, h>>1)`. The
/// chain terminates at the first `1x1` level, or right after the base level
/// if mipmaps are disabled.
#[derive(Debug, Clone)]
pub struct MipmapImage {
    data: Vec<u8>,
    mips: Vec<Image>,
}

impl MipmapImage {
    /// Allocate a chain for a `width x height` base image. `generate_chain`
    /// selects whether levels beyond the base are included at all; the
    /// actual pixel data for levels > 0 is filled in later by the mipmap
    /// stage.
    pub fn allocate(width: u32, height: u32, generate_chain: bool) -> Self {
        let mut dims = Vec::new();
        if width > 0 && height > 0 {
            dims.push((width, height));
            let (mut w, mut h) = (width, height);
            if generate_chain {
                loop {
                    let next_w = (w >> 1).max(1);
                    let next_h = (h >> 1).max(1);
                    if next_w == w && next_h == h {
                        break;
                    }
                    dims.push((next_w, next_h));
                    w = next_w;
                    h = next_h;
                    if w == 1 && h == 1 {
                        break;
                    }
                }
            }
        }

        let mut mips = Vec::with_capacity(dims.len());
        let mut offset = 0usize;
        for (w, h) in dims {
            let image = Image::new(w, h, offset);
            offset += image.len();
            mips.push(image);
        }

        Self {
            data: vec![0u8; offset],
            mips,
        }
    }

    pub fn mip_count(&self) -> u32 {
        self.mips.len() as u32
    }

    pub fn mip(&self, level: usize) -> Image {
        self.mips[level]
    }

    pub fn mips(&self) -> &[Image] {
        &self.mips
    }

    pub fn base(&self) -> Image {
        self.mips[0]
    }

    pub fn bytes(&self, level: usize) -> &[u8] {
        let image = self.mips[level];
        &self.data[image.offset..image.offset + image.len]
    }

    pub fn bytes_mut(&mut self, level: usize) -> &mut [u8] {
        let image = self.mips[level];
        &mut self.data[image.offset..image.offset + image.len]
    }

    pub fn allocation_size(&self) -> usize {
        self.data.len()
    }

    /// Copy `pixels` (a tightly packed `width x height` RGBA8 buffer, no
    /// padding) into level `level`'s padded buffer, one row at a time.
    /// `row_order` selects whether source rows are read top-to-bottom or
    /// reversed (used by `vflip`).
    pub fn write_rows(&mut self, level: usize, width: u32, height: u32, pixels: &[u8], vflip: bool) {
        let image = self.mips[level];
        let stride = image.stride();
        let row_bytes = width as usize * Image::BYTES_PER_PIXEL;
        let buffer = self.bytes_mut(level);
        for y in 0..height as usize {
            let src_row = if vflip { height as usize - 1 - y } else { y };
            let src_start = src_row * row_bytes;
            let dst_start = y * stride;
            buffer[dst_start..dst_start + row_bytes]
                .copy_from_slice(&pixels[src_start..src_start + row_bytes]);
        }
    }

    /// Copy the logical (unpadded) pixels of `level` out as a tightly
    /// packed RGBA8 buffer, dropping any padding columns/rows.
    pub fn read_rows(&self, level: usize) -> Vec<u8> {
        let image = self.mips[level];
        let stride = image.stride();
        let row_bytes = image.width as usize * Image::BYTES_PER_PIXEL;
        let buffer = self.bytes(level);
        let mut out = Vec::with_capacity(row_bytes * image.height as usize);
        for y in 0..image.height as usize {
            let start = y * stride;
            out.extend_from_slice(&buffer[start..start + row_bytes]);
        }
        out
    }

    /// Replace this chain's base level with `new_base`, keeping the same
    /// `generate_chain` policy (used by fix_size and scale, which both
    /// reallocate the whole chain around a new base surface).
    pub fn from_base(base_width: u32, base_height: u32, generate_chain: bool) -> Self {
        Self::allocate(base_width, base_height, generate_chain)
    }
}

/// Block-compressed (or re-encoded PNG) output for a single source image.
#[derive(Debug, Clone)]
pub struct EncodedBlob {
    pub index: usize,
    pub format: Format,
    pub width: u32,
    pub height: u32,
    /// Ordered by mip level, level 0 first. For the `Format::Png` bypass
    /// this holds exactly one entry: the re-serialized PNG file bytes.
    pub mip_levels: Vec<Vec<u8>>,
}

/// Events emitted on the report side channel (spec.md §3).
#[derive(Debug, Clone)]
pub enum Report {
    RetrievalStarted,
    RetrievalProgress(usize),
    RetrievalTime(u64),
    FileLoaded { index: usize },
    ProcessStarted { total: usize },
    EncodingProgress { index: usize },
    PipelineError { index: Option<usize>, message: String },
}

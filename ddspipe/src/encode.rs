//! C6 Encode stage (spec.md §4.6). Parallel. Per image, selects an
//! effective format (falling back to `alpha_format` when any pixel isn't
//! fully opaque), then block-compresses every mip level in 4x4 block
//! order. BC1/BC3/BC7 compression is delegated to `intel_tex_2`; the
//! `alpha_black` punch-through override is applied as a targeted
//! per-block rewrite, since `intel_tex_2` has no hook for it.

use crate::config::{Configuration, Format};
use crate::error::EncodeError;
use crate::model::{EncodedBlob, Image, MipmapImage};

/// Alpha value below which a pixel counts as eligible for the BC1
/// punch-through ("alpha black") heuristic (spec.md §9 open question).
pub const ALPHA_BLACK_THRESHOLD_ALPHA: u8 = 128;
/// Luminance value below which a pixel counts as eligible for the BC1
/// punch-through heuristic (spec.md §9 open question).
pub const ALPHA_BLACK_THRESHOLD_LUMINANCE: u8 = 32;

pub fn encode(chain: &MipmapImage, index: usize, config: &Configuration) -> Result<EncodedBlob, EncodeError> {
    if chain.mip_count() == 0 {
        return Err(EncodeError::ZeroSizedImage);
    }

    let format = effective_format(chain, config);

    if format == Format::Png {
        return encode_png(chain, index);
    }

    let mut mip_levels = Vec::with_capacity(chain.mip_count() as usize);
    for level in 0..chain.mip_count() as usize {
        let image = chain.mip(level);
        let bytes = encode_level(chain.bytes(level), image, format, config)?;
        mip_levels.push(bytes);
    }

    Ok(EncodedBlob {
        index,
        format,
        width: chain.base().width,
        height: chain.base().height,
        mip_levels,
    })
}

/// `alpha_format` overrides `format` whenever any pixel in the base level
/// is not fully opaque (spec.md §4.6).
fn effective_format(chain: &MipmapImage, config: &Configuration) -> Format {
    match config.alpha_format {
        Some(alpha_format) if has_translucent_pixel(chain.bytes(0)) => alpha_format,
        _ => config.format,
    }
}

fn has_translucent_pixel(rgba: &[u8]) -> bool {
    rgba.chunks_exact(4).any(|p| p[3] < crate::config::OPAQUE_ALPHA)
}

fn encode_level(
    rgba: &[u8],
    image: Image,
    format: Format,
    config: &Configuration,
) -> Result<Vec<u8>, EncodeError> {
    let surface = intel_tex_2::RgbaSurface {
        width: image.padded_width,
        height: image.padded_height,
        stride: image.stride() as u32,
        data: rgba,
    };

    let mut bytes = match format {
        Format::Bc1 => intel_tex_2::bc1::compress_blocks(&surface),
        Format::Bc3 => intel_tex_2::bc3::compress_blocks(&surface),
        Format::Bc7 => intel_tex_2::bc7::compress_blocks(&bc7_settings(config.quality), &surface),
        Format::Png => unreachable!("PNG handled by encode_png"),
    };

    if format == Format::Bc1 && config.alpha_black {
        apply_alpha_black(&mut bytes, rgba, image);
    }

    Ok(bytes)
}

fn bc7_settings(quality: u8) -> intel_tex_2::bc7::EncodeSettings {
    // intel_tex_2 exposes a fixed ladder of presets rather than a
    // continuous partition-candidate count; quality buckets onto the
    // closest preset (see DESIGN.md for the open-question resolution).
    match quality {
        0..=33 => intel_tex_2::bc7::alpha_ultra_fast_settings(),
        34..=66 => intel_tex_2::bc7::alpha_very_fast_settings(),
        _ => intel_tex_2::bc7::alpha_fast_settings(),
    }
}

/// Rewrite every BC1 block that contains a punch-through-eligible pixel
/// (alpha < [`ALPHA_BLACK_THRESHOLD_ALPHA`] and luminance <
/// [`ALPHA_BLACK_THRESHOLD_LUMINANCE`]) as a hand-encoded 3-color block
/// with index 3 = transparent black.
fn apply_alpha_black(blocks: &mut [u8], rgba: &[u8], image: Image) {
    let blocks_wide = image.padded_width as usize / 4;
    let blocks_tall = image.padded_height as usize / 4;
    let stride = image.stride();

    for by in 0..blocks_tall {
        for bx in 0..blocks_wide {
            let pixels = read_block(rgba, stride, bx * 4, by * 4);
            if !pixels.iter().any(is_alpha_black_eligible) {
                continue;
            }
            let block_index = by * blocks_wide + bx;
            let encoded = encode_punch_through_block(&pixels);
            blocks[block_index * 8..block_index * 8 + 8].copy_from_slice(&encoded);
        }
    }
}

fn read_block(rgba: &[u8], stride: usize, x0: usize, y0: usize) -> [[u8; 4]; 16] {
    let mut pixels = [[0u8; 4]; 16];
    for row in 0..4 {
        let row_start = (y0 + row) * stride + x0 * 4;
        for col in 0..4 {
            let o = row_start + col * 4;
            pixels[row * 4 + col].copy_from_slice(&rgba[o..o + 4]);
        }
    }
    pixels
}

fn luminance(pixel: &[u8; 4]) -> u8 {
    ((pixel[0] as u32 * 77 + pixel[1] as u32 * 150 + pixel[2] as u32 * 29) >> 8) as u8
}

fn is_alpha_black_eligible(pixel: &[u8; 4]) -> bool {
    pixel[3] < ALPHA_BLACK_THRESHOLD_ALPHA && luminance(pixel) < ALPHA_BLACK_THRESHOLD_LUMINANCE
}

fn to_565(pixel: [u8; 3]) -> u16 {
    let r = (pixel[0] as u16 >> 3) & 0x1f;
    let g = (pixel[1] as u16 >> 2) & 0x3f;
    let b = (pixel[2] as u16 >> 3) & 0x1f;
    (r << 11) | (g << 5) | b
}

fn from_565(value: u16) -> [u8; 3] {
    let r = ((value >> 11) & 0x1f) as u8;
    let g = ((value >> 5) & 0x3f) as u8;
    let b = (value & 0x1f) as u8;
    [(r << 3) | (r >> 2), (g << 2) | (g >> 4), (b << 3) | (b >> 2)]
}

/// Encode a single 4x4 block as BC1 3-color (punch-through) mode: the two
/// endpoints come from the min/max opaque pixels by luminance, and every
/// eligible pixel gets index 3 (transparent black).
fn encode_punch_through_block(pixels: &[[u8; 4]; 16]) -> [u8; 8] {
    let opaque: Vec<_> = pixels.iter().filter(|p| !is_alpha_black_eligible(p)).collect();
    let (min_pixel, max_pixel) = if opaque.is_empty() {
        ([0u8, 0, 0, 0], [0u8, 0, 0, 0])
    } else {
        let min = **opaque.iter().min_by_key(|p| luminance(p)).unwrap();
        let max = **opaque.iter().max_by_key(|p| luminance(p)).unwrap();
        (min, max)
    };

    let mut c0 = to_565([min_pixel[0], min_pixel[1], min_pixel[2]]);
    let mut c1 = to_565([max_pixel[0], max_pixel[1], max_pixel[2]]);
    // Encode as 3-color mode: color0 <= color1 numerically selects it.
    if c0 > c1 {
        std::mem::swap(&mut c0, &mut c1);
    } else if c0 == c1 && c1 < u16::MAX {
        c1 += 1;
    }

    let p0 = from_565(c0);
    let p1 = from_565(c1);
    let p2 = [
        ((p0[0] as u16 + p1[0] as u16) / 2) as u8,
        ((p0[1] as u16 + p1[1] as u16) / 2) as u8,
        ((p0[2] as u16 + p1[2] as u16) / 2) as u8,
    ];

    let mut indices = 0u32;
    for (i, pixel) in pixels.iter().enumerate() {
        let index = if is_alpha_black_eligible(pixel) {
            3
        } else {
            nearest_palette_index(pixel, p0, p1, p2)
        };
        indices |= (index as u32) << (i * 2);
    }

    let mut block = [0u8; 8];
    block[0..2].copy_from_slice(&c0.to_le_bytes());
    block[2..4].copy_from_slice(&c1.to_le_bytes());
    block[4..8].copy_from_slice(&indices.to_le_bytes());
    block
}

fn nearest_palette_index(pixel: &[u8; 4], p0: [u8; 3], p1: [u8; 3], p2: [u8; 3]) -> u32 {
    let dist = |a: [u8; 3]| {
        let dr = pixel[0] as i32 - a[0] as i32;
        let dg = pixel[1] as i32 - a[1] as i32;
        let db = pixel[2] as i32 - a[2] as i32;
        dr * dr + dg * dg + db * db
    };
    let (mut best_index, mut best_dist) = (0u32, dist(p0));
    for (i, candidate) in [p1, p2].into_iter().enumerate() {
        let d = dist(candidate);
        if d < best_dist {
            best_dist = d;
            best_index = (i + 1) as u32;
        }
    }
    best_index
}

fn encode_png(chain: &MipmapImage, index: usize) -> Result<EncodedBlob, EncodeError> {
    let base = chain.base();
    let rgba = image::RgbaImage::from_raw(base.width, base.height, chain.read_rows(0))
        .expect("base surface dimensions match its pixel buffer");

    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgba8(rgba).write_to(
        &mut std::io::Cursor::new(&mut bytes),
        image::ImageFormat::Png,
    )?;

    Ok(EncodedBlob {
        index,
        format: Format::Png,
        width: base.width,
        height: base.height,
        mip_levels: vec![bytes],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoded_level_length_matches_block_invariant() {
        let mut chain = MipmapImage::allocate(8, 8, false);
        for byte in chain.bytes_mut(0).iter_mut() {
            *byte = 128;
        }
        let config = Configuration {
            format: Format::Bc7,
            ..Configuration::default()
        };
        let blob = encode(&chain, 0, &config).unwrap();
        assert_eq!(blob.mip_levels.len(), 1);
        assert_eq!(blob.mip_levels[0].len(), (8 / 4) * (8 / 4) * 16);
    }

    #[test]
    fn bc1_level_length_matches_block_invariant() {
        let chain = MipmapImage::allocate(12, 12, false);
        let config = Configuration {
            format: Format::Bc1,
            ..Configuration::default()
        };
        let blob = encode(&chain, 0, &config).unwrap();
        assert_eq!(blob.mip_levels[0].len(), (12 / 4) * (12 / 4) * 8);
    }

    #[test]
    fn alpha_format_used_only_when_translucent() {
        let mut chain = MipmapImage::allocate(4, 4, false);
        for pixel in chain.bytes_mut(0).chunks_exact_mut(4) {
            pixel[3] = 255;
        }
        let config = Configuration {
            format: Format::Bc1,
            alpha_format: Some(Format::Bc7),
            ..Configuration::default()
        };
        assert_eq!(effective_format(&chain, &config), Format::Bc1);

        chain.bytes_mut(0)[3] = 10;
        assert_eq!(effective_format(&chain, &config), Format::Bc7);
    }

    #[test]
    fn zero_sized_image_is_an_encode_error() {
        let chain = MipmapImage::allocate(0, 0, false);
        let config = Configuration::default();
        assert!(matches!(encode(&chain, 0, &config), Err(EncodeError::ZeroSizedImage)));
    }

    /// A flat-color block round-trips through BC1 encode/decode within the
    /// lossy 565-quantization tolerance.
    #[test]
    fn bc1_round_trip_preserves_flat_color() {
        let mut chain = MipmapImage::allocate(4, 4, false);
        for pixel in chain.bytes_mut(0).chunks_exact_mut(4) {
            pixel.copy_from_slice(&[200, 100, 50, 255]);
        }
        let config = Configuration {
            format: Format::Bc1,
            ..Configuration::default()
        };
        let blob = encode(&chain, 0, &config).unwrap();
        let block = &blob.mip_levels[0];
        assert_eq!(block.len(), 8);

        let mut decoded = [0u8; 4 * 4 * 4];
        bcdec_rs::bc1(block, &mut decoded, 4 * 4);
        for pixel in decoded.chunks_exact(4) {
            assert!((pixel[0] as i32 - 200).abs() <= 8);
            assert!((pixel[1] as i32 - 100).abs() <= 8);
            assert!((pixel[2] as i32 - 50).abs() <= 8);
        }
    }

    #[test]
    fn alpha_black_override_produces_transparent_indices() {
        let mut chain = MipmapImage::allocate(4, 4, false);
        for (i, pixel) in chain.bytes_mut(0).chunks_exact_mut(4).enumerate() {
            if i < 8 {
                pixel.copy_from_slice(&[0, 0, 0, 0]);
            } else {
                pixel.copy_from_slice(&[255, 255, 255, 255]);
            }
        }
        let config = Configuration {
            format: Format::Bc1,
            alpha_black: true,
            ..Configuration::default()
        };
        let blob = encode(&chain, 0, &config).unwrap();
        let block = &blob.mip_levels[0];

        let mut decoded = [0u8; 4 * 4 * 4];
        bcdec_rs::bc1(block, &mut decoded, 4 * 4);
        for pixel in decoded.chunks_exact(4).take(8) {
            assert_eq!(pixel, &[0, 0, 0, 0]);
        }
    }
}

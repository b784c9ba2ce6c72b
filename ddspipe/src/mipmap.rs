//! C5 Mipmap stage (spec.md §4.5). Parallel; a no-op when mipmaps are
//! disabled. Fills `mips[1..]` by filtering the base level. Alpha is
//! resampled independently from RGB so a transparent neighbour pixel
//! never bleeds color into an opaque one.

use crate::config::Configuration;
use crate::model::MipmapImage;

/// Populate every mip level beyond the base in `chain` from its base level.
pub fn generate_mipmaps(chain: &mut MipmapImage, config: &Configuration) {
    if chain.mip_count() <= 1 {
        return;
    }

    let base = chain.base();
    let base_pixels = chain.read_rows(0);
    let (base_rgb, base_alpha) = split_channels(base.width, base.height, &base_pixels);

    let filter: image::imageops::FilterType = config.mipmap_filter.into();
    let sigma = config.mipmap_blur;

    let blurred_rgb = image::imageops::blur(&base_rgb, sigma);
    let blurred_alpha = image::imageops::blur(&base_alpha, sigma);

    let levels: Vec<_> = chain.mips().to_vec();
    for (level, mip) in levels.iter().enumerate().skip(1) {
        let rgb = image::imageops::resize(&blurred_rgb, mip.width.max(1), mip.height.max(1), filter);
        let alpha = image::imageops::resize(&blurred_alpha, mip.width.max(1), mip.height.max(1), filter);
        let merged = merge_channels(&rgb, &alpha);
        chain.write_rows(level, mip.width, mip.height, &merged, false);
    }
}

fn split_channels(
    width: u32,
    height: u32,
    rgba: &[u8],
) -> (image::RgbImage, image::GrayImage) {
    let mut rgb = image::RgbImage::new(width, height);
    let mut alpha = image::GrayImage::new(width, height);
    for (i, pixel) in rgba.chunks_exact(4).enumerate() {
        let x = (i as u32) % width;
        let y = (i as u32) / width;
        rgb.put_pixel(x, y, image::Rgb([pixel[0], pixel[1], pixel[2]]));
        alpha.put_pixel(x, y, image::Luma([pixel[3]]));
    }
    (rgb, alpha)
}

fn merge_channels(rgb: &image::RgbImage, alpha: &image::GrayImage) -> Vec<u8> {
    let mut out = Vec::with_capacity((rgb.width() * rgb.height() * 4) as usize);
    for (rgb_pixel, alpha_pixel) in rgb.pixels().zip(alpha.pixels()) {
        out.extend_from_slice(&[rgb_pixel.0[0], rgb_pixel.0[1], rgb_pixel.0[2], alpha_pixel.0[0]]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_mipmaps_is_noop() {
        let mut chain = MipmapImage::allocate(8, 8, false);
        let config = Configuration::default();
        generate_mipmaps(&mut chain, &config);
        assert_eq!(chain.mip_count(), 1);
    }

    #[test]
    fn one_by_one_has_single_level() {
        let chain = MipmapImage::allocate(1, 1, true);
        assert_eq!(chain.mip_count(), 1);
    }

    #[test]
    fn mip_chain_halves_each_level() {
        let chain = MipmapImage::allocate(8, 8, true);
        assert_eq!(chain.mip_count(), 4);
        assert_eq!(chain.mip(1).width, 4);
        assert_eq!(chain.mip(2).width, 2);
        assert_eq!(chain.mip(3).width, 1);
    }
}

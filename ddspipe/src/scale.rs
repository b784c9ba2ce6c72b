//! C4 Scale stage (spec.md §4.4). Parallel. Applies only when `scale != 100`
//! or `max_size` is set and exceeded; `max_size` takes priority over `scale`
//! whenever it would shrink the image further.

use crate::config::Configuration;
use crate::model::MipmapImage;

/// Rescale `chain`'s base level in place (reallocating the whole chain
/// around the new base) when the configuration calls for it. Returns the
/// chain unchanged if no scaling applies.
pub fn scale(chain: MipmapImage, config: &Configuration) -> MipmapImage {
    let base = chain.base();
    let Some((new_width, new_height)) = target_dimensions(base.width, base.height, config) else {
        return chain;
    };
    if new_width == base.width && new_height == base.height {
        return chain;
    }

    let rgba = image::RgbaImage::from_raw(base.width, base.height, chain.read_rows(0))
        .expect("base surface dimensions match its pixel buffer");
    let resized = image::imageops::resize(
        &rgba,
        new_width.max(1),
        new_height.max(1),
        config.scale_filter.into(),
    );

    let mut new_chain = MipmapImage::allocate(resized.width(), resized.height(), config.mipmaps);
    new_chain.write_rows(0, resized.width(), resized.height(), resized.as_raw(), false);
    new_chain
}

/// Compute the new base dimensions, or `None` if no scaling policy applies.
fn target_dimensions(width: u32, height: u32, config: &Configuration) -> Option<(u32, u32)> {
    let longest = width.max(height);

    let factor = if let Some(max_size) = config.max_size {
        if max_size > 0 && longest > max_size {
            Some(max_size as f64 / longest as f64)
        } else if config.scale != 100 {
            Some(config.scale as f64 / 100.0)
        } else {
            None
        }
    } else if config.scale != 100 {
        Some(config.scale as f64 / 100.0)
    } else {
        None
    };

    factor.map(|factor| {
        (
            (width as f64 * factor).round().max(1.0) as u32,
            (height as f64 * factor).round().max(1.0) as u32,
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_size_wins_when_it_would_shrink_more_than_scale() {
        let mut config = Configuration::default();
        config.scale = 1000;
        config.max_size = Some(64);
        let dims = target_dimensions(100, 50, &config).unwrap();
        assert_eq!(dims, (64, 32));
    }

    #[test]
    fn scale_applies_when_max_size_not_exceeded() {
        let mut config = Configuration::default();
        config.scale = 200;
        config.max_size = Some(1000);
        let dims = target_dimensions(100, 50, &config).unwrap();
        assert_eq!(dims, (200, 100));
    }

    #[test]
    fn no_scaling_when_defaults() {
        let config = Configuration::default();
        assert_eq!(target_dimensions(100, 50, &config), None);
    }
}

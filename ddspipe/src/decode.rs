//! C3 Decode stage (spec.md §4.3). Parallel: each task decodes
//! independently once its [`PngBlob`] is available.

use crate::config::Configuration;
use crate::error::DecodeError;
use crate::model::{round_up_to_4, FileTask, MipmapImage, PngBlob};

/// Decode a non-empty PNG blob into a fully allocated mipmap chain and
/// update `task`'s dimensions in place. Returns `None` for an empty blob
/// (skipped or failed upstream) — later stages must bypass such tasks.
pub fn decode(
    task: &mut FileTask,
    blob: &PngBlob,
    config: &Configuration,
) -> Result<Option<MipmapImage>, DecodeError> {
    if blob.is_empty() {
        return Ok(None);
    }

    let decoded = image::load_from_memory(&blob.bytes)
        .map_err(|source| DecodeError::MalformedPng {
            path: task.source_path.clone(),
            source,
        })?
        .to_rgba8();

    let width = decoded.width();
    let height = decoded.height();

    let mut chain = MipmapImage::allocate(width, height, config.mipmaps);
    chain.write_rows(0, width, height, decoded.as_raw(), config.vflip);

    task.width = width;
    task.height = height;

    if config.fix_size && (width % 4 != 0 || height % 4 != 0) {
        let padded_width = round_up_to_4(width);
        let padded_height = round_up_to_4(height);
        let mut padded_chain = MipmapImage::allocate(padded_width, padded_height, config.mipmaps);
        // The source is already in logical (unpadded) row order; no flip.
        padded_chain.write_rows(0, width, height, &chain.read_rows(0), false);
        chain = padded_chain;
        task.width = padded_width;
        task.height = padded_height;
    }

    task.mipmap_count = chain.mip_count();

    Ok(Some(chain))
}

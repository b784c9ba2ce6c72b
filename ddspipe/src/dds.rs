//! C7 Serialize+Save stage (spec.md §4.7). Builds the DDS container (or,
//! for the PNG bypass, reuses the already-serialized bytes from
//! [`crate::encode`]) and writes it atomically: the full payload goes to
//! a sibling `.part` file first, which is then renamed onto the real
//! destination so a reader never observes a half-written file.

use std::fs;
use std::path::{Path, PathBuf};

use ddsfile::{D3D10ResourceDimension, D3DFormat, Dds, DxgiFormat, NewD3dParams, NewDxgiParams};

use crate::config::Format;
use crate::error::SaveError;
use crate::model::EncodedBlob;

/// Build the on-disk bytes for `blob`: a full DDS container for BC1/BC3/BC7,
/// or the raw re-encoded PNG bytes for the PNG bypass.
pub fn serialize(blob: &EncodedBlob) -> Result<Vec<u8>, SaveError> {
    if blob.format == Format::Png {
        return Ok(blob.mip_levels[0].clone());
    }

    let mipmap_levels = blob.mip_levels.len() as u32;
    let mut dds = match blob.format {
        Format::Bc7 => Dds::new_dxgi(NewDxgiParams {
            height: blob.height,
            width: blob.width,
            depth: None,
            format: DxgiFormat::BC7_UNorm,
            mipmap_levels: if mipmap_levels > 1 { Some(mipmap_levels) } else { None },
            array_layers: None,
            caps2: None,
            is_cubemap: false,
            resource_dimension: D3D10ResourceDimension::Texture2D,
            alpha_mode: ddsfile::AlphaMode::Straight,
        }),
        Format::Bc1 => Dds::new_d3d(NewD3dParams {
            height: blob.height,
            width: blob.width,
            depth: None,
            format: D3DFormat::DXT1,
            mipmap_levels: if mipmap_levels > 1 { Some(mipmap_levels) } else { None },
            caps2: None,
        }),
        Format::Bc3 => Dds::new_d3d(NewD3dParams {
            height: blob.height,
            width: blob.width,
            depth: None,
            format: D3DFormat::DXT5,
            mipmap_levels: if mipmap_levels > 1 { Some(mipmap_levels) } else { None },
            caps2: None,
        }),
        Format::Png => unreachable!("handled above"),
    }
    .map_err(|source| SaveError::Write {
        path: PathBuf::new(),
        source: std::io::Error::new(std::io::ErrorKind::Other, source),
    })?;

    dds.data = blob.mip_levels.concat();

    let mut bytes = Vec::new();
    dds.write(&mut bytes).map_err(|source| SaveError::Write {
        path: PathBuf::new(),
        source: std::io::Error::new(std::io::ErrorKind::Other, source),
    })?;

    Ok(bytes)
}

/// Write `bytes` to `destination` atomically: to `destination.part` first,
/// then renamed into place. Creates the destination's parent directory if
/// needed. A no-op under `dry_run`.
pub fn save(destination: &Path, bytes: &[u8], dry_run: bool) -> Result<(), SaveError> {
    if dry_run {
        return Ok(());
    }

    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent).map_err(|source| SaveError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let part_path = part_path_for(destination);
    fs::write(&part_path, bytes).map_err(|source| SaveError::Write {
        path: part_path.clone(),
        source,
    })?;

    fs::rename(&part_path, destination).map_err(|source| {
        let _ = fs::remove_file(&part_path);
        SaveError::Rename {
            from: part_path,
            to: destination.to_path_buf(),
            source,
        }
    })?;

    Ok(())
}

/// Delete `destination` if it exists (spec.md §4.1 `clean` mode). Missing
/// files are not an error: `clean` tolerates destinations that were never
/// produced.
pub fn clean(destination: &Path) -> Result<(), SaveError> {
    match fs::remove_file(destination) {
        Ok(()) => Ok(()),
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(SaveError::Delete {
            path: destination.to_path_buf(),
            source,
        }),
    }
}

fn part_path_for(destination: &Path) -> PathBuf {
    let mut part = destination.as_os_str().to_owned();
    part.push(".part");
    PathBuf::from(part)
}

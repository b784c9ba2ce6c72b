//! Configuration record supplied by an external collaborator (CLI or GUI),
//! and the filter/format vocabularies it draws from (spec.md §3).

use std::path::PathBuf;

use regex::Regex;

/// Primary output container format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString, strum::Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Format {
    Bc1,
    Bc3,
    Bc7,
    Png,
}

impl Format {
    pub fn supports_alpha(self) -> bool {
        !matches!(self, Format::Bc1)
    }

    pub fn block_size_bytes(self) -> usize {
        match self {
            Format::Bc1 => 8,
            Format::Bc3 | Format::Bc7 => 16,
            Format::Png => 0,
        }
    }
}

/// Resampling kernel used by the scale and mipmap stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum ResampleFilter {
    Nearest,
    Linear,
    Cubic,
    Area,
    Lanczos,
}

impl Default for ResampleFilter {
    fn default() -> Self {
        ResampleFilter::Lanczos
    }
}

impl From<ResampleFilter> for image::imageops::FilterType {
    fn from(value: ResampleFilter) -> Self {
        use image::imageops::FilterType;
        match value {
            ResampleFilter::Nearest => FilterType::Nearest,
            ResampleFilter::Linear => FilterType::Triangle,
            ResampleFilter::Cubic => FilterType::CatmullRom,
            // `image` has no dedicated box/area-average filter; Triangle is
            // the closest box-like kernel it ships, so area reuses it with
            // its own pre-blur disabled downstream.
            ResampleFilter::Area => FilterType::Triangle,
            ResampleFilter::Lanczos => FilterType::Lanczos3,
        }
    }
}

/// Skip policy for files whose destination already exists (spec.md §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverwritePolicy {
    /// Skip if the destination exists at all.
    #[default]
    SkipExisting,
    /// Convert files even if an output file already exists.
    Overwrite,
    /// Convert only if the destination is older than the source.
    OverwriteNew,
}

/// Every recognized configuration option and its effect (spec.md §3 table).
#[derive(Debug, Clone)]
pub struct Configuration {
    pub inputs: Vec<PathBuf>,
    pub output: Option<PathBuf>,

    pub format: Format,
    pub alpha_format: Option<Format>,
    /// 0..=100, passed to the BC7 encoder's quality ladder.
    pub quality: u8,

    pub mipmaps: bool,
    pub mipmap_filter: ResampleFilter,
    pub mipmap_blur: f32,

    /// Percent, 1..=1000.
    pub scale: u16,
    pub max_size: Option<u32>,
    pub scale_filter: ResampleFilter,

    pub threads: usize,
    pub depth: usize,

    pub overwrite: OverwritePolicy,

    pub vflip: bool,
    pub fix_size: bool,

    pub substring: Option<String>,
    pub regex: Option<Regex>,

    pub dry_run: bool,
    pub clean: bool,

    pub alpha_black: bool,
}

/// Alpha channel value below which a pixel counts as "not fully opaque"
/// for the purposes of alpha-format selection and the BC1 punch-through
/// heuristic threshold (see [`ALPHA_BLACK_THRESHOLD_ALPHA`]).
pub const OPAQUE_ALPHA: u8 = 255;

pub const DEFAULT_MIPMAP_BLUR: f32 = 0.55;
pub const DEFAULT_SCALE: u16 = 100;
pub const MIN_SCALE: u16 = 1;
pub const MAX_SCALE: u16 = 1000;

impl Default for Configuration {
    fn default() -> Self {
        Self {
            inputs: Vec::new(),
            output: None,
            format: Format::Bc7,
            alpha_format: None,
            quality: 50,
            mipmaps: true,
            mipmap_filter: ResampleFilter::default(),
            mipmap_blur: DEFAULT_MIPMAP_BLUR,
            scale: DEFAULT_SCALE,
            max_size: None,
            scale_filter: ResampleFilter::Lanczos,
            threads: 1,
            depth: usize::MAX,
            overwrite: OverwritePolicy::default(),
            vflip: false,
            fix_size: false,
            substring: None,
            regex: None,
            dry_run: false,
            clean: false,
            alpha_black: false,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("--format PNG requires an explicit --output directory")]
    PngRequiresOutput,
    #[error("--mipmap-filter is incompatible with --format PNG")]
    PngForbidsMipmapFilter,
    #[error("--mipmap-blur is incompatible with --format PNG")]
    PngForbidsMipmapBlur,
    #[error("--overwrite and --overwrite-new are mutually exclusive")]
    OverwriteConflict,
    #[error("scale must be in 1..=1000, got {0}")]
    ScaleOutOfRange(u16),
    #[error("mipmap-blur must be greater than zero")]
    NonPositiveBlur,
    #[error("invalid regular expression: {0}")]
    InvalidRegex(#[from] regex::Error),
    #[error("alpha-format {0} does not support alpha")]
    AlphaFormatHasNoAlpha(Format),
}

impl Configuration {
    /// Validates cross-option constraints (spec.md §6/§7.1). Per-option
    /// parsing (e.g. integer ranges from CLI strings) happens before this.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.format == Format::Png && self.output.is_none() {
            return Err(ConfigError::PngRequiresOutput);
        }
        if self.format == Format::Png && self.mipmap_filter != ResampleFilter::default() {
            return Err(ConfigError::PngForbidsMipmapFilter);
        }
        if self.format == Format::Png && self.mipmap_blur != DEFAULT_MIPMAP_BLUR {
            return Err(ConfigError::PngForbidsMipmapBlur);
        }
        if !(MIN_SCALE..=MAX_SCALE).contains(&self.scale) {
            return Err(ConfigError::ScaleOutOfRange(self.scale));
        }
        if self.mipmap_blur <= 0.0 {
            return Err(ConfigError::NonPositiveBlur);
        }
        if let Some(alpha_format) = self.alpha_format {
            if !alpha_format.supports_alpha() {
                return Err(ConfigError::AlphaFormatHasNoAlpha(alpha_format));
            }
        }
        Ok(())
    }

    pub fn final_extension(&self) -> &'static str {
        if self.format == Format::Png {
            "png"
        } else {
            "dds"
        }
    }
}

/// Preferences persisted by the out-of-scope GUI front-end (target path,
/// process-all flag, font size, theme index). The core pipeline never
/// reads this; it exists purely as the data shape that collaborator owns.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct UiPreferences {
    pub target_path: Option<PathBuf>,
    pub process_all_files: bool,
    pub font_size: u16,
    pub theme_index: u32,
}

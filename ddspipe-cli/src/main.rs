//! Command-line front-end for `ddspipe`. Parses arguments into a
//! [`ddspipe::Configuration`], runs the pipeline, and renders the
//! `Report` stream as terminal progress.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Context;
use clap::Parser;
use ddspipe::{Configuration, Format, OverwritePolicy, ResampleFilter};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ddspipe")]
#[command(author = "ddspipe contributors")]
#[command(version)]
#[command(about = "Convert directory trees of PNG textures into block-compressed DDS files")]
struct Cli {
    /// File, directory, or .txt manifest to convert.
    input: PathBuf,
    /// Output directory; preserves the input's relative structure.
    output: Option<PathBuf>,

    /// Output format. `BC1_ALPHA_BC7` is a deprecated alias for
    /// `--format bc1 --alpha-format bc7`.
    #[arg(long, value_enum, default_value = "bc7")]
    format: CliFormat,
    /// Override format for images with a non-opaque alpha channel.
    #[arg(long)]
    alpha_format: Option<CliFormat>,
    /// BC7 encoder quality, 0 (fastest) to 100 (slowest).
    #[arg(long, default_value_t = 50)]
    quality: u8,

    /// Disable mipmap generation.
    #[arg(long)]
    no_mipmaps: bool,
    /// Resampling filter for mipmap generation.
    #[arg(long, value_enum, default_value = "lanczos")]
    mipmap_filter: CliFilter,
    /// Pre-filter Gaussian blur applied before downsampling each mip level.
    #[arg(long, default_value_t = ddspipe::config::DEFAULT_MIPMAP_BLUR)]
    mipmap_blur: f32,

    /// Scale percentage applied to the base image before encoding, 1..=1000.
    #[arg(long, alias = "sc", default_value_t = ddspipe::config::DEFAULT_SCALE)]
    scale: u16,
    /// Cap the longer dimension to this size, taking priority over `--scale`
    /// whenever it would shrink the image further.
    #[arg(long, alias = "ms")]
    max_size: Option<u32>,
    /// Resampling filter used by `--scale`/`--max-size`.
    #[arg(long, alias = "sf", value_enum, default_value = "lanczos")]
    scale_filter: CliFilter,

    /// Worker thread count; defaults to the host's available parallelism.
    #[arg(long)]
    threads: Option<usize>,
    /// Maximum directory recursion depth.
    #[arg(long, default_value_t = usize::MAX)]
    depth: usize,

    /// Convert even if the destination already exists.
    #[arg(long, conflicts_with = "overwrite_new")]
    overwrite: bool,
    /// Convert only when the destination is older than the source.
    #[arg(long = "overwrite-new", alias = "on", conflicts_with = "overwrite")]
    overwrite_new: bool,

    /// Flip rows vertically before encoding.
    #[arg(long)]
    vflip: bool,
    /// Pad the base image up to a multiple of 4 in each dimension.
    #[arg(long)]
    fix_size: bool,

    /// Only convert paths containing this substring.
    #[arg(long)]
    substring: Option<String>,
    /// Only convert paths matching this regular expression.
    #[arg(long)]
    regex: Option<String>,

    /// Resolve and report only; write nothing.
    #[arg(long)]
    dry_run: bool,
    /// Delete previously produced destination files instead of converting.
    #[arg(long)]
    clean: bool,

    /// Emit 3-color (punch-through) BC1 blocks for near-black transparent pixels.
    #[arg(long = "alpha-black", alias = "bc1-ab")]
    alpha_black: bool,

    /// Raise the default log level from warn to info/debug.
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum CliFormat {
    Bc1,
    Bc3,
    Bc7,
    Png,
    /// Deprecated alias for `bc1` + `--alpha-format bc7`; resolved in
    /// `build_config`, never reaches [`Format`] directly.
    #[value(name = "BC1_ALPHA_BC7")]
    Bc1AlphaBc7,
}

impl From<CliFormat> for Format {
    fn from(value: CliFormat) -> Self {
        match value {
            CliFormat::Bc1 => Format::Bc1,
            CliFormat::Bc3 => Format::Bc3,
            CliFormat::Bc7 => Format::Bc7,
            CliFormat::Png => Format::Png,
            CliFormat::Bc1AlphaBc7 => {
                unreachable!("build_config resolves this alias before conversion")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliFilter {
    Nearest,
    Linear,
    Cubic,
    Area,
    Lanczos,
}

impl From<CliFilter> for ResampleFilter {
    fn from(value: CliFilter) -> Self {
        match value {
            CliFilter::Nearest => ResampleFilter::Nearest,
            CliFilter::Linear => ResampleFilter::Linear,
            CliFilter::Cubic => ResampleFilter::Cubic,
            CliFilter::Area => ResampleFilter::Area,
            CliFilter::Lanczos => ResampleFilter::Lanczos,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(if cli.verbose { "ddspipe=debug" } else { "ddspipe=warn" })),
        )
        .init();

    let config = match build_config(cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err:#}");
            return ExitCode::from(1);
        }
    };

    match run(config) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(1)
        }
    }
}

fn build_config(cli: Cli) -> anyhow::Result<Configuration> {
    if cli.alpha_format == Some(CliFormat::Bc1AlphaBc7) {
        anyhow::bail!("BC1_ALPHA_BC7 is only valid for --format, not --alpha-format");
    }

    let (format, alpha_format) = if cli.format == CliFormat::Bc1AlphaBc7 {
        tracing::warn!("--format BC1_ALPHA_BC7 is deprecated; use --format bc1 --alpha-format bc7");
        (Format::Bc1, Some(Format::Bc7))
    } else {
        (Format::from(cli.format), cli.alpha_format.map(Format::from))
    };

    let regex = cli
        .regex
        .as_deref()
        .map(regex::Regex::new)
        .transpose()
        .context("invalid --regex pattern")?;

    let overwrite = if cli.overwrite {
        OverwritePolicy::Overwrite
    } else if cli.overwrite_new {
        OverwritePolicy::OverwriteNew
    } else {
        OverwritePolicy::SkipExisting
    };

    let threads = cli.threads.unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    });

    let config = Configuration {
        inputs: vec![cli.input],
        output: cli.output,
        format,
        alpha_format,
        quality: cli.quality,
        mipmaps: !cli.no_mipmaps,
        mipmap_filter: cli.mipmap_filter.into(),
        mipmap_blur: cli.mipmap_blur,
        scale: cli.scale,
        max_size: cli.max_size,
        scale_filter: cli.scale_filter.into(),
        threads,
        depth: cli.depth,
        overwrite,
        vflip: cli.vflip,
        fix_size: cli.fix_size,
        substring: cli.substring,
        regex,
        dry_run: cli.dry_run,
        clean: cli.clean,
        alpha_black: cli.alpha_black,
    };

    config.validate().context("invalid configuration")?;
    Ok(config)
}

/// Runs the pipeline to completion, printing progress as it goes.
/// Returns `Ok(true)` on a clean run, `Ok(false)` if any file failed.
fn run(config: Configuration) -> anyhow::Result<bool> {
    let cancel = AtomicBool::new(false);
    let mut had_error = false;
    let total = std::sync::Mutex::new(0usize);
    let completed = std::sync::atomic::AtomicUsize::new(0);

    let report = |event: ddspipe::Report| match event {
        ddspipe::Report::ProcessStarted { total: count } => {
            *total.lock().unwrap() = count;
            println!("resolved {count} file(s)");
        }
        ddspipe::Report::EncodingProgress { index } => {
            let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
            tracing::debug!(index, done, "encoded");
        }
        ddspipe::Report::PipelineError { index, message } => {
            eprintln!("error ({index:?}): {message}");
        }
        _ => {}
    };

    let summary = ddspipe::run(&config, &report, &cancel);
    if summary.errors > 0 {
        had_error = true;
    }
    println!(
        "{} converted, {} error(s) ({} resolved)",
        summary.processed, summary.errors, summary.resolved
    );

    Ok(!had_error)
}

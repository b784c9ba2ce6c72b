//! Black-box integration tests exercising the full resolver -> save
//! pipeline against scratch directories, matching the concrete scenarios
//! in spec.md §8.

use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Mutex;

use ddsfile::Dds;
use ddspipe::config::{Configuration, Format, OverwritePolicy};
use ddspipe::model::Report;

fn write_png(path: &Path, width: u32, height: u32, pixel: [u8; 4]) {
    let image = image::RgbaImage::from_pixel(width, height, image::Rgba(pixel));
    image::DynamicImage::ImageRgba8(image).save(path).unwrap();
}

fn run_collecting(config: &Configuration) -> (ddspipe::pipeline::Summary, Vec<Report>) {
    let events: Mutex<Vec<Report>> = Mutex::new(Vec::new());
    let report = |event: Report| events.lock().unwrap().push(event);
    let cancel = AtomicBool::new(false);
    let summary = ddspipe::run(config, &report, &cancel);
    (summary, events.into_inner().unwrap())
}

fn encoding_progress_count(events: &[Report]) -> usize {
    events
        .iter()
        .filter(|event| matches!(event, Report::EncodingProgress { .. }))
        .count()
}

#[test]
fn opaque_8x8_converts_to_bc7_and_rerun_is_a_noop() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("a.png");
    write_png(&input, 8, 8, [10, 20, 30, 255]);

    let mut config = Configuration::default();
    config.inputs = vec![input.clone()];
    config.format = Format::Bc7;

    let (summary, events) = run_collecting(&config);
    assert_eq!(summary.resolved, 1);
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.errors, 0);
    assert_eq!(encoding_progress_count(&events), 1);

    let destination = dir.path().join("a.dds");
    assert!(destination.exists());
    let bytes = std::fs::read(&destination).unwrap();
    let dds = Dds::read(&bytes[..]).unwrap();
    assert_eq!(dds.get_width(), 8);
    assert_eq!(dds.get_height(), 8);
    assert!(dds.header10.is_some(), "BC7 must carry a DX10 header");

    // Default overwrite policy skips existing destinations, so a rerun
    // resolves nothing and emits no further progress.
    let (summary, events) = run_collecting(&config);
    assert_eq!(summary.resolved, 0);
    assert_eq!(encoding_progress_count(&events), 0);
}

#[test]
fn fix_size_pads_3x3_to_4x4_bc1_single_level() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("small.png");
    write_png(&input, 3, 3, [1, 2, 3, 255]);

    let mut config = Configuration::default();
    config.inputs = vec![input];
    config.format = Format::Bc1;
    config.fix_size = true;
    config.mipmaps = false;

    let (summary, _events) = run_collecting(&config);
    assert_eq!(summary.processed, 1);

    let destination = dir.path().join("small.dds");
    let bytes = std::fs::read(&destination).unwrap();
    let dds = Dds::read(&bytes[..]).unwrap();
    assert_eq!(dds.get_width(), 4);
    assert_eq!(dds.get_height(), 4);
    assert!(dds.header10.is_none(), "BC1 must use the classic FourCC, not DX10");
    // One 4x4 mip level is one 8-byte BC1 block.
    assert_eq!(dds.data.len(), 8);
}

#[test]
fn clean_mode_deletes_previously_produced_dds_files() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("a.png");
    write_png(&input, 8, 8, [10, 20, 30, 255]);

    let mut config = Configuration::default();
    config.inputs = vec![input.clone()];
    config.format = Format::Bc7;
    let (summary, _) = run_collecting(&config);
    assert_eq!(summary.processed, 1);
    assert!(dir.path().join("a.dds").exists());

    config.clean = true;
    config.overwrite = OverwritePolicy::Overwrite;
    let (summary, events) = run_collecting(&config);
    assert_eq!(summary.resolved, 1);
    assert_eq!(encoding_progress_count(&events), 1);
    assert!(!dir.path().join("a.dds").exists());
}

#[test]
fn corrupt_png_is_isolated_and_other_files_still_succeed() {
    let dir = tempfile::tempdir().unwrap();
    let good = dir.path().join("good.png");
    write_png(&good, 4, 4, [5, 5, 5, 255]);
    let bad = dir.path().join("bad.png");
    std::fs::write(&bad, b"not a png").unwrap();

    let mut config = Configuration::default();
    config.inputs = vec![dir.path().to_path_buf()];
    config.format = Format::Bc7;

    let (summary, events) = run_collecting(&config);
    assert_eq!(summary.resolved, 2);
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.errors, 1);
    assert!(events
        .iter()
        .any(|event| matches!(event, Report::PipelineError { .. })));
    assert!(dir.path().join("good.dds").exists());
    assert!(!dir.path().join("bad.dds").exists());
}

#[test]
fn scale_and_max_size_together_respect_max_size_priority() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("a.png");
    write_png(&input, 100, 50, [0, 0, 0, 255]);

    let mut config = Configuration::default();
    config.inputs = vec![input];
    config.format = Format::Bc7;
    config.scale = 200;
    config.max_size = Some(64);
    config.mipmaps = false;

    let (summary, _) = run_collecting(&config);
    assert_eq!(summary.processed, 1);

    let destination = dir.path().join("a.dds");
    let bytes = std::fs::read(&destination).unwrap();
    let dds = Dds::read(&bytes[..]).unwrap();
    assert_eq!(dds.get_width(), 64);
    assert_eq!(dds.get_height(), 32);
    // (64/4)*(32/4) = 16*8 = 128 blocks * 16 bytes/block for BC7.
    assert_eq!(dds.data.len(), 128 * 16);
}

#[test]
fn png_format_without_output_fails_validation() {
    let mut config = Configuration::default();
    config.inputs = vec![std::path::PathBuf::from("input.png")];
    config.format = Format::Png;
    config.output = None;
    assert!(config.validate().is_err());
}

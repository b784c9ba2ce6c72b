//! C1 Input Resolver (spec.md §4.1): expands configured input paths into
//! an ordered list of [`FileTask`]s, honouring depth limits, path filters,
//! the overwrite policy, and `clean` mode.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use walkdir::WalkDir;

use crate::config::{Configuration, OverwritePolicy};
use crate::error::ResolveError;
use crate::model::{FileTask, Report};

const PROGRESS_STEP: usize = 50;

/// Resolve every configured input path into an ordered list of admitted
/// [`FileTask`]s, reporting progress and per-path errors via `report`.
pub fn resolve(config: &Configuration, report: &dyn Fn(Report)) -> Vec<FileTask> {
    report(Report::RetrievalStarted);
    let started = std::time::Instant::now();

    let mut pairs: Vec<(PathBuf, PathBuf)> = Vec::new();
    for input in &config.inputs {
        match collect_input(input, config, report) {
            Ok(mut found) => pairs.append(&mut found),
            Err(err) => report(Report::PipelineError {
                index: None,
                message: err.to_string(),
            }),
        }
    }

    let mut filtered = Vec::with_capacity(pairs.len());
    for (index, (source, destination)) in pairs.into_iter().enumerate() {
        if !passes_filters(&source, config, &report) {
            continue;
        }
        if !config.clean && !admitted_by_overwrite_policy(&source, &destination, config) {
            continue;
        }
        filtered.push(FileTask::new(index, source, destination));
        if filtered.len() % PROGRESS_STEP == 0 {
            report(Report::RetrievalProgress(filtered.len()));
        }
    }

    report(Report::RetrievalProgress(filtered.len()));
    report(Report::RetrievalTime(started.elapsed().as_millis() as u64));
    report(Report::ProcessStarted {
        total: filtered.len(),
    });

    filtered
}

fn passes_filters(source: &Path, config: &Configuration, report: &dyn Fn(Report)) -> bool {
    if let Some(substring) = &config.substring {
        if !source.to_string_lossy().contains(substring.as_str()) {
            return false;
        }
    }
    if let Some(regex) = &config.regex {
        let absolute = fs::canonicalize(source).unwrap_or_else(|_| source.to_path_buf());
        if !regex.is_match(&absolute.to_string_lossy()) {
            return false;
        }
    }
    let _ = report;
    true
}

fn admitted_by_overwrite_policy(source: &Path, destination: &Path, config: &Configuration) -> bool {
    match config.overwrite {
        OverwritePolicy::Overwrite => true,
        OverwritePolicy::OverwriteNew => {
            let Ok(dest_meta) = fs::metadata(destination) else {
                return true;
            };
            let Ok(src_meta) = fs::metadata(source) else {
                return true;
            };
            let dest_mtime = dest_meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            let src_mtime = src_meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            dest_mtime < src_mtime
        }
        OverwritePolicy::SkipExisting => !destination.exists(),
    }
}

fn collect_input(
    input: &Path,
    config: &Configuration,
    report: &dyn Fn(Report),
) -> Result<Vec<(PathBuf, PathBuf)>, ResolveError> {
    if input.extension().and_then(|e| e.to_str()) == Some("txt") {
        return collect_manifest(input, config, report);
    }
    if input.is_dir() {
        return Ok(collect_directory(input, input, config, report, false));
    }
    if is_png(input) {
        let destination = destination_for(input, input.parent().unwrap_or(input), config, false);
        return Ok(vec![(input.to_path_buf(), destination)]);
    }
    Ok(Vec::new())
}

/// Walk `search_root` for PNG files under `root`. `ignore_output` forces
/// destinations beside their source regardless of `config.output` — used
/// for manifest-listed directories, whose destinations must stay beside
/// the source (spec.md §4.1).
fn collect_directory(
    root: &Path,
    search_root: &Path,
    config: &Configuration,
    report: &dyn Fn(Report),
    ignore_output: bool,
) -> Vec<(PathBuf, PathBuf)> {
    let mut results = Vec::new();
    let walker = WalkDir::new(search_root)
        .max_depth(config.depth)
        .sort_by_file_name();
    for entry in walker {
        match entry {
            Ok(entry) => {
                if entry.file_type().is_file() && is_png(entry.path()) {
                    let destination = destination_for(entry.path(), root, config, ignore_output);
                    results.push((entry.path().to_path_buf(), destination));
                }
            }
            Err(err) => {
                report(Report::PipelineError {
                    index: None,
                    message: err.to_string(),
                });
            }
        }
    }
    results
}

fn collect_manifest(
    manifest: &Path,
    config: &Configuration,
    report: &dyn Fn(Report),
) -> Result<Vec<(PathBuf, PathBuf)>, ResolveError> {
    let contents = fs::read_to_string(manifest).map_err(|source| ResolveError::ReadManifest {
        path: manifest.to_path_buf(),
        source,
    })?;
    let manifest_dir = manifest.parent().unwrap_or(Path::new("."));

    let mut results = Vec::new();
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let path = manifest_dir.join(line);
        if path.is_dir() {
            // Destination is placed beside the source; output is ignored.
            results.extend(collect_directory(&path, &path, config, report, true));
        } else if is_png(&path) {
            let destination = path.with_extension(config.final_extension());
            results.push((path, destination));
        }
    }
    Ok(results)
}

fn is_png(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("png"))
        .unwrap_or(false)
}

fn destination_for(source: &Path, root: &Path, config: &Configuration, ignore_output: bool) -> PathBuf {
    let base = match (&config.output, ignore_output) {
        (Some(output), false) => {
            let relative = source.strip_prefix(root).unwrap_or(source);
            output.join(relative)
        }
        _ => source.to_path_buf(),
    };
    base.with_extension(config.final_extension())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destination_rebases_under_output() {
        let mut config = Configuration::default();
        config.output = Some(PathBuf::from("/out"));
        let dest = destination_for(Path::new("/in/a/b.png"), Path::new("/in"), &config, false);
        assert_eq!(dest, PathBuf::from("/out/a/b.dds"));
    }

    #[test]
    fn destination_beside_source_without_output() {
        let config = Configuration::default();
        let dest = destination_for(Path::new("/in/a/b.png"), Path::new("/in"), &config, false);
        assert_eq!(dest, PathBuf::from("/in/a/b.dds"));
    }

    #[test]
    fn destination_ignores_output_when_forced() {
        let mut config = Configuration::default();
        config.output = Some(PathBuf::from("/out"));
        let dest = destination_for(Path::new("/in/a/b.png"), Path::new("/in"), &config, true);
        assert_eq!(dest, PathBuf::from("/in/a/b.dds"));
    }

    #[test]
    fn overwrite_new_skips_when_destination_newer() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("a.png");
        let dst = dir.path().join("a.dds");
        fs::write(&src, b"x").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(10));
        fs::write(&dst, b"y").unwrap();

        let mut config = Configuration::default();
        config.overwrite = OverwritePolicy::OverwriteNew;
        assert!(!admitted_by_overwrite_policy(&src, &dst, &config));
    }

    #[test]
    fn overwrite_new_admits_when_source_newer() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("a.png");
        let dst = dir.path().join("a.dds");
        fs::write(&dst, b"y").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(10));
        fs::write(&src, b"x").unwrap();

        let mut config = Configuration::default();
        config.overwrite = OverwritePolicy::OverwriteNew;
        assert!(admitted_by_overwrite_policy(&src, &dst, &config));
    }

    #[test]
    fn skip_existing_admits_only_when_absent() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("a.png");
        let dst = dir.path().join("a.dds");
        fs::write(&src, b"x").unwrap();

        let config = Configuration::default();
        assert!(admitted_by_overwrite_policy(&src, &dst, &config));
        fs::write(&dst, b"y").unwrap();
        assert!(!admitted_by_overwrite_policy(&src, &dst, &config));
    }

    #[test]
    fn manifest_directory_entries_ignore_output_override() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("textures");
        fs::create_dir(&sub).unwrap();
        fs::write(sub.join("a.png"), b"png-bytes").unwrap();

        let manifest = dir.path().join("list.txt");
        fs::write(&manifest, "textures\n").unwrap();

        let mut config = Configuration::default();
        config.output = Some(dir.path().join("out"));

        let pairs = collect_manifest(&manifest, &config, &|_| {}).unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].1, sub.join("a.dds"));
    }

    #[test]
    fn unreadable_directory_entry_is_reported_and_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.png"), b"png-bytes").unwrap();
        let missing = dir.path().join("does-not-exist");

        let config = Configuration::default();
        let events = std::sync::Mutex::new(Vec::new());
        let report = |event: Report| events.lock().unwrap().push(event);

        // Walking a root that disappears/never existed yields a walkdir
        // error for that entry rather than a panic; it must be reported
        // rather than silently dropped.
        let results = collect_directory(&missing, &missing, &config, &report, false);

        assert!(results.is_empty());
        let reported = events.into_inner().unwrap();
        assert!(reported
            .iter()
            .any(|event| matches!(event, Report::PipelineError { .. })));
    }
}

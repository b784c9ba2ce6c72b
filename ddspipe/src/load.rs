//! C2 Load stage (spec.md §4.2). Runs with a single worker in the
//! orchestrator (serial per disk); this module itself is just the pure
//! read-a-file-into-memory operation.

use std::fs;

use crate::model::{FileTask, PngBlob};

/// Read `task.source_path` into a [`PngBlob`]. An IO failure yields an
/// empty blob; the caller is responsible for reporting the error and
/// letting the token continue so ordering invariants hold.
pub fn load(task: &FileTask) -> Result<PngBlob, (PngBlob, std::io::Error)> {
    if task.source_path.as_os_str().is_empty() {
        return Ok(PngBlob {
            index: task.index,
            bytes: Vec::new(),
        });
    }
    match fs::read(&task.source_path) {
        Ok(bytes) => Ok(PngBlob {
            index: task.index,
            bytes,
        }),
        Err(err) => Err((
            PngBlob {
                index: task.index,
                bytes: Vec::new(),
            },
            err,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn load_missing_file_reports_error() {
        let task = FileTask::new(0, PathBuf::from("/nonexistent/a.png"), PathBuf::from("/tmp/a.dds"));
        let result = load(&task);
        assert!(result.is_err());
    }

    #[test]
    fn load_existing_file_returns_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.png");
        std::fs::write(&path, b"png-bytes").unwrap();
        let task = FileTask::new(0, path, dir.path().join("a.dds"));
        let blob = load(&task).unwrap();
        assert_eq!(blob.bytes, b"png-bytes");
    }
}

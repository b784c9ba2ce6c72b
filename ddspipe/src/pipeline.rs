//! C8 Pipeline Orchestrator (spec.md §4.8). Wires the per-stage functions
//! together into a bounded producer/worker pipeline: a single loader
//! thread reads every file serially (spinning storage thrashes under
//! concurrent reads) and feeds a bounded channel; a `rayon` pool fans the
//! CPU-heavy decode/scale/mipmap/encode stages out across `threads`
//! workers and, once a task's bytes are ready, saves it from that same
//! worker rather than funnelling every write through one thread — save is
//! serial only *within* a single file, not across the whole run. Every
//! stage boundary polls `cancel`. Destination-path collisions across
//! in-flight tasks are caught by `claim_destination` before a worker
//! starts, which is also what makes parallel saves safe: two tasks never
//! race on the same path.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::config::Configuration;
use crate::error::TaskError;
use crate::model::{FileTask, PngBlob, Report};
use crate::{decode, dds, encode, load, mipmap, resolve, scale};

/// Outcome of a full pipeline run.
#[derive(Debug, Clone, Copy, Default)]
pub struct Summary {
    pub resolved: usize,
    pub processed: usize,
    pub errors: usize,
}

/// Number of in-flight tasks buffered between the loader thread and the
/// worker pool: `2 * parallelism` caps memory use while keeping every
/// worker fed.
fn channel_capacity(parallelism: usize) -> usize {
    (2 * parallelism).max(2)
}

struct LoadedTask {
    task: FileTask,
    blob: PngBlob,
}

/// Run the full pipeline: resolve inputs, then either delete (`clean`)
/// or load/decode/scale/mipmap/encode/save each task. `report` is called
/// from multiple threads and must tolerate concurrent invocation.
pub fn run(config: &Configuration, report: &(dyn Fn(Report) + Sync), cancel: &AtomicBool) -> Summary {
    let tasks = resolve::resolve(config, report);
    let resolved = tasks.len();

    if config.clean {
        let mut errors = 0;
        for task in &tasks {
            if cancel.load(Ordering::Relaxed) {
                break;
            }
            match dds::clean(&task.destination_path) {
                Ok(()) => report(Report::EncodingProgress { index: task.index }),
                Err(err) => {
                    errors += 1;
                    report(Report::PipelineError {
                        index: Some(task.index),
                        message: err.to_string(),
                    });
                }
            }
        }
        return Summary {
            resolved,
            processed: resolved - errors,
            errors,
        };
    }

    let parallelism = config.threads.max(1);
    let capacity = channel_capacity(parallelism);

    let (load_tx, load_rx) = crossbeam_channel::bounded::<LoadedTask>(capacity);

    let errors = AtomicUsize::new(0);
    let processed = AtomicUsize::new(0);
    let in_flight_destinations: Mutex<HashSet<PathBuf>> = Mutex::new(HashSet::new());

    std::thread::scope(|scope| {
        // Load runs on a single dedicated thread: only one `fs::read` is
        // ever in flight, matching the serial-per-stage contract.
        scope.spawn(|| {
            for task in tasks {
                if cancel.load(Ordering::Relaxed) {
                    break;
                }
                let blob = match load::load(&task) {
                    Ok(blob) => blob,
                    Err((blob, source)) => {
                        report(Report::PipelineError {
                            index: Some(task.index),
                            message: crate::error::LoadError::Io {
                                path: task.source_path.clone(),
                                source,
                            }
                            .to_string(),
                        });
                        blob
                    }
                };
                report(Report::FileLoaded { index: task.index });
                if load_tx.send(LoadedTask { task, blob }).is_err() {
                    break;
                }
            }
        });

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(parallelism)
            .build()
            .expect("thread pool with a positive worker count always builds");

        pool.install(|| {
            use rayon::iter::{ParallelBridge, ParallelIterator};
            load_rx.into_iter().par_bridge().for_each(|loaded| {
                if cancel.load(Ordering::Relaxed) {
                    return;
                }
                let LoadedTask { mut task, blob } = loaded;
                if !claim_destination(&in_flight_destinations, &task.destination_path) {
                    errors.fetch_add(1, Ordering::Relaxed);
                    report(Report::PipelineError {
                        index: Some(task.index),
                        message: format!(
                            "duplicate destination {}",
                            task.destination_path.display()
                        ),
                    });
                    return;
                }

                let result = process_one(&mut task, &blob, config);
                finish_task(task, result, config.dry_run, report, &processed, &errors);
            });
        });
    });

    Summary {
        resolved,
        processed: processed.load(Ordering::Relaxed),
        errors: errors.load(Ordering::Relaxed),
    }
}

fn claim_destination(in_flight: &Mutex<HashSet<PathBuf>>, destination: &PathBuf) -> bool {
    in_flight
        .lock()
        .expect("in-flight destination set mutex is never poisoned")
        .insert(destination.clone())
}

/// Run decode -> scale -> mipmap -> encode -> serialize for one already-
/// loaded task. `Ok(None)` means the task was a no-op pass-through (the
/// load failed upstream) and nothing should be written.
fn process_one(
    task: &mut FileTask,
    blob: &PngBlob,
    config: &Configuration,
) -> Result<Option<Vec<u8>>, TaskError> {
    let Some(mut chain) = decode::decode(task, blob, config)? else {
        return Ok(None);
    };

    chain = scale::scale(chain, config);
    mipmap::generate_mipmaps(&mut chain, config);

    let blob = encode::encode(&chain, task.index, config)?;
    let bytes = dds::serialize(&blob)?;
    Ok(Some(bytes))
}

/// Save `task`'s encoded bytes (if any) and report the outcome. Runs on
/// the worker that produced `result`, so saves across distinct
/// destinations proceed in parallel; `claim_destination` already
/// guarantees no two workers ever call this for the same path.
fn finish_task(
    task: FileTask,
    result: Result<Option<Vec<u8>>, TaskError>,
    dry_run: bool,
    report: &(dyn Fn(Report) + Sync),
    processed: &AtomicUsize,
    errors: &AtomicUsize,
) {
    match result {
        Ok(Some(bytes)) => match dds::save(&task.destination_path, &bytes, dry_run) {
            Ok(()) => {
                processed.fetch_add(1, Ordering::Relaxed);
                report(Report::EncodingProgress { index: task.index });
            }
            Err(err) => {
                errors.fetch_add(1, Ordering::Relaxed);
                report(Report::PipelineError {
                    index: Some(task.index),
                    message: err.to_string(),
                });
            }
        },
        Ok(None) => {}
        Err(err) => {
            errors.fetch_add(1, Ordering::Relaxed);
            report(Report::PipelineError {
                index: Some(task.index),
                message: err.to_string(),
            });
        }
    }
}

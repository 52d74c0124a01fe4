//! Worker Pool: spawns N threads that drain the work queue, running each
//! task through classification, hashing, and dispatch, then emitting the
//! finished `FileResult` (§4.5).

use std::path::PathBuf;
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::Sender;

use crate::classify::{self, Classification};
use crate::hash;
use crate::log::RunLog;
use crate::queue::QueueHandle;
use crate::registry::SignatureRegistry;
use crate::dispatch;
use crate::result::{self, FileResult};

/// Shared, read-only context every worker thread needs.
pub struct PoolContext {
    pub registry: Arc<SignatureRegistry>,
    pub run_log: Arc<RunLog>,
    pub staging_root: PathBuf,
    pub temp_dir: Option<PathBuf>,
    /// Sender half of the run's result channel; every finished
    /// `FileResult` is placed here in addition to being printed.
    pub results_tx: Sender<FileResult>,
}

/// Spawns `threads` workers draining `queue` until it is permanently
/// closed. The caller is expected to `queue.join()` and then let the
/// process exit; workers are not explicitly joined, mirroring the
/// short-lived, one-scan-per-invocation lifecycle of this tool.
pub fn spawn(threads: usize, ctx: Arc<PoolContext>, queue: QueueHandle) -> Vec<JoinHandle<()>> {
    (0..threads.max(1))
        .map(|_| {
            let ctx = ctx.clone();
            let queue = queue.clone();
            std::thread::spawn(move || worker_loop(&ctx, &queue))
        })
        .collect()
}

fn worker_loop(ctx: &PoolContext, queue: &QueueHandle) {
    while let Some(task) = queue.get() {
        let result = process_task(ctx, &task, queue);
        match result {
            Ok(Some(file_result)) => result::emit(file_result, &ctx.results_tx),
            Ok(None) => {}
            Err(err) => tracing::warn!(
                "failed to process {}: {err}",
                task.path.display()
            ),
        }
        queue.task_done();
    }
}

/// Runs one task through classification, hashing, and dispatch, without
/// emitting it anywhere. Exposed alongside `worker_loop` so callers that
/// want the results in hand (tests, embedders) can drive the pipeline
/// single-threaded instead of going through `spawn`.
pub fn process_task(
    ctx: &PoolContext,
    task: &crate::queue::Task,
    queue: &QueueHandle,
) -> std::io::Result<Option<FileResult>> {
    let classification = classify::classify(&task.path, task.labels.clone(), &ctx.staging_root)?;
    let Classification::Regular = classification else {
        return Ok(match classification {
            Classification::ShortCircuit(result) => result,
            Classification::Regular => unreachable!(),
        });
    };

    let filesize = std::fs::metadata(&task.path)?.len();
    let digests = hash::hash_file(&task.path)?;
    let outcome = dispatch::scan_and_dispatch(
        &ctx.registry,
        &task.path,
        filesize,
        &ctx.staging_root,
        &ctx.run_log,
        ctx.temp_dir.as_deref(),
        queue,
    )?;

    let mut labels = task.labels.clone();
    labels.insert(outcome.probe_label.to_string());
    labels.extend(outcome.merged_labels);

    let (fullfilename, filename) = classify::names(&task.path, &ctx.staging_root);
    let mut file_result = FileResult::minimal(fullfilename, filename, labels);
    file_result.filesize = Some(filesize);
    file_result.md5 = Some(digests.md5);
    file_result.sha1 = Some(digests.sha1);
    file_result.sha256 = Some(digests.sha256);
    file_result.unpackedfiles = outcome.reports;

    Ok(Some(file_result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::RunLog;
    use crate::queue::{Task, TaskQueue};
    use crate::registry::default_registry;
    use crate::result::Labels;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn processes_a_root_task_and_drains_recursively_enqueued_children() {
        let dir = tempdir().expect("tempdir");
        let staging_root = dir.path().to_path_buf();

        // Gzip member preceded by non-signature bytes; the carved member
        // is written out as a child and recursively enqueued.
        let mut data = vec![0xAAu8; 16];
        data.extend_from_slice(&[0x1F, 0x8B, 0x08, 0x00]);
        data.extend_from_slice(&[0x00; 6]);
        data.extend_from_slice(b"DATA payload for the gzip member");

        let path = staging_root.join("evidence.bin");
        std::fs::File::create(&path).unwrap().write_all(&data).unwrap();

        let queue = TaskQueue::new();
        let handle = queue.handle();
        queue.put(Task {
            path: path.clone(),
            labels: Labels::from_iter(["root".to_string()]),
        });

        let results = result::ResultChannel::new();
        let ctx = Arc::new(PoolContext {
            registry: Arc::new(default_registry()),
            run_log: Arc::new(RunLog::open(staging_root.as_path()).expect("log")),
            staging_root,
            temp_dir: None,
            results_tx: results.sender(),
        });

        let _workers = spawn(2, ctx, handle);
        queue.join();

        // The gzip member and its recursively-enqueued child should both
        // have reached the result channel by the time the queue drains.
        assert_eq!(results.drain().len(), 2);
    }
}

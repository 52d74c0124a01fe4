//! Dispatch & Carving Engine: orders candidates from the scanner, invokes
//! unpackers, reconciles success/failure, carves consumed ranges, and
//! enqueues extracted children (§4.4).

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::log::RunLog;
use crate::queue::{QueueHandle, Task};
use crate::registry::SignatureRegistry;
use crate::result::{Labels, UnpackReport};
use crate::scanner::{Candidate, SlidingWindowScanner, TextProbe};

/// Per-file dispatch state. `last_unpacked_offset` starts at `None`
/// (conceptually -1): nothing has been carved yet, so every non-negative
/// candidate offset is eligible.
struct DispatchState {
    last_unpacked_offset: Mutex<Option<u64>>,
    counters_per_signature: Mutex<std::collections::HashMap<String, u64>>,
    reports: Mutex<Vec<UnpackReport>>,
    merged_labels: Mutex<Labels>,
}

/// Scans `path` and dispatches every candidate the scanner finds, per the
/// Dispatch & Carving Engine flow. Returns the ordered reports and any
/// labels the unpacker at offset 0 contributed when it consumed the whole
/// file.
pub struct DispatchOutcome {
    pub reports: Vec<UnpackReport>,
    pub merged_labels: Labels,
    pub probe_label: &'static str,
}

pub fn scan_and_dispatch(
    registry: &SignatureRegistry,
    path: &Path,
    filesize: u64,
    staging_root: &Path,
    run_log: &RunLog,
    temp_dir: Option<&Path>,
    queue: &QueueHandle,
) -> std::io::Result<DispatchOutcome> {
    let state = DispatchState {
        last_unpacked_offset: Mutex::new(None),
        counters_per_signature: Mutex::new(std::collections::HashMap::new()),
        reports: Mutex::new(Vec::new()),
        merged_labels: Mutex::new(Labels::new()),
    };

    let scanner = SlidingWindowScanner::new(registry);
    let mut probe = TextProbe::default();

    scanner.scan(
        path,
        &mut probe,
        || state.last_unpacked_offset.lock().unwrap().unwrap_or(0),
        |batch: &[Candidate]| {
            for candidate in batch {
                dispatch_one(
                    &state,
                    registry,
                    path,
                    filesize,
                    staging_root,
                    candidate,
                    run_log,
                    temp_dir,
                    queue,
                );
            }
        },
    )?;

    Ok(DispatchOutcome {
        reports: state.reports.into_inner().unwrap(),
        merged_labels: state.merged_labels.into_inner().unwrap(),
        probe_label: probe.label(),
    })
}

fn dispatch_one(
    state: &DispatchState,
    registry: &SignatureRegistry,
    path: &Path,
    filesize: u64,
    staging_root: &Path,
    candidate: &Candidate,
    run_log: &RunLog,
    temp_dir: Option<&Path>,
    queue: &QueueHandle,
) {
    // Step 1: drop candidates inside already-carved data.
    {
        let last = state.last_unpacked_offset.lock().unwrap();
        if let Some(last) = *last {
            if candidate.offset < last {
                return;
            }
        }
    }

    // Step 2: drop candidates with no registered handler.
    let handler = match registry.handler(&candidate.signature_key) {
        Some(h) => h.clone(),
        None => return,
    };
    let display_name = registry
        .display_name(&candidate.signature_key)
        .unwrap_or(&candidate.signature_key)
        .to_string();

    let path_str = path.display().to_string();
    run_log.trying(&path_str, &candidate.signature_key, candidate.offset);

    // Step 3: allocate a fresh directory, retrying past filesystem races.
    let (target_dir, attempt_n) = match allocate_directory(state, path, &display_name) {
        Some(v) => v,
        None => {
            run_log.fail(
                &path_str,
                &candidate.signature_key,
                candidate.offset,
                "could not allocate an extraction directory",
            );
            return;
        }
    };

    // Step 4: invoke the handler.
    let verdict = handler.try_unpack(path, candidate.offset, &target_dir, temp_dir);

    match verdict {
        Err(failure) => {
            // Step 5: clean up and move on; the counter is not committed.
            run_log.fail(
                &path_str,
                &candidate.signature_key,
                candidate.offset,
                &failure.reason,
            );
            cleanup_failed_dir(&target_dir);
        }
        Ok(success) if success.consumed_length == 0 => {
            // Open Question 3: a zero-length success would stall
            // `lastUnpackedOffset` forever; treat it as a dispatch-level
            // defect rather than honoring it.
            run_log.fail(
                &path_str,
                &candidate.signature_key,
                candidate.offset,
                "unpacker reported zero consumed_length on success",
            );
            cleanup_failed_dir(&target_dir);
        }
        Ok(success) => {
            // Step 6: commit.
            {
                let mut counters = state.counters_per_signature.lock().unwrap();
                counters.insert(display_name.clone(), attempt_n);
            }

            let whole_file = candidate.offset == 0 && success.consumed_length == filesize;
            if whole_file {
                let mut labels = state.merged_labels.lock().unwrap();
                labels.extend(success.new_labels.iter().cloned());
                if success.produced.is_empty() {
                    let _ = std::fs::remove_dir_all(&target_dir);
                }
            }

            let unpackdirectory = if success.produced.is_empty() {
                None
            } else {
                Some(
                    target_dir
                        .strip_prefix(staging_root)
                        .unwrap_or(&target_dir)
                        .to_string_lossy()
                        .to_string(),
                )
            };

            let report = UnpackReport {
                offset: candidate.offset,
                signature: candidate.signature_key.clone(),
                type_name: display_name.clone(),
                size: success.consumed_length,
                files: success
                    .produced
                    .iter()
                    .map(|p| p.path.display().to_string())
                    .collect(),
                unpackdirectory,
            };
            state.reports.lock().unwrap().push(report);

            run_log.success(
                &path_str,
                &candidate.signature_key,
                candidate.offset,
                success.consumed_length,
            );

            for produced in &success.produced {
                queue.put(Task {
                    path: target_dir.join(&produced.path),
                    labels: produced.labels.clone(),
                });
            }

            let mut last = state.last_unpacked_offset.lock().unwrap();
            let new_last = candidate.offset + success.consumed_length;
            *last = Some(last.map_or(new_last, |l| l.max(new_last)));
        }
    }
}

fn allocate_directory(
    state: &DispatchState,
    path: &Path,
    display_name: &str,
) -> Option<(PathBuf, u64)> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let file_name = path.file_name()?.to_string_lossy().to_string();

    let start = {
        let counters = state.counters_per_signature.lock().unwrap();
        counters.get(display_name).copied().unwrap_or(0) + 1
    };

    // Bounded retry: filesystem EEXIST races bump the counter, but an
    // unbounded name collision run is a sign of something else wrong.
    for n in start..start + 10_000 {
        let candidate_dir = parent.join(format!("{file_name}-{display_name}-{n}"));
        match std::fs::create_dir(&candidate_dir) {
            Ok(()) => return Some((candidate_dir, n)),
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => continue,
            Err(_) => return None,
        }
    }
    None
}

/// Restores writable/executable mode on every non-symlink entry under
/// `dir`, then removes it recursively. Symlinks are never `chmod`ed,
/// since that would affect their target rather than the link itself.
fn cleanup_failed_dir(dir: &Path) {
    if !dir.exists() {
        return;
    }
    make_removable(dir);
    let _ = std::fs::remove_dir_all(dir);
}

fn make_removable(dir: &Path) {
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(_) => return,
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let metadata = match entry.file_type() {
            Ok(t) => t,
            Err(_) => continue,
        };
        if metadata.is_symlink() {
            continue;
        }
        if metadata.is_dir() {
            make_removable(&path);
        }
        set_rwx(&path);
    }
    set_rwx(dir);
}

#[cfg(unix)]
fn set_rwx(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    let _ = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700));
}

#[cfg(not(unix))]
fn set_rwx(path: &Path) {
    if let Ok(metadata) = std::fs::metadata(path) {
        let mut perms = metadata.permissions();
        perms.set_readonly(false);
        let _ = std::fs::set_permissions(path, perms);
    }
}

//! SCCDAG DOT dumps for diagnostics

use crate::features::sccdag::{write_dot, SccDag};
use crate::shared::models::{Function, LoopId};
use std::path::{Path, PathBuf};

/// Paths of the original and task dumps of `loop_id` under `dir`
pub fn dump_paths(dir: &Path, loop_id: LoopId) -> (PathBuf, PathBuf) {
    (
        dir.join(format!("sccdag-original-{}.dot", loop_id.0)),
        dir.join(format!("sccdag-task-{}.dot", loop_id.0)),
    )
}

/// Write both SCCDAGs of one loop. Failures are logged and swallowed.
pub fn dump_sccdags(
    dir: &Path,
    loop_id: LoopId,
    original: (&SccDag, &Function),
    task: (&SccDag, &Function),
) {
    if let Err(e) = std::fs::create_dir_all(dir) {
        tracing::warn!(dir = %dir.display(), error = %e, "cannot create sccdag dump directory");
        return;
    }
    let (original_path, task_path) = dump_paths(dir, loop_id);
    for (path, (dag, func)) in [(original_path, original), (task_path, task)] {
        let title = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("sccdag")
            .to_string();
        match write_dot(dag, func, &title, &path) {
            Ok(()) => tracing::debug!(path = %path.display(), "sccdag dumped"),
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "sccdag dump failed"),
        }
    }
}

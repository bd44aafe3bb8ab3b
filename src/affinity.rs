//! CPU-core pinning for stage threads.
//!
//! Pinning is best-effort: stages that request a core log a warning and
//! keep running unpinned when the platform refuses, they never fail.

use crate::error::{PipelineError, Result};

/// Pin the calling thread to the CPU core with the given index.
///
/// Returns [`PipelineError::Affinity`] if the index does not name an
/// available core or the platform rejects the request. Callers treat this
/// as a warning, not a fatal condition.
pub fn pin_current_thread(core: usize) -> Result<()> {
    let core_ids =
        core_affinity::get_core_ids().ok_or(PipelineError::Affinity { core })?;
    let core_id = core_ids
        .into_iter()
        .find(|id| id.id == core)
        .ok_or(PipelineError::Affinity { core })?;
    if core_affinity::set_for_current(core_id) {
        tracing::debug!("Pinned current thread to CPU core {}", core);
        Ok(())
    } else {
        Err(PipelineError::Affinity { core })
    }
}

//! Admission planning: pick which waiting jobs start now.

use crate::core::{JobRecord, JobState, ResourceLedger};

/// Admit every waiting job that fits, scanning in insertion order.
///
/// A job that does not fit is skipped, so a smaller job behind it may start
/// first. Units for admitted jobs are committed on the ledger before this
/// returns. Admitted records come back in insertion order, marked
/// [`JobState::Running`]; the rest stay in `waiting` in their original order.
pub fn plan(waiting: &mut Vec<JobRecord>, ledger: &mut ResourceLedger) -> Vec<JobRecord> {
    if waiting.is_empty() || ledger.available() == 0 {
        return Vec::new();
    }

    let mut chosen = Vec::new();
    for (idx, record) in waiting.iter().enumerate() {
        if ledger.try_commit(record.units()) {
            chosen.push(idx);
        }
    }

    // Remove from the back so earlier indices stay valid.
    let mut admitted: Vec<JobRecord> = chosen
        .into_iter()
        .rev()
        .map(|idx| waiting.remove(idx))
        .collect();
    admitted.reverse();

    for record in &mut admitted {
        record.state = JobState::Running;
    }
    admitted
}

use dashmap::DashMap;

use super::Operation;

/// Counts in-flight calls per operation kind.
///
/// Each call holds an [`InFlightGuard`]; the count drops when the guard does,
/// including when the calling future is cancelled.
#[derive(Debug, Default)]
pub struct InFlight {
    counts: DashMap<Operation, usize>,
}

impl InFlight {
    pub fn begin(&self, op: Operation) -> InFlightGuard<'_> {
        *self.counts.entry(op).or_insert(0) += 1;
        InFlightGuard { tracker: self, op }
    }

    pub fn is_pending(&self, op: Operation) -> bool {
        self.counts.get(&op).is_some_and(|n| *n > 0)
    }

    pub fn any(&self) -> bool {
        self.counts.iter().any(|entry| *entry.value() > 0)
    }
}

pub struct InFlightGuard<'a> {
    tracker: &'a InFlight,
    op: Operation,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let idle = match self.tracker.counts.get_mut(&self.op) {
            Some(mut n) => {
                *n = n.saturating_sub(1);
                *n == 0
            }
            None => false,
        };
        // the shard lock is released above; a concurrent begin() may have bumped it again
        if idle {
            self.tracker.counts.remove_if(&self.op, |_, n| *n == 0);
        }
    }
}

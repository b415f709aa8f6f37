use std::{cmp::Reverse, collections::BinaryHeap};

/// Handle of one scheduled tick. A pipeline owns at most one live id at a time.
pub type TimerId = u64;

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
struct Entry {
    due_us: i64,
    id: TimerId,
    pipeline: String,
}

/// Min-heap of pending pipeline ticks.
///
/// Cancelling is lazy: the pipeline forgets its timer id and stale entries are dropped when
/// they surface.
#[derive(Debug, Default)]
pub(crate) struct TimerQueue {
    heap: BinaryHeap<Reverse<Entry>>,
    next_id: TimerId,
}

impl TimerQueue {
    pub(crate) fn schedule(&mut self, pipeline: &str, due_ms: f64) -> TimerId {
        let id = self.next_id;
        self.next_id += 1;
        self.heap.push(Reverse(Entry {
            due_us: to_us(due_ms),
            id,
            pipeline: pipeline.to_owned(),
        }));
        id
    }

    /// Pop the earliest entry due at or before `now_ms`. Ties pop in scheduling order.
    pub(crate) fn pop_due(&mut self, now_ms: f64) -> Option<(TimerId, String)> {
        let now = to_us(now_ms);
        if self.heap.peek().is_some_and(|Reverse(e)| e.due_us <= now) {
            let Reverse(e) = self.heap.pop()?;
            return Some((e.id, e.pipeline));
        }
        None
    }

    /// Earliest due time, stale entries included.
    pub(crate) fn peek_due_ms(&self) -> Option<f64> {
        self.heap.peek().map(|Reverse(e)| e.due_us as f64 / 1000.0)
    }

    /// Drop entries `is_live` rejects.
    pub(crate) fn retain(&mut self, mut is_live: impl FnMut(&str, TimerId) -> bool) {
        self.heap.retain(|Reverse(e)| is_live(&e.pipeline, e.id));
    }

    pub(crate) fn clear(&mut self) {
        self.heap.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.heap.len()
    }
}

fn to_us(ms: f64) -> i64 {
    (ms * 1000.0).round() as i64
}

use std::collections::VecDeque;
use std::time::Instant;

/// A value tagged with the instant it entered the window.
#[derive(Clone, Debug)]
pub struct TimedValue<T> {
    pub at: Instant,
    pub value: T,
}

/// Capacity-bounded window ordered by arrival.
///
/// Once full, every push evicts the oldest entry. Age is not enforced on
/// push; readers filter with [`RollingWindow::newer_than`].
#[derive(Debug)]
pub struct RollingWindow<T> {
    values: VecDeque<TimedValue<T>>,
    capacity: usize,
}

impl<T> RollingWindow<T> {
    /// A zero capacity is bumped to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, value: T) {
        self.push_at(Instant::now(), value);
    }

    pub fn push_at(&mut self, at: Instant, value: T) {
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(TimedValue { at, value });
    }

    /// Values that entered strictly after `cutoff`, oldest first.
    pub fn newer_than(&self, cutoff: Instant) -> impl Iterator<Item = &T> + '_ {
        self.values
            .iter()
            .filter(move |v| v.at > cutoff)
            .map(|v| &v.value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.values.iter().map(|v| &v.value)
    }

    pub fn latest(&self) -> Option<&T> {
        self.values.back().map(|v| &v.value)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}

//! Explicit ownership of rebuilt geometry.
//!
//! A compositor may still be drawing the previous geometry when a new one
//! is built, so the old value is not dropped on commit. It moves to a
//! *retired* position and stays alive until the consumer calls
//! [`GenerationSlot::release_retired`] after the new generation has been
//! presented. Nothing is freed behind the consumer's back except the one
//! case where a second commit arrives before a release: the oldest value
//! is then two generations old and cannot be in flight.

use tracing::debug;

/// A committed value tagged with its generation number.
#[derive(Debug, Clone, PartialEq)]
pub struct Generation<T> {
    id: u64,
    value: T,
}

impl<T> Generation<T> {
    /// Monotonic generation number, starting at 1.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// The committed value.
    #[must_use]
    pub const fn value(&self) -> &T {
        &self.value
    }

    /// Consume the generation, returning the value.
    #[must_use]
    pub fn into_value(self) -> T {
        self.value
    }
}

/// Owner of the current and the retired generation.
#[derive(Debug)]
pub struct GenerationSlot<T> {
    next_id: u64,
    current: Option<Generation<T>>,
    retired: Option<Generation<T>>,
}

impl<T> GenerationSlot<T> {
    /// An empty slot.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next_id: 1,
            current: None,
            retired: None,
        }
    }

    /// Install `value` as the current generation and return its id.
    ///
    /// The previous current generation becomes retired. If a retired
    /// generation was still held it is dropped here.
    pub fn commit(&mut self, value: T) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        let previous = self.current.replace(Generation { id, value });
        if let Some(dropped) = std::mem::replace(&mut self.retired, previous) {
            debug!(generation = dropped.id, "dropping unreleased retired generation");
        }
        id
    }

    /// The current generation, if any.
    #[must_use]
    pub const fn current(&self) -> Option<&Generation<T>> {
        self.current.as_ref()
    }

    /// The retired generation awaiting release, if any.
    #[must_use]
    pub const fn retired(&self) -> Option<&Generation<T>> {
        self.retired.as_ref()
    }

    /// Drop the retired generation, returning its id.
    ///
    /// Call once the current generation has been presented.
    pub fn release_retired(&mut self) -> Option<u64> {
        self.retired.take().map(|g| g.id)
    }

    /// Drop everything. Generation numbers keep increasing.
    pub fn clear(&mut self) {
        self.current = None;
        self.retired = None;
    }
}

impl<T> Default for GenerationSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;

    #[test]
    fn commit_retires_previous() {
        let mut slot = GenerationSlot::new();
        assert!(slot.current().is_none());
        assert_eq!(slot.commit("a"), 1);
        assert!(slot.retired().is_none());
        assert_eq!(slot.commit("b"), 2);
        assert_eq!(slot.current().map(|g| *g.value()), Some("b"));
        assert_eq!(slot.retired().map(Generation::id), Some(1));
    }

    #[test]
    fn retired_value_lives_until_released() {
        let first = Rc::new(());
        let mut slot = GenerationSlot::new();
        slot.commit(Rc::clone(&first));
        slot.commit(Rc::new(()));
        assert_eq!(Rc::strong_count(&first), 2);
        assert_eq!(slot.release_retired(), Some(1));
        assert_eq!(Rc::strong_count(&first), 1);
        assert_eq!(slot.release_retired(), None);
    }

    #[test]
    fn second_commit_drops_oldest() {
        let first = Rc::new(());
        let mut slot = GenerationSlot::new();
        slot.commit(Rc::clone(&first));
        slot.commit(Rc::new(()));
        slot.commit(Rc::new(()));
        assert_eq!(Rc::strong_count(&first), 1);
        assert_eq!(slot.retired().map(Generation::id), Some(2));
        assert_eq!(slot.current().map(Generation::id), Some(3));
    }

    #[test]
    fn clear_keeps_numbering() {
        let mut slot = GenerationSlot::new();
        slot.commit(1);
        slot.clear();
        assert!(slot.current().is_none());
        assert_eq!(slot.commit(2), 2);
    }
}

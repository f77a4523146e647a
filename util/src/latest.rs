//! Single-slot latest-value handoff
//!
//! The marker acquisition thread produces observation sets faster or slower
//! than the control loop consumes them. The control loop must only ever see
//! the most recent set, must never block waiting for a new one, and no
//! backlog of stale frames may accumulate. A single shared slot where writes
//! overwrite and reads take gives exactly those semantics.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::sync::{Arc, Mutex};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Producer half of a latest-value slot.
pub struct LatestWriter<T> {
    slot: Arc<Mutex<Option<T>>>
}

/// Consumer half of a latest-value slot.
pub struct LatestReader<T> {
    slot: Arc<Mutex<Option<T>>>
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Create a connected writer/reader pair around an empty slot.
pub fn latest_pair<T>() -> (LatestWriter<T>, LatestReader<T>) {
    let slot = Arc::new(Mutex::new(None));

    (
        LatestWriter { slot: slot.clone() },
        LatestReader { slot }
    )
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<T> LatestWriter<T> {
    /// Put a new value in the slot, discarding any unconsumed previous value.
    pub fn publish(&self, value: T) {
        // A poisoned mutex means the other thread panicked while holding the
        // lock, there is no state to salvage in a plain Option slot
        let mut slot = match self.slot.lock() {
            Ok(s) => s,
            Err(poisoned) => poisoned.into_inner()
        };

        *slot = Some(value);
    }
}

impl<T> LatestReader<T> {
    /// Take the current value out of the slot, leaving it empty.
    ///
    /// Returns `None` if nothing has been published since the last take.
    /// Never blocks beyond the slot's own mutex.
    pub fn take(&self) -> Option<T> {
        let mut slot = match self.slot.lock() {
            Ok(s) => s,
            Err(poisoned) => poisoned.into_inner()
        };

        slot.take()
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_take_empties_slot() {
        let (writer, reader) = latest_pair();

        writer.publish(1u32);

        assert_eq!(reader.take(), Some(1));
        assert_eq!(reader.take(), None);
    }

    #[test]
    fn test_most_recent_wins() {
        let (writer, reader) = latest_pair();

        writer.publish(1u32);
        writer.publish(2u32);
        writer.publish(3u32);

        // Only the newest value survives, no backlog
        assert_eq!(reader.take(), Some(3));
        assert_eq!(reader.take(), None);
    }

    #[test]
    fn test_cross_thread_handoff() {
        let (writer, reader) = latest_pair();

        let producer = std::thread::spawn(move || {
            for i in 0..100u32 {
                writer.publish(i);
            }
        });

        producer.join().unwrap();

        assert_eq!(reader.take(), Some(99));
    }
}

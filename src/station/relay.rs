/// Single-slot handoff between the event callback and the consumer loop
use parking_lot::Mutex;

use crate::models::Reading;

#[derive(Debug, Default)]
struct Slot {
    latest: Option<Reading>,
    closed: bool,
}

/// Newest-wins mailbox holding at most one reading.
///
/// The callback publishes whenever an event arrives; the consumer takes the
/// value at its own pace. A reading that is not consumed before the next
/// publish is silently replaced.
#[derive(Debug, Default)]
pub struct ReadingRelay {
    slot: Mutex<Slot>,
}

impl ReadingRelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the slot. Returns true if an unconsumed reading was replaced.
    /// Dropped without effect once the relay is closed.
    pub fn publish(&self, reading: Reading) -> bool {
        let mut slot = self.slot.lock();
        if slot.closed {
            return false;
        }
        slot.latest.replace(reading).is_some()
    }

    /// Take the current reading, leaving the slot empty. Never blocks on data.
    pub fn consume(&self) -> Option<Reading> {
        self.slot.lock().latest.take()
    }

    /// Empty the slot and refuse further publishes
    pub fn close(&self) {
        let mut slot = self.slot.lock();
        slot.closed = true;
        slot.latest = None;
    }

    pub fn is_closed(&self) -> bool {
        self.slot.lock().closed
    }
}

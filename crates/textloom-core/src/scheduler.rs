/// Cancel-and-replace deferred task slot.
///
/// Models the scheduling discipline the reconciler needs from its host:
/// at most one pending instance of a given task, where scheduling again
/// replaces the pending one (last writer wins) and nothing stale ever
/// runs. The host decides what a tick is (animation frame, timer,
/// microtask); the reconciler only ever asks "is this due now".
///
/// A task scheduled while a tick is being processed is not due until the
/// next tick: callers snapshot due work with [`TaskSlot::take_due`] before
/// running any of it.
#[derive(Debug, Clone, Default)]
pub struct TaskSlot<T> {
    pending: Option<T>,
}

impl<T> TaskSlot<T> {
    pub fn new() -> Self {
        TaskSlot { pending: None }
    }

    /// Schedule a task, replacing any pending one.
    pub fn schedule(&mut self, task: T) {
        self.pending = Some(task);
    }

    /// Cancel the pending task, if any.
    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take()
    }

    pub fn is_scheduled(&self) -> bool {
        self.pending.is_some()
    }

    /// Take the task due this tick, leaving the slot empty.
    pub fn take_due(&mut self) -> Option<T> {
        self.pending.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedule_replaces_pending() {
        let mut slot = TaskSlot::new();
        slot.schedule(1);
        slot.schedule(2);
        assert_eq!(slot.take_due(), Some(2));
        assert_eq!(slot.take_due(), None);
    }

    #[test]
    fn cancel_clears_pending() {
        let mut slot = TaskSlot::new();
        slot.schedule("flush");
        assert!(slot.is_scheduled());
        assert_eq!(slot.cancel(), Some("flush"));
        assert!(!slot.is_scheduled());
        assert_eq!(slot.take_due(), None);
    }
}

//! Update scheduling: one computation in flight, one request waiting

/// Lifecycle of an update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Nothing running, the next request starts immediately
    #[default]
    Idle,
    /// Background worker is recomputing clusters
    Computing,
    /// Results are being pushed to the map on the dispatcher's thread
    Applying,
}

/// State machine deciding when a request may start
///
/// Requests arriving while busy overwrite a single pending slot, so a burst of viewport
/// changes collapses into one follow-up pass with the latest parameters.
#[derive(Debug)]
pub(crate) struct Scheduler<R> {
    phase: Phase,
    pending: Option<R>,
}

impl<R> Scheduler<R> {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            pending: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Submit a request. Returns it back if it should start now.
    pub fn request(&mut self, request: R) -> Option<R> {
        match self.phase {
            Phase::Idle => {
                self.phase = Phase::Computing;
                Some(request)
            }
            Phase::Computing | Phase::Applying => {
                if self.pending.replace(request).is_some() {
                    tracing::trace!("Superseded pending update request");
                }
                None
            }
        }
    }

    /// The background computation finished (successfully or not)
    pub fn computed(&mut self) {
        debug_assert_eq!(self.phase, Phase::Computing);
        self.phase = Phase::Applying;
    }

    /// The apply phase finished. Returns the pending request to chain, if any.
    pub fn applied(&mut self) -> Option<R> {
        debug_assert_eq!(self.phase, Phase::Applying);
        match self.pending.take() {
            Some(request) => {
                self.phase = Phase::Computing;
                Some(request)
            }
            None => {
                self.phase = Phase::Idle;
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_request_starts_immediately() {
        let mut scheduler = Scheduler::new();
        assert_eq!(scheduler.request(1), Some(1));
        assert_eq!(scheduler.phase(), Phase::Computing);

        scheduler.computed();
        assert_eq!(scheduler.phase(), Phase::Applying);
        assert_eq!(scheduler.applied(), None);
        assert_eq!(scheduler.phase(), Phase::Idle);
    }

    #[test]
    fn test_last_write_wins_while_busy() {
        let mut scheduler = Scheduler::new();
        assert_eq!(scheduler.request(1), Some(1));
        assert_eq!(scheduler.request(2), None);
        assert_eq!(scheduler.request(3), None);
        scheduler.computed();
        // Still queued while applying
        assert_eq!(scheduler.request(4), None);

        assert_eq!(scheduler.applied(), Some(4));
        assert_eq!(scheduler.phase(), Phase::Computing);

        scheduler.computed();
        assert_eq!(scheduler.applied(), None);
        assert_eq!(scheduler.phase(), Phase::Idle);
    }
}

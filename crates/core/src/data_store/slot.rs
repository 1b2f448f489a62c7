use tokio::task::AbortHandle;

use crate::{async_result::AsyncResult, error::NetworkError};

/// State of one request key plus the operation that currently owns it.
///
/// Every new operation bumps `generation`; a completion is only applied when
/// it carries the current generation, so a superseded request can never
/// overwrite newer state even if its abort arrives too late.
pub(crate) struct Slot<T> {
    state: AsyncResult<T, NetworkError>,
    generation: u64,
    inflight: Option<AbortHandle>,
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self {
            state: AsyncResult::Empty,
            generation: 0,
            inflight: None,
        }
    }
}

impl<T: Clone> Slot<T> {
    pub(crate) fn state(&self) -> AsyncResult<T, NetworkError> {
        self.state.clone()
    }
}

impl<T> Slot<T> {
    /// Cancels the owner, moves to Loading and returns the new generation.
    pub(crate) fn begin(&mut self) -> u64 {
        if self.cancel() {
            tracing::debug!("superseding in-flight request");
        }
        self.state.start();
        self.generation
    }

    pub(crate) fn attach(&mut self, generation: u64, handle: AbortHandle) {
        if generation == self.generation {
            self.inflight = Some(handle);
        } else {
            handle.abort();
        }
    }

    /// Applies a completion. Returns `false` when it was superseded.
    pub(crate) fn finish(&mut self, generation: u64, result: Result<T, NetworkError>) -> bool {
        if generation != self.generation {
            return false;
        }
        self.inflight = None;
        match result {
            Ok(value) => self.state.succeed(value),
            Err(err) => self.state.fail(err),
        }
        true
    }

    /// Aborts the owning operation without touching the state.
    ///
    /// Idempotent. Returns `true` if an operation was in flight.
    pub(crate) fn cancel(&mut self) -> bool {
        self.generation = self.generation.wrapping_add(1);
        match self.inflight.take() {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// Sets the state locally, discarding any in-flight operation.
    pub(crate) fn replace(&mut self, state: AsyncResult<T, NetworkError>) {
        self.cancel();
        self.state = state;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_generation_is_discarded() {
        let mut slot: Slot<u32> = Slot::default();
        let first = slot.begin();
        let second = slot.begin();
        assert_ne!(first, second);

        assert!(slot.finish(second, Ok(2)));
        assert!(!slot.finish(first, Ok(1)));
        assert_eq!(slot.state(), AsyncResult::Success(2));
    }

    #[test]
    fn cancel_keeps_state_and_discards_completion() {
        let mut slot: Slot<u32> = Slot::default();
        let generation = slot.begin();
        assert!(!slot.cancel());
        assert!(!slot.cancel());
        assert_eq!(slot.state(), AsyncResult::Loading);
        assert!(!slot.finish(generation, Ok(1)));
        assert_eq!(slot.state(), AsyncResult::Loading);
    }

    #[test]
    fn replace_discards_in_flight_completion() {
        let mut slot: Slot<u32> = Slot::default();
        let generation = slot.begin();
        slot.replace(AsyncResult::Success(9));
        assert!(!slot.finish(generation, Err(NetworkError::NotFound)));
        assert_eq!(slot.state(), AsyncResult::Success(9));
    }
}

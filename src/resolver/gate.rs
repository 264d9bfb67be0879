use std::time::Duration;

use tokio::sync::{Mutex, MutexGuard};
use tokio::time::Instant;

/// Shared "time of last dispatch" for one resolver instance.
///
/// Every external lookup passes through here, whichever call issued it.
#[derive(Debug, Default)]
pub(crate) struct DelayGate {
    last: Mutex<Option<Instant>>,
}

/// Exclusive hold on the gate; other dispatchers wait while it is alive.
pub(crate) struct GatePass<'a> {
    last: MutexGuard<'a, Option<Instant>>,
}

impl DelayGate {
    /// Wait for exclusive access and for `min_delay` to pass since the last mark.
    pub(crate) async fn acquire(&self, min_delay: Duration) -> GatePass<'_> {
        let last = self.last.lock().await;
        if let Some(at) = *last {
            tokio::time::sleep_until(at + min_delay).await;
        }
        GatePass { last }
    }
}

impl GatePass<'_> {
    pub(crate) fn mark(&mut self) {
        *self.last = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_first_pass_is_immediate() {
        let gate = DelayGate::default();
        let start = Instant::now();
        let mut pass = gate.acquire(Duration::from_secs(5)).await;
        pass.mark();
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_pass_waits_for_delay() {
        let gate = DelayGate::default();
        let delay = Duration::from_millis(1000);

        let mut pass = gate.acquire(delay).await;
        pass.mark();
        let first = Instant::now();
        drop(pass);

        let _pass = gate.acquire(delay).await;
        assert!(first.elapsed() >= delay);
    }
}

use crate::binding::BindingId;
use std::time::Duration;

/// Coarse periodic check for bindings configured with
/// [`ReleaseMode::OnFinish`](crate::config::ReleaseMode::OnFinish).
///
/// Bindings subscribe after a successful play. Every `interval` of accumulated
/// tick time the manager takes the pending list, releases the bindings whose
/// pools have gone silent and hands the rest back with
/// [`requeue`](Self::requeue).
#[derive(Debug, Clone)]
pub struct ReleaseSweep {
    interval: Duration,
    elapsed: Duration,
    pending: Vec<BindingId>,
}

impl ReleaseSweep {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            elapsed: Duration::ZERO,
            pending: Vec::new(),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Queue a binding for release once its audio finishes. Subscribing twice is harmless.
    pub fn subscribe(&mut self, id: BindingId) {
        if !self.pending.contains(&id) {
            self.pending.push(id);
        }
    }

    pub fn unsubscribe(&mut self, id: BindingId) {
        self.pending.retain(|pending| *pending != id);
    }

    pub fn contains(&self, id: BindingId) -> bool {
        self.pending.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Accumulate tick time. Returns true when a sweep is due; the timer restarts.
    pub fn advance(&mut self, dt: Duration) -> bool {
        self.elapsed += dt;
        if self.elapsed < self.interval {
            return false;
        }
        self.elapsed = Duration::ZERO;
        true
    }

    pub fn take_pending(&mut self) -> Vec<BindingId> {
        std::mem::take(&mut self.pending)
    }

    /// Put back bindings that are still audible.
    pub fn requeue(&mut self, ids: impl IntoIterator<Item = BindingId>) {
        for id in ids {
            self.subscribe(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sweep_fires_on_interval() {
        let mut sweep = ReleaseSweep::new(Duration::from_secs(1));

        assert!(!sweep.advance(Duration::from_millis(400)));
        assert!(!sweep.advance(Duration::from_millis(400)));
        assert!(sweep.advance(Duration::from_millis(400)));
        // timer restarted
        assert!(!sweep.advance(Duration::from_millis(400)));
    }

    #[test]
    fn test_zero_interval_fires_every_tick() {
        let mut sweep = ReleaseSweep::new(Duration::ZERO);
        assert!(sweep.advance(Duration::ZERO));
        assert!(sweep.advance(Duration::from_millis(16)));
    }

    #[test]
    fn test_subscribe_deduplicates() {
        let mut sweep = ReleaseSweep::new(Duration::from_secs(1));
        let id = BindingId::from_raw(7);

        sweep.subscribe(id);
        sweep.subscribe(id);
        assert_eq!(sweep.len(), 1);

        let taken = sweep.take_pending();
        assert_eq!(taken, vec![id]);
        assert!(sweep.is_empty());

        sweep.requeue(taken);
        assert!(sweep.contains(id));
        sweep.unsubscribe(id);
        assert!(sweep.is_empty());
    }
}

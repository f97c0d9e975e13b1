//! Edit coalescing and render cancellation.
//!
//! Slider drags produce dozens of parameter snapshots per second;
//! rendering each one would leave the pipeline permanently behind.
//! [`EditCoalescer`] holds the newest snapshot until it has been stable
//! for the debounce window, then releases it for rendering. The logic is
//! pure and clock-injected — callers pass `Instant`s — so the window is
//! testable without sleeping.
//!
//! [`CancelToken`] lets a newer edit supersede an in-flight render. The
//! orchestrator checks the token between stages and never publishes
//! cache entries after a cancellation, so a cancelled render cannot
//! write state for a superseded parameter snapshot.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use revela_params::AdjustmentParameters;

/// Debounces a stream of parameter edits.
#[derive(Debug)]
pub struct EditCoalescer {
    window: Duration,
    pending: Option<(AdjustmentParameters, Instant)>,
}

impl EditCoalescer {
    /// Creates a coalescer with the given stability window.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
        }
    }

    /// Records an edit at `now`. A newer edit replaces the pending one
    /// and restarts the stability clock.
    pub fn submit(&mut self, params: AdjustmentParameters, now: Instant) {
        self.pending = Some((params, now));
    }

    /// Releases the pending snapshot once it has been stable for the
    /// window. Returns `None` while edits are still settling (or none is
    /// pending).
    pub fn poll(&mut self, now: Instant) -> Option<AdjustmentParameters> {
        match &self.pending {
            Some((_, submitted)) if now.duration_since(*submitted) >= self.window => {
                self.pending.take().map(|(p, _)| p)
            }
            _ => None,
        }
    }

    /// True when an edit is waiting out its window.
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Drops any pending edit.
    pub fn clear(&mut self) {
        self.pending = None;
    }
}

/// Cooperative cancellation flag for an in-flight render.
///
/// Cloning shares the flag; any clone can cancel.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates a fresh, uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// True once cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params_with_exposure(v: f32) -> AdjustmentParameters {
        let mut p = AdjustmentParameters::default();
        p.exposure = v;
        p
    }

    #[test]
    fn test_stable_edit_releases_after_window() {
        let mut c = EditCoalescer::new(Duration::from_millis(150));
        let t0 = Instant::now();
        c.submit(params_with_exposure(0.5), t0);

        assert_eq!(c.poll(t0 + Duration::from_millis(100)), None);
        let released = c.poll(t0 + Duration::from_millis(150));
        assert_eq!(released, Some(params_with_exposure(0.5)));
        // Released once; nothing left pending.
        assert!(!c.has_pending());
        assert_eq!(c.poll(t0 + Duration::from_millis(300)), None);
    }

    #[test]
    fn test_rapid_edits_coalesce_to_newest() {
        let mut c = EditCoalescer::new(Duration::from_millis(150));
        let t0 = Instant::now();
        for i in 0..10 {
            c.submit(
                params_with_exposure(i as f32 * 0.1),
                t0 + Duration::from_millis(i * 20),
            );
        }
        // 180 ms after t0 the last edit (at 180 ms) is only 0 ms old.
        assert_eq!(c.poll(t0 + Duration::from_millis(200)), None);
        // Once the last edit has been stable for the window, it releases
        // and every earlier edit is gone.
        let released = c.poll(t0 + Duration::from_millis(330));
        assert_eq!(released, Some(params_with_exposure(0.9)));
    }

    #[test]
    fn test_clear_drops_pending() {
        let mut c = EditCoalescer::new(Duration::from_millis(150));
        let t0 = Instant::now();
        c.submit(params_with_exposure(0.5), t0);
        c.clear();
        assert_eq!(c.poll(t0 + Duration::from_secs(1)), None);
    }

    #[test]
    fn test_cancel_token_shared() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
    }
}

//! Tap-vs-hold gesture tracking.
//!
//! On a layer with any HOLD binding, a press arms a timer instead of firing
//! immediately: releasing inside the window is a tap, reaching the window
//! fires the hold. Layers without HOLD bindings pass edges straight through.
//!
//! ```text
//! (idle)    --press-->        (pending, armed at t0)
//! (pending) --release < 200-->  Tap                  -> (idle)
//! (pending) --timer >= 200-->   hold fires, disarm   -> (holding)
//! (holding) --release-->        HoldRelease          -> (idle)
//! ```

/// A press shorter than this is a tap; reaching it fires the hold.
pub const HOLD_TIMEOUT_MS: u64 = 200;

/// What a key edge resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KeyGesture {
    /// Short press on a hold-capable layer: fire PRESS, DO then UNDO.
    Tap,
    /// Release after the hold fired (or with no armed timer): HOLD, UNDO.
    HoldRelease,
    /// Plain press edge on a layer without HOLD bindings.
    Press,
    /// Plain release edge on a layer without HOLD bindings.
    Release,
}

/// Per-cell armed timestamps for the tap/hold window.
pub struct HoldTracker<const CELLS: usize> {
    armed: [Option<u64>; CELLS],
}

impl<const CELLS: usize> HoldTracker<CELLS> {
    pub const fn new() -> Self {
        Self {
            armed: [None; CELLS],
        }
    }

    /// Classifies a press or release edge at `now_ms`. `hold_bindable` is
    /// the current layer's on-hold flag; when clear, edges pass through
    /// untimed.
    pub fn on_edge(
        &mut self,
        cell: usize,
        pressed: bool,
        now_ms: u64,
        hold_bindable: bool,
    ) -> Option<KeyGesture> {
        if !hold_bindable {
            return Some(if pressed {
                KeyGesture::Press
            } else {
                KeyGesture::Release
            });
        }

        if pressed {
            self.armed[cell] = Some(now_ms);
            return None;
        }

        match self.armed[cell].take() {
            Some(t0) if now_ms.saturating_sub(t0) < HOLD_TIMEOUT_MS => Some(KeyGesture::Tap),
            _ => Some(KeyGesture::HoldRelease),
        }
    }

    /// True once an armed cell has stayed pressed through the whole window.
    /// The caller fires HOLD, DO and then disarms.
    pub fn hold_expired(&self, cell: usize, now_ms: u64) -> bool {
        matches!(self.armed[cell], Some(t0) if now_ms.saturating_sub(t0) >= HOLD_TIMEOUT_MS)
    }

    pub fn disarm(&mut self, cell: usize) {
        self.armed[cell] = None;
    }
}

impl<const CELLS: usize> Default for HoldTracker<CELLS> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_press_is_a_tap() {
        let mut tracker: HoldTracker<4> = HoldTracker::new();
        assert_eq!(tracker.on_edge(0, true, 1_000, true), None);
        assert!(!tracker.hold_expired(0, 1_100));
        assert_eq!(tracker.on_edge(0, false, 1_100, true), Some(KeyGesture::Tap));
    }

    #[test]
    fn test_long_press_fires_hold_then_hold_release() {
        let mut tracker: HoldTracker<4> = HoldTracker::new();
        tracker.on_edge(0, true, 1_000, true);

        assert!(!tracker.hold_expired(0, 1_199));
        assert!(tracker.hold_expired(0, 1_200));
        tracker.disarm(0);
        assert!(!tracker.hold_expired(0, 1_500));

        assert_eq!(
            tracker.on_edge(0, false, 1_500, true),
            Some(KeyGesture::HoldRelease)
        );
    }

    #[test]
    fn test_release_at_exactly_the_window_is_not_a_tap() {
        let mut tracker: HoldTracker<4> = HoldTracker::new();
        tracker.on_edge(0, true, 1_000, true);
        assert_eq!(
            tracker.on_edge(0, false, 1_200, true),
            Some(KeyGesture::HoldRelease)
        );
    }

    #[test]
    fn test_release_without_armed_timer_is_hold_release() {
        let mut tracker: HoldTracker<4> = HoldTracker::new();
        assert_eq!(
            tracker.on_edge(2, false, 1_000, true),
            Some(KeyGesture::HoldRelease)
        );
    }

    #[test]
    fn test_layers_without_holds_pass_edges_through() {
        let mut tracker: HoldTracker<4> = HoldTracker::new();
        assert_eq!(
            tracker.on_edge(1, true, 1_000, false),
            Some(KeyGesture::Press)
        );
        assert_eq!(
            tracker.on_edge(1, false, 5_000, false),
            Some(KeyGesture::Release)
        );
    }

    #[test]
    fn test_cells_track_independently() {
        let mut tracker: HoldTracker<4> = HoldTracker::new();
        tracker.on_edge(0, true, 1_000, true);
        tracker.on_edge(1, true, 1_150, true);

        assert!(tracker.hold_expired(0, 1_250));
        assert!(!tracker.hold_expired(1, 1_250));
        assert_eq!(tracker.on_edge(1, false, 1_250, true), Some(KeyGesture::Tap));
    }
}

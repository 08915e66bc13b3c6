//! Flow-control window arithmetic.
//!
//! A single signed window per direction, rather than a separate "window as
//! the peer knows it" vs. "available to the consumer" split — that split
//! exists to support user-facing backpressure, which is out of this core's
//! scope.

use crate::error::FlowControlError;

/// Lower bound of a flow-control window: `-(2^31) + 1`.
pub const MIN_WINDOW_SIZE: i32 = -(1 << 31) + 1;
/// Upper bound of a flow-control window: `2^31 - 1`.
pub const MAX_WINDOW_SIZE: i32 = (1 << 31) - 1;
/// Initial window size per RFC 7540 §6.9.2, absent a SETTINGS override.
pub const DEFAULT_INITIAL_WINDOW_SIZE: u32 = 65_535;

/// A signed flow-control window in `[MIN_WINDOW_SIZE, MAX_WINDOW_SIZE]`.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct FlowControlWindow {
    value: i32,
}

impl FlowControlWindow {
    pub fn new(initial: u32) -> FlowControlWindow {
        debug_assert!(initial as i64 <= MAX_WINDOW_SIZE as i64);
        FlowControlWindow {
            value: initial as i32,
        }
    }

    pub fn value(&self) -> i32 {
        self.value
    }

    /// Reflects `n` bytes having been sent/received. May legally go negative;
    /// underflowing past `MIN_WINDOW_SIZE` is a protocol error.
    pub fn decrement_by(&mut self, n: u32) -> Result<(), FlowControlError> {
        let next = self.value as i64 - n as i64;
        if next < MIN_WINDOW_SIZE as i64 {
            return Err(FlowControlError::InvalidFlowControlWindowSize);
        }
        self.value = next as i32;
        Ok(())
    }

    /// Applies a WINDOW_UPDATE increment. Zero is a protocol error; an
    /// increment that would push the window past `MAX_WINDOW_SIZE` is a
    /// flow-control error. Neither case mutates the window.
    pub fn increment_by(&mut self, n: u32) -> Result<(), FlowControlError> {
        if n == 0 {
            return Err(FlowControlError::InvalidWindowIncrementSize);
        }
        let next = self.checked_add(n as i64)?;
        self.value = next;
        Ok(())
    }

    /// Computes what `value()` would become after adding `delta`, without
    /// mutating `self`. Used by SETTINGS `INITIAL_WINDOW_SIZE` re-baselining,
    /// which must validate every affected stream before mutating any of
    /// them.
    pub fn checked_add_delta(&self, delta: i64) -> Result<i32, FlowControlError> {
        self.checked_add(delta)
    }

    /// Applies a pre-validated delta. Panics if it would leave the valid
    /// range; callers must have gone through `checked_add_delta` first.
    pub fn apply_delta(&mut self, delta: i64) {
        let next = self.checked_add(delta).expect(
            "apply_delta called with a delta that was not pre-validated via checked_add_delta",
        );
        self.value = next;
    }

    fn checked_add(&self, delta: i64) -> Result<i32, FlowControlError> {
        let next = self.value as i64 + delta;
        if next > MAX_WINDOW_SIZE as i64 {
            return Err(FlowControlError::InvalidFlowControlWindowSize);
        }
        if next < MIN_WINDOW_SIZE as i64 {
            return Err(FlowControlError::InvalidFlowControlWindowSize);
        }
        Ok(next as i32)
    }
}

impl Default for FlowControlWindow {
    fn default() -> FlowControlWindow {
        FlowControlWindow::new(DEFAULT_INITIAL_WINDOW_SIZE)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn decrement_can_go_negative_but_not_below_min() {
        let mut w = FlowControlWindow::new(10);
        w.decrement_by(20).unwrap();
        assert_eq!(w.value(), -10);
    }

    #[test]
    fn decrement_past_min_is_an_error_and_does_not_mutate() {
        let mut w = FlowControlWindow::new(0);
        let before = w.value();
        let err = w.decrement_by(MAX_WINDOW_SIZE as u32 + 2).unwrap_err();
        assert_eq!(err, FlowControlError::InvalidFlowControlWindowSize);
        assert_eq!(w.value(), before);
    }

    #[test]
    fn zero_increment_is_rejected() {
        let mut w = FlowControlWindow::new(100);
        let err = w.increment_by(0).unwrap_err();
        assert_eq!(err, FlowControlError::InvalidWindowIncrementSize);
    }

    #[test]
    fn increment_past_max_is_rejected_without_mutation() {
        let mut w = FlowControlWindow::new(MAX_WINDOW_SIZE as u32);
        let err = w.increment_by(1).unwrap_err();
        assert_eq!(err, FlowControlError::InvalidFlowControlWindowSize);
        assert_eq!(w.value(), MAX_WINDOW_SIZE);
    }

    #[test]
    fn checked_add_delta_does_not_mutate() {
        let w = FlowControlWindow::new(65_535);
        let next = w.checked_add_delta(65_535).unwrap();
        assert_eq!(next, 131_070);
        assert_eq!(w.value(), 65_535);
    }

    #[quickcheck_macros::quickcheck]
    fn value_always_stays_in_range(initial: u16, deltas: Vec<i32>) -> bool {
        let mut w = FlowControlWindow::new(initial as u32);
        for d in deltas {
            if w.checked_add_delta(d as i64).is_ok() {
                w.apply_delta(d as i64);
            }
        }
        w.value() >= MIN_WINDOW_SIZE && w.value() <= MAX_WINDOW_SIZE
    }
}

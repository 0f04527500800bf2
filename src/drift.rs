//! Per-card drift compensation.
//!
//! Mechanical slack grows with cycle count, so the return leg of a tap
//! slowly overshoots middle.  Each completed tap adds a fixed step to that
//! card's accumulator (saturating at the cap) and every return-to-middle
//! lookup subtracts the accumulator from the nominal duration.
//!
//! Monotonic and saturating: there is no estimation and no overshoot
//! detection.

use log::info;

use crate::fsm::context::Card;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriftCompensator {
    per_tap_ms: u32,
    cap_ms: u32,
    /// Indexed by [`Card::index`].
    accumulated_ms: [u32; 2],
}

impl DriftCompensator {
    pub const fn new(per_tap_ms: u32, cap_ms: u32) -> Self {
        Self {
            per_tap_ms,
            cap_ms,
            accumulated_ms: [0, 0],
        }
    }

    /// Register one completed tap on `card`.  Returns the new accumulator.
    pub fn record_tap(&mut self, card: Card) -> u32 {
        let slot = &mut self.accumulated_ms[card.index()];
        *slot = slot.saturating_add(self.per_tap_ms).min(self.cap_ms);
        info!("Drift: {} accumulator now {}ms (cap {}ms)", card, *slot, self.cap_ms);
        *slot
    }

    /// Current correction for `card`.
    pub fn accumulated_ms(&self, card: Card) -> u32 {
        self.accumulated_ms[card.index()]
    }

    /// `nominal − min(accumulator, cap)`, never below zero.
    pub fn compensate(&self, card: Card, nominal_ms: u32) -> u32 {
        let correction = self.accumulated_ms(card).min(self.cap_ms);
        nominal_ms.saturating_sub(correction)
    }

    pub fn cap_ms(&self) -> u32 {
        self.cap_ms
    }
}

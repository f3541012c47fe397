//! Generation-counter timer slot.
//!
//! Arming hands out a ticket and invalidates every earlier ticket, so a
//! timer task that wakes up late can check whether it still owns the slot
//! instead of relying on its cancellation having landed. Used for the save
//! debounce and for the notice display window.

/// Proof that a timer was armed at a given generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerTicket(u64);

/// A single trailing-edge timer slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Debounce {
    generation: u64,
    armed: bool,
}

impl Debounce {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm or re-arm the slot. Earlier tickets become stale.
    pub fn arm(&mut self) -> TimerTicket {
        self.generation = self.generation.wrapping_add(1);
        self.armed = true;
        TimerTicket(self.generation)
    }

    /// Disarm the slot. Outstanding tickets become stale.
    pub fn cancel(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        self.armed = false;
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Consume the slot if `ticket` is still the current one.
    pub fn fire(&mut self, ticket: TimerTicket) -> bool {
        if self.armed && ticket.0 == self.generation {
            self.armed = false;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_ticket_fires_once() {
        let mut slot = Debounce::new();
        let ticket = slot.arm();
        assert!(slot.is_armed());
        assert!(slot.fire(ticket));
        assert!(!slot.is_armed());
        assert!(!slot.fire(ticket));
    }

    #[test]
    fn rearm_invalidates_previous_ticket() {
        let mut slot = Debounce::new();
        let first = slot.arm();
        let second = slot.arm();
        assert!(!slot.fire(first));
        assert!(slot.is_armed());
        assert!(slot.fire(second));
    }

    #[test]
    fn cancel_invalidates_ticket() {
        let mut slot = Debounce::new();
        let ticket = slot.arm();
        slot.cancel();
        assert!(!slot.is_armed());
        assert!(!slot.fire(ticket));
    }
}

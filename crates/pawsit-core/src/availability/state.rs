//! Pure state container of the availability engine.
//!
//! Every method is a synchronous transition returning what the async driver
//! has to schedule next. Nothing in here touches the clock or the network,
//! which keeps the ordering rules testable without a runtime.
//!
//! ## State Transitions
//!
//! ```text
//! idle -> pending -> saving -> saved -> idle
//!                       \-> error -> pending (next edit)
//! pending -> idle (edit reverted before the debounce fired)
//! ```

use chrono::NaiveDate;

use super::debounce::{Debounce, TimerTicket};
use super::set::{AvailabilityDiff, AvailabilitySet};
use super::types::{AvailabilityRecord, StatusMessage, StatusView, SyncStatus};

/// What the driver must do after a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FollowUp {
    Nothing,
    /// (Re)start the debounce timer for this ticket.
    ArmDebounce(TimerTicket),
    /// Drop the armed debounce timer.
    CancelDebounce,
    /// A queued flush was started; run it.
    Flush(FlushPlan),
}

/// Outcome of asking for a flush.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushDecision {
    Start(FlushPlan),
    /// A save is in flight; this one runs after it.
    Queued,
    /// Stale timer or nothing to write.
    Skip,
}

/// Work captured at the moment a flush starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlushPlan {
    pub diff: AvailabilityDiff,
    /// Edit revision the diff was computed from.
    pub revision: u64,
}

/// Transitions after a successful save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AfterSave {
    pub notice: TimerTicket,
    pub follow_up: FollowUp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Notice {
    Saved,
    Error(StatusMessage),
}

/// Snapshot, working selection, timers and save lifecycle of one user.
#[derive(Debug, Clone)]
pub struct SyncState {
    snapshot: AvailabilitySet,
    working: AvailabilitySet,
    loaded: bool,
    mounted: bool,
    /// Bumped on every calendar edit.
    revision: u64,
    debounce: Debounce,
    /// Revision of the flush currently in flight.
    in_flight: Option<u64>,
    flush_queued: bool,
    notice: Option<Notice>,
    notice_timer: Debounce,
}

impl Default for SyncState {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncState {
    pub fn new() -> Self {
        Self {
            snapshot: AvailabilitySet::new(),
            working: AvailabilitySet::new(),
            loaded: false,
            mounted: true,
            revision: 0,
            debounce: Debounce::new(),
            in_flight: None,
            flush_queued: false,
            notice: None,
            notice_timer: Debounce::new(),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn snapshot(&self) -> &AvailabilitySet {
        &self.snapshot
    }

    pub fn working(&self) -> &AvailabilitySet {
        &self.working
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn is_saving(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Working selection differs from the last server-confirmed state.
    pub fn is_dirty(&self) -> bool {
        self.loaded && !self.working.same_dates(&self.snapshot)
    }

    /// Status projection, first match wins:
    /// error, saving, pending, saved, idle.
    pub fn project(&self) -> StatusView {
        if let Some(Notice::Error(message)) = self.notice {
            return StatusView::with_message(SyncStatus::Error, message);
        }
        if self.is_saving() {
            return StatusView::new(SyncStatus::Saving);
        }
        if self.is_dirty() && (self.debounce.is_armed() || self.flush_queued) {
            return StatusView::new(SyncStatus::Pending);
        }
        if self.notice == Some(Notice::Saved) {
            return StatusView::with_message(SyncStatus::Saved, StatusMessage::Saved);
        }
        StatusView::new(SyncStatus::Idle)
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn load_succeeded(&mut self, records: Vec<AvailabilityRecord>) -> FollowUp {
        self.snapshot = AvailabilitySet::from_records(records);
        self.working = self.snapshot.clone();
        self.loaded = true;
        self.flush_queued = false;
        self.debounce.cancel();
        if matches!(self.notice, Some(Notice::Error(_))) {
            self.clear_notice();
        }
        FollowUp::CancelDebounce
    }

    pub fn load_failed(&mut self) -> TimerTicket {
        self.show_notice(Notice::Error(StatusMessage::LoadFailed))
    }

    /// Replace the working selection with the calendar's full selection.
    pub fn apply_selection<I>(&mut self, dates: I) -> FollowUp
    where
        I: IntoIterator<Item = NaiveDate>,
    {
        self.working = AvailabilitySet::from_dates(dates, &self.snapshot);
        self.revision = self.revision.wrapping_add(1);
        let stale_notice = match self.notice {
            Some(Notice::Error(_)) => true,
            // Reverting later must not bring the old "saved" back.
            Some(Notice::Saved) => self.is_dirty(),
            None => false,
        };
        if stale_notice {
            self.clear_notice();
        }
        self.detect_changes()
    }

    /// Re-arm on a dirty selection, cancel on a clean one.
    fn detect_changes(&mut self) -> FollowUp {
        if !self.loaded {
            return FollowUp::Nothing;
        }
        if self.is_dirty() {
            FollowUp::ArmDebounce(self.debounce.arm())
        } else {
            self.cancel_pending();
            FollowUp::CancelDebounce
        }
    }

    /// Forget any armed or queued flush.
    pub fn cancel_pending(&mut self) {
        self.debounce.cancel();
        self.flush_queued = false;
    }

    /// The debounce timer for `ticket` elapsed.
    pub fn debounce_elapsed(&mut self, ticket: TimerTicket) -> FlushDecision {
        if !self.debounce.fire(ticket) {
            return FlushDecision::Skip;
        }
        self.begin_flush()
    }

    /// Flush immediately (manual retry), bypassing the debounce.
    pub fn flush_now(&mut self) -> FlushDecision {
        self.debounce.cancel();
        self.begin_flush()
    }

    fn begin_flush(&mut self) -> FlushDecision {
        if !self.loaded || !self.mounted {
            return FlushDecision::Skip;
        }
        if self.is_saving() {
            self.flush_queued = true;
            return FlushDecision::Queued;
        }
        self.flush_queued = false;
        let diff = AvailabilityDiff::between(&self.snapshot, &self.working);
        if diff.is_empty() {
            return FlushDecision::Skip;
        }
        self.in_flight = Some(self.revision);
        self.clear_notice();
        FlushDecision::Start(FlushPlan {
            diff,
            revision: self.revision,
        })
    }

    /// All writes settled and the re-fetch returned `refreshed`.
    pub fn flush_succeeded(
        &mut self,
        plan_revision: u64,
        refreshed: Vec<AvailabilityRecord>,
    ) -> AfterSave {
        self.in_flight = None;
        self.snapshot = AvailabilitySet::from_records(refreshed);
        self.working = if self.revision == plan_revision {
            self.snapshot.clone()
        } else {
            // Edited while saving: keep the newer selection.
            self.working.rebase(&self.snapshot)
        };
        let notice = self.show_notice(Notice::Saved);
        let follow_up = self.reconcile();
        AfterSave { notice, follow_up }
    }

    /// A write or the re-fetch failed. `refreshed` is the best-effort
    /// re-fetch done after a failed write, if it worked.
    pub fn flush_failed(
        &mut self,
        message: StatusMessage,
        refreshed: Option<Vec<AvailabilityRecord>>,
    ) -> TimerTicket {
        self.in_flight = None;
        self.flush_queued = false;
        if let Some(records) = refreshed {
            self.snapshot = AvailabilitySet::from_records(records);
            self.working = self.working.rebase(&self.snapshot);
        }
        self.show_notice(Notice::Error(message))
    }

    /// Decide what the refreshed snapshot means for pending edits.
    fn reconcile(&mut self) -> FollowUp {
        if !self.is_dirty() {
            self.cancel_pending();
            return FollowUp::CancelDebounce;
        }
        if self.flush_queued {
            // The quiet period already passed while saving.
            return match self.flush_now() {
                FlushDecision::Start(plan) => FollowUp::Flush(plan),
                FlushDecision::Queued | FlushDecision::Skip => FollowUp::Nothing,
            };
        }
        if self.debounce.is_armed() {
            return FollowUp::Nothing;
        }
        FollowUp::ArmDebounce(self.debounce.arm())
    }

    pub fn notice_elapsed(&mut self, ticket: TimerTicket) {
        if self.notice_timer.fire(ticket) {
            self.notice = None;
        }
    }

    /// Stop reacting to timers; later results are ignored by the driver.
    pub fn unmount(&mut self) {
        self.mounted = false;
        self.cancel_pending();
        self.notice_timer.cancel();
    }

    fn show_notice(&mut self, notice: Notice) -> TimerTicket {
        self.notice = Some(notice);
        self.notice_timer.arm()
    }

    fn clear_notice(&mut self) {
        self.notice = None;
        self.notice_timer.cancel();
    }
}

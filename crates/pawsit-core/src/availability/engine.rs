//! Async driver around [`SyncState`].
//!
//! The engine owns the state behind a mutex that is never held across an
//! `.await`, runs the debounce and notice timers as tokio tasks, performs
//! flushes against the injected [`AvailabilityBackend`] and publishes every
//! status change on a `watch` channel.
//!
//! Timer handles live under the same lock as the state: a ticket and the
//! task waiting on it are always issued and stored together, so a late
//! caller can never replace a newer timer with an older one.
//!
//! Timer tasks only hold a `Weak` handle, so dropping the engine never
//! leaves a timer firing into it. A flush that is already on the wire keeps
//! running; its result is discarded once the engine is unmounted.
//!
//! All methods that schedule work must be called from within a tokio
//! runtime.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use chrono::NaiveDate;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::backend::{AvailabilityBackend, CredentialProvider};
use super::debounce::TimerTicket;
use super::http::HttpAvailabilityBackend;
use super::state::{AfterSave, FlushDecision, FlushPlan, FollowUp, SyncState};
use super::types::{AvailabilityRecord, StatusMessage, StatusView, UserId};
use crate::config::EngineConfig;
use crate::error::AvailabilityError;

/// Keeps a sitter's calendar selection in sync with the backend.
pub struct AvailabilitySyncEngine {
    shared: Arc<Shared>,
}

struct Shared {
    backend: Arc<dyn AvailabilityBackend>,
    credentials: Arc<dyn CredentialProvider>,
    config: EngineConfig,
    inner: Mutex<Inner>,
    status_tx: watch::Sender<StatusView>,
}

/// Everything guarded by the engine lock.
struct Inner {
    state: SyncState,
    timers: Timers,
}

#[derive(Default)]
struct Timers {
    debounce: Option<JoinHandle<()>>,
    notice: Option<JoinHandle<()>>,
}

impl Timers {
    fn replace_debounce(&mut self, handle: JoinHandle<()>) {
        if let Some(previous) = self.debounce.replace(handle) {
            previous.abort();
        }
    }

    fn abort_debounce(&mut self) {
        if let Some(handle) = self.debounce.take() {
            debug!("debounce cancelled");
            handle.abort();
        }
    }

    fn replace_notice(&mut self, handle: JoinHandle<()>) {
        if let Some(previous) = self.notice.replace(handle) {
            previous.abort();
        }
    }

    fn abort_all(&mut self) {
        for handle in [self.debounce.take(), self.notice.take()].into_iter().flatten() {
            handle.abort();
        }
    }
}

impl AvailabilitySyncEngine {
    pub fn new(
        backend: Arc<dyn AvailabilityBackend>,
        credentials: Arc<dyn CredentialProvider>,
        config: EngineConfig,
    ) -> Self {
        let (status_tx, _) = watch::channel(StatusView::default());
        Self {
            shared: Arc::new(Shared {
                backend,
                credentials,
                config,
                inner: Mutex::new(Inner {
                    state: SyncState::new(),
                    timers: Timers::default(),
                }),
                status_tx,
            }),
        }
    }

    /// Engine talking to the HTTP backend described by `config.backend`.
    pub fn with_http(
        config: EngineConfig,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self, AvailabilityError> {
        let backend = HttpAvailabilityBackend::new(&config.backend, Arc::clone(&credentials))?;
        Ok(Self::new(Arc::new(backend), credentials, config))
    }

    /// Fetch the server state and adopt it as snapshot and selection.
    ///
    /// Without a signed-in user this does nothing. A failure shows the
    /// load error notice and is also returned.
    pub async fn load(&self) -> Result<(), AvailabilityError> {
        let shared = &self.shared;
        let Some(user) = shared.credentials.current_user() else {
            debug!("no signed-in user, skipping availability load");
            return Ok(());
        };

        match shared.backend.list(&user).await {
            Ok(records) => {
                debug!(%user, count = records.len(), "availability loaded");
                shared.update(|shared, inner| {
                    if inner.state.is_mounted() {
                        let follow_up = inner.state.load_succeeded(records);
                        shared.apply(inner, follow_up);
                    }
                });
                Ok(())
            }
            Err(err) => {
                warn!(%user, error = %err, "failed to load availability");
                shared.update(|shared, inner| {
                    if inner.state.is_mounted() {
                        let ticket = inner.state.load_failed();
                        shared.arm_notice(&mut inner.timers, ticket, shared.config.error_display());
                    }
                });
                Err(err)
            }
        }
    }

    /// Replace the working selection with the calendar's full selection.
    pub fn apply_selection<I>(&self, dates: I)
    where
        I: IntoIterator<Item = NaiveDate>,
    {
        self.shared.update(|shared, inner| {
            if inner.state.is_mounted() {
                let follow_up = inner.state.apply_selection(dates);
                shared.apply(inner, follow_up);
            }
        });
    }

    /// Manual retry: reload when nothing was loaded yet, otherwise push
    /// pending edits right away.
    pub async fn retry(&self) -> Result<(), AvailabilityError> {
        if !self.is_loaded() {
            return self.load().await;
        }
        self.flush_now();
        Ok(())
    }

    /// Flush pending edits without waiting for the debounce.
    pub fn flush_now(&self) {
        let Some(user) = self.shared.credentials.current_user() else {
            debug!("no signed-in user, nothing to flush");
            return;
        };
        self.shared.update(|shared, inner| {
            let decision = inner.state.flush_now();
            inner.timers.abort_debounce();
            if let FlushDecision::Start(plan) = decision {
                shared.spawn_flush(user, plan);
            }
        });
    }

    pub fn status(&self) -> StatusView {
        *self.shared.status_tx.borrow()
    }

    /// Receiver that sees every status change.
    pub fn subscribe(&self) -> watch::Receiver<StatusView> {
        self.shared.status_tx.subscribe()
    }

    /// Last server-confirmed records.
    pub fn snapshot(&self) -> Vec<AvailabilityRecord> {
        self.shared.lock().state.snapshot().to_vec()
    }

    /// Current working selection.
    pub fn selection(&self) -> Vec<AvailabilityRecord> {
        self.shared.lock().state.working().to_vec()
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.shared.lock().state.is_dirty()
    }

    pub fn is_loaded(&self) -> bool {
        self.shared.lock().state.is_loaded()
    }

    /// Cancel timers and ignore any result still on its way back.
    pub fn unmount(&self) {
        self.shared.update(|_, inner| {
            inner.state.unmount();
            inner.timers.abort_all();
        });
        debug!("availability engine unmounted");
    }
}

impl Drop for AvailabilitySyncEngine {
    fn drop(&mut self) {
        self.unmount();
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run a transition, schedule what it asks for and publish the
    /// resulting projection, all under one lock.
    fn update<R>(self: &Arc<Self>, transition: impl FnOnce(&Arc<Self>, &mut Inner) -> R) -> R {
        let mut inner = self.lock();
        let result = transition(self, &mut *inner);
        let view = inner.state.project();
        self.status_tx.send_if_modified(|current| {
            if *current == view {
                false
            } else {
                debug!(status = ?view.status, "availability status changed");
                *current = view;
                true
            }
        });
        result
    }

    fn apply(self: &Arc<Self>, inner: &mut Inner, follow_up: FollowUp) {
        match follow_up {
            FollowUp::Nothing => {}
            FollowUp::ArmDebounce(ticket) => self.arm_debounce(&mut inner.timers, ticket),
            FollowUp::CancelDebounce => inner.timers.abort_debounce(),
            FollowUp::Flush(plan) => match self.credentials.current_user() {
                Some(user) => self.spawn_flush(user, plan),
                None => {
                    warn!("user signed out before a queued save could run");
                    let ticket = inner.state.flush_failed(StatusMessage::SaveFailed, None);
                    self.arm_notice(&mut inner.timers, ticket, self.config.error_display());
                }
            },
        }
    }

    fn arm_debounce(self: &Arc<Self>, timers: &mut Timers, ticket: TimerTicket) {
        debug!(delay_ms = self.config.debounce_ms, "debounce armed");
        let handle = self.spawn_timer(self.config.debounce(), move |shared| {
            shared.debounce_fired(ticket)
        });
        timers.replace_debounce(handle);
    }

    fn arm_notice(self: &Arc<Self>, timers: &mut Timers, ticket: TimerTicket, display: Duration) {
        let handle = self.spawn_timer(display, move |shared| {
            shared.update(|_, inner| inner.state.notice_elapsed(ticket));
        });
        timers.replace_notice(handle);
    }

    /// Sleep, then run `on_fire` if the engine is still alive.
    fn spawn_timer<F>(self: &Arc<Self>, delay: Duration, on_fire: F) -> JoinHandle<()>
    where
        F: FnOnce(Arc<Shared>) + Send + 'static,
    {
        // The deadline is fixed now, not when the task is first polled.
        let sleep = tokio::time::sleep(delay);
        let weak: Weak<Shared> = Arc::downgrade(self);
        tokio::spawn(async move {
            sleep.await;
            if let Some(shared) = weak.upgrade() {
                on_fire(shared);
            }
        })
    }

    fn debounce_fired(self: &Arc<Self>, ticket: TimerTicket) {
        let Some(user) = self.credentials.current_user() else {
            debug!("debounce fired without a signed-in user");
            self.update(|_, inner| inner.state.cancel_pending());
            return;
        };
        self.update(|shared, inner| match inner.state.debounce_elapsed(ticket) {
            FlushDecision::Start(plan) => shared.spawn_flush(user, plan),
            FlushDecision::Queued => debug!("save in flight, flush queued"),
            FlushDecision::Skip => debug!("stale or empty debounce, nothing to flush"),
        });
    }

    fn spawn_flush(self: &Arc<Self>, user: UserId, plan: FlushPlan) {
        debug!(
            %user,
            add = plan.diff.to_add.len(),
            remove = plan.diff.to_remove.len(),
            "flushing availability"
        );
        let shared = Arc::clone(self);
        tokio::spawn(async move { shared.run_flush(user, plan).await });
    }

    async fn run_flush(self: Arc<Self>, user: UserId, plan: FlushPlan) {
        let FlushPlan { diff, revision } = plan;
        let backend = &self.backend;

        // Created rows are ignored: the re-fetch below is authoritative.
        let create = async {
            if diff.to_add.is_empty() {
                return Ok(());
            }
            backend.bulk_create(&user, &diff.to_add).await.map(|_| ())
        };
        let deletes = async {
            for id in diff.ids_to_remove() {
                backend.delete(&user, id).await?;
            }
            Ok::<(), AvailabilityError>(())
        };

        let written = match tokio::join!(create, deletes) {
            (Ok(()), Ok(())) => Ok(()),
            (Err(create_err), Err(delete_err)) => {
                // The role check wins so the user sees why.
                if delete_err.is_not_eligible() && !create_err.is_not_eligible() {
                    Err(delete_err)
                } else {
                    Err(create_err)
                }
            }
            (Err(err), _) | (_, Err(err)) => Err(err),
        };

        match written {
            Ok(()) => match backend.list(&user).await {
                Ok(records) => self.finish_success(revision, records),
                Err(err) => {
                    warn!(%user, error = %err, "writes applied but re-fetch failed");
                    self.finish_failure(StatusMessage::SaveFailed, None);
                }
            },
            Err(err) => {
                warn!(%user, error = %err, "failed to save availability");
                let refreshed = match backend.list(&user).await {
                    Ok(records) => Some(records),
                    Err(refetch_err) => {
                        warn!(%user, error = %refetch_err, "re-fetch after failed save also failed");
                        None
                    }
                };
                self.finish_failure(StatusMessage::for_write_error(&err), refreshed);
            }
        }
    }

    fn finish_success(self: &Arc<Self>, revision: u64, records: Vec<AvailabilityRecord>) {
        self.update(|shared, inner| {
            if !inner.state.is_mounted() {
                debug!("engine unmounted, discarding save result");
                return;
            }
            let AfterSave { notice, follow_up } = inner.state.flush_succeeded(revision, records);
            info!("availability saved");
            shared.arm_notice(&mut inner.timers, notice, shared.config.saved_display());
            shared.apply(inner, follow_up);
        });
    }

    fn finish_failure(
        self: &Arc<Self>,
        message: StatusMessage,
        refreshed: Option<Vec<AvailabilityRecord>>,
    ) {
        self.update(|shared, inner| {
            if !inner.state.is_mounted() {
                debug!("engine unmounted, discarding save failure");
                return;
            }
            let ticket = inner.state.flush_failed(message, refreshed);
            shared.arm_notice(&mut inner.timers, ticket, shared.config.error_display());
        });
    }
}

use crate::db::{MutationOutcome, Patient, SELECT_ALL_PATIENTS};
use crate::error::RegistryError;
use crate::service::executor::QueryExecutor;
use crate::service::mutations::{PatientForm, PatientMutations};
use crate::sync::SubscriptionId;
use futures::FutureExt;
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::{Notify, watch};
use tokio::task::AbortHandle;
use tracing::{debug, warn};

/// What the registry table shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RegistryState {
    Loading,
    Ready { patients: Vec<Patient> },
    Error { message: String },
}

impl RegistryState {
    pub fn patients(&self) -> Option<&[Patient]> {
        match self {
            RegistryState::Ready { patients } => Some(patients),
            _ => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, RegistryState::Ready { .. })
    }
}

/// Timing knobs for a mounted [`RegistryViewModel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshTiming {
    /// Delay before a requested refresh runs; triggers inside it collapse into one.
    pub debounce: Duration,
    /// Upper bound for [`RegistryViewModel::settled`].
    pub settle_timeout: Duration,
}

impl Default for RefreshTiming {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(50),
            settle_timeout: Duration::from_secs(5),
        }
    }
}

/// Refresh tickets: only the most recently issued ticket may publish.
#[derive(Debug, Default)]
pub(crate) struct RefreshSequencer {
    latest: Mutex<u64>,
}

impl RefreshSequencer {
    /// Issue the next ticket; `on_issue` runs while no other ticket can be issued or committed.
    pub(crate) fn begin(&self, on_issue: impl FnOnce()) -> u64 {
        let mut latest = self.lock();
        *latest += 1;
        on_issue();
        *latest
    }

    /// Run `publish` only if `ticket` is still the latest. Returns whether it ran.
    pub(crate) fn commit(&self, ticket: u64, publish: impl FnOnce()) -> bool {
        let latest = self.lock();
        if *latest != ticket {
            return false;
        }
        publish();
        true
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, u64> {
        self.latest.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

struct Inner {
    executor: QueryExecutor,
    mutations: PatientMutations,
    state: watch::Sender<RegistryState>,
    sequencer: RefreshSequencer,
    wake: Arc<Notify>,
    settle_timeout: Duration,
    subscription: Mutex<Option<SubscriptionId>>,
    worker: Mutex<Option<AbortHandle>>,
}

impl Inner {
    fn unmount(&self) {
        if let Some(id) = lock(&self.subscription).take() {
            self.executor.notifier().unsubscribe(id);
        }
        if let Some(worker) = lock(&self.worker).take() {
            worker.abort();
        }
    }

    async fn refresh(&self) {
        let ticket = self.sequencer.begin(|| {
            self.state.send_replace(RegistryState::Loading);
        });

        let next = match self.fetch().await {
            Ok(patients) => RegistryState::Ready { patients },
            Err(e) => {
                warn!(ticket, error = %e, "registry refresh failed");
                RegistryState::Error {
                    message: e.to_string(),
                }
            }
        };

        let applied = self.sequencer.commit(ticket, || {
            self.state.send_replace(next);
        });
        if !applied {
            debug!(ticket, "discarding superseded registry fetch");
        }
    }

    async fn fetch(&self) -> Result<Vec<Patient>, RegistryError> {
        self.executor.storage().ensure_ready().await?;
        let outcome = self.executor.run(SELECT_ALL_PATIENTS).await?;
        outcome
            .rows
            .into_iter()
            .map(Patient::from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(RegistryError::from)
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.unmount();
    }
}

/// Owns the registry snapshot for one session.
///
/// States go Loading → Ready | Error and back to Loading on every trigger: mount,
/// a change notification, or a mutation issued through this model. Triggers are
/// coalesced through one worker, so a local write and its own echoed notification
/// cost a single fetch.
#[derive(Clone)]
pub struct RegistryViewModel {
    inner: Arc<Inner>,
}

impl RegistryViewModel {
    /// Subscribe to change notifications and start the initial load.
    /// Must be called inside a tokio runtime. The worker and subscription stop on
    /// [`RegistryViewModel::unmount`] or when the last clone is dropped.
    pub fn mount(executor: QueryExecutor, timing: RefreshTiming) -> Self {
        let (state, _) = watch::channel(RegistryState::Loading);
        let wake = Arc::new(Notify::new());
        let inner = Arc::new(Inner {
            mutations: PatientMutations::new(executor.clone()),
            executor,
            state,
            sequencer: RefreshSequencer::default(),
            wake: wake.clone(),
            settle_timeout: timing.settle_timeout,
            subscription: Mutex::new(None),
            worker: Mutex::new(None),
        });

        let on_change = wake.clone();
        let subscription = inner.executor.notifier().subscribe(move |event| {
            debug!(%event, "change notification received");
            on_change.notify_one();
        });
        *lock(&inner.subscription) = Some(subscription);

        // The worker only holds the model while a refresh runs.
        let weak: Weak<Inner> = Arc::downgrade(&inner);
        let debounce = timing.debounce;
        let worker = tokio::spawn(async move {
            let mut first = true;
            loop {
                if !first {
                    wake.notified().await;
                    if !debounce.is_zero() {
                        tokio::time::sleep(debounce).await;
                    }
                    // Swallow a trigger that landed during the debounce window.
                    let _ = wake.notified().now_or_never();
                }
                first = false;

                let Some(inner) = weak.upgrade() else { break };
                inner.refresh().await;
            }
            debug!("registry worker stopped");
        });
        *lock(&inner.worker) = Some(worker.abort_handle());

        Self { inner }
    }

    pub fn state(&self) -> RegistryState {
        self.inner.state.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<RegistryState> {
        self.inner.state.subscribe()
    }

    /// Wait until the state satisfies `predicate` and return that state.
    pub async fn wait_for(
        &self,
        mut predicate: impl FnMut(&RegistryState) -> bool,
    ) -> RegistryState {
        let mut rx = self.watch();
        match rx.wait_for(|s| predicate(s)).await {
            Ok(state) => state.clone(),
            // Sender lives in `inner`, which `self` keeps alive.
            Err(_) => self.state(),
        }
    }

    /// Fetch now, bypassing the coalescing worker. Overlapping calls are allowed;
    /// only the latest-issued one publishes.
    pub async fn refresh(&self) {
        self.inner.refresh().await;
    }

    /// Wait for the state to leave `Loading`, giving up after the settle timeout.
    ///
    /// On timeout the current snapshot is returned as is; this happens when the
    /// model was unmounted in the middle of a refresh.
    pub async fn settled(&self) -> RegistryState {
        let settled = self.wait_for(|s| !matches!(s, RegistryState::Loading));
        match tokio::time::timeout(self.inner.settle_timeout, settled).await {
            Ok(state) => state,
            Err(_) => {
                warn!(
                    timeout_ms = self.inner.settle_timeout.as_millis(),
                    "registry did not settle, returning current snapshot"
                );
                self.state()
            }
        }
    }

    /// Ask the worker for a refresh; requests close together collapse into one.
    pub fn request_refresh(&self) {
        self.inner.wake.notify_one();
    }

    pub fn mutations(&self) -> &PatientMutations {
        &self.inner.mutations
    }

    pub async fn create(&self, form: &PatientForm) -> Result<i64, RegistryError> {
        let id = self.inner.mutations.create(form).await?;
        self.request_refresh();
        Ok(id)
    }

    pub async fn register(&self, form: &mut PatientForm) -> Result<i64, RegistryError> {
        let id = self.inner.mutations.register(form).await?;
        self.request_refresh();
        Ok(id)
    }

    pub async fn update(
        &self,
        id: i64,
        form: &PatientForm,
    ) -> Result<MutationOutcome, RegistryError> {
        let outcome = self.inner.mutations.update(id, form).await?;
        self.request_refresh();
        Ok(outcome)
    }

    pub async fn delete(&self, id: i64) -> Result<MutationOutcome, RegistryError> {
        let outcome = self.inner.mutations.delete(id).await?;
        self.request_refresh();
        Ok(outcome)
    }

    /// Stop listening for notifications and stop the refresh worker.
    pub fn unmount(&self) {
        self.inner.unmount();
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

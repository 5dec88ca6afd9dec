//! Session state
//!
//! State that outlives a single request and is touched both by HTTP handlers
//! and by background completion tasks:
//!
//! - [`ConnectionScope`]: the open storage connection and the listeners it
//!   registered; dropping the scope unregisters them
//! - [`InitiatedInputRegistry`]: initiated inputs waiting for their finish
//! - [`ActiveInfeedSlot`]: the single infeed input waiting for placement

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;

use infeed_core::{InputRequest, InputResponse, Pack, Result};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// =============================================================================
// Connection scope
// =============================================================================

/// Handler for pack input requests arriving over the connection
pub type InputListener = Arc<dyn Fn(InputRequest) -> Result<InputResponse> + Send + Sync>;

/// Pack input listeners currently registered
#[derive(Default)]
pub struct ListenerRegistry {
    next_id: AtomicU64,
    listeners: Mutex<Vec<(u64, InputListener)>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, listener: InputListener) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        lock(&self.listeners).push((id, listener));
        id
    }

    pub fn unregister(&self, id: u64) -> bool {
        let mut listeners = lock(&self.listeners);
        let before = listeners.len();
        listeners.retain(|(registered, _)| *registered != id);
        listeners.len() != before
    }

    pub fn len(&self) -> usize {
        lock(&self.listeners).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Hand a request to the first registered listener.
    ///
    /// `None` when nothing is listening. The listener runs without the
    /// registry lock held.
    pub fn deliver(&self, request: InputRequest) -> Option<Result<InputResponse>> {
        let listener = lock(&self.listeners).first().map(|(_, l)| Arc::clone(l))?;
        Some(listener(request))
    }
}

/// Lifetime of one storage connection
pub struct ConnectionScope {
    id: String,
    opened_at: DateTime<Utc>,
    registry: Arc<ListenerRegistry>,
    registrations: Vec<u64>,
}

impl ConnectionScope {
    pub fn open(registry: Arc<ListenerRegistry>) -> Self {
        let scope = Self {
            id: uuid::Uuid::new_v4().to_string(),
            opened_at: Utc::now(),
            registry,
            registrations: Vec::new(),
        };
        tracing::info!(connection = %scope.id, "storage connection opened");
        scope
    }

    /// Register a listener for as long as this scope lives
    pub fn listen(&mut self, listener: InputListener) {
        let id = self.registry.register(listener);
        self.registrations.push(id);
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn opened_at(&self) -> DateTime<Utc> {
        self.opened_at
    }

    pub fn listener_count(&self) -> usize {
        self.registrations.len()
    }
}

impl Drop for ConnectionScope {
    fn drop(&mut self) {
        for id in self.registrations.drain(..) {
            self.registry.unregister(id);
        }
        tracing::info!(connection = %self.id, "storage connection closed");
    }
}

// =============================================================================
// Initiated inputs
// =============================================================================

/// An input the operator started from the simulator side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitiatedInput {
    pub id: String,
    #[serde(default)]
    pub source: i32,
    #[serde(default)]
    pub input_point: i32,
    #[serde(default)]
    pub destination: i32,
    #[serde(default)]
    pub delivery_number: Option<String>,
    #[serde(default)]
    pub picking_indicator: bool,
    #[serde(default)]
    pub packs: Vec<Pack>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

/// Initiated inputs still waiting for the storage system's finish
#[derive(Debug, Default)]
pub struct InitiatedInputRegistry {
    inputs: Mutex<Vec<InitiatedInput>>,
}

impl InitiatedInputRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track an input; `false` if one with the same id is in flight
    pub fn add(&self, input: InitiatedInput) -> bool {
        let mut inputs = lock(&self.inputs);
        if inputs.iter().any(|i| i.id == input.id) {
            return false;
        }
        tracing::info!(input_id = %input.id, packs = input.packs.len(), "input initiated");
        inputs.push(input);
        true
    }

    /// Remove a finished input
    pub fn finish(&self, id: &str) -> Option<InitiatedInput> {
        let mut inputs = lock(&self.inputs);
        let index = inputs.iter().position(|i| i.id == id)?;
        let input = inputs.remove(index);
        tracing::info!(input_id = %input.id, "initiated input finished");
        Some(input)
    }

    pub fn list(&self) -> Vec<InitiatedInput> {
        lock(&self.inputs).clone()
    }

    pub fn len(&self) -> usize {
        lock(&self.inputs).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// =============================================================================
// Infeed input
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InfeedState {
    /// Sent; the storage system waits for the packs to be placed
    Waiting,
    Completed,
    Aborted,
}

impl InfeedState {
    pub fn is_finished(self) -> bool {
        self != InfeedState::Waiting
    }
}

/// What the operator asked to feed in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfeedOrder {
    pub id: String,
    #[serde(default)]
    pub infeed_number: i32,
    #[serde(default)]
    pub destination: i32,
    #[serde(default)]
    pub delivery_number: Option<String>,
    #[serde(default)]
    pub picking_indicator: bool,
    #[serde(default)]
    pub packs: Vec<Pack>,
}

/// Snapshot of an infeed input for display
#[derive(Debug, Clone, Serialize)]
pub struct InfeedView {
    #[serde(flatten)]
    pub order: InfeedOrder,
    pub state: InfeedState,
    pub started_at: DateTime<Utc>,
}

/// A running infeed input
#[derive(Debug)]
pub struct InfeedInput {
    order: InfeedOrder,
    started_at: DateTime<Utc>,
    state: watch::Sender<InfeedState>,
}

impl InfeedInput {
    pub fn start(order: InfeedOrder) -> Arc<Self> {
        let (state, _) = watch::channel(InfeedState::Waiting);
        tracing::info!(input_id = %order.id, infeed = order.infeed_number, "infeed input sent");
        Arc::new(Self {
            order,
            started_at: Utc::now(),
            state,
        })
    }

    pub fn id(&self) -> &str {
        &self.order.id
    }

    pub fn state(&self) -> InfeedState {
        *self.state.borrow()
    }

    pub fn is_finished(&self) -> bool {
        self.state().is_finished()
    }

    /// Confirm placement; `false` if the input already finished
    pub fn packs_placed(&self) -> bool {
        self.conclude(InfeedState::Completed)
    }

    pub fn abort(&self) -> bool {
        self.conclude(InfeedState::Aborted)
    }

    fn conclude(&self, outcome: InfeedState) -> bool {
        self.state.send_if_modified(|state| {
            if state.is_finished() {
                return false;
            }
            *state = outcome;
            true
        })
    }

    /// Wait until the input completes or is aborted. There is no timeout.
    pub async fn wait_finished(&self) -> InfeedState {
        let mut updates = self.state.subscribe();
        let outcome = match updates.wait_for(|state| state.is_finished()).await {
            Ok(state) => *state,
            Err(_) => self.state(),
        };
        outcome
    }

    pub fn view(&self) -> InfeedView {
        InfeedView {
            order: self.order.clone(),
            state: self.state(),
            started_at: self.started_at,
        }
    }
}

/// Holder of the one infeed input that may be in flight
#[derive(Debug, Default)]
pub struct ActiveInfeedSlot {
    slot: Mutex<Option<Arc<InfeedInput>>>,
}

impl ActiveInfeedSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `input` unless an unfinished one is active; that one is
    /// returned as the error.
    pub fn install(&self, input: Arc<InfeedInput>) -> std::result::Result<(), Arc<InfeedInput>> {
        let mut slot = lock(&self.slot);
        match slot.as_ref() {
            Some(active) if !active.is_finished() => Err(Arc::clone(active)),
            _ => {
                *slot = Some(input);
                Ok(())
            }
        }
    }

    pub fn current(&self) -> Option<Arc<InfeedInput>> {
        lock(&self.slot).clone()
    }

    pub fn take(&self) -> Option<Arc<InfeedInput>> {
        lock(&self.slot).take()
    }

    /// Clear the slot if it still holds `input`
    pub fn release(&self, input: &Arc<InfeedInput>) -> bool {
        let mut slot = lock(&self.slot);
        match slot.as_ref() {
            Some(active) if Arc::ptr_eq(active, input) => {
                *slot = None;
                true
            }
            _ => false,
        }
    }
}

/// Wait for `input` in the background and free the slot when it finishes
pub fn spawn_infeed_waiter(
    slot: Arc<ActiveInfeedSlot>,
    input: Arc<InfeedInput>,
) -> tokio::task::JoinHandle<InfeedState> {
    tokio::spawn(async move {
        let outcome = input.wait_finished().await;
        tracing::info!(input_id = %input.id(), state = ?outcome, "infeed input finished");
        slot.release(&input);
        outcome
    })
}

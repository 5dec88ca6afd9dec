//! Shared application state
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, MutexGuard};

use infeed_core::{InputRequest, InputResponse, Result};
use infeed_decision::{DecisionPipeline, InputDispatcher};
use infeed_fields::PolicyStore;

use crate::config::ServiceConfig;
use crate::metrics::{Metrics, MetricsSink};
use crate::session::{
    ActiveInfeedSlot, ConnectionScope, InitiatedInputRegistry, InputListener, ListenerRegistry,
};

pub struct AppState {
    pub config: ServiceConfig,
    pub dispatcher: Arc<InputDispatcher>,
    pub policies: Arc<Mutex<PolicyStore>>,
    pub listeners: Arc<ListenerRegistry>,
    connection: Mutex<Option<ConnectionScope>>,
    pub initiated: InitiatedInputRegistry,
    pub infeed: Arc<ActiveInfeedSlot>,
    pub metrics: Arc<Metrics>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Build the state; policies from the config are validated here
    pub fn new(config: ServiceConfig) -> anyhow::Result<Self> {
        let policies = PolicyStore::from_config(&config.policies)?;
        let metrics = Arc::new(Metrics::new()?);

        let pipeline = DecisionPipeline::new(
            config.profile.clone(),
            Arc::new(config.article_catalog()),
        );
        let dispatcher = InputDispatcher::new(pipeline, Arc::new(MetricsSink::new(metrics.clone())))
            .with_log_capacity(config.decision_log_capacity);

        tracing::info!(
            profile = %config.profile.name,
            articles = config.articles.len(),
            selected_types = ?policies.selected_types(),
            "application state ready"
        );

        Ok(Self {
            config,
            dispatcher: Arc::new(dispatcher),
            policies: Arc::new(Mutex::new(policies)),
            listeners: Arc::new(ListenerRegistry::new()),
            connection: Mutex::new(None),
            initiated: InitiatedInputRegistry::new(),
            infeed: Arc::new(ActiveInfeedSlot::new()),
            metrics,
            started_at: Utc::now(),
        })
    }

    pub fn policies(&self) -> MutexGuard<'_, PolicyStore> {
        self.policies
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn connection(&self) -> MutexGuard<'_, Option<ConnectionScope>> {
        self.connection
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Open the storage connection and register the pack input listener.
    /// Returns the new connection id, or `None` if one is already open.
    pub fn connect(&self) -> Option<String> {
        let mut connection = self.connection();
        if connection.is_some() {
            return None;
        }
        let mut scope = ConnectionScope::open(self.listeners.clone());
        scope.listen(self.pack_input_listener());
        let id = scope.id().to_string();
        *connection = Some(scope);
        Some(id)
    }

    /// Close the connection; its listeners are unregistered on drop
    pub fn disconnect(&self) -> bool {
        let scope = self.connection().take();
        scope.is_some()
    }

    pub fn is_connected(&self) -> bool {
        self.connection().is_some()
    }

    pub fn connection_id(&self) -> Option<String> {
        self.connection().as_ref().map(|scope| scope.id().to_string())
    }

    /// Deliver an inbound request; `None` when nobody is listening
    pub fn receive_input(&self, request: InputRequest) -> Option<Result<InputResponse>> {
        let outcome = self.listeners.deliver(request);
        match &outcome {
            None => self.metrics.unavailable.inc(),
            Some(Err(_)) => self.metrics.aborted.inc(),
            Some(Ok(_)) => {}
        }
        outcome
    }

    fn pack_input_listener(&self) -> InputListener {
        let dispatcher = self.dispatcher.clone();
        let policies = self.policies.clone();
        Arc::new(move |request: InputRequest| -> Result<InputResponse> {
            let store = policies
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .clone();
            dispatcher.dispatch(request, &store)
        })
    }
}

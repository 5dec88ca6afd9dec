//! API Handlers
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use infeed_core::{InfeedError, InputRequest, INFEED_VERSION};
use infeed_fields::{FieldCatalog, PolicyMode};

use crate::metrics;
use crate::session::{spawn_infeed_waiter, InfeedInput, InfeedOrder, InitiatedInput};
use crate::state::AppState;

type Reply = (StatusCode, Json<Value>);

const DEFAULT_DECISION_LIMIT: usize = 50;

fn error_reply(status: StatusCode, category: &str, message: impl Into<String>) -> Reply {
    (
        status,
        Json(json!({ "error": { "category": category, "message": message.into() } })),
    )
}

/// Map a core error to its HTTP status
fn infeed_error(err: &InfeedError) -> Reply {
    let status = match err {
        InfeedError::UnknownField { .. } | InfeedError::UnknownType(_) => StatusCode::NOT_FOUND,
        InfeedError::MandatoryField { .. } => StatusCode::CONFLICT,
        InfeedError::FieldValueConversion { .. }
        | InfeedError::ArticleAssignment(_)
        | InfeedError::Decode(_) => StatusCode::UNPROCESSABLE_ENTITY,
        InfeedError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_reply(status, err.category(), err.to_string())
}

fn not_connected() -> Reply {
    error_reply(
        StatusCode::SERVICE_UNAVAILABLE,
        "CONNECTION",
        "no storage connection is open",
    )
}

pub async fn health(State(state): State<Arc<AppState>>) -> Reply {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "version": INFEED_VERSION,
            "connected": state.is_connected(),
            "started_at": state.started_at,
        })),
    )
}

pub async fn metrics(State(state): State<Arc<AppState>>) -> (StatusCode, String) {
    match metrics::encode(state.metrics.registry()) {
        Ok(text) => (StatusCode::OK, text),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    }
}

// === Pack input ===

pub async fn submit_input(
    State(state): State<Arc<AppState>>,
    Json(request): Json<InputRequest>,
) -> Reply {
    match state.receive_input(request) {
        None => not_connected(),
        Some(Ok(response)) => (StatusCode::OK, Json(json!(response))),
        Some(Err(err)) => {
            let (_, body) = infeed_error(&err);
            (StatusCode::UNPROCESSABLE_ENTITY, body)
        }
    }
}

pub async fn open_connection(State(state): State<Arc<AppState>>) -> Reply {
    match state.connect() {
        Some(id) => (StatusCode::CREATED, Json(json!({ "connection": id }))),
        None => error_reply(
            StatusCode::CONFLICT,
            "CONNECTION",
            "a storage connection is already open",
        ),
    }
}

pub async fn close_connection(State(state): State<Arc<AppState>>) -> Reply {
    let closed = state.disconnect();
    (StatusCode::OK, Json(json!({ "closed": closed })))
}

// === Field catalog and policies ===

pub async fn get_fields(Path(type_name): Path<String>) -> Reply {
    match FieldCatalog::describe(&type_name) {
        Some(fields) => (
            StatusCode::OK,
            Json(json!({ "type": type_name, "fields": fields })),
        ),
        None => infeed_error(&InfeedError::UnknownType(type_name)),
    }
}

pub async fn get_policies(
    State(state): State<Arc<AppState>>,
    Path(type_name): Path<String>,
) -> Reply {
    if FieldCatalog::describe(&type_name).is_none() {
        return infeed_error(&InfeedError::UnknownType(type_name));
    }
    let store = state.policies();
    let policies = store.policies(&type_name);
    (
        StatusCode::OK,
        Json(json!({
            "type": type_name,
            "selected": policies.is_some(),
            "policies": policies.cloned().unwrap_or_default(),
        })),
    )
}

pub async fn select_type(
    State(state): State<Arc<AppState>>,
    Path(type_name): Path<String>,
) -> Reply {
    let mut store = state.policies();
    match store.select(&type_name) {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "type": type_name, "selected": true, "policies": store.policies(&type_name) })),
        ),
        Err(err) => infeed_error(&err),
    }
}

pub async fn deselect_type(
    State(state): State<Arc<AppState>>,
    Path(type_name): Path<String>,
) -> Reply {
    let removed = state.policies().deselect(&type_name);
    (
        StatusCode::OK,
        Json(json!({ "type": type_name, "deselected": removed })),
    )
}

pub async fn set_policy(
    State(state): State<Arc<AppState>>,
    Path((type_name, field)): Path<(String, String)>,
    Json(mode): Json<PolicyMode>,
) -> Reply {
    let mut store = state.policies();
    match store.set_policy(&type_name, &field, mode) {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "type": type_name, "field": field, "mode": store.policies(&type_name).and_then(|set| set.get(&field)) })),
        ),
        Err(err) => infeed_error(&err),
    }
}

pub async fn exclude_field(
    State(state): State<Arc<AppState>>,
    Path((type_name, field)): Path<(String, String)>,
) -> Reply {
    match state.policies().exclude(&type_name, &field) {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "type": type_name, "field": field, "excluded": true })),
        ),
        Err(err) => infeed_error(&err),
    }
}

// === Decision log ===

#[derive(Debug, Deserialize)]
pub struct DecisionQuery {
    pub limit: Option<usize>,
}

pub async fn list_decisions(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DecisionQuery>,
) -> Reply {
    let limit = query.limit.unwrap_or(DEFAULT_DECISION_LIMIT);
    (
        StatusCode::OK,
        Json(json!({
            "stats": state.dispatcher.stats(),
            "records": state.dispatcher.recent_decisions(limit),
        })),
    )
}

// === Initiated inputs ===

pub async fn initiate_input(
    State(state): State<Arc<AppState>>,
    Json(input): Json<InitiatedInput>,
) -> Reply {
    if !state.is_connected() {
        return not_connected();
    }
    let id = input.id.clone();
    if state.initiated.add(input) {
        (StatusCode::CREATED, Json(json!({ "id": id })))
    } else {
        error_reply(
            StatusCode::CONFLICT,
            "INPUT",
            format!("initiated input '{}' is already in flight", id),
        )
    }
}

pub async fn finish_initiated(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Reply {
    match state.initiated.finish(&id) {
        Some(input) => (StatusCode::OK, Json(json!(input))),
        None => error_reply(
            StatusCode::NOT_FOUND,
            "INPUT",
            format!("no initiated input '{}'", id),
        ),
    }
}

pub async fn list_initiated(State(state): State<Arc<AppState>>) -> Reply {
    (
        StatusCode::OK,
        Json(json!({ "inputs": state.initiated.list() })),
    )
}

// === Infeed input ===

pub async fn start_infeed(
    State(state): State<Arc<AppState>>,
    Json(order): Json<InfeedOrder>,
) -> Reply {
    if !state.is_connected() {
        return not_connected();
    }
    let input = InfeedInput::start(order);
    if let Err(active) = state.infeed.install(input.clone()) {
        return error_reply(
            StatusCode::CONFLICT,
            "INFEED",
            format!("infeed input '{}' is still waiting", active.id()),
        );
    }
    spawn_infeed_waiter(state.infeed.clone(), input.clone());
    (StatusCode::ACCEPTED, Json(json!(input.view())))
}

pub async fn packs_placed(State(state): State<Arc<AppState>>) -> Reply {
    conclude_infeed(&state, InfeedInput::packs_placed)
}

pub async fn abort_infeed(State(state): State<Arc<AppState>>) -> Reply {
    conclude_infeed(&state, InfeedInput::abort)
}

fn conclude_infeed(state: &AppState, conclude: fn(&InfeedInput) -> bool) -> Reply {
    let Some(input) = state.infeed.current() else {
        return error_reply(StatusCode::NOT_FOUND, "INFEED", "no active infeed input");
    };
    if conclude(&input) {
        (StatusCode::OK, Json(json!(input.view())))
    } else {
        error_reply(
            StatusCode::CONFLICT,
            "INFEED",
            format!("infeed input '{}' already finished", input.id()),
        )
    }
}

pub async fn current_infeed(State(state): State<Arc<AppState>>) -> Reply {
    match state.infeed.current() {
        Some(input) => (StatusCode::OK, Json(json!(input.view()))),
        None => error_reply(StatusCode::NOT_FOUND, "INFEED", "no active infeed input"),
    }
}

//! End-to-end tests for the decision cycle.
//!
//! These run requests through the dispatcher and pipeline with an in-memory
//! article catalog and check verdicts, pack data and projections.

use chrono::{Months, NaiveDate};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use infeed_core::{
    InfeedError, InputHandlingKind, InputRequest, InputResponse, Pack, RequestContext,
};
use infeed_decision::{
    ArticleCatalog, CompletionSink, DecisionPipeline, InputArticle, InputDispatcher, InputProfile,
    RequestGate,
};
use infeed_fields::{PolicyMode, PolicyStore};

const KNOWN: &str = "4006381333931";
const FRIDGE: &str = "4006381000001";

fn catalog() -> Arc<ArticleCatalog> {
    Arc::new(
        ArticleCatalog::new()
            .with_article(KNOWN, InputArticle::new("PZN-01", "Aspirin").with_dosage_form("Tablet"))
            .with_article(FRIDGE, InputArticle::new("PZN-02", "Insulin").with_fridge(true)),
    )
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, 31).unwrap()
}

fn run(profile: InputProfile, request: &mut InputRequest, policies: &PolicyStore) -> InputResponse {
    let ctx = RequestContext::new(request).with_today(today());
    DecisionPipeline::new(profile, catalog())
        .run_with_context(&ctx, request, policies)
        .unwrap()
        .response
}

/// Quiet profile: no enforcement, no decoding
fn base_profile() -> InputProfile {
    InputProfile::permissive()
        .with_code_decoding(false)
        .with_expiry_month_offset(6)
}

#[derive(Default)]
struct RecordingSink {
    finished: AtomicUsize,
    ids: Mutex<Vec<String>>,
}

impl CompletionSink for RecordingSink {
    fn finish(&self, response: &InputResponse) {
        self.finished.fetch_add(1, Ordering::SeqCst);
        self.ids.lock().unwrap().push(response.id.clone());
    }
}

// =============================================================================
// Request gates
// =============================================================================

#[test]
fn test_stock_input_disabled_rejects_everything() {
    let original = InputRequest::new("1")
        .with_pack(Pack::new(KNOWN).with_batch("LOT"))
        .with_pack(Pack::new("ABC123"));
    let mut request = original.clone();

    let response = run(base_profile().with_stock_return_input(false), &mut request, &PolicyStore::new());

    assert_eq!(response.pack_kinds(), vec![InputHandlingKind::Rejected; 2]);
    for (before, after) in original.packs.iter().zip(&request.packs) {
        let mut expected = before.clone();
        expected.handling = after.handling.clone();
        assert_eq!(&expected, after);
    }
}

#[test]
fn test_stock_input_disabled_applies_to_deliveries() {
    let mut request = InputRequest::new("1").with_delivery("D-1").with_pack(Pack::new(KNOWN));
    let response = run(base_profile().with_stock_return_input(false), &mut request, &PolicyStore::new());
    assert_eq!(response.pack_kinds(), vec![InputHandlingKind::Rejected]);
    assert!(response.is_new_delivery);
}

#[test]
fn test_missing_picking_indicator_rejects_valid_packs() {
    let mut request = InputRequest::new("2")
        .with_pack(Pack::new(KNOWN).with_batch("LOT").with_expiry(today()))
        .with_pack(Pack::new("ABC123"));

    let response = run(
        base_profile().with_picking_indicator_enforced(true),
        &mut request,
        &PolicyStore::new(),
    );

    assert_eq!(
        response.pack_kinds(),
        vec![InputHandlingKind::RejectedNoPickingIndicator; 2]
    );
    assert_eq!(response.packs[0].article.id, "PZN-01");
    assert_eq!(response.packs[1].article.name.as_deref(), Some("Article ABC123"));
}

#[test]
fn test_single_unknown_article_vetoes_request() {
    let mut request = InputRequest::new("3")
        .with_pack(Pack::new(KNOWN))
        .with_pack(Pack::new("UNKNOWN-1"));

    let response = run(base_profile().with_only_known_articles(true), &mut request, &PolicyStore::new());

    for pack in &response.packs {
        assert_eq!(pack.handling.kind, InputHandlingKind::Rejected);
        assert_eq!(pack.handling.message.as_deref(), Some("Unknown article."));
        assert_eq!(pack.batch_number, None);
    }
    assert_eq!(response.packs[0].article.id, "PZN-01");
}

#[test]
fn test_known_articles_pass_the_veto() {
    let mut request = InputRequest::new("3")
        .with_pack(Pack::new(KNOWN))
        .with_pack(Pack::new(FRIDGE));

    let response = run(base_profile().with_only_known_articles(true), &mut request, &PolicyStore::new());
    assert_eq!(
        response.pack_kinds(),
        vec![InputHandlingKind::Allowed, InputHandlingKind::AllowedForFridge]
    );
}

// =============================================================================
// Per-pack evaluation
// =============================================================================

#[test]
fn test_single_pack_scenario() {
    let mut request = InputRequest::new("4")
        .with_pack(Pack::new("ABC123").with_location("").with_serial(""));

    let response = run(base_profile(), &mut request, &PolicyStore::new());
    let pack = &response.packs[0];

    assert_eq!(pack.batch_number.as_deref(), Some("BATCH-ABC123"));
    assert_eq!(pack.external_id.as_deref(), Some("EXTID-ABC123"));
    assert_eq!(pack.expiry_date, today().checked_add_months(Months::new(6)));
    assert_eq!(pack.handling.kind, InputHandlingKind::Allowed);
}

#[test]
fn test_fridge_article_and_fridge_mode() {
    let mut request = InputRequest::new("5").with_pack(Pack::new(FRIDGE));
    let response = run(base_profile(), &mut request, &PolicyStore::new());
    assert_eq!(response.packs[0].handling.kind, InputHandlingKind::AllowedForFridge);
    assert!(response.packs[0].article.requires_fridge);

    let mut request = InputRequest::new("6").with_pack(Pack::new(KNOWN));
    let response = run(base_profile().with_fridge_only(true), &mut request, &PolicyStore::new());
    assert_eq!(response.packs[0].handling.kind, InputHandlingKind::AllowedForFridge);
}

#[test]
fn test_expiry_check_precedes_batch_check() {
    let mut request = InputRequest::new("7")
        .with_pack(Pack::new(KNOWN))
        .with_pack(Pack::new(KNOWN).with_expiry(today()))
        .with_pack(Pack::new(KNOWN).with_expiry(today()).with_batch("LOT"));

    let profile = base_profile()
        .with_expiry_date_enforced(true)
        .with_batch_number_enforced(true);
    let response = run(profile, &mut request, &PolicyStore::new());

    assert_eq!(
        response.pack_kinds(),
        vec![
            InputHandlingKind::RejectedNoExpiryDate,
            InputHandlingKind::RejectedNoBatchNumber,
            InputHandlingKind::Allowed,
        ]
    );
    assert_eq!(response.packs[0].batch_number, None);
}

#[test]
fn test_location_and_serial_checks() {
    let mut request = InputRequest::new("8")
        .with_pack(Pack::new(KNOWN).with_location(""))
        .with_pack(Pack::new(KNOWN).with_location("A-1"));

    let profile = base_profile()
        .with_stock_location_enforced(true)
        .with_serial_number_enforced(true);
    let response = run(profile, &mut request, &PolicyStore::new());

    assert_eq!(
        response.pack_kinds(),
        vec![
            InputHandlingKind::RejectedNoStockLocation,
            InputHandlingKind::RejectedNoSerialNumber,
        ]
    );
}

#[test]
fn test_stock_location_overwrite_and_existing_batch() {
    let mut request = InputRequest::new("9")
        .with_pack(Pack::new(KNOWN).with_batch("LOT-9").with_location("A-1"));

    let response = run(
        base_profile().with_stock_location_overwrite("FRIDGE-1"),
        &mut request,
        &PolicyStore::new(),
    );

    let pack = &response.packs[0];
    assert_eq!(pack.batch_number.as_deref(), Some("LOT-9"));
    assert_eq!(pack.stock_location_id.as_deref(), Some("FRIDGE-1"));
}

#[test]
fn test_decoded_values_overwrite_pack() {
    let scan = "(01)04150123456782(17)270331(10)LOT-DM(21)SN-DM";
    let mut request = InputRequest::new("10").with_pack(Pack::new(scan).with_batch("OLD"));

    let response = run(
        base_profile().with_code_decoding(true).with_serial_number_enforced(true),
        &mut request,
        &PolicyStore::new(),
    );

    let pack = &response.packs[0];
    assert_eq!(pack.article.id, "12345678");
    assert_eq!(pack.batch_number.as_deref(), Some("LOT-DM"));
    assert_eq!(pack.serial_number.as_deref(), Some("SN-DM"));
    assert_eq!(pack.expiry_date, NaiveDate::from_ymd_opt(2027, 3, 31));
    assert_eq!(pack.handling.kind, InputHandlingKind::Allowed);
}

#[test]
fn test_decode_error_does_not_abort_pack() {
    let scan = "(01)04150123456782(17)279999";
    let mut request = InputRequest::new("11").with_pack(Pack::new(scan));

    let response = run(base_profile().with_code_decoding(true), &mut request, &PolicyStore::new());

    let pack = &response.packs[0];
    assert_eq!(pack.handling.kind, InputHandlingKind::Allowed);
    assert_eq!(pack.article.id, scan);
    assert_eq!(pack.batch_number.as_deref(), Some(format!("BATCH-{}", scan).as_str()));
}

// =============================================================================
// Article assignment failures
// =============================================================================

fn virtual_profile() -> InputProfile {
    base_profile().with_virtual_article(true)
}

fn pipeline_with_empty_id() -> DecisionPipeline {
    let catalog = ArticleCatalog::new()
        .with_article("EMPTY", InputArticle::new("", "Nameless"))
        .with_article(KNOWN, InputArticle::new("PZN-01", "Aspirin"));
    DecisionPipeline::new(virtual_profile(), Arc::new(catalog))
}

#[test]
fn test_assignment_failure_downgrades_stock_return_pack() {
    let mut request = InputRequest::new("12")
        .with_pack(Pack::new("EMPTY"))
        .with_pack(Pack::new(KNOWN));

    let outcome = pipeline_with_empty_id()
        .run(&mut request, &PolicyStore::new())
        .unwrap();

    let failed = &outcome.response.packs[0];
    assert_eq!(failed.handling.kind, InputHandlingKind::Rejected);
    assert!(failed.handling.message.as_deref().unwrap().contains("EMPTY"));

    let accepted = &outcome.response.packs[1];
    assert_eq!(accepted.handling.kind, InputHandlingKind::Allowed);
    assert_eq!(accepted.article.virtual_article_id.as_deref(), Some("Virtual-PZN-0"));
}

#[test]
fn test_assignment_failure_aborts_delivery() {
    let mut request = InputRequest::new("13")
        .with_delivery("D-13")
        .with_pack(Pack::new(KNOWN))
        .with_pack(Pack::new("EMPTY"));

    let err = pipeline_with_empty_id()
        .run(&mut request, &PolicyStore::new())
        .unwrap_err();

    assert!(matches!(err, InfeedError::ArticleAssignment(_)));
    assert_eq!(request.packs[0].handling.kind, InputHandlingKind::Allowed);
    assert!(!request.packs[1].handling.is_decided());
}

#[test]
fn test_gate_path_stock_return_skips_virtual_article() {
    let mut request = InputRequest::new("14").with_pack(Pack::new("EMPTY"));
    let profile = virtual_profile().with_picking_indicator_enforced(true);
    let catalog = ArticleCatalog::new().with_article("EMPTY", InputArticle::new("", "Nameless"));

    let outcome = DecisionPipeline::new(profile, Arc::new(catalog))
        .run(&mut request, &PolicyStore::new())
        .unwrap();

    assert_eq!(outcome.gate, Some(RequestGate::MissingPickingIndicator));
    assert_eq!(outcome.response.packs[0].article.virtual_article_id, None);
}

// =============================================================================
// Projection
// =============================================================================

#[test]
fn test_mirror_restores_pre_pipeline_batch() {
    let mut policies = PolicyStore::new();
    policies
        .set_policy("Pack", "batch_number", PolicyMode::MirrorInput)
        .unwrap();

    let mut request = InputRequest::new("15").with_pack(Pack::new("ABC123"));
    let response = run(base_profile(), &mut request, &policies);

    let pack = &response.packs[0];
    assert_eq!(pack.batch_number, None);
    assert_eq!(pack.external_id.as_deref(), Some("EXTID-ABC123"));
}

#[test]
fn test_custom_handling_and_deselected_message() {
    let mut policies = PolicyStore::new();
    policies
        .set_policy("Handling", "input", PolicyMode::custom("RejectedNoSerialNumber"))
        .unwrap();
    policies.exclude("Handling", "message").unwrap();

    let mut request = InputRequest::new("16")
        .with_pack(Pack::new(KNOWN))
        .with_pack(Pack::new("UNKNOWN"));
    let response = run(base_profile().with_only_known_articles(true), &mut request, &policies);

    for pack in &response.packs {
        assert_eq!(pack.handling.kind, InputHandlingKind::RejectedNoSerialNumber);
        assert_eq!(pack.handling.message, None);
    }
}

#[test]
fn test_global_gate_leaves_article_unprojected() {
    let mut policies = PolicyStore::new();
    policies
        .set_policy("Article", "name", PolicyMode::custom("Projected"))
        .unwrap();

    let mut request = InputRequest::new("17").with_pack(Pack::new(KNOWN));
    let response = run(base_profile().with_stock_return_input(false), &mut request, &policies);
    assert_eq!(response.packs[0].article.name, None);

    let mut request = InputRequest::new("18").with_pack(Pack::new(KNOWN));
    let response = run(base_profile(), &mut request, &policies);
    assert_eq!(response.packs[0].article.name.as_deref(), Some("Projected"));
}

#[test]
fn test_response_projection_mirrors_request() {
    let mut policies = PolicyStore::new();
    policies.set_policy("InputResponse", "source", PolicyMode::MirrorInput).unwrap();
    policies
        .set_policy("InputResponse", "is_new_delivery", PolicyMode::custom("True"))
        .unwrap();

    let mut request = InputRequest::new("19").with_route(100, 999).with_pack(Pack::new(KNOWN));
    let response = run(base_profile(), &mut request, &policies);

    assert_eq!(response.source, 100);
    assert_eq!(response.destination, 100);
    assert!(response.is_new_delivery);
}

#[test]
fn test_invalid_custom_value_aborts_cycle() {
    let mut policies = PolicyStore::new();
    policies
        .set_policy("Pack", "sub_item_quantity", PolicyMode::custom("lots"))
        .unwrap();

    let mut request = InputRequest::new("20").with_pack(Pack::new(KNOWN));
    let err = DecisionPipeline::new(base_profile(), catalog())
        .run(&mut request, &policies)
        .unwrap_err();
    assert!(matches!(err, InfeedError::FieldValueConversion { .. }));
}

// =============================================================================
// Dispatcher
// =============================================================================

#[test]
fn test_dispatcher_finishes_every_completed_request_once() {
    let sink = Arc::new(RecordingSink::default());
    let dispatcher = InputDispatcher::new(
        DecisionPipeline::new(base_profile().with_picking_indicator_enforced(true), catalog()),
        sink.clone(),
    );
    let policies = PolicyStore::new();

    dispatcher
        .dispatch(InputRequest::new("a").with_pack(Pack::new(KNOWN)), &policies)
        .unwrap();
    dispatcher
        .dispatch(
            InputRequest::new("b").with_delivery("D-2").with_pack(Pack::new(KNOWN)),
            &policies,
        )
        .unwrap();
    dispatcher
        .dispatch(
            InputRequest::new("c").with_picking_indicator(true).with_pack(Pack::new(KNOWN)),
            &policies,
        )
        .unwrap();

    assert_eq!(sink.finished.load(Ordering::SeqCst), 3);
    assert_eq!(*sink.ids.lock().unwrap(), vec!["a", "b", "c"]);

    let stats = dispatcher.stats();
    assert_eq!(stats.requests, 3);
    assert_eq!(stats.short_circuited, 2);
    assert_eq!(stats.packs_allowed, 1);
}

#[test]
fn test_dispatcher_does_not_finish_aborted_cycle() {
    let sink = Arc::new(RecordingSink::default());
    let dispatcher = InputDispatcher::new(pipeline_with_empty_id(), sink.clone());

    let request = InputRequest::new("x").with_delivery("D-9").with_pack(Pack::new("EMPTY"));
    assert!(dispatcher.dispatch(request, &PolicyStore::new()).is_err());

    assert_eq!(sink.finished.load(Ordering::SeqCst), 0);
    assert!(dispatcher.recent_decisions(10).is_empty());
}

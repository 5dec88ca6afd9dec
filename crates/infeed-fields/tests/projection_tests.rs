//! Integration tests for catalog, policy store and projector together.

use chrono::NaiveDate;
use infeed_core::{
    Article, ExpiryDateSource, Handling, InfeedError, InputHandlingKind, InputRequest,
    InputResponse, Pack,
};
use infeed_fields::{project, FieldCatalog, PolicyMode, PolicySet, PolicyStore, Projectable};

fn sample_pack() -> Pack {
    let mut pack = Pack::new("ABC123")
        .with_id(7)
        .with_batch("LOT-1")
        .with_external_id("EXT-1")
        .with_expiry(NaiveDate::from_ymd_opt(2027, 5, 31).unwrap())
        .with_expiry_source(ExpiryDateSource::Individual)
        .with_sub_items(12)
        .with_location("A-01")
        .with_serial("SN-9");
    pack.article = Article {
        id: "PZN-1".to_string(),
        name: Some("Ibuprofen 400".to_string()),
        dosage_form: Some("Tablet".to_string()),
        packaging_unit: Some("Box".to_string()),
        max_sub_item_quantity: 20,
        requires_fridge: true,
        virtual_article_id: Some("Virtual-PZN-".to_string()),
        virtual_article_name: Some("Virtual-Ibuprofen 400".to_string()),
    };
    pack.handling = Handling::new(InputHandlingKind::AllowedForFridge).with_message("ok");
    pack
}

// =============================================================================
// Idempotence
// =============================================================================

#[test]
fn test_use_default_everywhere_is_identity() {
    let original = sample_pack();
    let snapshot = Pack::new("OTHER").snapshot();

    let mut pack = original.clone();
    project(&mut pack, snapshot.pack(), &PolicySet::defaults_for::<Pack>()).unwrap();
    project(&mut pack.article, snapshot.article(), &PolicySet::defaults_for::<Article>()).unwrap();
    project(&mut pack.handling, snapshot.handling(), &PolicySet::defaults_for::<Handling>()).unwrap();

    assert_eq!(pack, original);
}

// =============================================================================
// Custom values
// =============================================================================

#[test]
fn test_boolean_custom_round_trip() {
    let source = Article::default();

    let mut article = Article::default();
    let on = PolicySet::defaults_for::<Article>().with("requires_fridge", PolicyMode::custom("True"));
    project(&mut article, &source, &on).unwrap();
    assert!(article.requires_fridge);

    let off = PolicySet::defaults_for::<Article>().with("requires_fridge", PolicyMode::custom("false"));
    project(&mut article, &source, &off).unwrap();
    assert!(!article.requires_fridge);
}

#[test]
fn test_custom_values_per_kind() {
    let mut pack = sample_pack();
    let source = pack.clone();
    let policies = PolicySet::defaults_for::<Pack>()
        .with("sub_item_quantity", PolicyMode::custom("5.0"))
        .with("expiry_date", PolicyMode::custom("2030-01-15"))
        .with("expiry_date_source", PolicyMode::custom("Article"))
        .with("serial_number", PolicyMode::custom("SN-CUSTOM"));

    project(&mut pack, &source, &policies).unwrap();

    assert_eq!(pack.sub_item_quantity, 5);
    assert_eq!(pack.expiry_date, NaiveDate::from_ymd_opt(2030, 1, 15));
    assert_eq!(pack.expiry_date_source, ExpiryDateSource::Article);
    assert_eq!(pack.serial_number.as_deref(), Some("SN-CUSTOM"));
}

#[test]
fn test_enumerated_ordinal_still_accepted() {
    let mut handling = Handling::new(InputHandlingKind::Allowed);
    let source = handling.clone();
    let policies = PolicySet::defaults_for::<Handling>().with("input", PolicyMode::custom("2"));

    project(&mut handling, &source, &policies).unwrap();
    assert_eq!(handling.kind, InputHandlingKind::Rejected);
}

#[test]
fn test_invalid_custom_value_aborts() {
    let mut pack = sample_pack();
    let source = pack.clone();
    let policies = PolicySet::defaults_for::<Pack>()
        .with("sub_item_quantity", PolicyMode::custom("many"));

    let err = project(&mut pack, &source, &policies).unwrap_err();
    match err {
        InfeedError::FieldValueConversion { type_name, field, raw, .. } => {
            assert_eq!(type_name, "Pack");
            assert_eq!(field, "sub_item_quantity");
            assert_eq!(raw, "many");
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_negative_quantity_is_conversion_error() {
    let mut article = Article::default();
    let policies = PolicySet::defaults_for::<Article>()
        .with("max_sub_item_quantity", PolicyMode::custom("-3"));

    assert!(matches!(
        project(&mut article, &Article::default(), &policies),
        Err(InfeedError::FieldValueConversion { .. })
    ));
}

// =============================================================================
// Mirror and deselection
// =============================================================================

#[test]
fn test_mirror_restores_pre_pipeline_values() {
    let mut pack = Pack::new("RAW-SCAN").with_location("");
    let snapshot = pack.snapshot();

    pack.scan_code = "DECODED".to_string();
    pack.batch_number = Some("BATCH-RAW-SCAN".to_string());
    pack.stock_location_id = Some("OVERWRITE".to_string());

    let policies = PolicySet::defaults_for::<Pack>()
        .with("batch_number", PolicyMode::MirrorInput)
        .with("stock_location_id", PolicyMode::MirrorInput);
    project(&mut pack, snapshot.pack(), &policies).unwrap();

    assert_eq!(pack.scan_code, "DECODED");
    assert_eq!(pack.batch_number, None);
    assert_eq!(pack.stock_location_id.as_deref(), Some(""));
}

#[test]
fn test_mirror_skips_fields_missing_on_source() {
    let request = InputRequest::new("42").with_route(100, 999).with_delivery("D-1");
    let mut response = InputResponse::from_request(&request);
    response.is_new_delivery = false;

    let policies = PolicySet::defaults_for::<InputResponse>()
        .with("is_new_delivery", PolicyMode::MirrorInput)
        .with("source", PolicyMode::MirrorInput);
    project(&mut response, &request, &policies).unwrap();

    assert!(!response.is_new_delivery);
    assert_eq!(response.source, 100);
}

#[test]
fn test_deselected_optional_fields_are_zeroed() {
    let mut pack = sample_pack();
    let source = pack.clone();
    let policies = PolicySet::defaults_for::<Pack>()
        .without("batch_number")
        .without("expiry_date")
        .without("expiry_date_source")
        .without("sub_item_quantity");

    project(&mut pack, &source, &policies).unwrap();

    assert_eq!(pack.batch_number, None);
    assert_eq!(pack.expiry_date, None);
    assert_eq!(pack.expiry_date_source, ExpiryDateSource::None);
    assert_eq!(pack.sub_item_quantity, 0);
    assert_eq!(pack.serial_number.as_deref(), Some("SN-9"));
    assert_eq!(pack.id, 7);
}

// =============================================================================
// Store driven projection
// =============================================================================

#[test]
fn test_store_rejects_bad_policies_and_projects_good_ones() {
    let mut store = PolicyStore::new();
    assert!(matches!(
        store.set_policy("Handling", "colour", PolicyMode::UseDefault),
        Err(InfeedError::UnknownField { .. })
    ));
    assert!(matches!(
        store.exclude("Article", "id"),
        Err(InfeedError::MandatoryField { .. })
    ));

    store.select("Handling").unwrap();
    store.exclude("Handling", "message").unwrap();
    store
        .set_policy("Handling", "input", PolicyMode::custom("RejectedNoSerialNumber"))
        .unwrap();

    let mut handling = Handling::new(InputHandlingKind::Allowed).with_message("fine");
    let source = Handling::default();
    project(&mut handling, &source, store.policies("Handling").unwrap()).unwrap();

    assert_eq!(handling.kind, InputHandlingKind::RejectedNoSerialNumber);
    assert_eq!(handling.message, None);
}

#[test]
fn test_every_catalog_entry_has_a_schema_row() {
    for type_name in FieldCatalog::type_names() {
        let catalog = FieldCatalog::describe(type_name).unwrap();
        for descriptor in catalog {
            assert!(FieldCatalog::lookup(type_name, descriptor.name).is_ok());
        }
    }
    assert_eq!(Pack::catalog().len(), Pack::schema().len() - 1);
}

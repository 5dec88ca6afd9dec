//! Static schema tables for the response objects
use once_cell::sync::Lazy;

use infeed_core::{
    Article, ExpiryDateSource, Handling, InputHandlingKind, InputRequest, InputResponse, Pack,
};

use crate::catalog::{discover, FieldDescriptor, FieldSpec, Projectable};
use crate::value::{FieldValue, ValueKind};

/// Types that can carry field policies
pub const TYPE_NAMES: &[&str] = &["InputResponse", "Article", "Pack", "Handling"];

const HANDLING_KINDS: ValueKind = ValueKind::Enumerated {
    variants: InputHandlingKind::VARIANTS,
};

const EXPIRY_SOURCES: ValueKind = ValueKind::Enumerated {
    variants: ExpiryDateSource::VARIANTS,
};

pub(crate) fn catalog_by_name(type_name: &str) -> Option<&'static [FieldDescriptor]> {
    match type_name {
        InputResponse::TYPE_NAME => Some(InputResponse::catalog()),
        Article::TYPE_NAME => Some(Article::catalog()),
        Pack::TYPE_NAME => Some(Pack::catalog()),
        Handling::TYPE_NAME => Some(Handling::catalog()),
        _ => None,
    }
}

// ============================================================================
// Article
// ============================================================================

static ARTICLE_SCHEMA: [FieldSpec<Article>; 8] = [
    FieldSpec {
        name: "id",
        kind: ValueKind::Text,
        mandatory: true,
        selectable: true,
        get: |a| FieldValue::Text(Some(a.id.clone())),
        set: |a, v| {
            a.id = v.into_text()?.unwrap_or_default();
            Ok(())
        },
    },
    FieldSpec {
        name: "name",
        kind: ValueKind::Text,
        mandatory: false,
        selectable: true,
        get: |a| FieldValue::Text(a.name.clone()),
        set: |a, v| {
            a.name = v.into_text()?;
            Ok(())
        },
    },
    FieldSpec {
        name: "dosage_form",
        kind: ValueKind::Text,
        mandatory: false,
        selectable: true,
        get: |a| FieldValue::Text(a.dosage_form.clone()),
        set: |a, v| {
            a.dosage_form = v.into_text()?;
            Ok(())
        },
    },
    FieldSpec {
        name: "packaging_unit",
        kind: ValueKind::Text,
        mandatory: false,
        selectable: true,
        get: |a| FieldValue::Text(a.packaging_unit.clone()),
        set: |a, v| {
            a.packaging_unit = v.into_text()?;
            Ok(())
        },
    },
    FieldSpec {
        name: "max_sub_item_quantity",
        kind: ValueKind::Numeric,
        mandatory: false,
        selectable: true,
        get: |a| FieldValue::Numeric(i64::from(a.max_sub_item_quantity)),
        set: |a, v| {
            a.max_sub_item_quantity = v.as_u32()?;
            Ok(())
        },
    },
    FieldSpec {
        name: "requires_fridge",
        kind: ValueKind::Boolean,
        mandatory: false,
        selectable: true,
        get: |a| FieldValue::Boolean(a.requires_fridge),
        set: |a, v| {
            a.requires_fridge = v.as_bool()?;
            Ok(())
        },
    },
    FieldSpec {
        name: "virtual_article_id",
        kind: ValueKind::Text,
        mandatory: false,
        selectable: true,
        get: |a| FieldValue::Text(a.virtual_article_id.clone()),
        set: |a, v| {
            a.virtual_article_id = v.into_text()?;
            Ok(())
        },
    },
    FieldSpec {
        name: "virtual_article_name",
        kind: ValueKind::Text,
        mandatory: false,
        selectable: true,
        get: |a| FieldValue::Text(a.virtual_article_name.clone()),
        set: |a, v| {
            a.virtual_article_name = v.into_text()?;
            Ok(())
        },
    },
];

static ARTICLE_CATALOG: Lazy<Vec<FieldDescriptor>> = Lazy::new(|| discover(&ARTICLE_SCHEMA));

impl Projectable for Article {
    const TYPE_NAME: &'static str = "Article";

    fn schema() -> &'static [FieldSpec<Self>] {
        &ARTICLE_SCHEMA
    }

    fn catalog() -> &'static [FieldDescriptor] {
        ARTICLE_CATALOG.as_slice()
    }
}

// ============================================================================
// Pack
// ============================================================================

static PACK_SCHEMA: [FieldSpec<Pack>; 9] = [
    FieldSpec {
        name: "id",
        kind: ValueKind::Numeric,
        mandatory: true,
        selectable: false,
        get: |p| FieldValue::Numeric(p.id as i64),
        set: |p, v| {
            p.id = v.as_u64()?;
            Ok(())
        },
    },
    FieldSpec {
        name: "scan_code",
        kind: ValueKind::Text,
        mandatory: true,
        selectable: true,
        get: |p| FieldValue::Text(Some(p.scan_code.clone())),
        set: |p, v| {
            p.scan_code = v.into_text()?.unwrap_or_default();
            Ok(())
        },
    },
    FieldSpec {
        name: "batch_number",
        kind: ValueKind::Text,
        mandatory: false,
        selectable: true,
        get: |p| FieldValue::Text(p.batch_number.clone()),
        set: |p, v| {
            p.batch_number = v.into_text()?;
            Ok(())
        },
    },
    FieldSpec {
        name: "external_id",
        kind: ValueKind::Text,
        mandatory: false,
        selectable: true,
        get: |p| FieldValue::Text(p.external_id.clone()),
        set: |p, v| {
            p.external_id = v.into_text()?;
            Ok(())
        },
    },
    FieldSpec {
        name: "expiry_date",
        kind: ValueKind::Date,
        mandatory: false,
        selectable: true,
        get: |p| FieldValue::Date(p.expiry_date),
        set: |p, v| {
            p.expiry_date = v.into_date()?;
            Ok(())
        },
    },
    FieldSpec {
        name: "expiry_date_source",
        kind: EXPIRY_SOURCES,
        mandatory: false,
        selectable: true,
        get: |p| FieldValue::Enumerated(p.expiry_date_source.ordinal()),
        set: |p, v| {
            let ordinal = v.as_ordinal()?;
            p.expiry_date_source = ExpiryDateSource::from_ordinal(ordinal)
                .ok_or_else(|| format!("no expiry date source with ordinal {}", ordinal))?;
            Ok(())
        },
    },
    FieldSpec {
        name: "sub_item_quantity",
        kind: ValueKind::Numeric,
        mandatory: false,
        selectable: true,
        get: |p| FieldValue::Numeric(i64::from(p.sub_item_quantity)),
        set: |p, v| {
            p.sub_item_quantity = v.as_u32()?;
            Ok(())
        },
    },
    FieldSpec {
        name: "stock_location_id",
        kind: ValueKind::Text,
        mandatory: false,
        selectable: true,
        get: |p| FieldValue::Text(p.stock_location_id.clone()),
        set: |p, v| {
            p.stock_location_id = v.into_text()?;
            Ok(())
        },
    },
    FieldSpec {
        name: "serial_number",
        kind: ValueKind::Text,
        mandatory: false,
        selectable: true,
        get: |p| FieldValue::Text(p.serial_number.clone()),
        set: |p, v| {
            p.serial_number = v.into_text()?;
            Ok(())
        },
    },
];

static PACK_CATALOG: Lazy<Vec<FieldDescriptor>> = Lazy::new(|| discover(&PACK_SCHEMA));

impl Projectable for Pack {
    const TYPE_NAME: &'static str = "Pack";

    fn schema() -> &'static [FieldSpec<Self>] {
        &PACK_SCHEMA
    }

    fn catalog() -> &'static [FieldDescriptor] {
        PACK_CATALOG.as_slice()
    }
}

// ============================================================================
// Handling
// ============================================================================

static HANDLING_SCHEMA: [FieldSpec<Handling>; 2] = [
    FieldSpec {
        name: "input",
        kind: HANDLING_KINDS,
        mandatory: true,
        selectable: true,
        get: |h| FieldValue::Enumerated(h.kind.ordinal()),
        set: |h, v| {
            let ordinal = v.as_ordinal()?;
            h.kind = InputHandlingKind::from_ordinal(ordinal)
                .ok_or_else(|| format!("no input handling with ordinal {}", ordinal))?;
            Ok(())
        },
    },
    FieldSpec {
        name: "message",
        kind: ValueKind::Text,
        mandatory: false,
        selectable: true,
        get: |h| FieldValue::Text(h.message.clone()),
        set: |h, v| {
            h.message = v.into_text()?;
            Ok(())
        },
    },
];

static HANDLING_CATALOG: Lazy<Vec<FieldDescriptor>> = Lazy::new(|| discover(&HANDLING_SCHEMA));

impl Projectable for Handling {
    const TYPE_NAME: &'static str = "Handling";

    fn schema() -> &'static [FieldSpec<Self>] {
        &HANDLING_SCHEMA
    }

    fn catalog() -> &'static [FieldDescriptor] {
        HANDLING_CATALOG.as_slice()
    }
}

// ============================================================================
// InputRequest (mirror source only) and InputResponse
// ============================================================================

static REQUEST_SCHEMA: [FieldSpec<InputRequest>; 5] = [
    FieldSpec {
        name: "id",
        kind: ValueKind::Text,
        mandatory: true,
        selectable: false,
        get: |r| FieldValue::Text(Some(r.id.clone())),
        set: |r, v| {
            r.id = v.into_text()?.unwrap_or_default();
            Ok(())
        },
    },
    FieldSpec {
        name: "source",
        kind: ValueKind::Numeric,
        mandatory: true,
        selectable: false,
        get: |r| FieldValue::Numeric(i64::from(r.source)),
        set: |r, v| {
            r.source = v.as_i32()?;
            Ok(())
        },
    },
    FieldSpec {
        name: "destination",
        kind: ValueKind::Numeric,
        mandatory: true,
        selectable: false,
        get: |r| FieldValue::Numeric(i64::from(r.destination)),
        set: |r, v| {
            r.destination = v.as_i32()?;
            Ok(())
        },
    },
    FieldSpec {
        name: "delivery_number",
        kind: ValueKind::Text,
        mandatory: false,
        selectable: false,
        get: |r| FieldValue::Text(r.delivery_number.clone()),
        set: |r, v| {
            r.delivery_number = v.into_text()?;
            Ok(())
        },
    },
    FieldSpec {
        name: "picking_indicator",
        kind: ValueKind::Boolean,
        mandatory: false,
        selectable: false,
        get: |r| FieldValue::Boolean(r.picking_indicator),
        set: |r, v| {
            r.picking_indicator = v.as_bool()?;
            Ok(())
        },
    },
];

static REQUEST_CATALOG: Lazy<Vec<FieldDescriptor>> = Lazy::new(|| discover(&REQUEST_SCHEMA));

impl Projectable for InputRequest {
    const TYPE_NAME: &'static str = "InputRequest";

    fn schema() -> &'static [FieldSpec<Self>] {
        &REQUEST_SCHEMA
    }

    fn catalog() -> &'static [FieldDescriptor] {
        REQUEST_CATALOG.as_slice()
    }
}

static RESPONSE_SCHEMA: [FieldSpec<InputResponse>; 6] = [
    FieldSpec {
        name: "id",
        kind: ValueKind::Text,
        mandatory: true,
        selectable: true,
        get: |r| FieldValue::Text(Some(r.id.clone())),
        set: |r, v| {
            r.id = v.into_text()?.unwrap_or_default();
            Ok(())
        },
    },
    FieldSpec {
        name: "source",
        kind: ValueKind::Numeric,
        mandatory: true,
        selectable: true,
        get: |r| FieldValue::Numeric(i64::from(r.source)),
        set: |r, v| {
            r.source = v.as_i32()?;
            Ok(())
        },
    },
    FieldSpec {
        name: "destination",
        kind: ValueKind::Numeric,
        mandatory: true,
        selectable: true,
        get: |r| FieldValue::Numeric(i64::from(r.destination)),
        set: |r, v| {
            r.destination = v.as_i32()?;
            Ok(())
        },
    },
    FieldSpec {
        name: "delivery_number",
        kind: ValueKind::Text,
        mandatory: false,
        selectable: true,
        get: |r| FieldValue::Text(r.delivery_number.clone()),
        set: |r, v| {
            r.delivery_number = v.into_text()?;
            Ok(())
        },
    },
    FieldSpec {
        name: "picking_indicator",
        kind: ValueKind::Boolean,
        mandatory: false,
        selectable: true,
        get: |r| FieldValue::Boolean(r.picking_indicator),
        set: |r, v| {
            r.picking_indicator = v.as_bool()?;
            Ok(())
        },
    },
    FieldSpec {
        name: "is_new_delivery",
        kind: ValueKind::Boolean,
        mandatory: false,
        selectable: true,
        get: |r| FieldValue::Boolean(r.is_new_delivery),
        set: |r, v| {
            r.is_new_delivery = v.as_bool()?;
            Ok(())
        },
    },
];

static RESPONSE_CATALOG: Lazy<Vec<FieldDescriptor>> = Lazy::new(|| discover(&RESPONSE_SCHEMA));

impl Projectable for InputResponse {
    const TYPE_NAME: &'static str = "InputResponse";

    fn schema() -> &'static [FieldSpec<Self>] {
        &RESPONSE_SCHEMA
    }

    fn catalog() -> &'static [FieldDescriptor] {
        RESPONSE_CATALOG.as_slice()
    }
}

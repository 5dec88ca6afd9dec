//! Decision Pipeline
//!
//! Classifies every pack of an input request and projects the operator's
//! field policies onto the result.
//!
//! ```text
//! request ─► stock input gate ─► picking gate ─► known-article gate ─► per pack
//!                 │                   │                  │                 │
//!                 ▼                   ▼                  ▼                 ▼
//!              Rejected      RejectedNoPicking…   Rejected "Unknown   resolve, decode,
//!                                                   article."         assign, check,
//!                                                                     complete
//! ```
//!
//! Each pack is decided exactly once. Right after its verdict is set the
//! pack's article, pack fields and handling are projected against the
//! snapshot taken before the pipeline touched the request.

use chrono::Months;
use std::sync::Arc;

use infeed_core::{
    Article, Handling, InfeedError, InputHandlingKind, InputRequest, InputResponse, Pack,
    PackSnapshot, RequestContext, Result,
};
use infeed_fields::{project_if_selected, PolicyStore};

use crate::config::InputProfile;
use crate::decoder::{pzn_from_item_code, DecodeResult, DecoderChain};
use crate::resolver::{ArticleResolver, InputArticle};
use crate::rule::{PackCheck, RequestGate};

const VIRTUAL_PREFIX: &str = "Virtual-";

/// How much article data is written onto a pack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assignment {
    /// Master data only, no virtual article
    Basic,
    /// Master data plus virtual article when configured
    Full,
}

/// Which sub-objects are projected after a verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Projection {
    PackAndHandling,
    All,
}

/// Result of one pipeline run
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub response: InputResponse,
    /// Gate that decided the whole request, if any
    pub gate: Option<RequestGate>,
}

pub struct DecisionPipeline {
    profile: InputProfile,
    resolver: Arc<dyn ArticleResolver>,
    decoders: DecoderChain,
}

impl DecisionPipeline {
    pub fn new(profile: InputProfile, resolver: Arc<dyn ArticleResolver>) -> Self {
        Self {
            profile,
            resolver,
            decoders: DecoderChain::standard(),
        }
    }

    pub fn with_decoders(mut self, decoders: DecoderChain) -> Self {
        self.decoders = decoders;
        self
    }

    pub fn profile(&self) -> &InputProfile {
        &self.profile
    }

    pub fn run(&self, request: &mut InputRequest, policies: &PolicyStore) -> Result<PipelineOutcome> {
        let ctx = RequestContext::new(request);
        self.run_with_context(&ctx, request, policies)
    }

    /// Decide every pack of `request` in place and build the response.
    ///
    /// A propagated error aborts the run; packs decided before it keep their
    /// verdicts.
    pub fn run_with_context(
        &self,
        ctx: &RequestContext,
        request: &mut InputRequest,
        policies: &PolicyStore,
    ) -> Result<PipelineOutcome> {
        let span = tracing::info_span!(
            "input_decision",
            request_id = %ctx.request_id,
            trace_id = %ctx.trace_id,
            kind = %ctx.kind,
        );
        let _enter = span.enter();

        let original = request.clone();
        let snapshots: Vec<PackSnapshot> = request.packs.iter().map(Pack::snapshot).collect();

        let gate = RequestGate::static_gate(&self.profile, request).or_else(|| {
            (self.profile.only_known_articles && self.has_unknown_article(request))
                .then_some(RequestGate::UnknownArticle)
        });

        match gate {
            Some(RequestGate::StockInputDisabled) => {
                tracing::info!(packs = request.packs.len(), "rejecting all packs, stock input disabled");
                for (pack, snapshot) in request.packs.iter_mut().zip(&snapshots) {
                    self.finalize(
                        pack,
                        snapshot,
                        InputHandlingKind::Rejected,
                        None,
                        Projection::PackAndHandling,
                        policies,
                    )?;
                }
            }
            Some(gate) => {
                tracing::info!(packs = request.packs.len(), %gate, "rejecting all packs");
                for (pack, snapshot) in request.packs.iter_mut().zip(&snapshots) {
                    let article = self
                        .resolver
                        .resolve(&pack.scan_code, &self.profile.resolve_options());
                    let assignment = if ctx.is_delivery() {
                        Assignment::Full
                    } else {
                        Assignment::Basic
                    };
                    assign_article(pack, &article, &self.profile, assignment)?;
                    self.finalize(
                        pack,
                        snapshot,
                        gate.verdict(),
                        gate.message().map(str::to_string),
                        Projection::All,
                        policies,
                    )?;
                }
            }
            None => {
                for (pack, snapshot) in request.packs.iter_mut().zip(&snapshots) {
                    self.evaluate_pack(ctx, pack, snapshot, policies)?;
                }
            }
        }

        let mut response = InputResponse::from_request(request);
        project_if_selected(
            &mut response,
            &original,
            policies.policies_for::<InputResponse>(),
        )?;

        Ok(PipelineOutcome { response, gate })
    }

    fn has_unknown_article(&self, request: &InputRequest) -> bool {
        request.packs.iter().any(|pack| {
            self.resolver
                .lookup(&pack.scan_code, &self.profile.resolve_options())
                .is_none()
        })
    }

    fn evaluate_pack(
        &self,
        ctx: &RequestContext,
        pack: &mut Pack,
        snapshot: &PackSnapshot,
        policies: &PolicyStore,
    ) -> Result<()> {
        let mut article = self
            .resolver
            .resolve(&pack.scan_code, &self.profile.resolve_options());

        if self.profile.parse_datamatrix_codes {
            if let Some(decoded) = self.decoders.decode(&pack.scan_code) {
                apply_decoded(pack, &mut article, decoded);
            }
        }

        if let Err(err) = assign_article(pack, &article, &self.profile, Assignment::Full) {
            if ctx.is_delivery() {
                tracing::error!(scan_code = %pack.scan_code, error = %err, "article assignment failed, aborting delivery");
                return Err(err);
            }
            tracing::warn!(scan_code = %pack.scan_code, error = %err, "rejecting pack, article assignment failed");
            let message = match err {
                InfeedError::ArticleAssignment(message) => message,
                other => other.to_string(),
            };
            return self.finalize(
                pack,
                snapshot,
                InputHandlingKind::Rejected,
                Some(message),
                Projection::All,
                policies,
            );
        }

        if let Some(check) = PackCheck::first_failure(&self.profile, pack) {
            tracing::info!(scan_code = %pack.scan_code, reason = %check, "rejecting pack");
            return self.finalize(pack, snapshot, check.verdict(), None, Projection::All, policies);
        }

        self.complete_pack(ctx, pack);

        let verdict = if self.profile.fridge_only || article.requires_fridge {
            InputHandlingKind::AllowedForFridge
        } else {
            InputHandlingKind::Allowed
        };
        tracing::info!(scan_code = %pack.scan_code, %verdict, "accepting pack");
        self.finalize(pack, snapshot, verdict, None, Projection::All, policies)
    }

    /// Fill in the data an accepted pack must carry
    fn complete_pack(&self, ctx: &RequestContext, pack: &mut Pack) {
        if !pack.has_batch_number() {
            pack.batch_number = Some(format!("BATCH-{}", pack.scan_code));
        }
        if !pack.has_external_id() {
            pack.external_id = Some(format!("EXTID-{}", pack.scan_code));
        }
        if pack.expiry_date.is_none() {
            pack.expiry_date = ctx
                .today
                .checked_add_months(Months::new(self.profile.default_expiry_month_offset));
        }
        if let Some(location) = &self.profile.overwrite_stock_location {
            pack.stock_location_id = Some(location.clone());
        }
    }

    fn finalize(
        &self,
        pack: &mut Pack,
        snapshot: &PackSnapshot,
        kind: InputHandlingKind,
        message: Option<String>,
        projection: Projection,
        policies: &PolicyStore,
    ) -> Result<()> {
        pack.set_handling(kind, message);

        if projection == Projection::All {
            project_if_selected(
                &mut pack.article,
                snapshot.article(),
                policies.policies_for::<Article>(),
            )?;
        }
        project_if_selected(pack, snapshot.pack(), policies.policies_for::<Pack>())?;
        project_if_selected(
            &mut pack.handling,
            snapshot.handling(),
            policies.policies_for::<Handling>(),
        )?;
        Ok(())
    }
}

/// Overwrite pack data with what the decoder found; empty values are ignored
fn apply_decoded(pack: &mut Pack, article: &mut InputArticle, decoded: DecodeResult) {
    let DecodeResult {
        item_code,
        batch_number,
        external_id,
        expiry_date,
        sub_item_quantity,
        serial_number,
    } = decoded;

    if let Some(code) = item_code.as_deref().filter(|code| !code.is_empty()) {
        article.id = pzn_from_item_code(code).unwrap_or(code).to_string();
    }
    if let Some(batch) = batch_number.filter(|b| !b.is_empty()) {
        pack.batch_number = Some(batch);
    }
    if let Some(external_id) = external_id.filter(|e| !e.is_empty()) {
        pack.external_id = Some(external_id);
    }
    if expiry_date.is_some() {
        pack.expiry_date = expiry_date;
    }
    if sub_item_quantity > 0 {
        pack.sub_item_quantity = sub_item_quantity;
    }
    if let Some(serial) = serial_number.filter(|s| !s.is_empty()) {
        pack.serial_number = Some(serial);
    }
}

/// Write article information onto a pack
pub fn assign_article(
    pack: &mut Pack,
    article: &InputArticle,
    profile: &InputProfile,
    assignment: Assignment,
) -> Result<()> {
    let (virtual_article_id, virtual_article_name) =
        if assignment == Assignment::Full && profile.set_virtual_article {
            let mut id = article.id.chars();
            if id.next_back().is_none() {
                return Err(InfeedError::ArticleAssignment(format!(
                    "cannot derive a virtual article for pack '{}' without an article id",
                    pack.scan_code
                )));
            }
            (
                Some(format!("{}{}", VIRTUAL_PREFIX, id.as_str())),
                Some(format!("{}{}", VIRTUAL_PREFIX, article.name)),
            )
        } else {
            (None, None)
        };

    pack.article = Article {
        id: article.id.clone(),
        name: Some(article.name.clone()),
        dosage_form: non_empty(&article.dosage_form),
        packaging_unit: non_empty(&article.packaging_unit),
        max_sub_item_quantity: if profile.set_max_sub_item_quantity {
            article.max_sub_item_quantity
        } else {
            0
        },
        requires_fridge: profile.fridge_only || article.requires_fridge,
        virtual_article_id,
        virtual_article_name,
    };
    Ok(())
}

fn non_empty(text: &str) -> Option<String> {
    (!text.is_empty()).then(|| text.to_string())
}

//! Status transition engine
//!
//! Enforces the DIP review lifecycle. A transition is planned against the
//! current document first and only applied once it is known to be legal, so
//! a rejected request never leaves a half-updated document behind.

use crate::dip::{DipStatus, ProposalDocument, TransitionRecord};
use crate::error::AppError;
use chrono::Utc;
use uuid::Uuid;

impl DipStatus {
    /// Accepted, Rejected and Withdrawn are final
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            DipStatus::Accepted | DipStatus::Rejected | DipStatus::Withdrawn
        )
    }

    /// Valid successor states, given the latest review round reached
    pub fn valid_transitions(self, round: u32) -> Vec<DipStatus> {
        match self {
            DipStatus::Draft => vec![DipStatus::CommunityReview(1)],
            DipStatus::CommunityReview(n) => vec![
                DipStatus::CommunityReview(n.saturating_add(1)),
                DipStatus::FinalReview,
                DipStatus::Postponed,
                DipStatus::Withdrawn,
            ],
            DipStatus::FinalReview => vec![
                DipStatus::Accepted,
                DipStatus::Rejected,
                DipStatus::CommunityReview(round.saturating_add(1)),
            ],
            // Resuming picks the postponed round back up
            DipStatus::Postponed => vec![DipStatus::CommunityReview(round.max(1))],
            DipStatus::Accepted | DipStatus::Rejected | DipStatus::Withdrawn => Vec::new(),
        }
    }

    pub fn can_transition_to(self, target: DipStatus, round: u32) -> bool {
        self.valid_transitions(round).contains(&target)
    }
}

/// Latest review round implied by a status and review count.
///
/// Documents enter the registry mid-lifecycle, so the round has to be
/// recovered from what the metadata table says.
///
/// For `Postponed` and `FinalReview` the table carries no round, so the
/// review count stands in for it. A document that was postponed, resumed
/// the same round and postponed again has a count above its round and will
/// resume one round too late. Transitions applied after registration track
/// `round` directly.
pub fn derive_round(status: DipStatus, review_count: u32) -> u32 {
    match status {
        DipStatus::Draft => 0,
        DipStatus::CommunityReview(n) => n,
        _ => review_count,
    }
}

/// Outcome of a legal transition, before it is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedTransition {
    pub from: DipStatus,
    pub to: DipStatus,
    pub review_count: u32,
    pub round: u32,
}

/// Stateless engine over the lifecycle graph
pub struct TransitionEngine;

impl TransitionEngine {
    /// Check a transition against the lifecycle graph without touching the document
    pub fn plan(doc: &ProposalDocument, target: DipStatus) -> Result<PlannedTransition, AppError> {
        let from = doc.status;
        if !from.can_transition_to(target, doc.round) {
            return Err(AppError::IllegalTransition { from, to: target });
        }

        let (review_count, round) = match target {
            DipStatus::CommunityReview(n) => (doc.review_count.saturating_add(1), n),
            _ => (doc.review_count, doc.round),
        };

        Ok(PlannedTransition {
            from,
            to: target,
            review_count,
            round,
        })
    }

    /// Move the document to `target`, recording the transition in its history
    pub fn apply(
        doc: &mut ProposalDocument,
        target: DipStatus,
        note: Option<String>,
    ) -> Result<TransitionRecord, AppError> {
        let planned = Self::plan(doc, target)?;
        let now = Utc::now();

        let record = TransitionRecord {
            id: Uuid::new_v4(),
            from: planned.from,
            to: planned.to,
            review_count: planned.review_count,
            note,
            at: now,
        };

        doc.status = planned.to;
        doc.review_count = planned.review_count;
        doc.round = planned.round;
        doc.updated_at = Some(now);
        doc.history.push(record.clone());

        tracing::info!(
            "DIP{} moved {} -> {} (review count {})",
            doc.id,
            planned.from,
            planned.to,
            planned.review_count
        );

        Ok(record)
    }
}

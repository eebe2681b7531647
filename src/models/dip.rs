//! DIP-related request and response DTOs

use crate::dip::{
    DipFilter, DipId, DipSummary, ProposalDocument, StatusKind, TransitionRecord,
    ValidationError, ValidationReport,
};
use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::Validate;

/// Request to move a DIP to another lifecycle state
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TransitionRequest {
    /// Target state, e.g. `Community Review Round 2` or `final_review`
    #[validate(length(min = 1, max = 64, message = "Target status is required"))]
    pub target: String,
    #[validate(length(max = 2000, message = "Note must be at most 2000 characters"))]
    pub note: Option<String>,
}

/// Query parameters for listing DIPs
#[derive(Debug, Default, Deserialize)]
pub struct DipListQuery {
    pub status: Option<String>,
    pub author: Option<String>,
}

impl TryFrom<DipListQuery> for DipFilter {
    type Error = AppError;

    fn try_from(query: DipListQuery) -> Result<Self, Self::Error> {
        let status = query
            .status
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.parse::<StatusKind>())
            .transpose()
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        let mut filter = match status {
            Some(kind) => DipFilter::status(kind),
            None => DipFilter::all(),
        };
        filter.author = query.author.filter(|a| !a.trim().is_empty());
        Ok(filter)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DipListResponse {
    pub count: usize,
    pub dips: Vec<DipSummary>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DipResponse {
    pub dip: ProposalDocument,
}

/// Registration result; violations are warnings unless strict mode rejected them
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub dip: ProposalDocument,
    pub violations: Vec<ValidationError>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateResponse {
    pub dip: DipSummary,
    pub report: ValidationReport,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionResponse {
    pub dip: ProposalDocument,
    pub transition: TransitionRecord,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResponse {
    pub id: DipId,
    pub history: Vec<TransitionRecord>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub total: usize,
    pub by_status: BTreeMap<StatusKind, usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_request_requires_target() {
        let req = TransitionRequest {
            target: String::new(),
            note: None,
        };
        assert!(req.validate().is_err());

        let req = TransitionRequest {
            target: "final_review".to_string(),
            note: Some("ready".to_string()),
        };
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_list_query_to_filter() {
        let filter = DipFilter::try_from(DipListQuery {
            status: Some("community_review".to_string()),
            author: Some(" ".to_string()),
        })
        .unwrap();
        assert_eq!(filter.status, Some(StatusKind::CommunityReview));
        assert!(filter.author.is_none());

        let filter = DipFilter::try_from(DipListQuery {
            status: None,
            author: Some("Walter".to_string()),
        })
        .unwrap();
        assert!(filter.status.is_none());
        assert_eq!(filter.author.as_deref(), Some("Walter"));

        let err = DipFilter::try_from(DipListQuery {
            status: Some("merged".to_string()),
            author: None,
        })
        .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}

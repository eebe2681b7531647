//! DIP data models
//!
//! Defines the proposal document, its lifecycle status and transition records.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// DIP number, e.g. `1019`
pub type DipId = u32;

static COMMUNITY_REVIEW: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^community ?review(?: round)? ?(\d+)$").expect("valid community review pattern")
});

/// Lifecycle state of a DIP
///
/// ```text
/// Draft -> CommunityReview(1) -> ... -> FinalReview -> {Accepted | Rejected}
///                 |                          |
///                 +-> Postponed / Withdrawn  +-> CommunityReview(n+1)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "state", content = "round", rename_all = "snake_case")]
pub enum DipStatus {
    /// Being written, not yet reviewed
    Draft,
    /// Community review round `n` (n >= 1)
    CommunityReview(u32),
    /// Accepted for final review
    FinalReview,
    Accepted,
    Rejected,
    Withdrawn,
    /// Review paused; may resume
    Postponed,
}

impl Default for DipStatus {
    fn default() -> Self {
        DipStatus::Draft
    }
}

impl DipStatus {
    /// Round-independent classification, used for filtering
    pub fn kind(self) -> StatusKind {
        match self {
            DipStatus::Draft => StatusKind::Draft,
            DipStatus::CommunityReview(_) => StatusKind::CommunityReview,
            DipStatus::FinalReview => StatusKind::FinalReview,
            DipStatus::Accepted => StatusKind::Accepted,
            DipStatus::Rejected => StatusKind::Rejected,
            DipStatus::Withdrawn => StatusKind::Withdrawn,
            DipStatus::Postponed => StatusKind::Postponed,
        }
    }
}

impl fmt::Display for DipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DipStatus::Draft => f.write_str("Draft"),
            DipStatus::CommunityReview(n) => write!(f, "Community Review Round {}", n),
            DipStatus::FinalReview => f.write_str("Final Review"),
            DipStatus::Accepted => f.write_str("Accepted"),
            DipStatus::Rejected => f.write_str("Rejected"),
            DipStatus::Withdrawn => f.write_str("Withdrawn"),
            DipStatus::Postponed => f.write_str("Postponed"),
        }
    }
}

/// Status text that names no lifecycle state
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown lifecycle state '{0}'")]
pub struct UnknownStatus(pub String);

/// Lowercase, map `_`/`-` to spaces and collapse runs of whitespace
fn normalize(text: &str) -> String {
    text.to_lowercase()
        .replace(['_', '-'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

impl FromStr for DipStatus {
    type Err = UnknownStatus;

    /// Accepts the document form (`Community Review Round 2`) as well as
    /// compact API forms (`community_review_2`, `final-review`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = normalize(s);
        let status = match normalized.as_str() {
            "draft" => DipStatus::Draft,
            "final review" | "finalreview" => DipStatus::FinalReview,
            "accepted" => DipStatus::Accepted,
            "rejected" => DipStatus::Rejected,
            "withdrawn" => DipStatus::Withdrawn,
            "postponed" => DipStatus::Postponed,
            other => {
                let round = COMMUNITY_REVIEW
                    .captures(other)
                    .and_then(|caps| caps[1].parse::<u32>().ok())
                    .ok_or_else(|| UnknownStatus(s.trim().to_string()))?;
                DipStatus::CommunityReview(round)
            }
        };
        Ok(status)
    }
}

/// Status without the review round
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    Draft,
    CommunityReview,
    FinalReview,
    Accepted,
    Rejected,
    Withdrawn,
    Postponed,
}

impl FromStr for StatusKind {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "draft" => Ok(StatusKind::Draft),
            "community review" | "communityreview" => Ok(StatusKind::CommunityReview),
            "final review" | "finalreview" => Ok(StatusKind::FinalReview),
            "accepted" => Ok(StatusKind::Accepted),
            "rejected" => Ok(StatusKind::Rejected),
            "withdrawn" => Ok(StatusKind::Withdrawn),
            "postponed" => Ok(StatusKind::Postponed),
            _ => Err(UnknownStatus(s.trim().to_string())),
        }
    }
}

/// One heading-delimited section of a DIP
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub heading: String,
    /// Markdown heading level (2 for `##`)
    pub level: u8,
    /// Raw body text, not interpreted
    pub body: String,
}

/// A recorded lifecycle transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionRecord {
    pub id: Uuid,
    pub from: DipStatus,
    pub to: DipStatus,
    /// Review count after the transition
    pub review_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub at: DateTime<Utc>,
}

/// A D Improvement Proposal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalDocument {
    pub id: DipId,
    pub title: String,
    pub status: DipStatus,
    /// Number of community review rounds entered
    pub review_count: u32,
    /// Latest community review round reached (0 while in draft)
    pub round: u32,
    pub author: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub implementation: Option<String>,
    /// Free text between the metadata table and the first section
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub preamble: String,
    pub sections: Vec<Section>,
    /// SHA-256 of the source text
    pub checksum: String,
    #[serde(default)]
    pub history: Vec<TransitionRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registered_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ProposalDocument {
    /// Find a section by heading text (case-insensitive)
    pub fn section(&self, heading: &str) -> Option<&Section> {
        self.sections
            .iter()
            .find(|s| s.heading.eq_ignore_ascii_case(heading))
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Lightweight listing entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DipSummary {
    pub id: DipId,
    pub title: String,
    pub status: DipStatus,
    pub review_count: u32,
    pub author: String,
    pub section_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<&ProposalDocument> for DipSummary {
    fn from(doc: &ProposalDocument) -> Self {
        Self {
            id: doc.id,
            title: doc.title.clone(),
            status: doc.status,
            review_count: doc.review_count,
            author: doc.author.clone(),
            section_count: doc.sections.len(),
            updated_at: doc.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_status_parses_document_forms() {
        assert_eq!("Draft".parse::<DipStatus>().unwrap(), DipStatus::Draft);
        assert_eq!(
            "Community Review Round 2".parse::<DipStatus>().unwrap(),
            DipStatus::CommunityReview(2)
        );
        assert_eq!(
            "  final   review ".parse::<DipStatus>().unwrap(),
            DipStatus::FinalReview
        );
        assert_eq!(
            "community_review_3".parse::<DipStatus>().unwrap(),
            DipStatus::CommunityReview(3)
        );
        assert_eq!("final-review".parse::<DipStatus>().unwrap(), DipStatus::FinalReview);
    }

    #[test]
    fn test_status_rejects_unknown_text() {
        let err = "Formal Assessment".parse::<DipStatus>().unwrap_err();
        assert_eq!(err, UnknownStatus("Formal Assessment".to_string()));
        assert!("Community Review".parse::<DipStatus>().is_err());
    }

    #[test]
    fn test_status_display_matches_document_form() {
        for status in [
            DipStatus::Draft,
            DipStatus::CommunityReview(4),
            DipStatus::FinalReview,
            DipStatus::Postponed,
        ] {
            assert_eq!(status.to_string().parse::<DipStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_status_json_shape() {
        let json = serde_json::to_value(DipStatus::CommunityReview(2)).unwrap();
        assert_eq!(json, serde_json::json!({ "state": "community_review", "round": 2 }));
        let json = serde_json::to_value(DipStatus::Draft).unwrap();
        assert_eq!(json, serde_json::json!({ "state": "draft" }));
    }

    #[test]
    fn test_status_kind() {
        assert_eq!(DipStatus::CommunityReview(7).kind(), StatusKind::CommunityReview);
        assert_eq!("community-review".parse::<StatusKind>().unwrap(), StatusKind::CommunityReview);
        assert!("merged".parse::<StatusKind>().is_err());
    }
}

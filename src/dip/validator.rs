//! Schema validator
//!
//! Checks a parsed DIP for metadata problems. Every check runs on every
//! document; violations are collected, never short-circuited.

use crate::dip::{DipStatus, ProposalDocument};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Violation severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

/// A schema violation found in a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "camelCase")]
#[error("[{code}] {field}: {message}")]
pub struct ValidationError {
    pub code: String,
    pub field: String,
    pub severity: Severity,
    pub message: String,
}

impl ValidationError {
    fn error(code: &str, field: &str, message: String) -> Self {
        Self {
            code: code.to_string(),
            field: field.to_string(),
            severity: Severity::Error,
            message,
        }
    }

    fn warning(code: &str, field: &str, message: String) -> Self {
        Self {
            code: code.to_string(),
            field: field.to_string(),
            severity: Severity::Warning,
            message,
        }
    }
}

/// Result of validating one document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub violations: Vec<ValidationError>,
    pub has_errors: bool,
    pub has_warnings: bool,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Metadata validator for DIP documents
pub struct SchemaValidator;

impl SchemaValidator {
    /// Run every check and return all violations found
    pub fn validate(doc: &ProposalDocument) -> Vec<ValidationError> {
        let mut violations = Vec::new();

        violations.extend(Self::check_id(doc));
        violations.extend(Self::check_status(doc));
        violations.extend(Self::check_author(doc));
        violations.extend(Self::check_title(doc));
        violations.extend(Self::check_review_count(doc));
        violations.extend(Self::check_duplicate_sections(doc));

        violations
    }

    /// Validate and summarize
    pub fn report(doc: &ProposalDocument) -> ValidationReport {
        let violations = Self::validate(doc);
        let has_errors = violations.iter().any(|v| v.severity == Severity::Error);
        let has_warnings = violations.iter().any(|v| v.severity == Severity::Warning);

        ValidationReport {
            violations,
            has_errors,
            has_warnings,
        }
    }

    fn check_id(doc: &ProposalDocument) -> Option<ValidationError> {
        (doc.id == 0).then(|| {
            ValidationError::error("V001", "id", "DIP number must be a positive integer".to_string())
        })
    }

    fn check_status(doc: &ProposalDocument) -> Option<ValidationError> {
        match doc.status {
            DipStatus::CommunityReview(0) => Some(ValidationError::error(
                "V002",
                "status",
                "Community review rounds start at 1".to_string(),
            )),
            _ => None,
        }
    }

    fn check_author(doc: &ProposalDocument) -> Option<ValidationError> {
        doc.author.trim().is_empty().then(|| {
            ValidationError::error("V003", "author", "Author must not be empty".to_string())
        })
    }

    fn check_title(doc: &ProposalDocument) -> Option<ValidationError> {
        doc.title.trim().is_empty().then(|| {
            ValidationError::error("V004", "title", "Title must not be empty".to_string())
        })
    }

    /// Review count must agree with how far the document has progressed
    fn check_review_count(doc: &ProposalDocument) -> Option<ValidationError> {
        let count = doc.review_count;
        let message = match doc.status {
            DipStatus::Draft if count != 0 => format!(
                "A Draft must have a review count of 0, found {}",
                count
            ),
            DipStatus::Draft => return None,
            DipStatus::CommunityReview(n) if count < n => format!(
                "{} requires a review count of at least {}, found {}",
                doc.status, n, count
            ),
            DipStatus::CommunityReview(_) => return None,
            status if count == 0 => format!(
                "{} is only reachable through community review, but the review count is 0",
                status
            ),
            _ => return None,
        };

        Some(ValidationError::error("V005", "reviewCount", message))
    }

    fn check_duplicate_sections(doc: &ProposalDocument) -> Vec<ValidationError> {
        let mut seen = HashSet::new();
        doc.sections
            .iter()
            .filter(|s| !seen.insert((s.level, s.heading.to_lowercase())))
            .map(|s| {
                ValidationError::warning(
                    "V006",
                    "sections",
                    format!("Section heading '{}' appears more than once", s.heading),
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dip::Section;
    use pretty_assertions::assert_eq;

    fn doc(status: DipStatus, review_count: u32) -> ProposalDocument {
        ProposalDocument {
            id: 1019,
            title: "Named Arguments Lite".to_string(),
            status,
            review_count,
            round: 0,
            author: "Yuxuan Shui (yshuiv7@gmail.com)".to_string(),
            implementation: None,
            preamble: String::new(),
            sections: vec![Section {
                heading: "Abstract".to_string(),
                level: 2,
                body: "Named arguments for D.".to_string(),
            }],
            checksum: String::new(),
            history: Vec::new(),
            registered_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_clean_document_has_no_violations() {
        assert!(SchemaValidator::validate(&doc(DipStatus::Draft, 0)).is_empty());
        assert!(SchemaValidator::validate(&doc(DipStatus::CommunityReview(2), 2)).is_empty());
        assert!(SchemaValidator::validate(&doc(DipStatus::FinalReview, 2)).is_empty());
    }

    #[test]
    fn test_draft_with_reviews_yields_one_violation() {
        let violations = SchemaValidator::validate(&doc(DipStatus::Draft, 3));

        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].code, "V005");
        assert_eq!(violations[0].field, "reviewCount");
        assert!(violations[0].message.contains("Draft"));
    }

    #[test]
    fn test_all_problems_reported_together() {
        let mut d = doc(DipStatus::CommunityReview(0), 0);
        d.id = 0;
        d.author = "   ".to_string();
        d.title = String::new();

        let codes: Vec<_> = SchemaValidator::validate(&d)
            .into_iter()
            .map(|v| v.code)
            .collect();
        assert_eq!(codes, vec!["V001", "V002", "V003", "V004"]);
    }

    #[test]
    fn test_review_count_behind_round() {
        let violations = SchemaValidator::validate(&doc(DipStatus::CommunityReview(3), 2));
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].code, "V005");
    }

    #[test]
    fn test_post_review_states_need_a_review() {
        for status in [DipStatus::Accepted, DipStatus::Postponed, DipStatus::FinalReview] {
            let violations = SchemaValidator::validate(&doc(status, 0));
            assert_eq!(violations.len(), 1, "{status}");
        }
    }

    #[test]
    fn test_duplicate_sections_are_warnings() {
        let mut d = doc(DipStatus::Draft, 0);
        d.sections.push(Section {
            heading: "abstract".to_string(),
            level: 2,
            body: String::new(),
        });

        let report = SchemaValidator::report(&d);
        assert!(!report.has_errors);
        assert!(report.has_warnings);
        assert_eq!(report.violations[0].severity, Severity::Warning);
    }
}

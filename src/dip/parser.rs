//! Document parser
//!
//! Reads DIP markdown: an H1 title, a `Field | Value` metadata table, then
//! heading-delimited sections whose bodies are kept verbatim.
//!
//! ```text
//! # Named Arguments Lite
//!
//! | Field           | Value                           |
//! |-----------------|---------------------------------|
//! | DIP:            | 1019                            |
//! | Review Count:   | 2                               |
//! | Author:         | Yuxuan Shui (yshuiv7@gmail.com) |
//! | Implementation: |                                 |
//! | Status:         | Final Review                    |
//!
//! ## Abstract
//! ...
//! ```

use crate::dip::lifecycle::derive_round;
use crate::dip::{DipId, DipStatus, ProposalDocument, Section};
use crate::error::ParseError;
use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

static HEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(#{1,6})\s+(.*?)(?:\s+#+)?\s*$").expect("valid heading pattern")
});

static SEPARATOR_CELL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^:?-{3,}:?$").expect("valid separator pattern"));

static DIP_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:dip\s*)?(\d+)$").expect("valid DIP number pattern"));

const FIELD_DIP: &str = "DIP";
const FIELD_REVIEW_COUNT: &str = "Review Count";
const FIELD_AUTHOR: &str = "Author";
const FIELD_IMPLEMENTATION: &str = "Implementation";
const FIELD_STATUS: &str = "Status";

/// A metadata value and the line it came from
struct FieldValue<'a> {
    value: &'a str,
    line: usize,
}

/// Parse a DIP document from raw text
pub fn parse(text: &str) -> Result<ProposalDocument, ParseError> {
    let lines: Vec<&str> = text.lines().collect();

    let (title, title_idx) = find_title(&lines)?;
    let (table_idx, fields, body_idx) = read_metadata_table(&lines, title_idx + 1)?;
    let table_line = table_idx + 1;

    let id = parse_dip_number(required(&fields, FIELD_DIP, table_line)?)?;
    let review_count = parse_review_count(required(&fields, FIELD_REVIEW_COUNT, table_line)?)?;
    let author = required(&fields, FIELD_AUTHOR, table_line)?.value.to_string();
    let status_field = required(&fields, FIELD_STATUS, table_line)?;
    let status = status_field
        .value
        .parse::<DipStatus>()
        .map_err(|_| ParseError::InvalidField {
            field: FIELD_STATUS,
            value: status_field.value.to_string(),
            line: status_field.line,
        })?;
    let implementation = fields
        .get(&normalize_key(FIELD_IMPLEMENTATION))
        .map(|f| f.value.to_string())
        .filter(|v| !v.is_empty());

    let (preamble, sections) = read_sections(&lines[body_idx..]);

    Ok(ProposalDocument {
        id,
        title,
        status,
        review_count,
        round: derive_round(status, review_count),
        author,
        implementation,
        preamble,
        sections,
        checksum: checksum(text),
        history: Vec::new(),
        registered_at: None,
        updated_at: None,
    })
}

/// SHA-256 of the source text, hex encoded
pub fn checksum(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn is_fence(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("```") || trimmed.starts_with("~~~")
}

/// Heading level and text, ignoring lines that only look like headings
fn heading(line: &str) -> Option<(u8, String)> {
    let caps = HEADING.captures(line)?;
    Some((caps[1].len() as u8, caps[2].to_string()))
}

fn find_title(lines: &[&str]) -> Result<(String, usize), ParseError> {
    let mut in_fence = false;
    for (idx, line) in lines.iter().enumerate() {
        if is_fence(line) {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }
        if let Some((1, text)) = heading(line) {
            return Ok((text, idx));
        }
    }
    Err(ParseError::MissingTitle)
}

/// Split a `| a | b |` row into trimmed cells
fn cells(line: &str) -> Vec<&str> {
    let trimmed = line.trim();
    let inner = trimmed.strip_prefix('|').unwrap_or(trimmed);
    let inner = inner.strip_suffix('|').unwrap_or(inner);
    inner.split('|').map(str::trim).collect()
}

fn is_table_row(line: &str) -> bool {
    line.trim_start().starts_with('|')
}

/// Header row of the metadata table: exactly `Field | Value`
fn is_metadata_header(line: &str) -> bool {
    match cells(line).as_slice() {
        [field, value] => normalize_key(field) == "field" && normalize_key(value) == "value",
        _ => false,
    }
}

fn normalize_key(key: &str) -> String {
    key.trim().trim_end_matches(':').trim().to_lowercase()
}

/// Locate the metadata table and collect its rows.
///
/// Returns the table's first line index, the fields keyed by normalized
/// name, and the index of the first line after the table.
fn read_metadata_table<'a>(
    lines: &[&'a str],
    start: usize,
) -> Result<(usize, HashMap<String, FieldValue<'a>>, usize), ParseError> {
    let mut idx = start;
    while idx < lines.len() && !is_table_row(lines[idx]) {
        if heading(lines[idx]).is_some() {
            return Err(ParseError::MissingMetadataTable { line: idx + 1 });
        }
        idx += 1;
    }
    if idx >= lines.len() {
        return Err(ParseError::MissingMetadataTable { line: lines.len().max(1) });
    }

    let table_idx = idx;
    if !is_metadata_header(lines[table_idx]) {
        return Err(malformed(lines, table_idx));
    }

    let separator_idx = table_idx + 1;
    let is_separator = lines
        .get(separator_idx)
        .map(|l| is_table_row(l) && cells(l).iter().all(|c| SEPARATOR_CELL.is_match(c)))
        .unwrap_or(false);
    if !is_separator {
        return Err(malformed(lines, separator_idx.min(lines.len() - 1)));
    }

    let mut fields = HashMap::new();
    idx = separator_idx + 1;
    while idx < lines.len() && is_table_row(lines[idx]) {
        let row = cells(lines[idx]);
        if row.len() != 2 || row[0].is_empty() {
            return Err(malformed(lines, idx));
        }

        let key = normalize_key(row[0]);
        if fields.contains_key(&key) {
            return Err(ParseError::DuplicateField {
                field: row[0].trim_end_matches(':').to_string(),
                line: idx + 1,
            });
        }
        fields.insert(
            key,
            FieldValue {
                value: row[1],
                line: idx + 1,
            },
        );
        idx += 1;
    }

    Ok((table_idx, fields, idx))
}

fn malformed(lines: &[&str], idx: usize) -> ParseError {
    ParseError::MalformedRow {
        line: idx + 1,
        content: lines.get(idx).map(|l| l.trim().to_string()).unwrap_or_default(),
    }
}

fn required<'m, 'a>(
    fields: &'m HashMap<String, FieldValue<'a>>,
    field: &'static str,
    table_line: usize,
) -> Result<&'m FieldValue<'a>, ParseError> {
    fields
        .get(&normalize_key(field))
        .ok_or(ParseError::MissingField {
            field,
            line: table_line,
        })
}

fn parse_dip_number(field: &FieldValue<'_>) -> Result<DipId, ParseError> {
    DIP_NUMBER
        .captures(field.value)
        .and_then(|caps| caps[1].parse::<DipId>().ok())
        .ok_or_else(|| ParseError::InvalidField {
            field: FIELD_DIP,
            value: field.value.to_string(),
            line: field.line,
        })
}

fn parse_review_count(field: &FieldValue<'_>) -> Result<u32, ParseError> {
    let value = field.value;
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseError::InvalidField {
            field: FIELD_REVIEW_COUNT,
            value: value.to_string(),
            line: field.line,
        });
    }
    value.parse::<u32>().map_err(|_| ParseError::InvalidField {
        field: FIELD_REVIEW_COUNT,
        value: value.to_string(),
        line: field.line,
    })
}

/// Split the remaining text at headings. Headings inside fenced code
/// blocks belong to the body.
fn read_sections(lines: &[&str]) -> (String, Vec<Section>) {
    let mut preamble: Vec<&str> = Vec::new();
    let mut sections = Vec::new();
    let mut current: Option<(u8, String, Vec<&str>)> = None;
    let mut in_fence = false;

    for &line in lines {
        if is_fence(line) {
            in_fence = !in_fence;
        } else if !in_fence {
            if let Some((level, text)) = heading(line) {
                if let Some((prev_level, prev_heading, body)) = current.take() {
                    sections.push(section(prev_level, prev_heading, &body));
                }
                current = Some((level, text, Vec::new()));
                continue;
            }
        }

        match current.as_mut() {
            Some((_, _, body)) => body.push(line),
            None => preamble.push(line),
        }
    }

    if let Some((level, text, body)) = current {
        sections.push(section(level, text, &body));
    }

    (preamble.join("\n").trim().to_string(), sections)
}

fn section(level: u8, heading: String, body: &[&str]) -> Section {
    Section {
        heading,
        level,
        body: body.join("\n").trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dip::SchemaValidator;
    use pretty_assertions::assert_eq;

    const DIP1019: &str = "\
# Named Arguments Lite

| Field           | Value                                                           |
|-----------------|-----------------------------------------------------------------|
| DIP:            | 1019                                                            |
| Review Count:   | 2                                                               |
| Author:         | Yuxuan Shui (yshuiv7@gmail.com)                                 |
| Implementation: |                                                                 |
| Status:         | Final Review                                                    |

## Abstract

This DIP proposes the addition of named arguments to D.

## Rationale

Named arguments improve readability:

```d
# not a heading
foo(x: 1, y: 2);
```

### Alternatives

Struct literals.

## Reviews

[Reviewed Version](https://example.org)
";

    #[test]
    fn test_parse_full_document() {
        let doc = parse(DIP1019).unwrap();

        assert_eq!(doc.id, 1019);
        assert_eq!(doc.title, "Named Arguments Lite");
        assert_eq!(doc.status, DipStatus::FinalReview);
        assert_eq!(doc.review_count, 2);
        assert_eq!(doc.round, 2);
        assert_eq!(doc.author, "Yuxuan Shui (yshuiv7@gmail.com)");
        assert_eq!(doc.implementation, None);
        assert_eq!(doc.checksum.len(), 64);

        let headings: Vec<_> = doc.sections.iter().map(|s| (s.level, s.heading.as_str())).collect();
        assert_eq!(
            headings,
            vec![(2, "Abstract"), (2, "Rationale"), (3, "Alternatives"), (2, "Reviews")]
        );
        assert!(doc.section("rationale").unwrap().body.contains("# not a heading"));
    }

    #[test]
    fn test_valid_document_passes_validation() {
        let doc = parse(DIP1019).unwrap();
        assert!(SchemaValidator::validate(&doc).is_empty());
    }

    #[test]
    fn test_dip_prefix_and_community_review_status() {
        let text = DIP1019
            .replace("| 1019  ", "| DIP1019")
            .replace("Final Review   ", "Community Review Round 2");
        let doc = parse(&text).unwrap();
        assert_eq!(doc.id, 1019);
        assert_eq!(doc.status, DipStatus::CommunityReview(2));
    }

    #[test]
    fn test_missing_title() {
        let text = DIP1019.replacen("# Named", "Named", 1);
        assert_eq!(parse(&text).unwrap_err(), ParseError::MissingTitle);
    }

    #[test]
    fn test_missing_table() {
        let err = parse("# Title\n\nSome prose.\n\n## Abstract\n").unwrap_err();
        assert_eq!(err, ParseError::MissingMetadataTable { line: 5 });
    }

    #[test]
    fn test_missing_required_field() {
        let text: String = DIP1019
            .lines()
            .filter(|l| !l.starts_with("| Author"))
            .map(|l| format!("{l}\n"))
            .collect();
        let err = parse(&text).unwrap_err();
        assert_eq!(
            err,
            ParseError::MissingField {
                field: "Author",
                line: 3
            }
        );
    }

    #[test]
    fn test_malformed_row_reports_line() {
        let text = DIP1019.replace("| Review Count:   | 2  ", "| Review Count:   | 2 | x");
        match parse(&text).unwrap_err() {
            ParseError::MalformedRow { line, .. } => assert_eq!(line, 6),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_values() {
        let text = DIP1019.replace("| 1019  ", "| abc   ");
        assert!(matches!(
            parse(&text).unwrap_err(),
            ParseError::InvalidField { field: "DIP", line: 5, .. }
        ));

        let text = DIP1019.replace("| 2   ", "| -1  ");
        assert!(matches!(
            parse(&text).unwrap_err(),
            ParseError::InvalidField { field: "Review Count", .. }
        ));

        let text = DIP1019.replace("Final Review", "Formal Assmt");
        assert!(matches!(
            parse(&text).unwrap_err(),
            ParseError::InvalidField { field: "Status", line: 9, .. }
        ));
    }

    #[test]
    fn test_duplicate_field() {
        let text = DIP1019.replace(
            "| Status:  ",
            "| Author:         | Someone Else |\n| Status:  ",
        );
        assert!(matches!(
            parse(&text).unwrap_err(),
            ParseError::DuplicateField { line: 9, .. }
        ));
    }

    #[test]
    fn test_empty_author_is_left_to_validator() {
        let text = DIP1019.replace("Yuxuan Shui (yshuiv7@gmail.com)", "");
        let doc = parse(&text).unwrap();
        assert_eq!(doc.author, "");
        assert_eq!(SchemaValidator::validate(&doc).len(), 1);
    }

    #[test]
    fn test_preamble_is_kept() {
        let text = DIP1019.replace("\n## Abstract", "Draft notes.\n\n## Abstract");
        let doc = parse(&text).unwrap();
        assert_eq!(doc.preamble, "Draft notes.");
    }

    #[test]
    fn test_checksum_consistency() {
        assert_eq!(checksum(DIP1019), checksum(DIP1019));
        assert_ne!(checksum(DIP1019), checksum("# Other"));
    }

    #[test]
    fn test_trailing_hash_kept_in_heading_text() {
        let text = DIP1019
            .replacen("# Named Arguments Lite", "# Interop with C#", 1)
            .replacen("## Abstract", "## Comparison with C#", 1)
            .replacen("## Reviews", "## Reviews ##", 1);
        let doc = parse(&text).unwrap();

        assert_eq!(doc.title, "Interop with C#");
        assert_eq!(doc.sections[0].heading, "Comparison with C#");
        assert!(doc.section("Reviews").is_some());
    }

    #[test]
    fn test_table_header_must_be_field_value() {
        let text = DIP1019.replacen("| Field           | Value ", "| Name            | Age   ", 1);
        let err = parse(&text).unwrap_err();
        assert!(matches!(err, ParseError::MalformedRow { line: 3, .. }));

        let lower = DIP1019.replacen("| Field           | Value ", "| field           | VALUE ", 1);
        assert!(parse(&lower).is_ok());
    }
}

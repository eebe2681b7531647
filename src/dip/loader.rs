//! Directory loader
//!
//! Reads `*.md` files from a directory and feeds them through the parser and
//! validator into the registry. One bad file never aborts the whole load.

use crate::dip::{parse, DipId, DipRegistry, SchemaValidator, ValidationError};
use crate::error::AppError;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// A file that was not registered, and why
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// A registered document that carried violations
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileWarning {
    pub path: PathBuf,
    pub id: DipId,
    pub violations: Vec<ValidationError>,
}

/// Outcome of a directory load
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadReport {
    pub loaded: Vec<DipId>,
    pub skipped: Vec<SkippedFile>,
    pub warnings: Vec<FileWarning>,
}

pub struct DipLoader {
    /// Skip documents with error-severity violations instead of registering them
    strict: bool,
}

impl DipLoader {
    pub fn new(strict: bool) -> Self {
        Self { strict }
    }

    /// Load every markdown file in `dir`, in file-name order
    pub async fn load_dir(&self, registry: &DipRegistry, dir: &Path) -> Result<LoadReport, AppError> {
        let mut paths = Vec::new();
        let mut entries = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_markdown = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map_or(false, |ext| ext.eq_ignore_ascii_case("md"));
            if is_markdown && entry.file_type().await?.is_file() {
                paths.push(path);
            }
        }
        paths.sort();

        let mut report = LoadReport::default();
        for path in paths {
            self.load_file(registry, path, &mut report).await;
        }

        info!(
            "Loaded {} DIP(s) from {} ({} skipped, {} with warnings)",
            report.loaded.len(),
            dir.display(),
            report.skipped.len(),
            report.warnings.len()
        );
        Ok(report)
    }

    async fn load_file(&self, registry: &DipRegistry, path: PathBuf, report: &mut LoadReport) {
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) => return skip(report, path, format!("unreadable: {}", e)),
        };

        let doc = match parse(&text) {
            Ok(doc) => doc,
            Err(e) => return skip(report, path, e.to_string()),
        };

        let validation = SchemaValidator::report(&doc);
        if self.strict && validation.has_errors {
            let reason = validation
                .violations
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            return skip(report, path, reason);
        }

        let id = doc.id;
        match registry.register(doc).await {
            Ok(_) => {
                debug!("Loaded DIP{} from {}", id, path.display());
                report.loaded.push(id);
                if !validation.is_clean() {
                    report.warnings.push(FileWarning {
                        path,
                        id,
                        violations: validation.violations,
                    });
                }
            }
            Err(e) => skip(report, path, e.to_string()),
        }
    }
}

fn skip(report: &mut LoadReport, path: PathBuf, reason: String) {
    warn!("Skipping {}: {}", path.display(), reason);
    report.skipped.push(SkippedFile { path, reason });
}

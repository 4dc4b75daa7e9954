//! Load authored cases from a directory of JSON files.
//!
//! Files go through the same normalization and validation as synthesized
//! cases. A file that fails is skipped with a warning; one bad case does not
//! keep the others out.

use std::path::{Path, PathBuf};

use clinisim_audit::events::{AuditAction, AuditEvent};
use clinisim_core::models::case::{Case, CaseSource};
use clinisim_llm::extract::{normalize_case_value, validate_case_value};
use clinisim_storage::Store;
use clinisim_storage::error::StorageError;
use serde_json::Value;
use tracing::{info, warn};

use crate::error::SessionError;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub imported: usize,
    pub unchanged: usize,
    pub rejected: usize,
}

/// Parse one case file's contents into a fixed case.
pub fn case_from_json(text: &str) -> Result<Case, SessionError> {
    let mut value: Value = serde_json::from_str(text)
        .map_err(|e| SessionError::InvalidInput(format!("case file is not JSON: {e}")))?;
    let case_number = value
        .get("case_number")
        .and_then(Value::as_str)
        .map(str::to_string);
    normalize_case_value(&mut value);
    let content = validate_case_value(value).map_err(|e| SessionError::InvalidInput(e.to_string()))?;

    let mut case = Case::new(content, CaseSource::Fixed);
    case.case_number = case_number;
    Ok(case)
}

async fn case_files(dir: &Path) -> Result<Vec<PathBuf>, SessionError> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| SessionError::InvalidInput(format!("cannot read {}: {e}", dir.display())))?;
    let mut files = Vec::new();
    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Import every `*.json` case in `dir`. A case whose title and case number
/// match a stored fixed case is left alone, so importing twice is harmless.
pub async fn import_dir(store: &dyn Store, dir: &Path) -> Result<ImportSummary, SessionError> {
    let existing = store.list_cases().await?;
    let mut summary = ImportSummary::default();

    for path in case_files(dir).await? {
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot read case file");
                summary.rejected += 1;
                continue;
            }
        };
        let case = match case_from_json(&text) {
            Ok(case) => case,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "case file rejected");
                summary.rejected += 1;
                continue;
            }
        };

        let duplicate = existing.iter().any(|c| {
            c.source == CaseSource::Fixed
                && c.content.title == case.content.title
                && c.case_number == case.case_number
        });
        if duplicate {
            summary.unchanged += 1;
            continue;
        }

        match store.put_case(&case).await {
            Ok(()) => {}
            Err(StorageError::Conflict { .. }) => {
                summary.unchanged += 1;
                continue;
            }
            Err(e) => return Err(e.into()),
        }
        AuditEvent::new(AuditAction::CaseImported, "case", case.id, "system")
            .with_details(serde_json::json!({ "file": path.display().to_string() }))
            .emit();
        summary.imported += 1;
    }

    info!(
        dir = %dir.display(),
        imported = summary.imported,
        unchanged = summary.unchanged,
        rejected = summary.rejected,
        "case import finished"
    );
    Ok(summary)
}

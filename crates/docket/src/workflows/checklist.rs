//! Document checklists derived from the procedure catalog.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::sync::Arc;
use tracing::warn;

use super::cases::CaseId;
use super::catalog::{CatalogError, CatalogLookup, DocumentRequirement};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Pdf,
    Image,
    Spreadsheet,
    Word,
}

impl DocumentKind {
    /// Keyword match on the catalog's free-text format; anything unrecognised is a PDF.
    pub fn infer(format: &str) -> Self {
        let format = format.to_lowercase();
        let has = |keywords: &[&str]| keywords.iter().any(|keyword| format.contains(keyword));

        if has(&["image", "jpg", "jpeg", "png", "photo", "scan"]) {
            Self::Image
        } else if has(&["spreadsheet", "excel", "xls", "csv"]) {
            Self::Spreadsheet
        } else if has(&["word", "doc"]) {
            Self::Word
        } else {
            Self::Pdf
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Pdf => "PDF",
            Self::Image => "Image",
            Self::Spreadsheet => "Spreadsheet",
            Self::Word => "Word",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub name: String,
    pub mandatory: bool,
    pub kind: DocumentKind,
    pub format: String,
    pub validity_days: Option<u32>,
    pub matched: bool,
}

impl ChecklistItem {
    fn from_requirement(requirement: &DocumentRequirement, mandatory: bool) -> Self {
        Self {
            name: requirement.name.clone(),
            mandatory,
            kind: DocumentKind::infer(&requirement.format),
            format: requirement.format.clone(),
            validity_days: requirement.validity_days,
            matched: false,
        }
    }
}

/// Externally uploaded document metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedDocument {
    pub case_id: CaseId,
    pub name: String,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistEvaluation {
    pub complete: bool,
    pub missing: Vec<String>,
    pub percent: u8,
}

/// Policy deciding whether an uploaded file fills a checklist slot.
pub trait DocumentMatcher: Send + Sync + Debug {
    fn matches(&self, submitted: &str, required: &str) -> bool;
}

/// Case-folded, trimmed substring match: "2025 Tax registration certificate.pdf"
/// fills "Tax registration certificate". Loose on purpose; near-miss names
/// will not match and generic names may fill the wrong slot.
#[derive(Debug, Default, Clone, Copy)]
pub struct SubstringMatcher;

impl SubstringMatcher {
    fn normalize(value: &str) -> String {
        value.trim().to_lowercase()
    }
}

impl DocumentMatcher for SubstringMatcher {
    fn matches(&self, submitted: &str, required: &str) -> bool {
        let required = Self::normalize(required);
        !required.is_empty() && Self::normalize(submitted).contains(&required)
    }
}

#[derive(Debug, Clone)]
pub struct ChecklistEngine {
    catalog: Arc<dyn CatalogLookup>,
    matcher: Arc<dyn DocumentMatcher>,
}

impl ChecklistEngine {
    pub fn new(catalog: Arc<dyn CatalogLookup>) -> Self {
        Self::with_matcher(catalog, Arc::new(SubstringMatcher))
    }

    pub fn with_matcher(catalog: Arc<dyn CatalogLookup>, matcher: Arc<dyn DocumentMatcher>) -> Self {
        Self { catalog, matcher }
    }

    pub fn catalog(&self) -> &Arc<dyn CatalogLookup> {
        &self.catalog
    }

    /// Mandatory items first, then optional, in catalog order.
    pub fn build_checklist(&self, procedure_id: &str) -> Result<Vec<ChecklistItem>, CatalogError> {
        let procedure = self
            .catalog
            .lookup(procedure_id)
            .ok_or_else(|| CatalogError::UnknownProcedure(procedure_id.to_string()))?;

        let mandatory = procedure
            .mandatory_docs
            .iter()
            .map(|requirement| ChecklistItem::from_requirement(requirement, true));
        let optional = procedure
            .optional_docs
            .iter()
            .map(|requirement| ChecklistItem::from_requirement(requirement, false));

        Ok(mandatory.chain(optional).collect())
    }

    pub fn evaluate(
        &self,
        procedure_id: &str,
        submitted: &[SubmittedDocument],
    ) -> Result<ChecklistEvaluation, CatalogError> {
        let items = self.build_checklist(procedure_id)?;
        Ok(self.evaluate_items(&items, submitted))
    }

    /// Percent complete is measured over mandatory items only; a procedure with
    /// no mandatory documents reports 0%.
    pub fn evaluate_items(
        &self,
        items: &[ChecklistItem],
        submitted: &[SubmittedDocument],
    ) -> ChecklistEvaluation {
        let marked = self.mark_matches(items, submitted);
        let total = marked.iter().filter(|item| item.mandatory).count();
        let missing: Vec<String> = marked
            .iter()
            .filter(|item| item.mandatory && !item.matched)
            .map(|item| item.name.clone())
            .collect();

        let percent = if total == 0 {
            0
        } else {
            let satisfied = (total - missing.len()) as f64;
            (100.0 * satisfied / total as f64).round() as u8
        };

        ChecklistEvaluation {
            complete: missing.is_empty(),
            missing,
            percent,
        }
    }

    /// Copy of `items` with `matched` set from the submitted documents.
    pub fn mark_matches(
        &self,
        items: &[ChecklistItem],
        submitted: &[SubmittedDocument],
    ) -> Vec<ChecklistItem> {
        for document in submitted {
            let hits = items
                .iter()
                .filter(|item| self.matcher.matches(&document.name, &item.name))
                .count();
            if hits > 1 {
                warn!(
                    case_id = %document.case_id,
                    document = %document.name,
                    slots = hits,
                    "submitted document matches several checklist items"
                );
            }
        }

        items
            .iter()
            .map(|item| {
                let mut item = item.clone();
                item.matched = submitted
                    .iter()
                    .any(|document| self.matcher.matches(&document.name, &item.name));
                item
            })
            .collect()
    }
}

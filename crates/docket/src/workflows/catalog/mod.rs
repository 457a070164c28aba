//! Read-only procedure catalog: SLA, step sequence, and document requirements
//! per procedure type.

mod import;
mod standard;

pub use import::CatalogImportError;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Debug;

/// Party responsible for carrying out a procedure step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepRole {
    Staff,
    Client,
    ThirdParty,
}

impl StepRole {
    pub const fn ordered() -> [Self; 3] {
        [Self::Staff, Self::Client, Self::ThirdParty]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Staff => "Internal Staff",
            Self::Client => "Client",
            Self::ThirdParty => "Third Party",
        }
    }

    pub(crate) fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "staff" | "internal" | "internal_staff" => Some(Self::Staff),
            "client" => Some(Self::Client),
            "third_party" | "thirdparty" | "external" => Some(Self::ThirdParty),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDefinition {
    pub order: u32,
    pub name: String,
    pub description: String,
    /// Business days from case creation until this step is due.
    pub sla_days: u32,
    pub role: StepRole,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRequirement {
    pub name: String,
    /// Free-text format as declared in the catalog ("PDF", "scanned image", ...).
    pub format: String,
    /// How long the artifact stays valid once issued, when the agency limits it.
    pub validity_days: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcedureDefinition {
    pub id: String,
    pub name: String,
    pub sla_days: u32,
    pub steps: Vec<StepDefinition>,
    pub mandatory_docs: Vec<DocumentRequirement>,
    pub optional_docs: Vec<DocumentRequirement>,
    pub fee_description: String,
}

impl ProcedureDefinition {
    pub fn total_steps(&self) -> u32 {
        self.steps.len() as u32
    }
}

/// Lookup seam for procedure definitions. The core only reads through it.
pub trait CatalogLookup: Send + Sync + Debug {
    fn lookup(&self, procedure_id: &str) -> Option<ProcedureDefinition>;
    fn procedures(&self) -> Vec<ProcedureDefinition>;
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("procedure '{0}' is not in the catalog")]
    UnknownProcedure(String),
}

/// In-process catalog keyed by procedure id.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    procedures: BTreeMap<String, ProcedureDefinition>,
}

impl StaticCatalog {
    pub fn new(procedures: impl IntoIterator<Item = ProcedureDefinition>) -> Self {
        Self {
            procedures: procedures
                .into_iter()
                .map(|procedure| (procedure.id.clone(), procedure))
                .collect(),
        }
    }

    pub fn standard() -> Self {
        Self::new(standard::standard_procedures())
    }

    pub fn len(&self) -> usize {
        self.procedures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.procedures.is_empty()
    }
}

impl CatalogLookup for StaticCatalog {
    fn lookup(&self, procedure_id: &str) -> Option<ProcedureDefinition> {
        self.procedures.get(procedure_id.trim()).cloned()
    }

    fn procedures(&self) -> Vec<ProcedureDefinition> {
        self.procedures.values().cloned().collect()
    }
}

use super::{DocumentRequirement, ProcedureDefinition, StaticCatalog, StepDefinition, StepRole};
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum CatalogImportError {
    #[error("failed to read catalog export: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid catalog CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("catalog row {row}: {reason}")]
    InvalidRow { row: usize, reason: String },
}

#[derive(Debug, Deserialize)]
struct CatalogRow {
    procedure_id: String,
    procedure_name: String,
    sla_days: u32,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    fee: Option<String>,
    kind: String,
    #[serde(default)]
    order: Option<u32>,
    name: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    description: Option<String>,
    #[serde(default)]
    item_sla_days: Option<u32>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    role: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    format: Option<String>,
    #[serde(default)]
    validity_days: Option<u32>,
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

impl StaticCatalog {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, CatalogImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_csv_reader(file)
    }

    /// Build a catalog from a flat export with one row per step or document.
    /// Rows sharing a `procedure_id` are folded into one definition; the first
    /// row fixes its name, SLA, and fee.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, CatalogImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut procedures: BTreeMap<String, ProcedureDefinition> = BTreeMap::new();

        for (index, record) in csv_reader.deserialize::<CatalogRow>().enumerate() {
            let row = record?;
            // header is row 1
            let row_number = index + 2;
            let procedure = procedures
                .entry(row.procedure_id.clone())
                .or_insert_with(|| ProcedureDefinition {
                    id: row.procedure_id.clone(),
                    name: row.procedure_name.clone(),
                    sla_days: row.sla_days,
                    steps: Vec::new(),
                    mandatory_docs: Vec::new(),
                    optional_docs: Vec::new(),
                    fee_description: row.fee.clone().unwrap_or_default(),
                });
            apply_row(procedure, row, row_number)?;
        }

        for procedure in procedures.values_mut() {
            procedure.steps.sort_by_key(|step| step.order);
        }

        Ok(Self { procedures })
    }
}

fn apply_row(
    procedure: &mut ProcedureDefinition,
    row: CatalogRow,
    row_number: usize,
) -> Result<(), CatalogImportError> {
    let invalid = |reason: String| CatalogImportError::InvalidRow {
        row: row_number,
        reason,
    };

    match row.kind.to_ascii_lowercase().as_str() {
        "step" => {
            let raw_role = row
                .role
                .ok_or_else(|| invalid("step rows require a role".to_string()))?;
            let role = StepRole::parse(&raw_role)
                .ok_or_else(|| invalid(format!("unknown role '{raw_role}'")))?;
            let order = row
                .order
                .unwrap_or_else(|| procedure.steps.len() as u32 + 1);
            procedure.steps.push(StepDefinition {
                order,
                name: row.name,
                description: row.description.unwrap_or_default(),
                sla_days: row.item_sla_days.unwrap_or(procedure.sla_days),
                role,
            });
        }
        kind @ ("mandatory" | "optional") => {
            let requirement = DocumentRequirement {
                name: row.name,
                format: row.format.unwrap_or_default(),
                validity_days: row.validity_days,
            };
            if kind == "mandatory" {
                procedure.mandatory_docs.push(requirement);
            } else {
                procedure.optional_docs.push(requirement);
            }
        }
        other => return Err(invalid(format!("unknown row kind '{other}'"))),
    }

    Ok(())
}

use super::{DocumentRequirement, ProcedureDefinition, StepDefinition, StepRole};

fn step(order: u32, name: &str, description: &str, sla_days: u32, role: StepRole) -> StepDefinition {
    StepDefinition {
        order,
        name: name.to_string(),
        description: description.to_string(),
        sla_days,
        role,
    }
}

fn doc(name: &str, format: &str, validity_days: Option<u32>) -> DocumentRequirement {
    DocumentRequirement {
        name: name.to_string(),
        format: format.to_string(),
        validity_days,
    }
}

pub(super) fn standard_procedures() -> Vec<ProcedureDefinition> {
    vec![
        ProcedureDefinition {
            id: "operating-license".to_string(),
            name: "Municipal Operating License".to_string(),
            sla_days: 10,
            steps: vec![
                step(
                    1,
                    "Collect client documentation",
                    "Gather identity, zoning, and premises documents from the client.",
                    3,
                    StepRole::Client,
                ),
                step(
                    2,
                    "File application with municipality",
                    "Submit the completed application packet and pay the filing fee.",
                    5,
                    StepRole::Staff,
                ),
                step(
                    3,
                    "Premises inspection",
                    "Municipal inspector visits the premises and issues findings.",
                    8,
                    StepRole::ThirdParty,
                ),
                step(
                    4,
                    "Collect license",
                    "Pick up the issued license and deliver a copy to the client.",
                    10,
                    StepRole::Staff,
                ),
            ],
            mandatory_docs: vec![
                doc("Tax registration certificate", "PDF", Some(30)),
                doc("Identity document", "scanned image", None),
                doc("Zoning compatibility certificate", "PDF", Some(90)),
                doc("Premises floor plan", "PDF", None),
            ],
            optional_docs: vec![doc("Fire safety inspection report", "Word document", Some(365))],
            fee_description: "Filing fee 2.5% of the tax unit plus inspection fee per square meter"
                .to_string(),
        },
        ProcedureDefinition {
            id: "sanitary-permit".to_string(),
            name: "Sanitary Permit for Food Establishments".to_string(),
            sla_days: 15,
            steps: vec![
                step(
                    1,
                    "Prepare sanitation plan",
                    "Draft the hygiene and sanitation plan with the client's quality lead.",
                    4,
                    StepRole::Client,
                ),
                step(
                    2,
                    "Laboratory water analysis",
                    "Accredited laboratory samples and certifies potable water.",
                    7,
                    StepRole::ThirdParty,
                ),
                step(
                    3,
                    "Submit permit request",
                    "File the request with the health authority and track the receipt.",
                    9,
                    StepRole::Staff,
                ),
                step(
                    4,
                    "Authority evaluation",
                    "Health authority reviews the file and may raise observations.",
                    13,
                    StepRole::ThirdParty,
                ),
                step(
                    5,
                    "Deliver permit",
                    "Download the resolution and archive it in the client file.",
                    15,
                    StepRole::Staff,
                ),
            ],
            mandatory_docs: vec![
                doc("Sanitation plan", "Word document", None),
                doc("Water analysis certificate", "PDF", Some(180)),
                doc("Staff health cards", "scanned image", Some(365)),
                doc("Pest control certificate", "PDF", Some(180)),
            ],
            optional_docs: vec![
                doc("Supplier list", "Excel spreadsheet", None),
                doc("Product photographs", "JPG images", None),
            ],
            fee_description: "Flat fee per establishment category".to_string(),
        },
        ProcedureDefinition {
            id: "environmental-certificate".to_string(),
            name: "Environmental Compliance Certificate".to_string(),
            sla_days: 20,
            steps: vec![
                step(
                    1,
                    "Baseline survey",
                    "Consultant measures emissions, noise, and waste streams on site.",
                    8,
                    StepRole::ThirdParty,
                ),
                step(
                    2,
                    "Draft environmental statement",
                    "Compile the survey into the statement template required by the agency.",
                    12,
                    StepRole::Staff,
                ),
                step(
                    3,
                    "Agency review",
                    "Environmental agency evaluates the statement.",
                    18,
                    StepRole::ThirdParty,
                ),
                step(
                    4,
                    "Certificate issuance",
                    "Record the certificate number and schedule its renewal.",
                    20,
                    StepRole::Staff,
                ),
            ],
            mandatory_docs: vec![
                doc("Environmental statement", "PDF", None),
                doc("Emissions measurement report", "spreadsheet", Some(90)),
                doc("Legal representative power of attorney", "PDF", Some(365)),
            ],
            optional_docs: vec![doc("Site photographs", "image", None)],
            fee_description: "Evaluation fee scaled by project category (I-III)".to_string(),
        },
        ProcedureDefinition {
            id: "import-permit".to_string(),
            name: "Restricted Goods Import Permit".to_string(),
            sla_days: 7,
            steps: vec![
                step(
                    1,
                    "Classify goods",
                    "Confirm tariff classification and the controlling agency.",
                    2,
                    StepRole::Staff,
                ),
                step(
                    2,
                    "File permit on single window",
                    "Submit the electronic request and attach commercial documents.",
                    4,
                    StepRole::Staff,
                ),
                step(
                    3,
                    "Agency authorization",
                    "Controlling agency authorizes or observes the request.",
                    7,
                    StepRole::ThirdParty,
                ),
            ],
            mandatory_docs: vec![
                doc("Commercial invoice", "PDF", None),
                doc("Technical data sheet", "PDF", None),
            ],
            optional_docs: vec![doc("Certificate of origin", "PDF", Some(180))],
            fee_description: "Electronic filing fee per request".to_string(),
        },
    ]
}

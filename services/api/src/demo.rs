use crate::infra::{assemble, load_catalog, parse_date, CaseRuntime};
use chrono::{Duration, Local, NaiveDate};
use clap::Args;
use docket::clock::{Clock, ManualClock};
use docket::config::AutomationConfig;
use docket::error::AppError;
use docket::workflows::automation::{certificate_expiry, SweepReport, RENEWAL_LEAD_DAYS};
use docket::workflows::cases::{CaseError, CaseState, NewCase, Priority};
use docket::workflows::catalog::CatalogLookup;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct SweepArgs {
    /// Date the tick runs on (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Date the sample cases were opened. Defaults to 14 days before `--today`.
    #[arg(long, value_parser = parse_date)]
    pub(crate) opened: Option<NaiveDate>,
    /// Load procedures from a CSV export instead of the built-in catalog
    #[arg(long)]
    pub(crate) catalog_csv: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct CatalogArgs {
    /// CSV export to import and list instead of the built-in catalog
    #[arg(long)]
    pub(crate) csv: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Opening date of the demo case (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = parse_date)]
    pub(crate) start: Option<NaiveDate>,
    /// Catalog procedure to open
    #[arg(long, default_value = "operating-license")]
    pub(crate) procedure: String,
    /// Client identifier on the demo case
    #[arg(long, default_value = "CL-DEMO")]
    pub(crate) client: String,
}

pub(crate) fn run_catalog(args: CatalogArgs) -> Result<(), AppError> {
    let catalog = load_catalog(args.csv.as_deref())?;
    let procedures = catalog.procedures();

    println!("Procedure catalog ({} entries)", procedures.len());
    for procedure in procedures {
        println!(
            "\n{} | {} | SLA {} business days",
            procedure.id, procedure.name, procedure.sla_days
        );
        if !procedure.fee_description.is_empty() {
            println!("  Fee: {}", procedure.fee_description);
        }
        for step in &procedure.steps {
            println!(
                "  {}. {} [{}] due +{}d",
                step.order,
                step.name,
                step.role.label(),
                step.sla_days
            );
        }
        for doc in &procedure.mandatory_docs {
            println!("  * {} ({})", doc.name, doc.format);
        }
        for doc in &procedure.optional_docs {
            println!("  - {} ({}, optional)", doc.name, doc.format);
        }
    }

    Ok(())
}

pub(crate) fn run_sweep(args: SweepArgs) -> Result<(), AppError> {
    let today = args.today.unwrap_or_else(|| Local::now().date_naive());
    let opened = args.opened.unwrap_or(today - Duration::days(14));

    let catalog = load_catalog(args.catalog_csv.as_deref())?;
    let clock = Arc::new(ManualClock::at_date(opened));
    let runtime = assemble(&AutomationConfig::default(), catalog.clone(), clock.clone());

    for (index, procedure) in catalog.procedures().iter().enumerate() {
        runtime.desk.create_case(NewCase {
            procedure_id: procedure.id.clone(),
            client_id: format!("CL-{:03}", index + 1),
            ..NewCase::default()
        })?;
    }

    clock.set(ManualClock::at_date(today).now());
    let report = runtime.scheduler.run_tick();
    let rendered = serde_json::to_string_pretty(&report).map_err(std::io::Error::other)?;
    println!("{rendered}");
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let start = args.start.unwrap_or_else(|| Local::now().date_naive());
    let clock = Arc::new(ManualClock::at_date(start));
    let runtime = assemble(
        &AutomationConfig::default(),
        load_catalog(None)?,
        clock.clone(),
    );
    let desk = &runtime.desk;

    println!("Case desk demo");
    let case = desk.create_case(NewCase {
        procedure_id: args.procedure.clone(),
        client_id: args.client.clone(),
        alias: "Demo storefront".to_string(),
        priority: Priority::High,
        ..NewCase::default()
    })?;
    println!(
        "\n[{}] opened {} for {}: deadline {} ({} days)",
        start,
        case.id,
        case.client_id,
        case.deadline,
        case.days_remaining(start)
    );

    let mandatory: Vec<String> = desk
        .get_checklist(&case.id)?
        .items
        .into_iter()
        .filter(|item| item.mandatory)
        .map(|item| item.name)
        .collect();
    let (first_batch, rest) = mandatory.split_at(mandatory.len() / 2);

    desk.transition_case(&case.id, CaseState::InProgress, "work started", "demo")?;
    for name in first_batch {
        desk.submit_document(&case.id, name)?;
    }
    let checklist = desk.get_checklist(&case.id)?;
    println!(
        "Checklist {}% complete, missing: {}",
        checklist.evaluation.percent,
        checklist.evaluation.missing.join(", ")
    );
    match desk.transition_case(&case.id, CaseState::Approved, "agency approved", "demo") {
        Err(CaseError::MissingMandatoryDocuments(missing)) => {
            println!("Approval blocked; {} mandatory documents outstanding", missing.len());
        }
        Err(other) => return Err(other.into()),
        Ok(_) => println!("Approval accepted"),
    }

    print_tick(&runtime, &clock, case.deadline - Duration::days(3));
    print_tick(&runtime, &clock, case.deadline + Duration::days(1));
    let overdue = desk.get_case(&case.id)?;
    println!(
        "State {} | indicator {}",
        overdue.case.state,
        overdue.status_indicator.label()
    );

    for name in rest {
        desk.submit_document(&case.id, name)?;
    }
    desk.transition_case(&case.id, CaseState::Approved, "late approval", "demo")?;
    let completed =
        desk.transition_case(&case.id, CaseState::Completed, "certificate delivered", "demo")?;
    println!("\n[{}] {} completed", clock.today(), completed.id);

    if let Some(expires_on) = certificate_expiry(&completed) {
        print_tick(&runtime, &clock, expires_on - Duration::days(RENEWAL_LEAD_DAYS));
    }

    println!("\nHistory");
    for record in desk.history(&case.id)? {
        let previous = record.previous.map(|state| state.label()).unwrap_or("-");
        println!(
            "  {} {} -> {} by {}: {}",
            record.recorded_at.format("%Y-%m-%d %H:%M"),
            previous,
            record.next,
            record.actor,
            record.reason
        );
    }

    println!(
        "\nCases on file: {}",
        runtime.store.case_count()?
    );

    println!("\nOutbox");
    for delivery in runtime.transport.sent() {
        println!(
            "  [{}] {} <- {}",
            delivery.channel.label(),
            delivery.recipient,
            delivery.subject
        );
    }

    Ok(())
}

fn print_tick(runtime: &CaseRuntime, clock: &ManualClock, day: NaiveDate) {
    clock.set(ManualClock::at_date(day).now());
    let report = runtime.scheduler.run_tick();
    render_tick(day, &report);
}

fn render_tick(day: NaiveDate, report: &SweepReport) {
    println!(
        "\n[{}] tick: {} escalated | {} deadline alerts | {} reminders | {} renewals | {} delivered",
        day,
        report.overdue_escalations,
        report.deadline_alerts,
        report.document_reminders,
        report.renewals_opened,
        report.delivered
    );
    for failure in &report.failures {
        println!("  ! {} failed: {}", failure.check.label(), failure.error);
    }
}

use chrono::NaiveDate;
use docket::clock::Clock;
use docket::config::AutomationConfig;
use docket::error::AppError;
use docket::workflows::automation::{AutomationScheduler, SweepRunner};
use docket::workflows::cases::CaseLifecycle;
use docket::workflows::catalog::{CatalogLookup, StaticCatalog};
use docket::workflows::checklist::ChecklistEngine;
use docket::workflows::deadline::DeadlineCalculator;
use docket::workflows::desk::CaseDesk;
use docket::workflows::memory::MemoryStore;
use docket::workflows::notifications::{NotificationDispatcher, OutboxTransport};
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

pub(crate) type Desk = CaseDesk<MemoryStore, MemoryStore, OutboxTransport>;
pub(crate) type Scheduler = AutomationScheduler<MemoryStore, MemoryStore, OutboxTransport>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) scheduler: Arc<Scheduler>,
}

/// Everything the binary wires together around one in-memory store.
pub(crate) struct CaseRuntime {
    pub(crate) desk: Arc<Desk>,
    pub(crate) scheduler: Arc<Scheduler>,
    pub(crate) store: Arc<MemoryStore>,
    pub(crate) transport: Arc<OutboxTransport>,
}

pub(crate) fn assemble(
    automation: &AutomationConfig,
    catalog: Arc<dyn CatalogLookup>,
    clock: Arc<dyn Clock>,
) -> CaseRuntime {
    let store = Arc::new(MemoryStore::new());
    let transport = Arc::new(OutboxTransport::new());

    let lifecycle = Arc::new(
        CaseLifecycle::new(
            store.clone(),
            ChecklistEngine::new(catalog),
            DeadlineCalculator::new(automation.case_prefix.clone()),
            clock.clone(),
        )
        .with_default_org_code(automation.org_code.clone()),
    );
    let dispatcher = Arc::new(NotificationDispatcher::new(
        store.clone(),
        transport.clone(),
        clock.clone(),
    ));
    let runner = Arc::new(SweepRunner::new(
        lifecycle.clone(),
        dispatcher.clone(),
        automation.alert_recipient.clone(),
    ));
    let scheduler = Arc::new(AutomationScheduler::new(
        runner,
        clock,
        automation.sweep_interval,
    ));

    CaseRuntime {
        desk: Arc::new(CaseDesk::new(lifecycle, dispatcher)),
        scheduler,
        store,
        transport,
    }
}

/// Built-in procedures unless a CSV export is given.
pub(crate) fn load_catalog(csv: Option<&Path>) -> Result<Arc<StaticCatalog>, AppError> {
    let catalog = match csv {
        Some(path) => {
            let catalog = StaticCatalog::from_path(path)?;
            info!(path = %path.display(), procedures = catalog.len(), "catalog imported");
            catalog
        }
        None => StaticCatalog::standard(),
    };
    Ok(Arc::new(catalog))
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use docket::clock::ManualClock;

    #[test]
    fn parse_date_reports_bad_input() {
        assert_eq!(
            parse_date(" 2025-03-07 "),
            Ok(NaiveDate::from_ymd_opt(2025, 3, 7).expect("valid"))
        );
        assert!(parse_date("07/03/2025").is_err());
    }

    #[test]
    fn assembled_runtime_uses_configured_identifiers() {
        let automation = AutomationConfig {
            case_prefix: "tram".to_string(),
            org_code: "MUNI".to_string(),
            ..AutomationConfig::default()
        };
        let clock = Arc::new(ManualClock::at_date(
            NaiveDate::from_ymd_opt(2025, 3, 7).expect("valid"),
        ));
        let runtime = assemble(&automation, Arc::new(StaticCatalog::standard()), clock);

        let case = runtime
            .desk
            .create_case(docket::workflows::cases::NewCase {
                procedure_id: "import-permit".to_string(),
                client_id: "CL-7".to_string(),
                ..Default::default()
            })
            .expect("case created");

        assert_eq!(case.id.as_str(), "TRAM-2025-MUNI-00001");
        assert_eq!(runtime.store.case_count().expect("count"), 1);
        assert_eq!(runtime.transport.sent().len(), 1);
        assert!(!runtime.scheduler.is_running());
    }
}

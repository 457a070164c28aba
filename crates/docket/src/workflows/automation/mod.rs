//! Periodic sweeps over open cases and the background loop that drives them.

mod scheduler;
mod sweeps;

#[cfg(test)]
mod tests;

pub use scheduler::AutomationScheduler;
pub use sweeps::{
    certificate_expiry, SweepCheck, SweepError, SweepFailure, SweepReport, SweepRunner,
    CERTIFICATE_VALIDITY_DAYS, RENEWAL_LEAD_DAYS,
};

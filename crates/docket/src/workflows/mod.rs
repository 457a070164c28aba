pub mod automation;
pub mod cases;
pub mod catalog;
pub mod checklist;
pub mod deadline;
pub mod desk;
pub mod memory;
pub mod notifications;
pub mod router;

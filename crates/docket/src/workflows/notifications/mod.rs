//! Template rendering, queuing, and deferred delivery of case notifications.

mod dispatcher;
pub mod domain;
mod queue;
pub mod templates;
mod transport;


pub use dispatcher::{DeliveryOutcome, DrainReport, NotificationDispatcher, NotificationError};
pub use domain::{
    Channel, EnqueueRequest, Notification, NotificationId, NotificationState, Throttle,
    WatermarkKey,
};
pub use queue::NotificationStore;
pub use templates::{Template, TemplateSet};
pub use transport::{Delivery, OutboxTransport, Transport, TransportError};

use chrono::{DateTime, Utc};

use super::domain::{Notification, NotificationId, Throttle, WatermarkKey};
use crate::workflows::cases::{CaseId, StoreError};

/// Storage for the outbound queue, delivery history, and reminder watermarks.
pub trait NotificationStore: Send + Sync {
    fn enqueue(&self, notification: Notification) -> Result<Notification, StoreError>;
    fn update_queued(&self, notification: Notification) -> Result<(), StoreError>;
    /// Pending and failed notifications still waiting for delivery.
    fn queued(&self) -> Result<Vec<Notification>, StoreError>;
    /// Remove from the queue and append to the immutable history.
    fn archive(&self, notification: Notification) -> Result<(), StoreError>;
    fn sent_history(&self, case_id: Option<&CaseId>) -> Result<Vec<Notification>, StoreError>;
    /// Move a queued `Pending` or `Error` notification to `Sending` under the
    /// store lock and return it. `None` means another sender holds it or it is
    /// no longer queued.
    fn claim_for_delivery(&self, id: &NotificationId) -> Result<Option<Notification>, StoreError>;

    /// Record `now` as the last send for `key` when `throttle` permits it.
    /// Check and update happen under one lock; returns whether the caller won
    /// the right to send.
    fn claim_watermark(
        &self,
        key: &WatermarkKey,
        now: DateTime<Utc>,
        throttle: Throttle,
    ) -> Result<bool, StoreError>;
}

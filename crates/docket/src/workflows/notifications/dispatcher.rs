use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use super::domain::{EnqueueRequest, Notification, NotificationId, NotificationState};
use super::queue::NotificationStore;
use super::templates::TemplateSet;
use super::transport::Transport;
use crate::clock::Clock;
use crate::workflows::cases::{CaseId, StoreError};

static NOTIFICATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_notification_id() -> NotificationId {
    let id = NOTIFICATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    NotificationId(format!("ntf-{id:06}"))
}

/// Error raised by the dispatcher.
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("unknown notification template '{0}'")]
    UnknownTemplate(String),
    #[error("missing required field '{0}'")]
    MissingField(&'static str),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Sent,
    Failed(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DrainReport {
    pub delivered: usize,
    pub failed: usize,
    pub deferred: usize,
}

/// Renders templates, queues notifications, and hands them to the transport.
pub struct NotificationDispatcher<N, T> {
    store: Arc<N>,
    transport: Arc<T>,
    templates: TemplateSet,
    clock: Arc<dyn Clock>,
}

impl<N, T> NotificationDispatcher<N, T>
where
    N: NotificationStore + 'static,
    T: Transport + 'static,
{
    pub fn new(store: Arc<N>, transport: Arc<T>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            transport,
            templates: TemplateSet::standard(),
            clock,
        }
    }

    pub fn store(&self) -> &Arc<N> {
        &self.store
    }

    pub fn templates(&self) -> &TemplateSet {
        &self.templates
    }

    /// Render immediately so an unknown template fails before anything is
    /// queued. Without a schedule the notification is stored already claimed
    /// and delivered right away, so a concurrent drain never sends it too; a
    /// failed delivery stays queued and is still returned.
    pub fn enqueue(&self, request: EnqueueRequest) -> Result<Notification, NotificationError> {
        let template = self
            .templates
            .get(&request.template)
            .ok_or_else(|| NotificationError::UnknownTemplate(request.template.clone()))?;
        if request.recipient.trim().is_empty() {
            return Err(NotificationError::MissingField("recipient"));
        }

        let mut variables = request.variables;
        variables
            .entry("case_id".to_string())
            .or_insert_with(|| request.case_id.to_string());

        let notification = Notification {
            id: next_notification_id(),
            case_id: request.case_id,
            template: template.code.to_string(),
            channel: request.channel.unwrap_or(template.default_channel),
            recipient: request.recipient,
            subject: template.render_subject(&variables),
            body: template.render_body(&variables),
            variables,
            state: if request.scheduled_for.is_some() {
                NotificationState::Pending
            } else {
                NotificationState::Sending
            },
            scheduled_for: request.scheduled_for,
            sent_at: None,
            created_at: self.clock.now(),
            last_error: None,
        };

        let queued = self.store.enqueue(notification)?;
        if queued.scheduled_for.is_some() {
            return Ok(queued);
        }

        let mut delivered = queued;
        self.deliver(&mut delivered)?;
        Ok(delivered)
    }

    /// Hand one notification to the transport. Success archives it; failure
    /// marks it `Error` and leaves it queued for the next drain. Retries are
    /// unbounded.
    pub fn deliver(
        &self,
        notification: &mut Notification,
    ) -> Result<DeliveryOutcome, NotificationError> {
        let result = self.transport.send(
            notification.channel,
            &notification.recipient,
            &notification.subject,
            &notification.body,
        );

        match result {
            Ok(()) => {
                notification.state = NotificationState::Sent;
                notification.sent_at = Some(self.clock.now());
                notification.last_error = None;
                self.store.archive(notification.clone())?;
                info!(
                    notification_id = %notification.id,
                    case_id = %notification.case_id,
                    template = %notification.template,
                    channel = notification.channel.label(),
                    "notification delivered"
                );
                Ok(DeliveryOutcome::Sent)
            }
            Err(error) => {
                let reason = error.to_string();
                notification.state = NotificationState::Error;
                notification.last_error = Some(reason.clone());
                self.store.update_queued(notification.clone())?;
                warn!(
                    notification_id = %notification.id,
                    case_id = %notification.case_id,
                    template = %notification.template,
                    %error,
                    "notification delivery failed; left queued"
                );
                Ok(DeliveryOutcome::Failed(reason))
            }
        }
    }

    /// Deliver every queued notification that is due at `now`. Each one is
    /// claimed first; rows already in flight elsewhere are left alone. One
    /// failing notification does not stop the others.
    pub fn drain_queue(&self, now: DateTime<Utc>) -> Result<DrainReport, NotificationError> {
        let mut report = DrainReport::default();

        for queued in self.store.queued()? {
            if queued.state == NotificationState::Sending {
                continue;
            }
            if !queued.is_due(now) {
                report.deferred += 1;
                continue;
            }
            let Some(mut notification) = self.store.claim_for_delivery(&queued.id)? else {
                continue;
            };

            match self.deliver(&mut notification) {
                Ok(DeliveryOutcome::Sent) => report.delivered += 1,
                Ok(DeliveryOutcome::Failed(_)) => report.failed += 1,
                Err(error) => {
                    warn!(
                        notification_id = %notification.id,
                        %error,
                        "could not record delivery outcome"
                    );
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    pub fn queued(&self) -> Result<Vec<Notification>, NotificationError> {
        Ok(self.store.queued()?)
    }

    pub fn history(&self, case_id: Option<&CaseId>) -> Result<Vec<Notification>, NotificationError> {
        Ok(self.store.sent_history(case_id)?)
    }
}

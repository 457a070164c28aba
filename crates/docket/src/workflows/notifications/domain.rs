use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::workflows::cases::CaseId;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NotificationId(pub String);

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Message,
    Alert,
    InApp,
}

impl Channel {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::Alert => "alert",
            Self::InApp => "in_app",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationState {
    Pending,
    /// Claimed by one sender; no other delivery attempt may pick it up.
    Sending,
    Sent,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub case_id: CaseId,
    pub template: String,
    pub channel: Channel,
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub variables: BTreeMap<String, String>,
    pub state: NotificationState,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl Notification {
    /// Pending or failed notifications are due once their scheduled time, if
    /// any, has come. In-flight and sent ones never are.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        matches!(self.state, NotificationState::Pending | NotificationState::Error)
            && self.scheduled_for.map_or(true, |at| at <= now)
    }
}

/// Input to `NotificationDispatcher::enqueue`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnqueueRequest {
    pub case_id: CaseId,
    pub template: String,
    pub recipient: String,
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
    #[serde(default)]
    pub channel: Option<Channel>,
    #[serde(default)]
    pub scheduled_for: Option<DateTime<Utc>>,
}

impl EnqueueRequest {
    pub fn new(case_id: CaseId, template: &str, recipient: &str) -> Self {
        Self {
            case_id,
            template: template.to_string(),
            recipient: recipient.to_string(),
            variables: BTreeMap::new(),
            channel: None,
            scheduled_for: None,
        }
    }

    pub fn var(mut self, key: &str, value: impl ToString) -> Self {
        self.variables.insert(key.to_string(), value.to_string());
        self
    }

    pub fn on(mut self, channel: Channel) -> Self {
        self.channel = Some(channel);
        self
    }

    pub fn at(mut self, scheduled_for: DateTime<Utc>) -> Self {
        self.scheduled_for = Some(scheduled_for);
        self
    }
}

/// Last-sent marker scope.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WatermarkKey {
    pub case_id: CaseId,
    pub template: String,
}

impl WatermarkKey {
    pub fn new(case_id: &CaseId, template: &str) -> Self {
        Self {
            case_id: case_id.clone(),
            template: template.to_string(),
        }
    }
}

/// How often a watermarked notification may repeat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Throttle {
    /// At most once per calendar day (UTC).
    OncePerDay,
    /// At most once per rolling window.
    Window(Duration),
}

impl Throttle {
    pub fn permits(self, last_sent: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        let Some(last) = last_sent else {
            return true;
        };
        match self {
            Throttle::OncePerDay => last.date_naive() != now.date_naive(),
            Throttle::Window(window) => now - last >= window,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, day, hour, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    #[test]
    fn once_per_day_resets_at_midnight() {
        let throttle = Throttle::OncePerDay;
        assert!(throttle.permits(None, at(10, 9)));
        assert!(!throttle.permits(Some(at(10, 1)), at(10, 23)));
        assert!(throttle.permits(Some(at(10, 23)), at(11, 0)));
    }

    #[test]
    fn window_requires_full_elapsed_period() {
        let throttle = Throttle::Window(Duration::hours(24));
        assert!(!throttle.permits(Some(at(10, 9)), at(11, 8)));
        assert!(throttle.permits(Some(at(10, 9)), at(11, 9)));
    }

    #[test]
    fn due_check_respects_schedule() {
        let request = EnqueueRequest::new(CaseId("C".to_string()), "case_opened", "ops");
        let notification = Notification {
            id: NotificationId("ntf-000001".to_string()),
            case_id: request.case_id,
            template: request.template,
            channel: Channel::Message,
            recipient: request.recipient,
            subject: String::new(),
            body: String::new(),
            variables: request.variables,
            state: NotificationState::Pending,
            scheduled_for: Some(at(12, 9)),
            sent_at: None,
            created_at: at(10, 9),
            last_error: None,
        };
        assert!(!notification.is_due(at(12, 8)));
        assert!(notification.is_due(at(12, 9)));
    }
}

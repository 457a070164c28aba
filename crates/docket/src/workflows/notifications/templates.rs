use std::collections::BTreeMap;

use super::domain::Channel;

pub const CASE_OPENED: &str = "case_opened";
pub const STATE_CHANGED: &str = "state_changed";
pub const DEADLINE_3_DAYS: &str = "deadline_3_days";
pub const DEADLINE_1_DAY: &str = "deadline_1_day";
pub const DEADLINE_TODAY: &str = "deadline_today";
pub const CASE_OVERDUE: &str = "case_overdue";
pub const MISSING_DOCUMENTS: &str = "missing_documents";
pub const RENEWAL_OPENED: &str = "renewal_opened";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pub code: &'static str,
    pub subject: &'static str,
    pub body: &'static str,
    pub default_channel: Channel,
}

impl Template {
    pub fn render_subject(&self, variables: &BTreeMap<String, String>) -> String {
        render(self.subject, variables)
    }

    pub fn render_body(&self, variables: &BTreeMap<String, String>) -> String {
        render(self.body, variables)
    }
}

/// Literal `{{name}}` substitution in one pass over the pattern. Placeholders
/// without a value are left as written, and substituted values are never
/// scanned again.
pub fn render(pattern: &str, variables: &BTreeMap<String, String>) -> String {
    let mut rendered = String::with_capacity(pattern.len());
    let mut rest = pattern;

    while let Some(open) = rest.find("{{") {
        rendered.push_str(&rest[..open]);
        let after_open = &rest[open + 2..];
        let Some(close) = after_open.find("}}") else {
            rendered.push_str(&rest[open..]);
            return rendered;
        };

        let name = &after_open[..close];
        match variables.get(name) {
            Some(value) => rendered.push_str(value),
            None => rendered.push_str(&rest[open..open + close + 4]),
        }
        rest = &after_open[close + 2..];
    }

    rendered.push_str(rest);
    rendered
}

/// Fixed mapping from template code to subject/body patterns.
#[derive(Debug, Clone)]
pub struct TemplateSet {
    templates: Vec<Template>,
}

impl TemplateSet {
    pub fn standard() -> Self {
        Self {
            templates: standard_templates(),
        }
    }

    pub fn get(&self, code: &str) -> Option<&Template> {
        self.templates.iter().find(|template| template.code == code)
    }

    pub fn codes(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.templates.iter().map(|template| template.code)
    }

    /// Template for a deadline reminder at `days` remaining, if that is a
    /// reminder threshold.
    pub fn deadline_template_for(days: i64) -> Option<&'static str> {
        match days {
            3 => Some(DEADLINE_3_DAYS),
            1 => Some(DEADLINE_1_DAY),
            0 => Some(DEADLINE_TODAY),
            _ => None,
        }
    }
}

impl Default for TemplateSet {
    fn default() -> Self {
        Self::standard()
    }
}

fn standard_templates() -> Vec<Template> {
    vec![
        Template {
            code: CASE_OPENED,
            subject: "Case {{case_id}} opened",
            body: "Your {{procedure}} case {{case_id}} is open. Expected resolution by {{deadline}}.",
            default_channel: Channel::Message,
        },
        Template {
            code: STATE_CHANGED,
            subject: "Case {{case_id}} is now {{state}}",
            body: "Case {{case_id}} moved from {{previous}} to {{state}}: {{reason}}",
            default_channel: Channel::InApp,
        },
        Template {
            code: DEADLINE_3_DAYS,
            subject: "Case {{case_id}} due in 3 days",
            body: "{{alias}} ({{case_id}}) is due on {{deadline}}. Three days remain.",
            default_channel: Channel::Alert,
        },
        Template {
            code: DEADLINE_1_DAY,
            subject: "Case {{case_id}} due tomorrow",
            body: "{{alias}} ({{case_id}}) is due on {{deadline}}. One day remains.",
            default_channel: Channel::Alert,
        },
        Template {
            code: DEADLINE_TODAY,
            subject: "URGENT: case {{case_id}} due today",
            body: "{{alias}} ({{case_id}}) reaches its deadline today ({{deadline}}).",
            default_channel: Channel::Alert,
        },
        Template {
            code: CASE_OVERDUE,
            subject: "OVERDUE: case {{case_id}}",
            body: "{{alias}} ({{case_id}}) passed its deadline of {{deadline}} and is now overdue.",
            default_channel: Channel::Alert,
        },
        Template {
            code: MISSING_DOCUMENTS,
            subject: "Documents pending for case {{case_id}}",
            body: "We still need: {{missing}}. Your file is {{percent}}% complete.",
            default_channel: Channel::Message,
        },
        Template {
            code: RENEWAL_OPENED,
            subject: "Renewal opened for {{source_case_id}}",
            body: "Certificate from {{source_case_id}} expires on {{expires_on}}. Renewal case {{case_id}} was opened.",
            default_channel: Channel::InApp,
        },
    ]
}

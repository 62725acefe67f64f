use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, PrimitiveDateTime, UtcOffset};

use std::str::FromStr;

time::serde::format_description!(
    due_date_format,
    PrimitiveDateTime,
    "[year]-[month]-[day]T[hour]:[minute]:[second]Z"
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(format!(
                "unknown priority '{other}'; expected low, medium or high"
            )),
        }
    }
}

/// A task as stored by the backend. Due dates are UTC wall-clock times.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, with = "due_date_format::option")]
    pub due_date: Option<PrimitiveDateTime>,
    #[serde(default)]
    pub notifications_enabled: bool,
}

impl Task {
    /// Matches the `taskId` carried by push notifications.
    pub fn matches_id(&self, task_id: &str) -> bool {
        task_id.trim() == self.id.to_string()
    }

    pub fn due_at(&self) -> Option<OffsetDateTime> {
        self.due_date.map(PrimitiveDateTime::assume_utc)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub title: String,
    pub completed: bool,
    pub priority: Priority,
    #[serde(with = "due_date_format::option")]
    pub due_date: Option<PrimitiveDateTime>,
    pub notifications_enabled: bool,
}

impl NewTask {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            completed: false,
            priority: Priority::default(),
            due_date: None,
            notifications_enabled: false,
        }
    }
}

/// Converts a local due date into the UTC wall-clock form the backend stores.
pub fn to_utc_due_date(at: OffsetDateTime) -> PrimitiveDateTime {
    let utc = at.to_offset(UtcOffset::UTC);
    PrimitiveDateTime::new(utc.date(), utc.time())
        .replace_nanosecond(0)
        .unwrap_or_else(|_| PrimitiveDateTime::new(utc.date(), utc.time()))
}

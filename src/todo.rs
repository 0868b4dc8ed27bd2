//! Todo records and the validated inputs that create or change them.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("title must not be empty")]
    EmptyTitle,
    #[error("Invalid status. Must be either \"pending\" or \"completed\"")]
    InvalidStatus(String),
    #[error("Invalid priority. Must be \"low\", \"medium\", or \"high\"")]
    InvalidPriority(String),
    #[error("invalid date `{0}`: expected YYYY-MM-DD or an RFC 3339 timestamp")]
    InvalidDate(String),
    #[error("invalid request body: {0}")]
    InvalidBody(String),
}

/// Completion state of a todo.
///
/// Stored values outside the known set survive a read as `Unknown`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Status {
    #[default]
    Pending,
    Completed,
    Unknown(String),
}

impl Status {
    pub fn as_str(&self) -> &str {
        match self {
            Status::Pending => "pending",
            Status::Completed => "completed",
            Status::Unknown(raw) => raw,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Status::Completed)
    }
}

impl FromStr for Status {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Status::Pending),
            "completed" => Ok(Status::Completed),
            other => Err(ValidationError::InvalidStatus(other.to_string())),
        }
    }
}

impl From<String> for Status {
    fn from(raw: String) -> Self {
        raw.parse().unwrap_or(Status::Unknown(raw))
    }
}

impl From<Status> for String {
    fn from(status: Status) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Importance of a todo. Same read tolerance as [`Status`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Unknown(String),
}

impl Priority {
    pub fn as_str(&self) -> &str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Unknown(raw) => raw,
        }
    }

    /// Sort weight; unknown values rank below `low`.
    pub fn rank(&self) -> u8 {
        match self {
            Priority::High => 3,
            Priority::Medium => 2,
            Priority::Low => 1,
            Priority::Unknown(_) => 0,
        }
    }
}

impl FromStr for Priority {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(ValidationError::InvalidPriority(other.to_string())),
        }
    }
}

impl From<String> for Priority {
    fn from(raw: String) -> Self {
        raw.parse().unwrap_or(Priority::Unknown(raw))
    }
}

impl From<Priority> for String {
    fn from(priority: Priority) -> Self {
        priority.as_str().to_string()
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored todo record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Todo {
    /// Create a fresh record from validated input
    pub fn from_new(new: NewTodo) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            title: new.title,
            description: new.description,
            status: new.status,
            priority: new.priority,
            due_date: new.due_date,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a validated patch and bump `updated_at`
    pub fn apply(&mut self, patch: TodoPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(due_date) = patch.due_date {
            self.due_date = Some(due_date);
        }
        self.updated_at = Utc::now();
    }
}

/// Validated input for creating a todo.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTodo {
    pub title: String,
    pub description: String,
    pub status: Status,
    pub priority: Priority,
    pub due_date: Option<NaiveDate>,
}

impl NewTodo {
    /// Validate raw caller input. Absent status/priority fall back to
    /// `pending`/`medium`.
    pub fn parse(
        title: &str,
        description: Option<&str>,
        status: Option<&str>,
        priority: Option<&str>,
        due_date: Option<&str>,
    ) -> Result<Self, ValidationError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        Ok(Self {
            title: title.to_string(),
            description: description.unwrap_or_default().to_string(),
            status: non_empty(status)
                .map(str::parse::<Status>)
                .transpose()?
                .unwrap_or_default(),
            priority: non_empty(priority)
                .map(str::parse::<Priority>)
                .transpose()?
                .unwrap_or_default(),
            due_date: non_empty(due_date).map(parse_date).transpose()?,
        })
    }

    #[cfg(test)]
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            status: Status::Pending,
            priority: Priority::Medium,
            due_date: None,
        }
    }
}

/// Validated partial update. Empty strings mean "leave unchanged".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TodoPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<Status>,
    pub priority: Option<Priority>,
    pub due_date: Option<NaiveDate>,
}

impl TodoPatch {
    pub fn parse(
        title: Option<&str>,
        description: Option<&str>,
        status: Option<&str>,
        priority: Option<&str>,
        due_date: Option<&str>,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            title: non_empty(title).map(|t| t.trim().to_string()),
            description: non_empty(description).map(str::to_string),
            status: non_empty(status).map(str::parse::<Status>).transpose()?,
            priority: non_empty(priority).map(str::parse::<Priority>).transpose()?,
            due_date: non_empty(due_date).map(parse_date).transpose()?,
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Parse a calendar date given either as `YYYY-MM-DD` or as an RFC 3339
/// timestamp, in which case its UTC date is used.
pub fn parse_date(raw: &str) -> Result<NaiveDate, ValidationError> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date);
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc).date_naive())
        .map_err(|_| ValidationError::InvalidDate(raw.to_string()))
}

/// Store ordering: priority descending, then due date ascending with
/// undated todos last. Callers sort stably so equal keys keep store order.
pub fn summary_order(a: &Todo, b: &Todo) -> Ordering {
    b.priority
        .rank()
        .cmp(&a.priority.rank())
        .then_with(|| match (a.due_date, b.due_date) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn todo(title: &str, priority: Priority, due: Option<&str>) -> Todo {
        let mut todo = Todo::from_new(NewTodo::titled(title));
        todo.priority = priority;
        todo.due_date = due.map(|d| parse_date(d).unwrap());
        todo
    }

    #[test]
    fn unknown_values_survive_deserialization() {
        let json = r#"{
            "id": "abc",
            "title": "legacy",
            "status": "archived",
            "priority": "urgent",
            "createdAt": "2024-05-01T10:00:00Z",
            "updatedAt": "2024-05-01T10:00:00Z"
        }"#;
        let todo: Todo = serde_json::from_str(json).unwrap();
        assert_eq!(todo.status, Status::Unknown("archived".into()));
        assert_eq!(todo.priority, Priority::Unknown("urgent".into()));
        assert_eq!(todo.description, "");

        let back = serde_json::to_value(&todo).unwrap();
        assert_eq!(back["priority"], "urgent");
        assert_eq!(back["dueDate"], serde_json::Value::Null);
    }

    #[test]
    fn new_todo_defaults_and_validation() {
        let new = NewTodo::parse("  Ship it ", None, None, None, None).unwrap();
        assert_eq!(new.title, "Ship it");
        assert_eq!(new.status, Status::Pending);
        assert_eq!(new.priority, Priority::Medium);

        assert_eq!(
            NewTodo::parse("   ", None, None, None, None),
            Err(ValidationError::EmptyTitle)
        );
        assert_eq!(
            NewTodo::parse("x", None, Some("done"), None, None),
            Err(ValidationError::InvalidStatus("done".into()))
        );
        assert_eq!(
            NewTodo::parse("x", None, None, Some("urgent"), None),
            Err(ValidationError::InvalidPriority("urgent".into()))
        );
        assert!(matches!(
            NewTodo::parse("x", None, None, None, Some("next tuesday")),
            Err(ValidationError::InvalidDate(_))
        ));
    }

    #[test]
    fn patch_ignores_empty_strings() {
        let patch = TodoPatch::parse(Some(""), Some(""), None, Some("high"), None).unwrap();
        assert_eq!(patch.title, None);
        assert_eq!(patch.description, None);
        assert_eq!(patch.priority, Some(Priority::High));

        let mut todo = todo("keep", Priority::Low, None);
        let before = todo.updated_at;
        todo.apply(patch);
        assert_eq!(todo.title, "keep");
        assert_eq!(todo.priority, Priority::High);
        assert!(todo.updated_at >= before);
    }

    #[test]
    fn parse_date_accepts_rfc3339() {
        assert_eq!(
            parse_date("2024-05-30T23:30:00-02:00").unwrap(),
            NaiveDate::from_ymd_opt(2024, 5, 31).unwrap()
        );
        assert_eq!(
            parse_date("2024-05-30").unwrap(),
            NaiveDate::from_ymd_opt(2024, 5, 30).unwrap()
        );
    }

    #[test]
    fn ordering_puts_high_first_and_undated_last() {
        let mut todos = vec![
            todo("low", Priority::Low, Some("2024-05-01")),
            todo("high-undated", Priority::High, None),
            todo("weird", Priority::Unknown("urgent".into()), Some("2024-01-01")),
            todo("high-late", Priority::High, Some("2024-06-01")),
            todo("medium", Priority::Medium, None),
            todo("high-early", Priority::High, Some("2024-05-01")),
        ];
        todos.sort_by(summary_order);
        let titles: Vec<_> = todos.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(
            titles,
            ["high-early", "high-late", "high-undated", "medium", "low", "weird"]
        );
    }
}

//! Prompt text for todo digests.

use crate::todo::Todo;
use chrono::NaiveDate;

const PROMPT_HEADER: &str =
    "Please provide a concise summary of these todos, highlighting key priorities and deadlines:";

const PROMPT_FOOTER: &str = r#"Please format the summary to include:
1. Overall status (how many completed vs pending)
2. High priority items that need attention
3. Upcoming deadlines
4. Key areas of focus

Keep the summary professional and actionable."#;

/// Build the summarization prompt for an already ordered, non-empty list.
///
/// Order is preserved as given.
pub fn build_summary_prompt(todos: &[Todo]) -> String {
    let todo_list = todos
        .iter()
        .map(format_todo)
        .collect::<Vec<_>>()
        .join("\n\n");

    format!("{PROMPT_HEADER}\n\n{todo_list}\n\n{PROMPT_FOOTER}")
}

fn format_todo(todo: &Todo) -> String {
    let status = if todo.status.is_completed() {
        "✅"
    } else {
        "⏳"
    };
    let priority = todo.priority.as_str().to_uppercase();
    let due = todo
        .due_date
        .map(|date| format!(" (Due: {})", locale_date(date)))
        .unwrap_or_default();

    format!(
        "{status} [{priority}] {}{due}\n{}",
        todo.title, todo.description
    )
}

/// US-style short date, e.g. `5/30/2024`.
pub fn locale_date(date: NaiveDate) -> String {
    date.format("%-m/%-d/%Y").to_string()
}

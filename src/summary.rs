//! Summary pipeline: store query, LLM digest and optional Slack delivery.

use crate::agent::{SummarizeError, Summarizer};
use crate::notifier::Notifier;
use crate::storage::{StorageError, TodoFilter, TodoStore};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Summary text when the date filter matches nothing.
pub const NO_TODOS_FOUND: &str = "No todos found for the specified period.";

#[derive(Error, Debug)]
pub enum SummaryError {
    #[error("failed to query todos: {0}")]
    Store(#[from] StorageError),
    #[error("failed to generate todo summary: {0}")]
    Summarization(#[from] SummarizeError),
}

/// Inclusive due-date bounds for a summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SummaryRequest {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl SummaryRequest {
    pub fn filter(&self) -> TodoFilter {
        TodoFilter::due_between(self.start_date, self.end_date)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<NaiveDate>,
}

/// Outcome of one summary request. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResult {
    pub success: bool,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub todo_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_range: Option<DateRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slack_sent: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slack_error: Option<String>,
}

/// Whether a finished summary is also posted to the chat webhook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    None,
    Slack,
}

/// Runs the summary pipeline against injected collaborators.
pub struct SummaryService {
    store: Arc<dyn TodoStore>,
    summarizer: Summarizer,
    notifier: Arc<dyn Notifier>,
}

impl SummaryService {
    pub fn new(
        store: Arc<dyn TodoStore>,
        summarizer: Summarizer,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            summarizer,
            notifier,
        }
    }

    /// Query, summarize and optionally deliver.
    ///
    /// Store and generation failures fail the request. A delivery failure is
    /// reported in `slack_sent`/`slack_error` of an otherwise successful
    /// result.
    pub async fn summarize(
        &self,
        request: SummaryRequest,
        delivery: Delivery,
    ) -> Result<SummaryResult, SummaryError> {
        let todos = self.store.find(&request.filter())?;
        tracing::info!(
            start = ?request.start_date,
            end = ?request.end_date,
            todo_count = todos.len(),
            "queried todos for summary"
        );

        if todos.is_empty() {
            return Ok(SummaryResult {
                success: true,
                summary: NO_TODOS_FOUND.to_string(),
                todo_count: None,
                date_range: None,
                slack_sent: None,
                slack_error: None,
            });
        }

        let summary = self.summarizer.summarize(&todos).await?;

        let mut result = SummaryResult {
            success: true,
            summary,
            todo_count: Some(todos.len()),
            date_range: Some(DateRange {
                start: request.start_date,
                end: request.end_date,
            }),
            slack_sent: None,
            slack_error: None,
        };

        if delivery == Delivery::Slack {
            match self.notifier.notify(&result.summary).await {
                Ok(()) => result.slack_sent = Some(true),
                Err(err) => {
                    tracing::warn!(error = %err, "summary not delivered to slack");
                    result.slack_sent = Some(false);
                    result.slack_error = Some(err.to_string());
                }
            }
        }

        Ok(result)
    }
}

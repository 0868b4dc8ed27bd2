//! # todo-digest
//!
//! A todo list service that turns the current list into an LLM-written digest
//! and posts it to Slack.
//!
//! ## Features
//!
//! - **Todo CRUD**: sled-backed store behind the [`TodoStore`] trait, exposed over HTTP
//! - **Digests**: date-filtered todos, ordered by priority then due date, summarized by Gemini
//! - **Delivery**: Block Kit messages to a Slack incoming webhook, reported per request

pub mod agent;
pub mod config;
pub mod logging;
pub mod memory;
pub mod notifier;
pub mod prompt;
pub mod server;
pub mod storage;
pub mod summary;
pub mod todo;

pub use agent::{GeminiConfig, GeminiGenerator, Summarizer, TextGenerator};
pub use config::Config;
pub use memory::MemoryStore;
pub use notifier::{Notifier, SlackNotifier};
pub use storage::{Storage, TodoFilter, TodoStore};
pub use summary::{Delivery, SummaryRequest, SummaryResult, SummaryService};
pub use todo::{NewTodo, Priority, Status, Todo, TodoPatch};

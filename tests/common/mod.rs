#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use todo_digest::agent::{GenerationParams, SummarizeError};
use todo_digest::notifier::NotifyError;
use todo_digest::storage::StorageError;
use todo_digest::{
    NewTodo, Notifier, Summarizer, SummaryService, TextGenerator, Todo, TodoFilter, TodoPatch,
    TodoStore,
};

/// Serve `app` on an ephemeral loopback port.
pub async fn spawn(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

#[derive(Default)]
pub struct FakeGenerator {
    pub prompts: Mutex<Vec<String>>,
    pub fail: bool,
}

impl FakeGenerator {
    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl TextGenerator for FakeGenerator {
    async fn generate(
        &self,
        prompt: &str,
        _params: &GenerationParams,
    ) -> Result<String, SummarizeError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if self.fail {
            return Err(SummarizeError::Rejected {
                status: 429,
                body: "quota exceeded".into(),
            });
        }
        Ok("Two high priority items need attention.".into())
    }
}

#[derive(Default)]
pub struct FakeNotifier {
    pub calls: AtomicUsize,
    pub fail: bool,
}

impl FakeNotifier {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Notifier for FakeNotifier {
    async fn notify(&self, _summary: &str) -> Result<(), NotifyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(NotifyError::NotConfigured);
        }
        Ok(())
    }
}

pub struct BrokenStore;

impl TodoStore for BrokenStore {
    fn find(&self, _filter: &TodoFilter) -> Result<Vec<Todo>, StorageError> {
        Err(StorageError::Unavailable("disk on fire".into()))
    }
    fn get(&self, _id: &str) -> Result<Option<Todo>, StorageError> {
        Err(StorageError::Unavailable("disk on fire".into()))
    }
    fn create(&self, _new: NewTodo) -> Result<Todo, StorageError> {
        Err(StorageError::Unavailable("disk on fire".into()))
    }
    fn update(&self, _id: &str, _patch: TodoPatch) -> Result<Option<Todo>, StorageError> {
        Err(StorageError::Unavailable("disk on fire".into()))
    }
    fn delete(&self, _id: &str) -> Result<bool, StorageError> {
        Err(StorageError::Unavailable("disk on fire".into()))
    }
}

pub fn summary_service(
    store: Arc<dyn TodoStore>,
    generator: &Arc<FakeGenerator>,
    notifier: &Arc<FakeNotifier>,
) -> Arc<SummaryService> {
    Arc::new(SummaryService::new(
        store,
        Summarizer::new(generator.clone()),
        notifier.clone(),
    ))
}

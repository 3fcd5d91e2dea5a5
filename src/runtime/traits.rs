//! Trait seams for runtime I/O
//!
//! The executor only talks to tools and storage through these traits so it
//! can be driven by the mocks in `testing`.

use crate::llm::ToolDefinition;
use crate::session::{Session, ToolRequest, ToolResult};
use crate::session_store::{SessionStore, SessionStoreError};
use crate::tools::ToolDispatcher;
use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;

/// Runs tool requests; failures come back as error results
#[async_trait]
pub trait ToolRunner: Send + Sync {
    async fn run(&self, request: &ToolRequest) -> ToolResult;

    /// Run a batch concurrently; results come back in request order
    async fn run_batch(&self, requests: &[ToolRequest]) -> Vec<ToolResult> {
        join_all(requests.iter().map(|r| self.run(r))).await
    }

    /// Catalog advertised to the agent
    fn definitions(&self) -> Vec<ToolDefinition>;
}

/// Durable storage for the live session
///
/// Synchronous so `quit` finishes the write before the terminal is restored.
pub trait SessionPersistence: Send + Sync {
    fn save(&self, session: &Session) -> Result<(), SessionStoreError>;
}

#[async_trait]
impl ToolRunner for ToolDispatcher {
    async fn run(&self, request: &ToolRequest) -> ToolResult {
        self.execute(request).await
    }

    async fn run_batch(&self, requests: &[ToolRequest]) -> Vec<ToolResult> {
        self.execute_batch(requests).await
    }

    fn definitions(&self) -> Vec<ToolDefinition> {
        ToolDispatcher::definitions(self)
    }
}

impl SessionPersistence for SessionStore {
    fn save(&self, session: &Session) -> Result<(), SessionStoreError> {
        SessionStore::save(self, session).map(|_| ())
    }
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: ToolRunner + ?Sized> ToolRunner for Arc<T> {
    async fn run(&self, request: &ToolRequest) -> ToolResult {
        (**self).run(request).await
    }

    async fn run_batch(&self, requests: &[ToolRequest]) -> Vec<ToolResult> {
        (**self).run_batch(requests).await
    }

    fn definitions(&self) -> Vec<ToolDefinition> {
        (**self).definitions()
    }
}

impl<T: SessionPersistence + ?Sized> SessionPersistence for Arc<T> {
    fn save(&self, session: &Session) -> Result<(), SessionStoreError> {
        (**self).save(session)
    }
}

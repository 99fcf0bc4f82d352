//! Deterministic generator for tests; no network.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use tempo_core::errors::GenError;

use crate::{GeneratedTask, TaskGenerator};

pub enum MockResponse {
    Tasks(Vec<GeneratedTask>),
    Error(GenError),
}

/// Returns a fixed response and counts calls.
pub struct MockGenerator {
    response: MockResponse,
    call_count: AtomicUsize,
}

impl MockGenerator {
    pub fn new(response: MockResponse) -> Self {
        Self {
            response,
            call_count: AtomicUsize::new(0),
        }
    }

    pub fn with_tasks(tasks: Vec<GeneratedTask>) -> Self {
        Self::new(MockResponse::Tasks(tasks))
    }

    pub fn failing(error: GenError) -> Self {
        Self::new(MockResponse::Error(error))
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl TaskGenerator for MockGenerator {
    async fn generate(
        &self,
        _playlist_name: &str,
        _prompt: &str,
    ) -> Result<Vec<GeneratedTask>, GenError> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        match &self.response {
            MockResponse::Tasks(tasks) => Ok(tasks.clone()),
            MockResponse::Error(err) => Err(err.clone()),
        }
    }
}

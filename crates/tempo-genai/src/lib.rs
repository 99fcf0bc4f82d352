//! AI-assisted task generation behind a narrow trait.
//!
//! The rest of the system never talks to a provider directly; it sees
//! `TaskGenerator` and a list of validated `GeneratedTask`s, or a
//! `GenError` classified as retryable or fatal.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use tempo_core::errors::GenError;

pub mod mock;
pub mod provider;

pub use mock::MockGenerator;
pub use provider::OpenAiGenerator;

/// A generated task suggestion: a title and a duration in minutes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeneratedTask {
    pub title: String,
    pub duration: i64,
}

#[async_trait]
pub trait TaskGenerator: Send + Sync {
    /// Generate a task list for a named playlist from a freeform prompt.
    async fn generate(&self, playlist_name: &str, prompt: &str)
        -> Result<Vec<GeneratedTask>, GenError>;
}

/// Parse a provider payload into validated tasks. Accepts either a bare
/// JSON array or an object wrapping one under `tasks` (json_object response
/// mode produces the latter).
pub fn parse_tasks(content: &str) -> Result<Vec<GeneratedTask>, GenError> {
    let value: serde_json::Value = serde_json::from_str(content)
        .map_err(|e| GenError::InvalidResponse(format!("not JSON: {e}")))?;

    let items = match &value {
        serde_json::Value::Array(items) => items.as_slice(),
        serde_json::Value::Object(map) => match map.get("tasks") {
            Some(serde_json::Value::Array(items)) => items.as_slice(),
            _ => {
                return Err(GenError::InvalidResponse(
                    "expected an array or an object with a tasks array".into(),
                ))
            }
        },
        _ => {
            return Err(GenError::InvalidResponse(
                "expected an array or an object with a tasks array".into(),
            ))
        }
    };

    let mut tasks = Vec::with_capacity(items.len());
    for item in items {
        let task: GeneratedTask = serde_json::from_value(item.clone())
            .map_err(|e| GenError::InvalidResponse(format!("bad task entry: {e}")))?;
        if task.title.trim().is_empty() {
            return Err(GenError::InvalidResponse("task with empty title".into()));
        }
        if task.duration < 1 {
            return Err(GenError::InvalidResponse(format!(
                "task \"{}\" has non-positive duration",
                task.title
            )));
        }
        tasks.push(task);
    }
    Ok(tasks)
}

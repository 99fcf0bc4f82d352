use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! branded_id {
    ($name:ident, $prefix:expr) => {
        #[derive(Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new() -> Self {
                Self(format!("{}_{}", $prefix, Uuid::now_v7()))
            }

            pub fn from_raw(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = std::convert::Infallible;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.to_owned()))
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

branded_id!(PlaylistId, "pl");
branded_id!(TaskId, "task");
branded_id!(TaskCompletionId, "tc");
branded_id!(PlaylistCompletionId, "pc");

/// Client-side placeholder prefix for tasks that have not been persisted yet.
pub const PLACEHOLDER_PREFIX: &str = "temp-";

impl TaskId {
    /// True for client-generated placeholder ids that must be replaced with
    /// a fresh persisted id on write.
    pub fn is_placeholder(&self) -> bool {
        self.0.starts_with(PLACEHOLDER_PREFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn playlist_id_has_prefix() {
        let id = PlaylistId::new();
        assert!(id.as_str().starts_with("pl_"), "got: {id}");
    }

    #[test]
    fn task_id_has_prefix() {
        let id = TaskId::new();
        assert!(id.as_str().starts_with("task_"), "got: {id}");
    }

    #[test]
    fn ids_are_unique() {
        let a = TaskId::new();
        let b = TaskId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn display_and_from_str_roundtrip() {
        let id = PlaylistId::new();
        let s = id.to_string();
        let parsed: PlaylistId = s.parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn serde_roundtrip() {
        let id = TaskCompletionId::new();
        let json = serde_json::to_string(&id).unwrap();
        let parsed: TaskCompletionId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn placeholder_detection() {
        assert!(TaskId::from_raw("temp-1724").is_placeholder());
        assert!(!TaskId::from_raw("task_0191").is_placeholder());
        assert!(!TaskId::new().is_placeholder());
    }

    #[test]
    fn monotonic_ordering() {
        let ids: Vec<PlaylistId> = (0..100).map(|_| PlaylistId::new()).collect();
        for w in ids.windows(2) {
            assert!(w[0].as_str() < w[1].as_str(), "not monotonic: {} >= {}", w[0], w[1]);
        }
    }
}

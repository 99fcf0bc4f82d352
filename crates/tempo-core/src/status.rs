use serde::{Deserialize, Serialize};

/// Derived playlist state for one calendar date. Never stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaylistStatus {
    #[serde(rename = "Not Started")]
    NotStarted,
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "Completed")]
    Completed,
}

impl PlaylistStatus {
    pub fn is_completed(self) -> bool {
        self == Self::Completed
    }
}

impl std::fmt::Display for PlaylistStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotStarted => write!(f, "Not Started"),
            Self::InProgress => write!(f, "In Progress"),
            Self::Completed => write!(f, "Completed"),
        }
    }
}

impl std::str::FromStr for PlaylistStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Not Started" => Ok(Self::NotStarted),
            "In Progress" => Ok(Self::InProgress),
            "Completed" => Ok(Self::Completed),
            other => Err(format!("unknown playlist status: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_format_uses_spaced_names() {
        assert_eq!(
            serde_json::to_string(&PlaylistStatus::NotStarted).unwrap(),
            "\"Not Started\""
        );
        assert_eq!(
            serde_json::to_string(&PlaylistStatus::InProgress).unwrap(),
            "\"In Progress\""
        );
    }

    #[test]
    fn display_and_from_str_roundtrip() {
        for status in [
            PlaylistStatus::NotStarted,
            PlaylistStatus::InProgress,
            PlaylistStatus::Completed,
        ] {
            let parsed: PlaylistStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn only_completed_reports_completed() {
        assert!(PlaylistStatus::Completed.is_completed());
        assert!(!PlaylistStatus::InProgress.is_completed());
        assert!(!PlaylistStatus::NotStarted.is_completed());
    }
}

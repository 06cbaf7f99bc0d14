use serde::{Deserialize, Serialize};

use dissonyx_common::{ConflictProgress, DissonyxError, Result};

// ── Submission ────────────────────────────────────────────────────────────────

/// A paper submitted for conflict analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub title: String,
    #[serde(default)]
    pub topics: Vec<String>,
    /// Conclusion text.
    #[serde(default)]
    pub text: String,
}

impl Submission {
    pub fn new(title: impl Into<String>, topics: Vec<String>, text: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            topics,
            text: text.into(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(DissonyxError::InvalidSubmission("paper title must not be blank".to_string()));
        }
        Ok(())
    }
}

// ── Events ────────────────────────────────────────────────────────────────────

/// Events streamed back while a submission is processed.
///
/// Serialises as `{"event": "<name>", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum SubmissionEvent {
    /// The paper is stored; detection starts next.
    PaperAdded { status: String },
    /// One candidate paper of a topic has been processed.
    Conflict(ConflictProgress),
    /// Detection finished and the store was saved.
    GraphHash { graph_hash: String },
    /// The submission was aborted.
    Error { status: String, message: String },
}

impl SubmissionEvent {
    pub fn paper_added() -> Self {
        SubmissionEvent::PaperAdded { status: "success".to_string() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        SubmissionEvent::Error {
            status: "error".to_string(),
            message: message.into(),
        }
    }

    /// No further events follow a terminal one.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SubmissionEvent::GraphHash { .. } | SubmissionEvent::Error { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_event_wire_format() {
        let added = serde_json::to_value(SubmissionEvent::paper_added()).unwrap();
        assert_eq!(added, serde_json::json!({"event": "paper_added", "data": {"status": "success"}}));

        let progress = SubmissionEvent::Conflict(ConflictProgress {
            conflicts: Vec::new(),
            topic: "x".to_string(),
            progress: 100,
        });
        assert_eq!(
            serde_json::to_value(progress).unwrap(),
            serde_json::json!({"event": "conflict", "data": {"conflicts": [], "topic": "x", "progress": 100}})
        );

        let err = serde_json::to_value(SubmissionEvent::error("boom")).unwrap();
        assert_eq!(err, serde_json::json!({"event": "error", "data": {"status": "error", "message": "boom"}}));
    }

    #[test]
    fn test_blank_title_rejected() {
        assert!(Submission::new("  ", vec![], "Text.").validate().is_err());
        assert!(Submission::new("A", vec![], "").validate().is_ok());
    }

    #[test]
    fn test_submission_defaults() {
        let s: Submission = serde_json::from_str(r#"{"title": "A"}"#).unwrap();
        assert!(s.topics.is_empty());
        assert_eq!(s.text, "");
    }
}

//! Request-level error taxonomy.
//!
//! Three kinds are expected outcomes that a caller reports as "not found";
//! [`RecallError::Collaborator`] wraps any transport or protocol failure
//! from the retriever, store, or rewriter.

use std::fmt;

/// Pipeline stage, used to tag where a collaborator failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Normalizing,
    Retrieving,
    LookingUp,
    Enriching,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Normalizing => "query normalization",
            Stage::Retrieving => "context retrieval",
            Stage::LookingUp => "metadata lookup",
            Stage::Enriching => "summary enrichment",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RecallError {
    #[error("no retrieved fragment carries a grouping key ({seen} fragments seen)")]
    NoCandidate { seen: usize },

    #[error("best score {confidence:.3} for {item_key} is below threshold {threshold:.3}")]
    LowConfidence {
        item_key: String,
        confidence: f64,
        threshold: f64,
    },

    #[error("no metadata record found for {item_key}")]
    RecordNotFound { item_key: String },

    #[error("{stage} failed: {source:#}")]
    Collaborator {
        stage: Stage,
        #[source]
        source: anyhow::Error,
    },
}

impl RecallError {
    pub fn collaborator(stage: Stage, source: anyhow::Error) -> Self {
        RecallError::Collaborator { stage, source }
    }

    /// True for outcomes caused by the query rather than by infrastructure.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, RecallError::Collaborator { .. })
    }

    /// Machine-readable kind.
    pub fn code(&self) -> &'static str {
        match self {
            RecallError::NoCandidate { .. } => "no_candidate",
            RecallError::LowConfidence { .. } => "low_confidence",
            RecallError::RecordNotFound { .. } => "record_not_found",
            RecallError::Collaborator { .. } => "collaborator_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collaborator_message_keeps_source_detail() {
        let err = RecallError::collaborator(
            Stage::Retrieving,
            anyhow::anyhow!("connection refused").context("POST /match_context"),
        );
        let msg = err.to_string();
        assert!(msg.starts_with("context retrieval failed"));
        assert!(msg.contains("connection refused"), "{}", msg);
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_stage_labels() {
        let labels: Vec<String> = [
            Stage::Normalizing,
            Stage::Retrieving,
            Stage::LookingUp,
            Stage::Enriching,
        ]
        .iter()
        .map(ToString::to_string)
        .collect();
        assert_eq!(
            labels,
            [
                "query normalization",
                "context retrieval",
                "metadata lookup",
                "summary enrichment"
            ]
        );
    }

    #[test]
    fn test_expected_outcomes_are_client_errors() {
        assert!(RecallError::NoCandidate { seen: 5 }.is_client_error());
        assert!(RecallError::RecordNotFound {
            item_key: "a.gif".into()
        }
        .is_client_error());
        let low = RecallError::LowConfidence {
            item_key: "a.gif".into(),
            confidence: 0.9,
            threshold: 0.95,
        };
        assert!(low.is_client_error());
        assert_eq!(low.code(), "low_confidence");
        assert_eq!(
            low.to_string(),
            "best score 0.900 for a.gif is below threshold 0.950"
        );
    }
}

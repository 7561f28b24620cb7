use thiserror::Error;

/// Query-level failure. Whichever task failed, the whole query fails.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("search task failed: {0}")]
    SearchFailed(String),

    #[error("description task failed: {0}")]
    DescriptionFailed(String),

    #[error("{task} task panicked")]
    TaskPanicked { task: &'static str },
}

/// Aggregated answer to one utterance.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryResult {
    pub narration: String,
    pub searched_objects: Vec<String>,
    pub warnings: Vec<String>,
    pub error: Option<QueryError>,
}

impl QueryResult {
    pub fn failed(error: QueryError) -> Self {
        Self {
            error: Some(error),
            ..Self::default()
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_result_carries_no_partial_output() {
        let result = QueryResult::failed(QueryError::SearchFailed("timeout".into()));
        assert!(result.is_error());
        assert!(result.narration.is_empty());
        assert!(result.searched_objects.is_empty());
        assert!(!result.has_warnings());
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            QueryError::DescriptionFailed("503".into()).to_string(),
            "description task failed: 503"
        );
        assert_eq!(
            QueryError::TaskPanicked { task: "search" }.to_string(),
            "search task panicked"
        );
    }
}

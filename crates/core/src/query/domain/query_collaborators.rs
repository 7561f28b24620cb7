use crate::shared::frame::Frame;
use crate::shared::BoxError;

use super::utterance::Utterance;

/// Outcome of asking whether an utterance wants objects located.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchClassification {
    /// False when the classifier's output could not be read as a list.
    pub is_list: bool,
    /// Simple common-noun object names, in the order given.
    pub object_names: Vec<String>,
    /// Unprocessed classifier output, kept for warnings.
    pub raw_text: String,
}

impl SearchClassification {
    pub fn malformed(raw_text: &str) -> Self {
        Self {
            is_list: false,
            object_names: Vec::new(),
            raw_text: raw_text.to_string(),
        }
    }
}

/// Domain interface for the object-search classifier.
///
/// Implementations usually wrap a remote language model; malformed model
/// output is reported through `is_list`, not as an error.
pub trait SearchClassifier: Send + Sync {
    fn classify_search(&self, utterance: &Utterance) -> Result<SearchClassification, BoxError>;
}

/// Domain interface for the free-form scene narrator.
pub trait SceneDescriber: Send + Sync {
    fn describe(
        &self,
        frame: &Frame,
        utterance: &Utterance,
        language: &str,
    ) -> Result<String, BoxError>;
}

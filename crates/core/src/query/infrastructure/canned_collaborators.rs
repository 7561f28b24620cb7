use crate::query::domain::query_collaborators::{
    SceneDescriber, SearchClassification, SearchClassifier,
};
use crate::query::domain::utterance::Utterance;
use crate::shared::frame::Frame;
use crate::shared::BoxError;

use super::search_response_parser::parse_search_response;

/// Classifier that answers every utterance with the same raw model text,
/// run through the normal response parser.
///
/// Lets recorded model output be replayed offline.
pub struct CannedSearchClassifier {
    raw_text: String,
}

impl CannedSearchClassifier {
    pub fn new(raw_text: &str) -> Self {
        Self {
            raw_text: raw_text.to_string(),
        }
    }
}

impl SearchClassifier for CannedSearchClassifier {
    fn classify_search(&self, _utterance: &Utterance) -> Result<SearchClassification, BoxError> {
        Ok(parse_search_response(&self.raw_text))
    }
}

/// Describer that returns fixed narration text.
pub struct CannedSceneDescriber {
    narration: String,
}

impl CannedSceneDescriber {
    pub fn new(narration: &str) -> Self {
        Self {
            narration: narration.to_string(),
        }
    }
}

impl SceneDescriber for CannedSceneDescriber {
    fn describe(
        &self,
        _frame: &Frame,
        _utterance: &Utterance,
        _language: &str,
    ) -> Result<String, BoxError> {
        Ok(self.narration.clone())
    }
}

use std::sync::{Arc, PoisonError};
use std::thread;

use crate::detection::domain::object_detector::SharedDetector;
use crate::detection::domain::segmentation::SegmentationRequest;
use crate::query::domain::query_collaborators::{
    SceneDescriber, SearchClassification, SearchClassifier,
};
use crate::query::domain::query_result::{QueryError, QueryResult};
use crate::query::domain::utterance::Utterance;
use crate::shared::frame::Frame;

use super::shared_pipeline_state::SharedPipelineState;

/// Answers one utterance by running the object search and the scene
/// description side by side, then feeding any found objects to
/// segmentation.
///
/// Failure is per query: if either task errors or panics the whole result
/// is that error. A search answer that is not a list only adds a warning.
pub struct QueryOrchestrator {
    classifier: Arc<dyn SearchClassifier>,
    describer: Arc<dyn SceneDescriber>,
    state: Arc<SharedPipelineState>,
    detector: SharedDetector,
    dynamic_segmentation: bool,
    language: String,
}

impl QueryOrchestrator {
    pub fn new(
        classifier: Arc<dyn SearchClassifier>,
        describer: Arc<dyn SceneDescriber>,
        state: Arc<SharedPipelineState>,
        detector: SharedDetector,
        dynamic_segmentation: bool,
        language: &str,
    ) -> Self {
        Self {
            classifier,
            describer,
            state,
            detector,
            dynamic_segmentation,
            language: language.to_string(),
        }
    }

    /// `frame` is the frame visible when the utterance was recorded.
    pub fn answer(&self, frame: &Frame, utterance: &Utterance) -> QueryResult {
        let (search, narration) = match self.run_tasks(frame, utterance) {
            Ok(outputs) => outputs,
            Err(e) => {
                log::warn!("Query failed: {e}");
                return QueryResult::failed(e);
            }
        };

        let mut warnings = Vec::new();
        let object_names = if search.is_list {
            search.object_names
        } else {
            let warning = format!("search response is not a list: {}", search.raw_text);
            log::warn!("{warning}");
            warnings.push(warning);
            Vec::new()
        };

        let request = SegmentationRequest::new(&object_names);
        if let Some(warning) = self.start_segmentation(frame, utterance, request) {
            log::warn!("{warning}");
            warnings.push(warning);
        }

        QueryResult {
            narration,
            searched_objects: object_names,
            warnings,
            error: None,
        }
    }

    /// Runs both collaborator calls on a two-thread scoped group and waits
    /// for both, whatever the outcome of the first.
    fn run_tasks(
        &self,
        frame: &Frame,
        utterance: &Utterance,
    ) -> Result<(SearchClassification, String), QueryError> {
        let (search, description) = thread::scope(|scope| {
            let search = scope.spawn(|| {
                self.classifier
                    .classify_search(utterance)
                    .map_err(|e| e.to_string())
            });
            let description = scope.spawn(|| {
                self.describer
                    .describe(frame, utterance, &self.language)
                    .map_err(|e| e.to_string())
            });
            (search.join(), description.join())
        });

        let search = match search {
            Ok(Ok(classification)) => classification,
            Ok(Err(e)) => return Err(QueryError::SearchFailed(e)),
            Err(_) => return Err(QueryError::TaskPanicked { task: "search" }),
        };
        let narration = match description {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => return Err(QueryError::DescriptionFailed(e)),
            Err(_) => return Err(QueryError::TaskPanicked { task: "description" }),
        };
        Ok((search, narration))
    }

    /// Stores the search stamped with the utterance time. In dynamic mode
    /// the worker segments it on its next cycle; otherwise segmentation
    /// runs here against `frame`. A query with no objects clears the live
    /// search unless a newer one already replaced it. Returns a warning if
    /// a non-empty search was not stored.
    fn start_segmentation(
        &self,
        frame: &Frame,
        utterance: &Utterance,
        request: SegmentationRequest,
    ) -> Option<String> {
        let at = utterance.recorded_at();
        if request.is_empty() {
            self.state.set_segmentation(request, None, at);
            return None;
        }
        let result = if self.dynamic_segmentation {
            None
        } else {
            let segmented = self
                .detector
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .segment(frame, &request);
            match segmented {
                Ok(result) => Some(result),
                Err(e) => return Some(format!("segmentation failed: {e}")),
            }
        };

        match self.state.set_segmentation(request, result, at) {
            Some(_) => None,
            None if !self.state.is_accepting() => Some("pipeline released".to_string()),
            None => Some("search superseded by a newer query".to_string()),
        }
    }
}

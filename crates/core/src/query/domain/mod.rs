pub mod query_collaborators;
pub mod query_result;
pub mod utterance;

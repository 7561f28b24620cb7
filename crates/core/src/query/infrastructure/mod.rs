pub mod canned_collaborators;
pub mod keyword_search_classifier;
pub mod search_response_parser;

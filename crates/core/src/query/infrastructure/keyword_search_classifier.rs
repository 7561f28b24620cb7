use crate::query::domain::query_collaborators::{SearchClassification, SearchClassifier};
use crate::query::domain::utterance::Utterance;
use crate::shared::BoxError;

/// Phrases that mark a transcript as a request to locate something.
pub const SEARCH_CUES: &[&str] = &["find", "where", "locate", "look for", "search", "show me"];

/// Offline classifier that matches a transcript against a fixed object
/// vocabulary, typically the detector's class names.
///
/// A transcript containing one of [`SEARCH_CUES`] yields every vocabulary
/// entry it mentions, in order of first mention. Needs a transcript; raw
/// audio alone is an error.
pub struct KeywordSearchClassifier {
    vocabulary: Vec<Vec<String>>,
}

impl KeywordSearchClassifier {
    pub fn new<I, S>(vocabulary: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let vocabulary = vocabulary
            .into_iter()
            .map(|entry| tokenize(entry.as_ref()))
            .filter(|tokens| !tokens.is_empty())
            .collect();
        Self { vocabulary }
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn find_phrase(tokens: &[String], phrase: &[String]) -> Option<usize> {
    tokens
        .windows(phrase.len())
        .position(|window| window == phrase)
}

impl SearchClassifier for KeywordSearchClassifier {
    fn classify_search(&self, utterance: &Utterance) -> Result<SearchClassification, BoxError> {
        let transcript = utterance
            .transcript()
            .ok_or("utterance has no transcript to classify")?;
        let tokens = tokenize(transcript);

        let is_search = SEARCH_CUES
            .iter()
            .any(|cue| find_phrase(&tokens, &tokenize(cue)).is_some());

        let mut found: Vec<(usize, String)> = Vec::new();
        if is_search {
            for phrase in &self.vocabulary {
                if let Some(pos) = find_phrase(&tokens, phrase) {
                    found.push((pos, phrase.join(" ")));
                }
            }
            found.sort_by_key(|(pos, _)| *pos);
        }

        let object_names: Vec<String> = found.into_iter().map(|(_, name)| name).collect();
        Ok(SearchClassification {
            is_list: true,
            raw_text: serde_json::to_string(&object_names)?,
            object_names,
        })
    }
}

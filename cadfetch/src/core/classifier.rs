//! Deterministic classification of fetch command error text.

use crate::core::types::ErrorClass;

/// Phrases the provider tool emits when an object does not exist.
pub const NOT_FOUND_PHRASES: &[&str] = &[
    "no object",
    "не найден",
    "not found",
    "object does not exist",
    "отсутствуют данные",
];

/// Classify error text with the built-in phrase list.
///
/// - Empty text is `Retryable` (ambiguous failure).
/// - A case-insensitive substring hit on any not-found phrase is `NotFound`.
/// - Everything else is `Retryable`.
pub fn classify(error_text: &str) -> ErrorClass {
    classify_with(error_text, NOT_FOUND_PHRASES.iter().copied())
}

fn classify_with<'a>(error_text: &str, phrases: impl IntoIterator<Item = &'a str>) -> ErrorClass {
    if error_text.is_empty() {
        return ErrorClass::Retryable;
    }
    let haystack = error_text.to_lowercase();
    if phrases
        .into_iter()
        .any(|phrase| haystack.contains(phrase))
    {
        ErrorClass::NotFound
    } else {
        ErrorClass::Retryable
    }
}

/// Classifier carrying the built-in phrases plus configured extras.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorClassifier {
    /// Lowercased extra phrases; blanks are dropped.
    extra: Vec<String>,
}

impl ErrorClassifier {
    pub fn with_extra_phrases(extra: &[String]) -> Self {
        let extra = extra
            .iter()
            .map(|phrase| phrase.trim().to_lowercase())
            .filter(|phrase| !phrase.is_empty())
            .collect();
        Self { extra }
    }

    pub fn classify(&self, error_text: &str) -> ErrorClass {
        classify_with(
            error_text,
            NOT_FOUND_PHRASES
                .iter()
                .copied()
                .chain(self.extra.iter().map(String::as_str)),
        )
    }
}

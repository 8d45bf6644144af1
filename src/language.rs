//! Language identification for incoming questions.
//!
//! The corpus is German; everything else must be translated before retrieval.
//! Detection is backed by `whatlang`, which returns a single top candidate
//! with a confidence score — ties between candidate languages are resolved by
//! whatlang's own trigram ranking and are not re-derived here.

use thiserror::Error;
use whatlang::Lang;

/// Errors raised while classifying the language of a question.
#[derive(Debug, Error)]
pub enum DetectionError {
    /// Input was empty or whitespace-only.
    #[error("cannot detect the language of empty input")]
    EmptyInput,
    /// Input carried no detectable linguistic signal (e.g. pure numbers).
    #[error("input contains no detectable linguistic signal")]
    NoSignal,
}

/// Top language candidate for a piece of text.
#[derive(Debug, Clone, PartialEq)]
pub struct LanguageDetection {
    /// ISO 639-1 code where known, ISO 639-3 otherwise.
    pub language_code: String,
    /// Confidence of the detection in `[0, 1]`.
    pub confidence: f64,
}

/// Interface implemented by language identification backends.
pub trait LanguageDetector: Send + Sync {
    /// Classify the language of `text`, returning the top candidate.
    fn detect(&self, text: &str) -> Result<LanguageDetection, DetectionError>;
}

/// Detector backed by the `whatlang` trigram model.
#[derive(Debug, Default, Clone, Copy)]
pub struct WhatlangDetector;

impl WhatlangDetector {
    /// Construct a new detector instance.
    pub const fn new() -> Self {
        Self
    }
}

impl LanguageDetector for WhatlangDetector {
    fn detect(&self, text: &str) -> Result<LanguageDetection, DetectionError> {
        if text.trim().is_empty() {
            return Err(DetectionError::EmptyInput);
        }
        let info = whatlang::detect(text).ok_or(DetectionError::NoSignal)?;
        let detection = LanguageDetection {
            language_code: iso_639_1(info.lang()).to_string(),
            confidence: info.confidence(),
        };
        tracing::trace!(
            language = %detection.language_code,
            confidence = detection.confidence,
            "Detected question language"
        );
        Ok(detection)
    }
}

/// Map whatlang's ISO 639-3 codes to the 639-1 codes the router compares
/// against. Unmapped languages keep their 639-3 code; they are still `!= "de"`
/// and therefore routed through translation.
fn iso_639_1(lang: Lang) -> &'static str {
    match lang {
        Lang::Deu => "de",
        Lang::Eng => "en",
        Lang::Fra => "fr",
        Lang::Spa => "es",
        Lang::Ita => "it",
        Lang::Nld => "nl",
        Lang::Pol => "pl",
        Lang::Por => "pt",
        Lang::Rus => "ru",
        Lang::Ukr => "uk",
        Lang::Tur => "tr",
        Lang::Ara => "ar",
        other => other.code(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_german_question() {
        let detection = WhatlangDetector::new()
            .detect("Wie beantrage ich Arbeitslosengeld bei der Agentur für Arbeit?")
            .expect("detection");
        assert_eq!(detection.language_code, "de");
        assert!(detection.confidence > 0.0 && detection.confidence <= 1.0);
    }

    #[test]
    fn detects_english_question() {
        let detection = WhatlangDetector::new()
            .detect("How do I apply for unemployment benefits in Germany?")
            .expect("detection");
        assert_eq!(detection.language_code, "en");
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(matches!(
            WhatlangDetector::new().detect("   "),
            Err(DetectionError::EmptyInput)
        ));
    }
}

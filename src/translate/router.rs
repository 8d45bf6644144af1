//! Decides whether a question is translated to German before retrieval.

use crate::language::{DetectionError, LanguageDetector};
use crate::translate::{TranslationError, Translator};
use std::sync::Arc;
use thiserror::Error;

/// Target corpus language.
const CORPUS_LANGUAGE: &str = "de";

/// Errors raised while routing a question.
#[derive(Debug, Error)]
pub enum RouteError {
    /// The question's language could not be classified.
    #[error("Language detection failed: {0}")]
    Detection(#[from] DetectionError),
    /// The question needed translation and the backend failed.
    #[error("Translation failed: {0}")]
    Translation(#[from] TranslationError),
}

/// Outcome of the routing policy, before any translation happens.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutingDecision {
    /// Whether the question must be translated to German.
    pub translate: bool,
    /// The question the decision was made for, unchanged.
    pub question: String,
}

/// Routes questions through translation when they are not confidently German.
///
/// The policy translates when the detected language is not German, or when it
/// is German but below the confidence threshold — ambiguous detections are
/// retranslated rather than trusted. That asymmetry is deliberate: detection
/// noise on short questions is assumed possible, and a spurious `auto → de`
/// translation of German text is harmless while a missed translation poisons
/// retrieval.
pub struct TranslationRouter {
    detector: Box<dyn LanguageDetector>,
    translator: Arc<dyn Translator>,
}

impl TranslationRouter {
    /// Build a router over the given detector and translator.
    pub fn new(detector: Box<dyn LanguageDetector>, translator: Arc<dyn Translator>) -> Self {
        Self {
            detector,
            translator,
        }
    }

    /// Apply the routing policy without performing any translation.
    pub fn decide(&self, question: &str, threshold: f64) -> Result<RoutingDecision, RouteError> {
        let detection = self.detector.detect(question)?;
        let ambiguous_german = detection.language_code == CORPUS_LANGUAGE
            && detection.confidence < threshold;
        let translate = detection.language_code != CORPUS_LANGUAGE || ambiguous_german;
        tracing::debug!(
            language = %detection.language_code,
            confidence = detection.confidence,
            threshold,
            translate,
            "Routed question"
        );
        Ok(RoutingDecision {
            translate,
            question: question.to_string(),
        })
    }

    /// Route a question, translating it to German when the policy requires.
    ///
    /// Translation failures propagate; the turn fails rather than silently
    /// retrieving against a question in the wrong language.
    pub async fn route(&self, question: &str, threshold: f64) -> Result<String, RouteError> {
        let decision = self.decide(question, threshold)?;
        if decision.translate {
            let translated = self
                .translator
                .translate(question, "auto", CORPUS_LANGUAGE)
                .await?;
            Ok(translated)
        } else {
            Ok(decision.question)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::LanguageDetection;
    use async_trait::async_trait;

    struct FixedDetector {
        language_code: &'static str,
        confidence: f64,
    }

    impl LanguageDetector for FixedDetector {
        fn detect(&self, _text: &str) -> Result<LanguageDetection, DetectionError> {
            Ok(LanguageDetection {
                language_code: self.language_code.to_string(),
                confidence: self.confidence,
            })
        }
    }

    struct EchoTranslator;

    #[async_trait]
    impl Translator for EchoTranslator {
        async fn translate(
            &self,
            text: &str,
            _source: &str,
            _target: &str,
        ) -> Result<String, TranslationError> {
            Ok(format!("übersetzt: {text}"))
        }
    }

    struct FailingTranslator;

    #[async_trait]
    impl Translator for FailingTranslator {
        async fn translate(
            &self,
            _text: &str,
            _source: &str,
            _target: &str,
        ) -> Result<String, TranslationError> {
            Err(TranslationError::BackendUnavailable("down".into()))
        }
    }

    fn router(language_code: &'static str, confidence: f64) -> TranslationRouter {
        TranslationRouter::new(
            Box::new(FixedDetector {
                language_code,
                confidence,
            }),
            Arc::new(EchoTranslator),
        )
    }

    #[test]
    fn confident_german_is_not_translated() {
        let decision = router("de", 0.9)
            .decide("Wie beantrage ich Bürgergeld?", 0.7)
            .expect("decision");
        assert!(!decision.translate);
        assert_eq!(decision.question, "Wie beantrage ich Bürgergeld?");
    }

    #[test]
    fn ambiguous_german_is_translated_defensively() {
        let decision = router("de", 0.5)
            .decide("Wie beantrage ich Bürgergeld?", 0.7)
            .expect("decision");
        assert!(decision.translate);
    }

    #[test]
    fn non_german_is_translated() {
        let decision = router("en", 0.95)
            .decide("How do I apply?", 0.7)
            .expect("decision");
        assert!(decision.translate);
    }

    #[tokio::test]
    async fn route_returns_unchanged_question_for_confident_german() {
        let routed = router("de", 0.9)
            .route("Wer bekommt Arbeitslosengeld?", 0.7)
            .await
            .expect("routed");
        assert_eq!(routed, "Wer bekommt Arbeitslosengeld?");
    }

    #[tokio::test]
    async fn route_translates_when_policy_requires() {
        let routed = router("en", 0.95)
            .route("How do I apply?", 0.7)
            .await
            .expect("routed");
        assert_eq!(routed, "übersetzt: How do I apply?");
    }

    #[tokio::test]
    async fn translation_failure_fails_the_turn() {
        let router = TranslationRouter::new(
            Box::new(FixedDetector {
                language_code: "en",
                confidence: 0.95,
            }),
            Arc::new(FailingTranslator),
        );
        let error = router
            .route("How do I apply?", 0.7)
            .await
            .expect_err("translator failure propagates");
        assert!(matches!(error, RouteError::Translation(_)));
    }
}

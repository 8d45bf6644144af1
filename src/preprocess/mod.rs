//! Page-cleaning transforms applied before a page is embedded and indexed.
//!
//! The source PDFs carry per-page headers, hyphenated line breaks, and stray
//! page-number fragments that hurt both embedding quality and answer
//! readability. Each transform maps a [`Document`] to a cleaned one; a
//! [`TransformPipeline`] folds them left to right.

use crate::retrieval::Document;
use regex::Regex;
use serde::Deserialize;
use serde_json::json;
use std::sync::LazyLock;

/// One page-level cleanup step.
pub trait PageTransform: Send + Sync {
    /// Apply the transform, returning the cleaned document.
    fn apply(&self, document: Document) -> Document;
}

/// Ordered chain of page transforms.
pub struct TransformPipeline {
    transforms: Vec<Box<dyn PageTransform>>,
}

impl TransformPipeline {
    /// Build a pipeline from an explicit transform list.
    pub fn new(transforms: Vec<Box<dyn PageTransform>>) -> Self {
        Self { transforms }
    }

    /// The standard ingestion chain: header strip, dehyphenation, leading
    /// page-number removal, then section annotation from `toc`.
    pub fn standard(toc: Vec<TocEntry>) -> Self {
        Self::new(vec![
            Box::new(StripHeaderLine),
            Box::new(JoinHyphenatedWords),
            Box::new(StripLeadingNumbers),
            Box::new(AnnotateSections::new(toc)),
        ])
    }

    /// Run every transform in order.
    pub fn apply(&self, document: Document) -> Document {
        self.transforms
            .iter()
            .fold(document, |doc, transform| transform.apply(doc))
    }
}

/// Drops the first line of the page, once.
///
/// The top line of every page in the source documents is a running header.
/// A `rm_header` metadata marker makes the transform idempotent, so a page
/// routed through the chain twice loses exactly one line.
pub struct StripHeaderLine;

impl PageTransform for StripHeaderLine {
    fn apply(&self, mut document: Document) -> Document {
        if document.metadata.contains_key("rm_header") {
            return document;
        }
        if let Some((_, rest)) = document.content.split_once('\n') {
            document.content = rest.to_string();
        }
        document.metadata.insert("rm_header".into(), json!(true));
        document
    }
}

/// Rejoins words hyphenated across a line break.
///
/// Only the exact ` -\n` pattern produced by the PDF extraction is handled;
/// in-word soft hyphens stay as they are.
pub struct JoinHyphenatedWords;

impl PageTransform for JoinHyphenatedWords {
    fn apply(&self, mut document: Document) -> Document {
        document.content = document.content.replace(" -\n", "");
        document
    }
}

// Three or more digits (optionally a dotted fraction) plus the trailing
// whitespace char are never a section number and get removed wholesale.
static LONG_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{3,}\.?\d*\s").expect("long-number pattern"));

/// Strips page-number fragments glued to the start of the page text.
///
/// Genuine section numbers like `1.2 Antragstellung` are kept: a one- or
/// two-digit prefix survives when followed by a dot.
pub struct StripLeadingNumbers;

impl PageTransform for StripLeadingNumbers {
    fn apply(&self, mut document: Document) -> Document {
        document.content = strip_leading_number(&document.content);
        document
    }
}

fn strip_leading_number(text: &str) -> String {
    if let Some(stripped) = LONG_NUMBER.find(text) {
        return text[stripped.end()..].to_string();
    }

    let digits = text.chars().take_while(char::is_ascii_digit).count();
    if !(1..=2).contains(&digits) {
        return text.to_string();
    }
    match text[digits..].chars().next() {
        // Dotted prefixes are section numbers; bare trailing digits stay too.
        Some('.') | None => text.to_string(),
        Some(next) if next.is_whitespace() => text[digits..].to_string(),
        Some(next) if next.is_ascii_digit() => text.to_string(),
        // Digits fused onto a word are extraction noise.
        Some(_) => text[digits..].to_string(),
    }
}

/// One table-of-contents entry: outline level, title, first page.
#[derive(Debug, Clone, Deserialize)]
pub struct TocEntry {
    /// Outline nesting level, 1-based.
    pub level: i64,
    /// Entry title as printed in the outline.
    pub title: String,
    /// First page the entry covers, 1-based.
    pub page: i64,
}

/// Annotates each page with the section it falls into.
///
/// The containing section is the last TOC entry starting at or before the
/// page. Titles beginning with a numbered fragment are split into
/// `section_number` and `section_title`; unnumbered titles become the title
/// alone.
pub struct AnnotateSections {
    toc: Vec<TocEntry>,
}

impl AnnotateSections {
    /// Build the annotator over a TOC sorted by ascending start page.
    pub fn new(toc: Vec<TocEntry>) -> Self {
        Self { toc }
    }

    fn section_for_page(&self, page: i64) -> Option<&TocEntry> {
        let index = self.toc.partition_point(|entry| entry.page <= page);
        index.checked_sub(1).and_then(|index| self.toc.get(index))
    }
}

impl PageTransform for AnnotateSections {
    fn apply(&self, mut document: Document) -> Document {
        let Some(page) = document.metadata.get("page").and_then(|v| v.as_i64()) else {
            return document;
        };
        let Some(entry) = self.section_for_page(page) else {
            return document;
        };

        match entry.title.split_once(' ') {
            Some((number, title)) if number.chars().any(|c| c.is_ascii_digit()) => {
                document
                    .metadata
                    .insert("section_number".into(), json!(number));
                document.metadata.insert("section_title".into(), json!(title));
            }
            _ => {
                document
                    .metadata
                    .insert("section_title".into(), json!(entry.title));
            }
        }
        document
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Map, Value};

    fn page(content: &str) -> Document {
        Document::from_content(content)
    }

    fn page_numbered(content: &str, number: i64) -> Document {
        let mut metadata = Map::new();
        metadata.insert("page".into(), json!(number));
        Document {
            content: content.into(),
            metadata,
        }
    }

    fn toc() -> Vec<TocEntry> {
        vec![
            TocEntry {
                level: 1,
                title: "Vorwort".into(),
                page: 1,
            },
            TocEntry {
                level: 1,
                title: "1 Anspruchsvoraussetzungen".into(),
                page: 4,
            },
            TocEntry {
                level: 2,
                title: "1.2 Antragstellung".into(),
                page: 9,
            },
        ]
    }

    #[test]
    fn header_strip_drops_first_line_once() {
        let transform = StripHeaderLine;
        let cleaned = transform.apply(page("Merkblatt 1\nEigentlicher Inhalt.\nZweite Zeile."));
        assert_eq!(cleaned.content, "Eigentlicher Inhalt.\nZweite Zeile.");
        assert_eq!(cleaned.metadata.get("rm_header"), Some(&Value::Bool(true)));

        let again = transform.apply(cleaned);
        assert_eq!(again.content, "Eigentlicher Inhalt.\nZweite Zeile.");
    }

    #[test]
    fn hyphenated_words_are_rejoined() {
        let cleaned = JoinHyphenatedWords.apply(page("Arbeits -\nlosengeld wird gezahlt."));
        assert_eq!(cleaned.content, "Arbeitslosengeld wird gezahlt.");
    }

    #[test]
    fn long_page_numbers_are_stripped() {
        assert_eq!(
            strip_leading_number("123 Der eigentliche Text."),
            "Der eigentliche Text."
        );
        assert_eq!(strip_leading_number("123.4 Text."), "Text.");
    }

    #[test]
    fn short_numbers_keep_their_whitespace() {
        assert_eq!(strip_leading_number("7 Text."), " Text.");
        assert_eq!(strip_leading_number("42\nText."), "\nText.");
    }

    #[test]
    fn section_numbers_survive() {
        assert_eq!(strip_leading_number("1.2 Antragstellung"), "1.2 Antragstellung");
        assert_eq!(strip_leading_number("Kein Zahlenpräfix."), "Kein Zahlenpräfix.");
    }

    #[test]
    fn digits_fused_to_a_word_are_noise() {
        assert_eq!(strip_leading_number("12Arbeitslosengeld"), "Arbeitslosengeld");
    }

    #[test]
    fn sections_are_annotated_from_the_toc() {
        let annotate = AnnotateSections::new(toc());

        let unnumbered = annotate.apply(page_numbered("Text", 2));
        assert_eq!(unnumbered.metadata["section_title"], json!("Vorwort"));
        assert!(!unnumbered.metadata.contains_key("section_number"));

        let numbered = annotate.apply(page_numbered("Text", 10));
        assert_eq!(numbered.metadata["section_number"], json!("1.2"));
        assert_eq!(numbered.metadata["section_title"], json!("Antragstellung"));
    }

    #[test]
    fn page_before_first_entry_stays_unannotated() {
        let annotate = AnnotateSections::new(toc());
        let document = annotate.apply(page_numbered("Text", 0));
        assert!(!document.metadata.contains_key("section_title"));
    }

    #[test]
    fn standard_chain_runs_in_order() {
        let pipeline = TransformPipeline::standard(toc());
        let document = pipeline.apply(page_numbered(
            "Merkblatt für Arbeitslose\n12 Anspruch auf Arbeits -\nlosengeld besteht.",
            5,
        ));
        assert_eq!(document.content, " Anspruch auf Arbeitslosengeld besteht.");
        assert_eq!(
            document.metadata["section_title"],
            json!("Anspruchsvoraussetzungen")
        );
    }
}

//! Prompt construction for each oracle task.
//!
//! Templates are compiled in from `prompts/`. Placeholders are substituted
//! with the caller's text last, so a fragment that happens to contain
//! `{language}` or `{target}` is embedded verbatim.

use crate::verses::{ArrayElement, VerseStructureAnalysis};

const ANNOTATE_ARRAY: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/prompts/annotate_array.md"
));
const STRIP_COMMENTS: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/prompts/strip_comments.md"
));
const RENUMBER_VERSES: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/prompts/renumber_verses.md"
));
const ANALYZE_VERSES: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/prompts/analyze_verses.md"
));
const ADJUST_VERSES: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/prompts/adjust_verses.md"
));
const LATIN_WORD: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/prompts/latin_word.md"
));
const LATIN_GRAMMAR: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/prompts/latin_grammar.md"
));
const LATIN_TRANSLATE: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/prompts/latin_translate.md"
));

/// A single oracle task with its subject.
#[derive(Debug, Clone, Copy)]
pub enum Prompt<'a> {
    AnnotateArray {
        code: &'a str,
        language: &'a str,
    },
    StripComments {
        code: &'a str,
        language: &'a str,
    },
    RenumberVerses {
        code: &'a str,
        language: &'a str,
    },
    AnalyzeVerseStructure {
        elements: &'a [ArrayElement],
    },
    AdjustVerseCount {
        analysis: &'a VerseStructureAnalysis,
        target: usize,
    },
    /// Morphology of one word as JSON.
    AnalyzeWord {
        word: &'a str,
    },
    /// Free-text grammatical analysis.
    AnalyzeGrammar {
        text: &'a str,
        language: &'a str,
    },
    Translate {
        text: &'a str,
        source: &'a str,
        target: &'a str,
    },
}

impl Prompt<'_> {
    /// Short task name used in log fields.
    pub fn task(&self) -> &'static str {
        match self {
            Self::AnnotateArray { .. } => "annotate_array",
            Self::StripComments { .. } => "strip_comments",
            Self::RenumberVerses { .. } => "renumber_verses",
            Self::AnalyzeVerseStructure { .. } => "analyze_verse_structure",
            Self::AdjustVerseCount { .. } => "adjust_verse_count",
            Self::AnalyzeWord { .. } => "analyze_word",
            Self::AnalyzeGrammar { .. } => "analyze_grammar",
            Self::Translate { .. } => "translate",
        }
    }

    pub fn render(&self) -> String {
        match *self {
            Self::AnnotateArray { code, language } => code_prompt(ANNOTATE_ARRAY, code, language),
            Self::StripComments { code, language } => code_prompt(STRIP_COMMENTS, code, language),
            Self::RenumberVerses { code, language } => {
                code_prompt(RENUMBER_VERSES, code, language)
            }
            Self::AnalyzeVerseStructure { elements } => {
                ANALYZE_VERSES.replace("{verses}", &numbered_list(elements))
            }
            Self::AdjustVerseCount { analysis, target } => {
                let structure =
                    serde_json::to_string_pretty(&analysis.verse_boundaries).unwrap_or_default();
                ADJUST_VERSES
                    .replace("{current}", &analysis.verse_boundaries.len().to_string())
                    .replace("{target}", &target.to_string())
                    .replace("{structure}", &structure)
            }
            Self::AnalyzeWord { word } => LATIN_WORD.replace("{word}", word),
            Self::AnalyzeGrammar { text, language } => LATIN_GRAMMAR
                .replace("{language}", language)
                .replace("{text}", text),
            Self::Translate {
                text,
                source,
                target,
            } => LATIN_TRANSLATE
                .replace("{source}", source)
                .replace("{target}", target)
                .replace("{text}", text),
        }
    }
}

fn code_prompt(template: &str, code: &str, language: &str) -> String {
    template
        .replace("{language}", language)
        .replace("{code}", code)
}

fn numbered_list(elements: &[ArrayElement]) -> String {
    elements
        .iter()
        .enumerate()
        .map(|(index, element)| format!("{}. {}", index + 1, element.content))
        .collect::<Vec<_>>()
        .join("\n")
}

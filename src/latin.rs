//! Latin word morphology, grammatical analysis and translation.
//!
//! Word analysis is deterministic where the built-in lexicon or the ending
//! patterns cover the word and consults the oracle otherwise. Grammar and
//! translation are free-text oracle tasks; their replies only lose sentinel
//! tokens.
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

use crate::extract::strip_sentinels;
use crate::oracle::{Oracle, OracleError};
use crate::prompt::Prompt;

mod morphology;

pub use morphology::{
    analyze_word, derive, lookup, pattern_guess, unknown, AnalysisSource, Confidence,
    FormAnalysis, IdentifiedForm, Translations, WordAnalysis,
};

static WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\p{Alphabetic}+").expect("word pattern compiles"));

/// Grammatical analysis of a passage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextAnalysis {
    pub text: String,
    pub language: String,
    /// Words of two or more letters, in order of appearance.
    pub words: Vec<String>,
    pub analysis: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Translation {
    pub text: String,
    pub source_language: String,
    pub target_language: String,
    pub translation: String,
}

/// Words of two or more letters. Punctuation, digits and single letters drop.
pub fn extract_words(text: &str) -> Vec<&str> {
    WORD.find_iter(text)
        .map(|found| found.as_str())
        .filter(|word| word.chars().nth(1).is_some())
        .collect()
}

pub fn analyze_text<O: Oracle + ?Sized>(
    oracle: &O,
    model: &str,
    text: &str,
    language: &str,
) -> Result<TextAnalysis, OracleError> {
    let prompt = Prompt::AnalyzeGrammar { text, language }.render();
    let reply = oracle.generate(model, &prompt)?;
    Ok(TextAnalysis {
        text: text.to_string(),
        language: language.to_string(),
        words: extract_words(text).into_iter().map(str::to_string).collect(),
        analysis: strip_sentinels(&reply),
    })
}

pub fn translate<O: Oracle + ?Sized>(
    oracle: &O,
    model: &str,
    text: &str,
    source: &str,
    target: &str,
) -> Result<Translation, OracleError> {
    let prompt = Prompt::Translate {
        text,
        source,
        target,
    }
    .render();
    let reply = oracle.generate(model, &prompt)?;
    let translation = strip_sentinels(&reply);
    tracing::debug!(source, target, translation_bytes = translation.len(), "translated");
    Ok(Translation {
        text: text.to_string(),
        source_language: source.to_string(),
        target_language: target.to_string(),
        translation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::CannedOracle;

    #[test]
    fn words_skip_punctuation_and_single_letters() {
        assert_eq!(
            extract_words("Gallia est omnis divisa in partes tres, 3 a b."),
            vec!["Gallia", "est", "omnis", "divisa", "in", "partes", "tres"]
        );
        assert_eq!(extract_words("rigāre, mōneō!"), vec!["rigāre", "mōneō"]);
        assert!(extract_words("  ... 42 ").is_empty());
    }

    #[test]
    fn analysis_keeps_the_reply_without_sentinels() {
        let oracle = CannedOracle::reply("Subject: Gallia (nominative).\n<|im_end|>");
        let analysis = analyze_text(&oracle, "m", "Gallia est omnis divisa", "latin").unwrap();
        assert_eq!(analysis.analysis, "Subject: Gallia (nominative).");
        assert_eq!(analysis.words, vec!["Gallia", "est", "omnis", "divisa"]);
        assert_eq!(analysis.language, "latin");
    }

    #[test]
    fn translation_reports_both_languages() {
        let oracle = CannedOracle::reply("  All Gaul is divided into three parts.\n");
        let text = "Gallia est omnis divisa in partes tres";
        let translation = translate(&oracle, "m", text, "latin", "english").unwrap();
        assert_eq!(translation.translation, "All Gaul is divided into three parts.");
        assert_eq!(translation.source_language, "latin");
        assert_eq!(translation.target_language, "english");
        let value = serde_json::to_value(&translation).unwrap();
        assert_eq!(value["text"], text);
    }

    #[test]
    fn oracle_errors_propagate() {
        let oracle = CannedOracle(Err(OracleError::AuthenticationFailed));
        assert!(matches!(
            translate(&oracle, "m", "ave", "latin", "english"),
            Err(OracleError::AuthenticationFailed)
        ));
        assert!(analyze_text(&oracle, "m", "ave", "latin").is_err());
    }
}

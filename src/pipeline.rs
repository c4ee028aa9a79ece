//! Caller-facing operations composed from the pipeline stages.
//!
//! Every operation follows the same shape: parse the fragment, build a prompt,
//! ask the oracle, extract a candidate, repair what can be repaired
//! deterministically, then validate. Only oracle failures, truncated output and
//! bad input are errors; everything else is reported on the outcome.
use serde::Serialize;

use crate::error::PipelineError;
use crate::extract::{extract, ExtractOptions};
use crate::fragment::{restore_assignment, wrap_fence, CodeFragment};
use crate::latin::{self, TextAnalysis, Translation, WordAnalysis};
use crate::markers::{normalize_positions, validate_sequential, Numbering};
use crate::oracle::Oracle;
use crate::prompt::Prompt;
use crate::strip::strip_all;
use crate::util::{snippet, SNIPPET_BYTES};
use crate::validate::{check_array_structure, check_complete, StructuralWarning};
use crate::verses::{
    adjust, analyze, render, segment, text_preserved, Restructuring, VerseStructureAnalysis,
};

const DEFAULT_TEXT_LANGUAGE: &str = "latin";

/// Result of `annotate` and `renumber`.
#[derive(Debug, Clone, Serialize)]
pub struct AnnotationOutcome {
    pub original_code: String,
    pub corrected_code: String,
    pub model_used: String,
    pub language: String,
    pub elements_count: Numbering,
    /// String elements found in the corrected code, marked or not.
    pub element_total: usize,
    pub warnings: Vec<StructuralWarning>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StripOutcome {
    pub original_code: String,
    pub stripped_code: String,
    /// `None` when the oracle was not consulted.
    pub model_used: Option<String>,
    pub oracle_used: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerseAdjustment {
    pub original_count: usize,
    pub target_count: usize,
    pub achieved_count: usize,
    pub analysis: VerseStructureAnalysis,
    pub restructuring: Restructuring,
    pub code_fragment: String,
    /// Advisory: the verses hold the same non-whitespace text as the source.
    pub text_preserved: bool,
}

pub struct Pipeline<O> {
    oracle: O,
    model: String,
}

impl<O: Oracle> Pipeline<O> {
    pub fn new(oracle: O, model: impl Into<String>) -> Self {
        Self {
            oracle,
            model: model.into(),
        }
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    /// Insert or fix `/* N */` markers before every array element.
    pub fn annotate(
        &self,
        code: &str,
        language: Option<&str>,
    ) -> Result<AnnotationOutcome, PipelineError> {
        let fragment = parse_input(code, language)?;
        let raw = self.ask(Prompt::AnnotateArray {
            code: &fragment.body,
            language: &fragment.language,
        })?;
        self.finish_annotation(code, &fragment, &raw, false)
    }

    /// Renumber markers by counting strings and ignoring existing markers.
    ///
    /// With `keep_fence` the corrected code is returned in a fenced block
    /// tagged with the fragment's language.
    pub fn renumber(
        &self,
        code: &str,
        language: Option<&str>,
        keep_fence: bool,
    ) -> Result<AnnotationOutcome, PipelineError> {
        let fragment = parse_input(code, language)?;
        let raw = self.ask(Prompt::RenumberVerses {
            code: &fragment.body,
            language: &fragment.language,
        })?;
        self.finish_annotation(code, &fragment, &raw, keep_fence)
    }

    fn finish_annotation(
        &self,
        code: &str,
        fragment: &CodeFragment,
        raw: &str,
        keep_fence: bool,
    ) -> Result<AnnotationOutcome, PipelineError> {
        let candidate = normalize_positions(&extract(raw, ExtractOptions::ARRAY));
        let corrected = restore_assignment(&fragment.body, &candidate);
        check_complete(&fragment.body, &corrected)?;

        let numbering = validate_sequential(&corrected);
        if !numbering.is_sequential() {
            tracing::warn!(numbering = %numbering, "oracle output is not sequentially numbered");
        }
        let warnings = check_array_structure(&corrected);
        for warning in &warnings {
            tracing::warn!(warning = %warning, "structural issue in oracle output");
        }
        let element_total = segment(&corrected).len();
        let corrected_code = if keep_fence {
            wrap_fence(&corrected, &fragment.language)
        } else {
            corrected
        };
        Ok(AnnotationOutcome {
            original_code: code.to_string(),
            corrected_code,
            model_used: self.model.clone(),
            language: fragment.language.clone(),
            elements_count: numbering,
            element_total,
            warnings,
        })
    }

    /// Remove every comment outside string literals.
    ///
    /// The lexical stripper always runs, after the oracle when `use_oracle`
    /// is set. A fenced input comes back fenced.
    pub fn strip_comments(
        &self,
        code: &str,
        language: Option<&str>,
        use_oracle: bool,
    ) -> Result<StripOutcome, PipelineError> {
        let fragment = parse_input(code, language)?;
        let candidate = if use_oracle {
            let raw = self.ask(Prompt::StripComments {
                code: &fragment.body,
                language: &fragment.language,
            })?;
            extract(&raw, ExtractOptions::CODE)
        } else {
            fragment.body.clone()
        };
        let stripped = restore_assignment(&fragment.body, &strip_all(&candidate));
        check_complete(&strip_all(&fragment.body), &stripped)?;
        Ok(StripOutcome {
            original_code: code.to_string(),
            stripped_code: fragment.rewrap(&stripped),
            model_used: use_oracle.then(|| self.model.clone()),
            oracle_used: use_oracle,
        })
    }

    /// Regroup the array's strings into `target` verses and re-render it.
    pub fn adjust_verses(
        &self,
        code: &str,
        target: usize,
    ) -> Result<VerseAdjustment, PipelineError> {
        let fragment = parse_input(code, None)?;
        if target == 0 {
            return Err(PipelineError::InvalidTargetCount);
        }
        let elements = segment(&fragment.body);
        if elements.is_empty() {
            return Err(PipelineError::NoElements);
        }

        let analysis = analyze(&self.oracle, &self.model, &elements);
        let restructuring = adjust(&self.oracle, &self.model, &elements, &analysis, target);
        let contents: Vec<&str> = restructuring
            .new_verses
            .iter()
            .map(|verse| verse.content.as_str())
            .collect();
        let code_fragment = restore_assignment(&fragment.body, &render(&contents));

        let preserved = text_preserved(&elements, &restructuring.new_verses);
        if !preserved {
            tracing::warn!("restructured verses do not preserve the source text");
        }
        tracing::info!(
            original = elements.len(),
            target,
            achieved = restructuring.new_verses.len(),
            analysis_fallback = analysis.fallback,
            restructuring_fallback = restructuring.fallback,
            "verse adjustment complete"
        );
        Ok(VerseAdjustment {
            original_count: elements.len(),
            target_count: target,
            achieved_count: restructuring.new_verses.len(),
            analysis,
            restructuring,
            code_fragment,
            text_preserved: preserved,
        })
    }

    /// Morphology of one word. Never consults the oracle for lexicon words.
    pub fn analyze_word(&self, word: &str) -> Result<WordAnalysis, PipelineError> {
        let word = non_empty(word)?;
        Ok(latin::analyze_word(&self.oracle, &self.model, word))
    }

    /// Free-text grammatical analysis; `language` defaults to Latin.
    pub fn analyze_grammar(
        &self,
        text: &str,
        language: Option<&str>,
    ) -> Result<TextAnalysis, PipelineError> {
        let text = non_empty(text)?;
        let language = language.unwrap_or(DEFAULT_TEXT_LANGUAGE);
        Ok(latin::analyze_text(&self.oracle, &self.model, text, language)?)
    }

    pub fn translate(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> Result<Translation, PipelineError> {
        let text = non_empty(text)?;
        Ok(latin::translate(&self.oracle, &self.model, text, source, target)?)
    }

    fn ask(&self, prompt: Prompt<'_>) -> Result<String, PipelineError> {
        let task = prompt.task();
        let text = prompt.render();
        tracing::debug!(task, model = %self.model, prompt_bytes = text.len(), "sending prompt");
        let reply = self.oracle.generate(&self.model, &text)?;
        tracing::debug!(task, reply = %snippet(&reply, SNIPPET_BYTES), "oracle replied");
        Ok(reply)
    }
}

fn parse_input(code: &str, language: Option<&str>) -> Result<CodeFragment, PipelineError> {
    if code.trim().is_empty() {
        return Err(PipelineError::EmptyInput);
    }
    Ok(CodeFragment::parse(code, language))
}

fn non_empty(text: &str) -> Result<&str, PipelineError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(PipelineError::EmptyText);
    }
    Ok(text)
}

use super::{decode_structured, literal_safe, ArrayElement, VerseBoundary, VerseStructureAnalysis};
use crate::oracle::Oracle;
use crate::prompt::Prompt;

const FALLBACK_NOTES: &str = "fallback analysis: each array element treated as a separate verse";

/// Ask the oracle how the elements group into verses.
///
/// Never fails: an oracle error, undecodable reply, empty boundary list or
/// out-of-range element index all yield [`fallback_analysis`].
pub fn analyze<O: Oracle + ?Sized>(
    oracle: &O,
    model: &str,
    elements: &[ArrayElement],
) -> VerseStructureAnalysis {
    let prompt = Prompt::AnalyzeVerseStructure { elements }.render();
    let reply = match oracle.generate(model, &prompt) {
        Ok(reply) => reply,
        Err(err) => {
            tracing::warn!(error = %err, "verse analysis failed, using fallback");
            return fallback_analysis(elements);
        }
    };
    let Some(mut analysis) = decode_structured::<VerseStructureAnalysis>(&reply) else {
        tracing::warn!(response_bytes = reply.len(), "verse analysis reply did not decode");
        return fallback_analysis(elements);
    };
    if analysis.verse_boundaries.is_empty() {
        tracing::warn!("verse analysis returned no boundaries");
        return fallback_analysis(elements);
    }
    let out_of_range = analysis
        .verse_boundaries
        .iter()
        .flat_map(|boundary| boundary.array_lines.iter().copied())
        .find(|&index| index >= elements.len());
    if let Some(index) = out_of_range {
        tracing::warn!(
            index,
            elements = elements.len(),
            "verse analysis referenced a missing element"
        );
        return fallback_analysis(elements);
    }

    for boundary in &mut analysis.verse_boundaries {
        boundary.content = literal_safe(&boundary.content);
    }
    if analysis.total_complete_verses == 0 {
        analysis.total_complete_verses = analysis.verse_boundaries.len();
    }
    tracing::debug!(
        verses = analysis.verse_boundaries.len(),
        elements = elements.len(),
        "verse analysis decoded"
    );
    analysis
}

/// One verse per element, in order.
pub fn fallback_analysis(elements: &[ArrayElement]) -> VerseStructureAnalysis {
    VerseStructureAnalysis {
        verse_boundaries: elements
            .iter()
            .enumerate()
            .map(|(index, element)| VerseBoundary {
                verse_number: verse_number(index),
                content: element.content.clone(),
                array_lines: vec![index],
            })
            .collect(),
        total_complete_verses: elements.len(),
        notes: FALLBACK_NOTES.to_string(),
        fallback: true,
    }
}

pub(super) fn verse_number(index: usize) -> u32 {
    u32::try_from(index + 1).unwrap_or(u32::MAX)
}

use super::analyze::verse_number;
use super::{
    decode_structured, literal_safe, ArrayElement, Restructuring, Verse, VerseStructureAnalysis,
};
use crate::oracle::Oracle;
use crate::prompt::Prompt;

pub const FALLBACK_EXPLANATION: &str = "automatic adjustment failed - using original structure";

/// Ask the oracle to re-partition the analyzed verses into `target` verses.
///
/// The reply is accepted when it decodes, has at least one verse, every verse
/// has text, and every source line names an existing element. Anything else
/// yields [`fallback_restructuring`]. The achieved count may still differ from
/// `target`.
pub fn adjust<O: Oracle + ?Sized>(
    oracle: &O,
    model: &str,
    elements: &[ArrayElement],
    analysis: &VerseStructureAnalysis,
    target: usize,
) -> Restructuring {
    let prompt = Prompt::AdjustVerseCount { analysis, target }.render();
    let reply = match oracle.generate(model, &prompt) {
        Ok(reply) => reply,
        Err(err) => {
            tracing::warn!(error = %err, "verse adjustment failed, using fallback");
            return fallback_restructuring(elements);
        }
    };
    let Some(mut restructuring) = decode_structured::<Restructuring>(&reply) else {
        tracing::warn!(response_bytes = reply.len(), "verse adjustment reply did not decode");
        return fallback_restructuring(elements);
    };

    for verse in &mut restructuring.new_verses {
        verse.content = literal_safe(&verse.content);
    }
    if let Some(problem) = rejection(&restructuring, elements.len()) {
        tracing::warn!(problem, "verse adjustment reply rejected");
        return fallback_restructuring(elements);
    }
    if restructuring.new_verses.len() != target {
        tracing::info!(
            target,
            achieved = restructuring.new_verses.len(),
            "oracle missed the target verse count"
        );
    }
    restructuring
}

fn rejection(restructuring: &Restructuring, element_count: usize) -> Option<&'static str> {
    let verses = &restructuring.new_verses;
    if verses.is_empty() {
        return Some("no verses");
    }
    if verses.iter().any(|verse| verse.content.is_empty()) {
        return Some("empty verse");
    }
    let out_of_range = verses
        .iter()
        .flat_map(|verse| verse.source_lines.iter())
        .any(|&index| index >= element_count);
    out_of_range.then_some("source line out of range")
}

/// The original elements, one verse each.
pub fn fallback_restructuring(elements: &[ArrayElement]) -> Restructuring {
    Restructuring {
        new_verses: elements
            .iter()
            .enumerate()
            .map(|(index, element)| Verse {
                verse_number: verse_number(index),
                content: element.content.clone(),
                source_lines: vec![index],
            })
            .collect(),
        explanation: FALLBACK_EXPLANATION.to_string(),
        fallback: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::CannedOracle;
    use crate::verses::{fallback_analysis, segment};

    fn five() -> Vec<ArrayElement> {
        segment("[\"I\", \"II\", \"III\", \"IV\", \"V\"]")
    }

    #[test]
    fn garbage_reply_keeps_original_verses() {
        let elements = five();
        let analysis = fallback_analysis(&elements);
        let result = adjust(&CannedOracle::reply("{{not json"), "m", &elements, &analysis, 3);
        assert!(result.fallback);
        assert_eq!(result.explanation, FALLBACK_EXPLANATION);
        let contents: Vec<&str> = result.new_verses.iter().map(|v| v.content.as_str()).collect();
        assert_eq!(contents, vec!["I", "II", "III", "IV", "V"]);
    }

    #[test]
    fn decoded_restructuring_is_sanitized() {
        let elements = five();
        let analysis = fallback_analysis(&elements);
        let reply = r#"```json
{
  "new_verses": [
    {"verse_number": 1, "content": "I II", "source_lines": [0, 1]},
    {"verse_number": 2, "content": "III \"IV\"\nV", "source_lines": [2, 3, 4]}
  ],
  "explanation": "merged pairs"
}
```"#;
        let result = adjust(&CannedOracle::reply(reply), "m", &elements, &analysis, 2);
        assert!(!result.fallback);
        assert_eq!(result.new_verses.len(), 2);
        assert_eq!(result.new_verses[1].content, r#"III \"IV\" V"#);
        assert_eq!(result.explanation, "merged pairs");
    }

    #[test]
    fn missed_target_is_still_accepted() {
        let elements = five();
        let analysis = fallback_analysis(&elements);
        let reply = r#"{"new_verses": [{"verse_number": 1, "content": "I II III IV V", "source_lines": [0, 1, 2, 3, 4]}]}"#;
        let result = adjust(&CannedOracle::reply(reply), "m", &elements, &analysis, 2);
        assert!(!result.fallback);
        assert_eq!(result.new_verses.len(), 1);
    }

    #[test]
    fn out_of_range_source_line_falls_back() {
        let elements = five();
        let analysis = fallback_analysis(&elements);
        let reply = r#"{"new_verses": [{"verse_number": 1, "content": "I", "source_lines": [5]}]}"#;
        assert!(adjust(&CannedOracle::reply(reply), "m", &elements, &analysis, 1).fallback);
    }

    #[test]
    fn blank_verse_falls_back() {
        let elements = five();
        let analysis = fallback_analysis(&elements);
        let reply = r#"{"new_verses": [{"verse_number": 1, "content": "  \n ", "source_lines": [0]}]}"#;
        assert!(adjust(&CannedOracle::reply(reply), "m", &elements, &analysis, 1).fallback);
    }
}

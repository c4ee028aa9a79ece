use serde::{Deserialize, Serialize};

use crate::oracle::Oracle;
use crate::prompt::Prompt;
use crate::verses::decode_structured;

/// How sure an analysis is of its lemma.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    #[default]
    Low,
}

/// Which step produced an analysis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisSource {
    /// Exact lemma or listed form in the built-in lexicon.
    Lexicon,
    /// Regular first/second conjugation ending on a lexicon stem.
    Derived,
    Oracle,
    /// Conjugation guessed from the ending alone.
    Pattern,
    #[default]
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Translations {
    #[serde(default)]
    pub en: String,
    #[serde(default)]
    pub la: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormAnalysis {
    #[serde(default)]
    pub input_form: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identified_form: Option<String>,
    #[serde(default)]
    pub confidence: Confidence,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// The listed form an inflected input matched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifiedForm {
    pub form: String,
    pub value: String,
}

/// Morphology of one Latin word.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordAnalysis {
    #[serde(default)]
    pub input: String,
    #[serde(default)]
    pub lemma: String,
    #[serde(default)]
    pub part_of_speech: String,
    /// `None` for anything that is not a verb.
    #[serde(default)]
    pub conjugation: Option<u8>,
    #[serde(default)]
    pub infinitive: String,
    #[serde(default)]
    pub perfect: String,
    #[serde(default)]
    pub future: String,
    #[serde(default)]
    pub translations: Translations,
    #[serde(default)]
    pub analysis: FormAnalysis,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identified_as: Option<IdentifiedForm>,
    #[serde(default, skip_deserializing)]
    pub source: AnalysisSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VerbForm {
    Infinitive,
    Present1Sg,
    Present2Sg,
    Present3Sg,
    Future1Sg,
    Future2Sg,
    Future3Sg,
    Perfect1Sg,
    Perfect3Sg,
    Supine,
}

impl VerbForm {
    fn as_str(self) -> &'static str {
        match self {
            Self::Infinitive => "infinitive",
            Self::Present1Sg => "present_1sg",
            Self::Present2Sg => "present_2sg",
            Self::Present3Sg => "present_3sg",
            Self::Future1Sg => "future_1sg",
            Self::Future2Sg => "future_2sg",
            Self::Future3Sg => "future_3sg",
            Self::Perfect1Sg => "perfect_1sg",
            Self::Perfect3Sg => "perfect_3sg",
            Self::Supine => "supine",
        }
    }
}

struct VerbEntry {
    lemma: &'static str,
    conjugation: u8,
    english: &'static str,
    forms: &'static [(VerbForm, &'static str)],
}

impl VerbEntry {
    fn form(&self, form: VerbForm) -> &'static str {
        self.forms
            .iter()
            .find(|(kind, _)| *kind == form)
            .map_or("", |&(_, value)| value)
    }

    fn matching_form(&self, word: &str) -> Option<VerbForm> {
        self.forms
            .iter()
            .find(|(_, value)| *value == word)
            .map(|(kind, _)| *kind)
    }

    fn analysis(
        &self,
        input: &str,
        form: Option<VerbForm>,
        confidence: Confidence,
    ) -> WordAnalysis {
        let identified = form.map_or("lemma", VerbForm::as_str);
        WordAnalysis {
            input: input.to_string(),
            lemma: self.lemma.to_string(),
            part_of_speech: "verb".to_string(),
            conjugation: Some(self.conjugation),
            infinitive: self.form(VerbForm::Infinitive).to_string(),
            perfect: self.form(VerbForm::Perfect1Sg).to_string(),
            future: self.form(VerbForm::Future1Sg).to_string(),
            translations: Translations {
                en: self.english.to_string(),
                la: self.lemma.to_string(),
            },
            analysis: FormAnalysis {
                input_form: if form.is_some() { input } else { "lemma" }.to_string(),
                identified_form: Some(identified.to_string()),
                confidence,
                note: None,
            },
            identified_as: form.map(|form| IdentifiedForm {
                form: form.as_str().to_string(),
                value: input.to_string(),
            }),
            source: AnalysisSource::Lexicon,
        }
    }
}

const LEXICON: &[VerbEntry] = &[
    VerbEntry {
        lemma: "rigo",
        conjugation: 1,
        english: "drench, water, irrigate",
        forms: &[
            (VerbForm::Infinitive, "rigare"),
            (VerbForm::Present1Sg, "rigo"),
            (VerbForm::Present2Sg, "rigas"),
            (VerbForm::Present3Sg, "rigat"),
            (VerbForm::Future1Sg, "rigabo"),
            (VerbForm::Future2Sg, "rigabis"),
            (VerbForm::Future3Sg, "rigabit"),
            (VerbForm::Perfect1Sg, "rigavi"),
            (VerbForm::Perfect3Sg, "rigavit"),
            (VerbForm::Supine, "rigatum"),
        ],
    },
    VerbEntry {
        lemma: "amo",
        conjugation: 1,
        english: "love, like",
        forms: &[
            (VerbForm::Infinitive, "amare"),
            (VerbForm::Future1Sg, "amabo"),
            (VerbForm::Perfect1Sg, "amavi"),
        ],
    },
    VerbEntry {
        lemma: "moneo",
        conjugation: 2,
        english: "warn, advise",
        forms: &[
            (VerbForm::Infinitive, "monēre"),
            (VerbForm::Future1Sg, "monēbo"),
            (VerbForm::Perfect1Sg, "monui"),
        ],
    },
];

/// Regular endings and the lemma ending that replaces them, per conjugation.
const DERIVATIONS: &[(&str, &str, u8, VerbForm)] = &[
    ("abo", "o", 1, VerbForm::Future1Sg),
    ("abis", "o", 1, VerbForm::Future2Sg),
    ("abit", "o", 1, VerbForm::Future3Sg),
    ("avit", "o", 1, VerbForm::Perfect3Sg),
    ("avi", "o", 1, VerbForm::Perfect1Sg),
    ("are", "o", 1, VerbForm::Infinitive),
    ("as", "o", 1, VerbForm::Present2Sg),
    ("at", "o", 1, VerbForm::Present3Sg),
    ("ēbo", "eo", 2, VerbForm::Future1Sg),
    ("ēre", "eo", 2, VerbForm::Infinitive),
    ("ui", "eo", 2, VerbForm::Perfect1Sg),
];

/// Infinitive endings that identify a conjugation without a lexicon entry.
const INFINITIVE_PATTERNS: &[(&str, &str, u8)] = &[
    ("are", "o", 1),
    ("ēre", "eo", 2),
    ("īre", "io", 4),
    ("ere", "o", 3),
];

/// Exact lemma or listed form from the lexicon.
pub fn lookup(word: &str) -> Option<WordAnalysis> {
    if let Some(entry) = LEXICON.iter().find(|entry| entry.lemma == word) {
        return Some(entry.analysis(word, None, Confidence::High));
    }
    LEXICON.iter().find_map(|entry| {
        let form = entry.matching_form(word)?;
        Some(entry.analysis(word, Some(form), Confidence::High))
    })
}

/// A regular inflection of a lexicon verb that the lexicon does not list.
pub fn derive(word: &str) -> Option<WordAnalysis> {
    DERIVATIONS
        .iter()
        .find_map(|&(ending, lemma_ending, conjugation, form)| {
            let stem = word.strip_suffix(ending).filter(|stem| !stem.is_empty())?;
            let lemma = format!("{stem}{lemma_ending}");
            let entry = LEXICON
                .iter()
                .find(|entry| entry.lemma == lemma && entry.conjugation == conjugation)?;
            let mut analysis = entry.analysis(word, Some(form), Confidence::Medium);
            analysis.source = AnalysisSource::Derived;
            Some(analysis)
        })
}

/// Conjugation and lemma guessed from an infinitive ending alone.
pub fn pattern_guess(word: &str) -> Option<WordAnalysis> {
    let (stem, lemma_ending, conjugation) = INFINITIVE_PATTERNS.iter().find_map(
        |&(ending, lemma_ending, conjugation)| {
            let stem = word.strip_suffix(ending).filter(|stem| !stem.is_empty())?;
            Some((stem, lemma_ending, conjugation))
        },
    )?;
    Some(WordAnalysis {
        input: word.to_string(),
        lemma: format!("{stem}{lemma_ending}"),
        part_of_speech: "verb".to_string(),
        conjugation: Some(conjugation),
        infinitive: word.to_string(),
        perfect: String::new(),
        future: String::new(),
        translations: Translations::default(),
        analysis: FormAnalysis {
            input_form: word.to_string(),
            identified_form: Some(VerbForm::Infinitive.as_str().to_string()),
            confidence: Confidence::Low,
            note: Some(format!("conjugation {conjugation} guessed from the infinitive ending")),
        },
        identified_as: None,
        source: AnalysisSource::Pattern,
    })
}

/// Placeholder for a word nothing could identify.
pub fn unknown(word: &str) -> WordAnalysis {
    WordAnalysis {
        input: word.to_string(),
        lemma: "unknown".to_string(),
        part_of_speech: "unknown".to_string(),
        conjugation: None,
        infinitive: String::new(),
        perfect: String::new(),
        future: String::new(),
        translations: Translations {
            en: "unknown".to_string(),
            la: "unknown".to_string(),
        },
        analysis: FormAnalysis {
            input_form: "unknown".to_string(),
            identified_form: None,
            confidence: Confidence::Low,
            note: Some("no lexicon entry and no usable oracle analysis".to_string()),
        },
        identified_as: None,
        source: AnalysisSource::Unknown,
    }
}

/// Analyze one word: lexicon, regular derivation, oracle, ending pattern,
/// then the unknown placeholder. The input is trimmed and lowercased first.
///
/// Never fails; oracle errors and undecodable replies move on to the next step.
pub fn analyze_word<O: Oracle + ?Sized>(oracle: &O, model: &str, word: &str) -> WordAnalysis {
    let word = word.trim().to_lowercase();
    if let Some(analysis) = lookup(&word).or_else(|| derive(&word)) {
        return analysis;
    }
    match ask_oracle(oracle, model, &word) {
        Some(analysis) => analysis,
        None => pattern_guess(&word).unwrap_or_else(|| unknown(&word)),
    }
}

fn ask_oracle<O: Oracle + ?Sized>(oracle: &O, model: &str, word: &str) -> Option<WordAnalysis> {
    let prompt = Prompt::AnalyzeWord { word }.render();
    let reply = match oracle.generate(model, &prompt) {
        Ok(reply) => reply,
        Err(err) => {
            tracing::warn!(word, error = %err, "word analysis failed");
            return None;
        }
    };
    let Some(mut analysis) = decode_structured::<WordAnalysis>(&reply) else {
        tracing::warn!(word, response_bytes = reply.len(), "word analysis reply did not decode");
        return None;
    };
    let lemma = analysis.lemma.trim();
    if lemma.is_empty() || lemma.eq_ignore_ascii_case("unknown") {
        tracing::debug!(word, "oracle could not identify the word");
        return None;
    }
    analysis.input = word.to_string();
    analysis.source = AnalysisSource::Oracle;
    Some(analysis)
}

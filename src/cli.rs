//! CLI argument parsing.
//!
//! The binary hosts one pipeline operation per invocation: read a fragment,
//! run the operation, print the outcome.
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use versemark::config::ConfigOverrides;

#[derive(Parser, Debug)]
#[command(
    name = "versemark",
    version,
    about = "Marker annotation, comment stripping and verse restructuring for array literals, with Latin helpers",
    after_help = "Examples:\n  versemark annotate --input psalm.swift\n  versemark renumber --keep-fence < psalm.swift\n  versemark strip --local --input psalm.swift\n  versemark adjust-verses --target 17 --input psalm.swift --json\n  versemark latin-word rigabit --json\n  versemark translate \"Gallia est omnis divisa\" --to english\n  versemark status",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    /// JSON config file (default: <config dir>/versemark/config.json)
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Ollama base URL
    #[arg(long, value_name = "URL", global = true)]
    pub ollama_url: Option<String>,

    /// Local fallback command; `{model}` is replaced with the model name
    #[arg(long, value_name = "COMMAND", global = true)]
    pub lm: Option<String>,

    /// Generation timeout in seconds
    #[arg(long, value_name = "SECS", global = true)]
    pub timeout_secs: Option<u64>,

    /// Log debug events to stderr (RUST_LOG takes precedence)
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl RootArgs {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            ollama_url: self.ollama_url.clone(),
            model: self.command.model().map(str::to_string),
            lm_command: self.lm.clone(),
            timeout_secs: self.timeout_secs,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Annotate(AnnotateArgs),
    Renumber(RenumberArgs),
    Strip(StripArgs),
    AdjustVerses(AdjustVersesArgs),
    LatinWord(LatinWordArgs),
    LatinGrammar(LatinGrammarArgs),
    Translate(TranslateArgs),
    Status(StatusArgs),
}

impl Command {
    fn model(&self) -> Option<&str> {
        match self {
            Self::Annotate(args) => args.fragment.model.as_deref(),
            Self::Renumber(args) => args.fragment.model.as_deref(),
            Self::Strip(args) => args.fragment.model.as_deref(),
            Self::AdjustVerses(args) => args.fragment.model.as_deref(),
            Self::LatinWord(args) => args.model.as_deref(),
            Self::LatinGrammar(args) => args.text.model.as_deref(),
            Self::Translate(args) => args.text.model.as_deref(),
            Self::Status(_) => None,
        }
    }
}

/// Flags shared by every fragment-processing command.
#[derive(Args, Debug)]
pub struct FragmentArgs {
    /// Read the fragment from a file instead of stdin
    #[arg(long, short, value_name = "PATH")]
    pub input: Option<PathBuf>,

    /// Language of the fragment (default: fence tag, then swift)
    #[arg(long, value_name = "NAME")]
    pub language: Option<String>,

    /// Model to ask (default: default_model from config)
    #[arg(long, short, value_name = "MODEL")]
    pub model: Option<String>,

    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Add or fix /* N */ markers before every array element")]
pub struct AnnotateArgs {
    #[command(flatten)]
    pub fragment: FragmentArgs,
}

#[derive(Parser, Debug)]
#[command(about = "Renumber markers by counting strings, ignoring existing markers")]
pub struct RenumberArgs {
    #[command(flatten)]
    pub fragment: FragmentArgs,

    /// Return the corrected code inside a fenced block
    #[arg(long)]
    pub keep_fence: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Remove every comment outside string literals")]
pub struct StripArgs {
    #[command(flatten)]
    pub fragment: FragmentArgs,

    /// Strip lexically without asking the oracle
    #[arg(long)]
    pub local: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Regroup the array's strings into a target number of verses")]
pub struct AdjustVersesArgs {
    #[command(flatten)]
    pub fragment: FragmentArgs,

    /// Number of verses to produce
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u64).range(1..))]
    pub target: u64,
}

#[derive(Parser, Debug)]
#[command(about = "Lemma, conjugation and principal parts of one Latin word")]
pub struct LatinWordArgs {
    pub word: String,

    #[arg(long, short, value_name = "MODEL")]
    pub model: Option<String>,

    #[arg(long)]
    pub json: bool,
}

/// Flags shared by the free-text commands.
#[derive(Args, Debug)]
pub struct TextArgs {
    /// Text to process (default: read --input or stdin)
    pub text: Option<String>,

    #[arg(long, short, value_name = "PATH", conflicts_with = "text")]
    pub input: Option<PathBuf>,

    #[arg(long, short, value_name = "MODEL")]
    pub model: Option<String>,

    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Grammatical analysis of a passage")]
pub struct LatinGrammarArgs {
    #[command(flatten)]
    pub text: TextArgs,

    #[arg(long, value_name = "NAME", default_value = "latin")]
    pub language: String,
}

#[derive(Parser, Debug)]
#[command(about = "Translate a passage")]
pub struct TranslateArgs {
    #[command(flatten)]
    pub text: TextArgs,

    #[arg(long, value_name = "LANG", default_value = "latin")]
    pub from: String,

    #[arg(long, value_name = "LANG", default_value = "english")]
    pub to: String,
}

#[derive(Parser, Debug)]
#[command(about = "Report oracle availability, server type and default model")]
pub struct StatusArgs {
    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_definition_is_consistent() {
        use clap::CommandFactory;
        RootArgs::command().debug_assert();
    }

    #[test]
    fn model_flag_becomes_override() {
        let args = RootArgs::parse_from([
            "versemark",
            "annotate",
            "--model",
            "mixtral:8x7b",
            "--timeout-secs",
            "90",
        ]);
        let overrides = args.overrides();
        assert_eq!(overrides.model.as_deref(), Some("mixtral:8x7b"));
        assert_eq!(overrides.timeout_secs, Some(90));
    }

    #[test]
    fn target_must_be_positive() {
        assert!(RootArgs::try_parse_from(["versemark", "adjust-verses", "--target", "0"]).is_err());
        let args = RootArgs::parse_from(["versemark", "adjust-verses", "--target", "3"]);
        assert!(matches!(args.command, Command::AdjustVerses(ref a) if a.target == 3));
    }

    #[test]
    fn translate_takes_text_and_language_defaults() {
        let args = RootArgs::parse_from(["versemark", "translate", "ave Maria", "-m", "llama3"]);
        assert_eq!(args.overrides().model.as_deref(), Some("llama3"));
        let Command::Translate(cmd) = args.command else {
            panic!("expected translate");
        };
        assert_eq!(cmd.text.text.as_deref(), Some("ave Maria"));
        assert_eq!((cmd.from.as_str(), cmd.to.as_str()), ("latin", "english"));

        let args = RootArgs::parse_from(["versemark", "latin-word", "rigo", "--json"]);
        assert!(matches!(args.command, Command::LatinWord(ref a) if a.word == "rigo" && a.json));
        assert!(
            RootArgs::try_parse_from(["versemark", "latin-grammar", "x", "--input", "f"]).is_err()
        );
    }
}

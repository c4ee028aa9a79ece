use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::fs;
use std::io::{self, Read};
use std::path::Path;
use tracing_subscriber::EnvFilter;

use versemark::config::{resolve_config, Config};
use versemark::{AnnotationOutcome, Gateway, Oracle, Pipeline};

mod cli;
use cli::{Command, FragmentArgs, RootArgs, TextArgs};

fn main() -> Result<()> {
    let args = RootArgs::parse();
    init_tracing(args.verbose);

    let config = resolve_config(args.config.as_deref(), &args.overrides())?;
    let gateway = Gateway::from_config(&config);
    if let Command::Status(status) = &args.command {
        return cmd_status(&config, &gateway, status.json);
    }
    let pipeline = Pipeline::new(gateway, config.default_model.clone());

    match &args.command {
        Command::Annotate(cmd) => {
            let code = read_input(cmd.fragment.input.as_deref())?;
            let outcome = pipeline.annotate(&code, cmd.fragment.language.as_deref())?;
            print_annotation(&outcome, &cmd.fragment)
        }
        Command::Renumber(cmd) => {
            let code = read_input(cmd.fragment.input.as_deref())?;
            let outcome =
                pipeline.renumber(&code, cmd.fragment.language.as_deref(), cmd.keep_fence)?;
            print_annotation(&outcome, &cmd.fragment)
        }
        Command::Strip(cmd) => {
            let code = read_input(cmd.fragment.input.as_deref())?;
            let outcome =
                pipeline.strip_comments(&code, cmd.fragment.language.as_deref(), !cmd.local)?;
            if cmd.fragment.json {
                return print_json(&outcome);
            }
            println!("{}", outcome.stripped_code);
            Ok(())
        }
        Command::AdjustVerses(cmd) => {
            let code = read_input(cmd.fragment.input.as_deref())?;
            let target = usize::try_from(cmd.target).context("target verse count")?;
            let outcome = pipeline.adjust_verses(&code, target)?;
            if cmd.fragment.json {
                return print_json(&outcome);
            }
            println!("{}", outcome.code_fragment);
            eprintln!(
                "verses: {} -> {} (target {})",
                outcome.original_count, outcome.achieved_count, outcome.target_count
            );
            if outcome.restructuring.fallback {
                eprintln!("note: {}", outcome.restructuring.explanation);
            }
            if !outcome.text_preserved {
                eprintln!("warning: restructured verses do not preserve the source text");
            }
            Ok(())
        }
        Command::LatinWord(cmd) => {
            let analysis = pipeline.analyze_word(&cmd.word)?;
            if cmd.json {
                return print_json(&analysis);
            }
            let conjugation = analysis
                .conjugation
                .map_or_else(|| "-".to_string(), |n| n.to_string());
            println!(
                "{} ({}, conjugation {conjugation}): {}",
                analysis.lemma, analysis.part_of_speech, analysis.translations.en
            );
            if !analysis.infinitive.is_empty() {
                println!(
                    "principal parts: {}, {}, {}",
                    analysis.infinitive, analysis.perfect, analysis.future
                );
            }
            if let Some(identified) = &analysis.identified_as {
                println!("form: {} = {}", identified.form, identified.value);
            }
            Ok(())
        }
        Command::LatinGrammar(cmd) => {
            let text = read_text(&cmd.text)?;
            let analysis = pipeline.analyze_grammar(&text, Some(&cmd.language))?;
            if cmd.text.json {
                return print_json(&analysis);
            }
            println!("{}", analysis.analysis);
            Ok(())
        }
        Command::Translate(cmd) => {
            let text = read_text(&cmd.text)?;
            let translation = pipeline.translate(&text, &cmd.from, &cmd.to)?;
            if cmd.text.json {
                return print_json(&translation);
            }
            println!("{}", translation.translation);
            Ok(())
        }
        Command::Status(_) => Ok(()),
    }
}

/// RUST_LOG wins; otherwise warnings, or debug with `--verbose`.
fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => {
            fs::read_to_string(path).with_context(|| format!("read input {}", path.display()))
        }
        None => {
            let mut code = String::new();
            io::stdin()
                .read_to_string(&mut code)
                .context("read fragment from stdin")?;
            Ok(code)
        }
    }
}

fn read_text(args: &TextArgs) -> Result<String> {
    match &args.text {
        Some(text) => Ok(text.clone()),
        None => read_input(args.input.as_deref()),
    }
}

fn print_annotation(outcome: &AnnotationOutcome, args: &FragmentArgs) -> Result<()> {
    if args.json {
        return print_json(outcome);
    }
    println!("{}", outcome.corrected_code);
    if !outcome.elements_count.is_sequential() {
        eprintln!("warning: markers are not sequential: {}", outcome.elements_count);
    }
    for warning in &outcome.warnings {
        eprintln!("warning: {warning}");
    }
    Ok(())
}

#[derive(Serialize)]
struct StatusReport<'a> {
    available: bool,
    server_type: &'a str,
    ollama_url: &'a str,
    default_model: &'a str,
    fallback_command: Option<&'a str>,
}

fn cmd_status(config: &Config, gateway: &Gateway, json: bool) -> Result<()> {
    let fallback_command = (gateway.server_type() == "local" && !config.lm_command.is_empty())
        .then_some(config.lm_command.as_str());
    let report = StatusReport {
        available: gateway.is_available(),
        server_type: gateway.server_type(),
        ollama_url: &config.ollama_url,
        default_model: &config.default_model,
        fallback_command,
    };
    if json {
        return print_json(&report);
    }
    println!(
        "ollama: {} ({}, {})",
        report.ollama_url,
        report.server_type,
        if report.available {
            "available"
        } else {
            "unavailable"
        }
    );
    println!("default model: {}", report.default_model);
    println!("fallback: {}", report.fallback_command.unwrap_or("none"));
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("serialize output")?;
    println!("{text}");
    Ok(())
}

//! Shared test infrastructure for integration tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};
use std::sync::Mutex;
use tempfile::TempDir;

use versemark::{Oracle, OracleError};

/// Nothing listens on the discard port, so the HTTP probe fails fast.
pub const UNREACHABLE_URL: &str = "http://127.0.0.1:9";

/// Oracle that replays scripted replies in order and records every prompt.
pub struct ScriptedOracle {
    replies: Mutex<VecDeque<Result<String, OracleError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedOracle {
    pub fn new(replies: Vec<Result<String, OracleError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(replies: &[&str]) -> Self {
        Self::new(replies.iter().map(|reply| Ok(reply.to_string())).collect())
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl Oracle for ScriptedOracle {
    fn is_available(&self) -> bool {
        true
    }

    fn generate(&self, _model: &str, prompt: &str) -> Result<String, OracleError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(OracleError::Other("script exhausted".to_string())))
    }
}

/// Scratch directory holding canned LM responses and a config that points
/// the binary at them through the process transport.
pub struct MockLm {
    dir: TempDir,
}

impl MockLm {
    /// Responses are served in order, one per LM invocation.
    pub fn with_responses(responses: &[&str]) -> Self {
        let dir = TempDir::new().expect("create temp dir");
        for (index, response) in responses.iter().enumerate() {
            fs::write(dir.path().join(format!("{}.txt", index + 1)), response)
                .expect("write response");
        }
        let mock = Self { dir };
        let config = serde_json::json!({
            "ollama_url": UNREACHABLE_URL,
            "probe_timeout_secs": 1,
            "timeout_secs": 10,
            "lm_command": mock.command(),
        });
        fs::write(mock.config_path(), config.to_string()).expect("write config");
        mock
    }

    /// Shell command that swallows the prompt, bumps a counter and prints the
    /// matching response file.
    fn command(&self) -> String {
        let script = r#"cat >/dev/null; n=$(cat "$0/count" 2>/dev/null || echo 0); n=$((n+1)); echo $n > "$0/count"; cat "$0/$n.txt""#;
        let dir = self.dir.path().display().to_string();
        format!(
            "sh -c {} {}",
            shell_words::quote(script),
            shell_words::quote(&dir)
        )
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.path().join("config.json")
    }

    /// LM invocations served so far.
    pub fn calls(&self) -> usize {
        fs::read_to_string(self.dir.path().join("count"))
            .ok()
            .and_then(|count| count.trim().parse().ok())
            .unwrap_or(0)
    }

    /// Run the binary with this mock's config and `stdin` as the fragment.
    pub fn run(&self, args: &[&str], stdin: &str) -> Output {
        let mut child = Command::new(env!("CARGO_BIN_EXE_versemark"))
            .arg("--config")
            .arg(self.config_path())
            .args(args)
            .env_remove("OLLAMA_URL")
            .env_remove("OLLAMA_USERNAME")
            .env_remove("OLLAMA_PASSWORD")
            .env_remove("DEFAULT_MODEL")
            .env_remove("VERSEMARK_LM_COMMAND")
            .env_remove("VERSEMARK_TIMEOUT_SECS")
            .env_remove("RUST_LOG")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("spawn versemark");
        // The binary may exit (e.g. on an argument error) before reading
        // stdin; a broken pipe is expected then and is not a harness failure.
        if let Err(err) = child
            .stdin
            .take()
            .expect("stdin piped")
            .write_all(stdin.as_bytes())
        {
            assert_eq!(
                err.kind(),
                std::io::ErrorKind::BrokenPipe,
                "write stdin: {err}"
            );
        }
        child.wait_with_output().expect("wait for versemark")
    }
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

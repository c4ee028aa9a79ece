//! Oracle gateway: the text-generation backend behind every pipeline task.
//!
//! Two transports exist. The HTTP transport talks to an Ollama server and the
//! process transport pipes the prompt into a local command (`ollama run` by
//! default). [`Gateway`] sequences them:
//!
//! - remote server: HTTP only, with no availability probe, so its error
//!   reaches the caller unchanged,
//! - local server that answers the probe: HTTP, then the process transport
//!   once on failure,
//! - local server that does not answer: the process transport only.
//!
//! Probe results are cached by [`AvailabilityCache`].

use std::time::{Duration, Instant};

use thiserror::Error;

use crate::config::Config;

mod availability;
mod http;
mod process;

pub use availability::{AvailabilityCache, Clock, SystemClock};
pub use http::{is_remote_url, HttpTransport};
pub use process::ProcessTransport;

/// Why an oracle call produced no text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OracleError {
    #[error("request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("cannot connect to Ollama server at {0}")]
    ConnectionRefused(String),

    #[error("authentication failed - check OLLAMA_USERNAME and OLLAMA_PASSWORD")]
    AuthenticationFailed,

    #[error("model '{0}' not found")]
    ModelNotFound(String),

    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("command failed with {status}: {stderr}")]
    CommandFailed { status: String, stderr: String },

    #[error("{0} is not installed or not in PATH")]
    NotInstalled(String),

    #[error("{0}")]
    Other(String),
}

/// Capability the pipeline needs: availability and text generation.
pub trait Oracle {
    fn is_available(&self) -> bool;

    fn generate(&self, model: &str, prompt: &str) -> Result<String, OracleError>;
}

/// One way of reaching a model.
pub trait Transport: Send + Sync {
    /// Name recorded in log fields.
    fn name(&self) -> &'static str;

    fn probe(&self) -> bool {
        true
    }

    fn generate(&self, model: &str, prompt: &str) -> Result<String, OracleError>;
}

/// Sequences a primary and an optional fallback transport.
pub struct Gateway {
    primary: Box<dyn Transport>,
    fallback: Option<Box<dyn Transport>>,
    availability: AvailabilityCache,
    remote: bool,
}

impl Gateway {
    pub fn new(
        primary: Box<dyn Transport>,
        fallback: Option<Box<dyn Transport>>,
        availability: AvailabilityCache,
    ) -> Self {
        Self {
            primary,
            fallback,
            availability,
            remote: false,
        }
    }

    /// Mark the primary transport's server as remote, disabling the fallback.
    pub fn remote(mut self) -> Self {
        self.remote = true;
        self
    }

    /// HTTP transport for the configured server, with the configured
    /// command as fallback unless `lm_command` is empty or the server is remote.
    pub fn from_config(config: &Config) -> Self {
        let availability = AvailabilityCache::new(config.availability_ttl());
        let primary = Box::new(HttpTransport::from_config(config));
        if is_remote_url(&config.ollama_url) {
            return Self::new(primary, None, availability).remote();
        }
        let fallback = (!config.lm_command.trim().is_empty()).then(|| {
            Box::new(ProcessTransport::new(&config.lm_command, config.timeout()))
                as Box<dyn Transport>
        });
        Self::new(primary, fallback, availability)
    }

    pub fn server_type(&self) -> &'static str {
        if self.remote {
            "remote"
        } else {
            "local"
        }
    }

    fn call(
        &self,
        transport: &dyn Transport,
        model: &str,
        prompt: &str,
    ) -> Result<String, OracleError> {
        let start = Instant::now();
        let result = transport.generate(model, prompt);
        let elapsed_ms = start.elapsed().as_millis();
        match &result {
            Ok(text) => tracing::info!(
                transport = transport.name(),
                model,
                elapsed_ms,
                prompt_bytes = prompt.len(),
                response_bytes = text.len(),
                "oracle call complete"
            ),
            Err(err) => tracing::warn!(
                transport = transport.name(),
                model,
                elapsed_ms,
                error = %err,
                "oracle call failed"
            ),
        }
        result
    }
}

impl Oracle for Gateway {
    fn is_available(&self) -> bool {
        self.availability.check(|| self.primary.probe())
    }

    fn generate(&self, model: &str, prompt: &str) -> Result<String, OracleError> {
        let fallback = self.fallback.as_deref().filter(|_| !self.remote);
        let Some(fallback) = fallback else {
            return self.call(self.primary.as_ref(), model, prompt);
        };
        if self.is_available() {
            match self.call(self.primary.as_ref(), model, prompt) {
                Ok(text) => return Ok(text),
                Err(err) => tracing::info!(
                    error = %err,
                    fallback = fallback.name(),
                    "primary transport failed, trying fallback"
                ),
            }
        }
        self.call(fallback, model, prompt)
    }
}

/// Oracle stand-in for unit tests: replays one canned reply.
#[cfg(test)]
pub(crate) struct CannedOracle(pub Result<String, OracleError>);

#[cfg(test)]
impl CannedOracle {
    pub(crate) fn reply(text: &str) -> Self {
        Self(Ok(text.to_string()))
    }
}

#[cfg(test)]
impl Oracle for CannedOracle {
    fn is_available(&self) -> bool {
        self.0.is_ok()
    }

    fn generate(&self, _model: &str, _prompt: &str) -> Result<String, OracleError> {
        self.0.clone()
    }
}

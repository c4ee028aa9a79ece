use std::io::ErrorKind;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use super::{OracleError, Transport};
use crate::config::Config;
use crate::util::{snippet, SNIPPET_BYTES};

const LOCAL_HOSTS: [&str; 4] = ["localhost", "127.0.0.1", "0.0.0.0", "::1"];

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: Sampling,
}

#[derive(Serialize)]
struct Sampling {
    temperature: f32,
    top_p: f32,
    top_k: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

/// Ollama `/api/generate` over HTTP, with optional basic auth.
pub struct HttpTransport {
    base_url: String,
    authorization: Option<String>,
    timeout: Duration,
    max_output_tokens: Option<u32>,
    agent: ureq::Agent,
    probe_agent: ureq::Agent,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Duration, probe_timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            authorization: None,
            timeout,
            max_output_tokens: None,
            agent: agent_with_timeout(timeout),
            probe_agent: agent_with_timeout(probe_timeout),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let mut transport = Self::new(
            &config.ollama_url,
            config.timeout(),
            config.probe_timeout(),
        );
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            transport = transport.with_basic_auth(username, password);
        }
        if config.max_output_tokens > 0 {
            transport.max_output_tokens = Some(config.max_output_tokens);
        }
        transport
    }

    pub fn with_basic_auth(mut self, username: &str, password: &str) -> Self {
        let credentials = STANDARD.encode(format!("{username}:{password}"));
        self.authorization = Some(format!("Basic {credentials}"));
        self
    }

    fn map_error(&self, err: ureq::Error) -> OracleError {
        match err {
            ureq::Error::Timeout(_) => OracleError::Timeout(self.timeout),
            ureq::Error::ConnectionFailed | ureq::Error::HostNotFound => {
                OracleError::ConnectionRefused(self.base_url.clone())
            }
            ureq::Error::Io(io) => match io.kind() {
                ErrorKind::ConnectionRefused | ErrorKind::ConnectionReset => {
                    OracleError::ConnectionRefused(self.base_url.clone())
                }
                ErrorKind::TimedOut | ErrorKind::WouldBlock => OracleError::Timeout(self.timeout),
                _ => OracleError::Other(io.to_string()),
            },
            other => OracleError::Other(other.to_string()),
        }
    }
}

fn agent_with_timeout(timeout: Duration) -> ureq::Agent {
    let config = ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build();
    ureq::Agent::new_with_config(config)
}

impl Transport for HttpTransport {
    fn name(&self) -> &'static str {
        "http"
    }

    fn probe(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        let mut request = self.probe_agent.get(&url);
        if let Some(authorization) = &self.authorization {
            request = request.header("Authorization", authorization);
        }
        match request.call() {
            Ok(response) => {
                let status = response.status().as_u16();
                if status != 200 {
                    tracing::info!(url = %url, status, "Ollama server not responding");
                }
                status == 200
            }
            Err(err) => {
                tracing::info!(url = %url, error = %err, "cannot reach Ollama server");
                false
            }
        }
    }

    fn generate(&self, model: &str, prompt: &str) -> Result<String, OracleError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = GenerateRequest {
            model,
            prompt,
            stream: false,
            options: Sampling {
                temperature: 0.1,
                top_p: 0.9,
                top_k: 40,
                num_predict: self.max_output_tokens,
            },
        };
        let mut request = self.agent.post(&url);
        if let Some(authorization) = &self.authorization {
            request = request.header("Authorization", authorization);
        }
        let response = request
            .send_json(&body)
            .map_err(|err| self.map_error(err))?;

        match response.status().as_u16() {
            200 => {
                let parsed: GenerateResponse = response
                    .into_body()
                    .read_json()
                    .map_err(|err| OracleError::Other(format!("decode generate response: {err}")))?;
                Ok(parsed.response.trim().to_string())
            }
            401 => Err(OracleError::AuthenticationFailed),
            404 => Err(OracleError::ModelNotFound(model.to_string())),
            status => {
                let text = response.into_body().read_to_string().unwrap_or_default();
                Err(OracleError::HttpStatus {
                    status,
                    body: snippet(&text, SNIPPET_BYTES),
                })
            }
        }
    }
}

/// Whether `url` names a host other than the local machine.
///
/// A URL whose host cannot be read counts as remote.
pub fn is_remote_url(url: &str) -> bool {
    match host(url) {
        Some(host) => !LOCAL_HOSTS.contains(&host.to_ascii_lowercase().as_str()),
        None => true,
    }
}

fn host(url: &str) -> Option<&str> {
    let after_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
    let authority = after_scheme.split(['/', '?', '#']).next()?;
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, rest)| rest);
    if let Some(bracketed) = host_port.strip_prefix('[') {
        return bracketed.split_once(']').map(|(host, _)| host);
    }
    let host = host_port.split(':').next()?;
    (!host.is_empty()).then_some(host)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_hosts_are_not_remote() {
        assert!(!is_remote_url("http://localhost:11434"));
        assert!(!is_remote_url("http://127.0.0.1:11434/"));
        assert!(!is_remote_url("http://0.0.0.0"));
        assert!(!is_remote_url("http://[::1]:11434"));
        assert!(!is_remote_url("http://LOCALHOST:11434"));
    }

    #[test]
    fn other_hosts_are_remote() {
        assert!(is_remote_url("https://ollama.example.org"));
        assert!(is_remote_url("http://user:pw@10.0.0.5:11434/api"));
        assert!(is_remote_url("not a url"));
        assert!(is_remote_url(""));
    }

    #[test]
    fn userinfo_does_not_hide_local_host() {
        assert!(!is_remote_url("http://user:pw@localhost:11434"));
    }

    #[test]
    fn request_body_matches_generate_api() {
        let body = GenerateRequest {
            model: "deepseek-coder:6.7b",
            prompt: "hi",
            stream: false,
            options: Sampling {
                temperature: 0.1,
                top_p: 0.9,
                top_k: 40,
                num_predict: None,
            },
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["stream"], false);
        assert_eq!(value["options"]["top_k"], 40);
        assert!(value["options"].get("num_predict").is_none());
    }

    #[test]
    fn basic_auth_header_is_base64() {
        let transport = HttpTransport::new(
            "http://localhost:11434/",
            Duration::from_secs(1),
            Duration::from_secs(1),
        )
        .with_basic_auth("user", "pass");
        assert_eq!(transport.authorization.as_deref(), Some("Basic dXNlcjpwYXNz"));
        assert_eq!(transport.base_url, "http://localhost:11434");
    }

    #[test]
    fn closed_port_maps_to_connection_refused() {
        let transport = HttpTransport::new(
            "http://127.0.0.1:9",
            Duration::from_secs(2),
            Duration::from_secs(2),
        );
        assert!(!transport.probe());
        assert!(matches!(
            transport.generate("m", "p"),
            Err(OracleError::ConnectionRefused(_)) | Err(OracleError::Timeout(_))
        ));
    }
}

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{ArgAction, Args, Parser, Subcommand};
use examiner_core::llm::openai::{DEFAULT_API_BASE, DEFAULT_MODEL};
use examiner_core::{ErrorPolicy, EvaluatorOptions, OpenAiConfig, OutputMode};
use tracing::Level;

#[derive(Debug, Parser)]
#[command(name = "examinerd", version, about = "Band Examiner essay evaluation service")]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit JSON-formatted log lines.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(flatten)]
    pub serve: ServeArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    pub fn log_level(&self) -> Level {
        match self.verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Commands {
    /// Start the HTTP server (default if no subcommand given).
    Serve,

    /// Print the resolved configuration (api key redacted) and exit.
    Config,
}

/// Server settings. Every flag falls back to an environment variable.
#[derive(Debug, Clone, Args)]
pub struct ServeArgs {
    #[arg(long, env = "EXAMINER_HOST", default_value = "0.0.0.0", global = true)]
    pub host: String,

    #[arg(long, env = "EXAMINER_PORT", default_value_t = 3003, global = true)]
    pub port: u16,

    /// Credential for the model provider.
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true, global = true)]
    pub api_key: Option<String>,

    #[arg(long, env = "EXAMINER_MODEL", default_value = DEFAULT_MODEL, global = true)]
    pub model: String,

    /// Base URL of an OpenAI-compatible API.
    #[arg(long, env = "EXAMINER_API_BASE", default_value = DEFAULT_API_BASE, global = true)]
    pub api_base: String,

    /// `structured` (provider-enforced schema) or `text` (fenced JSON).
    #[arg(long, env = "EXAMINER_OUTPUT_MODE", default_value = "structured", global = true)]
    pub output_mode: OutputMode,

    /// `status` (HTTP 500 on model failure) or `embedded` (200 with `error`).
    #[arg(long, env = "EXAMINER_ERROR_POLICY", default_value = "status", global = true)]
    pub error_policy: ErrorPolicy,

    /// Keep the model's own overall band instead of recomputing it.
    #[arg(long, env = "EXAMINER_TRUST_MODEL_BAND", global = true)]
    pub trust_model_band: bool,

    #[arg(long, env = "EXAMINER_MODEL_TIMEOUT_SECS", default_value_t = 60, global = true)]
    pub model_timeout_secs: u64,

    /// Request body limit, covering all uploaded images together.
    #[arg(long, env = "EXAMINER_MAX_UPLOAD_BYTES", default_value_t = 10 * 1024 * 1024, global = true)]
    pub max_upload_bytes: usize,
}

impl ServeArgs {
    pub fn addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }

    pub fn model_timeout(&self) -> Duration {
        Duration::from_secs(self.model_timeout_secs)
    }

    /// Provider configuration; fails when no api key is configured.
    pub fn openai_config(&self) -> anyhow::Result<OpenAiConfig> {
        let Some(api_key) = self.api_key.as_deref().filter(|k| !k.trim().is_empty()) else {
            bail!("OPENAI_API_KEY is not set (pass --api-key or set the environment variable)");
        };
        Ok(OpenAiConfig::new(api_key)?
            .with_model(&self.model)
            .with_api_base(&self.api_base)
            .with_timeout(self.model_timeout()))
    }

    pub fn evaluator_options(&self) -> EvaluatorOptions {
        EvaluatorOptions {
            output_mode: self.output_mode,
            error_policy: self.error_policy,
            trust_model_band: self.trust_model_band,
            model_timeout: Some(self.model_timeout()),
        }
    }

    /// Human-readable summary with the api key redacted.
    pub fn describe(&self) -> String {
        let key = match self.api_key.as_deref() {
            Some(k) if !k.is_empty() => "<set>",
            _ => "<missing>",
        };
        format!(
            "listen           = {}:{}\n\
             api_key          = {key}\n\
             model            = {}\n\
             api_base         = {}\n\
             output_mode      = {}\n\
             error_policy     = {}\n\
             trust_model_band = {}\n\
             model_timeout    = {}s\n\
             max_upload_bytes = {}",
            self.host,
            self.port,
            self.model,
            self.api_base,
            self.output_mode,
            self.error_policy,
            self.trust_model_band,
            self.model_timeout_secs,
            self.max_upload_bytes,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_parse_without_subcommand() {
        let cli = Cli::try_parse_from(["examinerd", "--api-key", "sk-test"]).unwrap();
        assert_eq!(cli.command, None);
        assert_eq!(cli.serve.port, 3003);
        assert_eq!(cli.serve.output_mode, OutputMode::Structured);
        assert_eq!(cli.serve.error_policy, ErrorPolicy::Status);
        assert!(!cli.serve.trust_model_band);
        assert_eq!(cli.log_level(), Level::INFO);
    }

    #[test]
    fn flags_after_subcommand_are_accepted() {
        let cli = Cli::try_parse_from([
            "examinerd",
            "serve",
            "--port",
            "8080",
            "--output-mode",
            "text",
            "--error-policy",
            "embedded",
            "-vv",
        ])
        .unwrap();
        assert_eq!(cli.command, Some(Commands::Serve));
        assert_eq!(cli.serve.port, 8080);
        assert_eq!(cli.serve.output_mode, OutputMode::Text);
        assert_eq!(cli.serve.error_policy, ErrorPolicy::Embedded);
        assert_eq!(cli.log_level(), Level::TRACE);
    }

    #[test]
    fn bad_output_mode_is_rejected() {
        assert!(Cli::try_parse_from(["examinerd", "--output-mode", "xml"]).is_err());
    }

    #[test]
    fn missing_api_key_fails_fast() {
        let mut cli = Cli::try_parse_from(["examinerd"]).unwrap();
        cli.serve.api_key = None;
        let err = cli.serve.openai_config().unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"));

        cli.serve.api_key = Some("   ".to_string());
        assert!(cli.serve.openai_config().is_err());
    }

    #[test]
    fn describe_redacts_key() {
        let cli = Cli::try_parse_from(["examinerd", "--api-key", "sk-secret"]).unwrap();
        let text = cli.serve.describe();
        assert!(text.contains("api_key          = <set>"));
        assert!(!text.contains("sk-secret"));
    }
}

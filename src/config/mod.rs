use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::cli::Cli;
use crate::transcribe::{FormattingOptions, LanguagePreference, DEFAULT_LANGUAGE};

/// Config file looked up in the current directory
const LOCAL_CONFIG_FILE: &str = "yt-transcript.yaml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Preferred transcript languages, in order
    pub languages: Vec<String>,

    /// Directory transcripts are saved to
    pub output_dir: PathBuf,

    /// Keep bracketed stage directions such as [Music]
    pub keep_stage_directions: bool,

    /// HTTP client settings
    pub http: HttpConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// User-Agent sent with every request
    pub user_agent: String,

    /// Accept-Language sent to YouTube
    pub accept_language: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            languages: vec![DEFAULT_LANGUAGE.to_string()],
            output_dir: PathBuf::from("."),
            keep_stage_directions: false,
            http: HttpConfig::default(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36".to_string(),
            accept_language: "en-US".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Where the transcript goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// Print only, write nothing
    Console,
    /// Print and save into this directory
    Directory(PathBuf),
}

/// Everything one run needs, resolved from the CLI and the config file
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub input: String,
    pub languages: LanguagePreference,
    pub formatting: FormattingOptions,
    pub target: OutputTarget,
}

impl Config {
    /// Load configuration from `explicit`, or the first default location
    /// that exists. Nothing found means defaults; the file is never written.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => Self::default_path(),
        };

        match path {
            Some(path) => {
                tracing::debug!("Loading config from {}", path.display());
                let content = fs_err::read_to_string(&path)
                    .context("Failed to read config file")?;
                Self::from_yaml(&content)
                    .with_context(|| format!("Invalid config file {}", path.display()))
            }
            None => Ok(Self::default()),
        }
    }

    /// Parse and validate a YAML document
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Config =
            serde_yaml::from_str(content).context("Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    /// First existing config file: local, then the user config directory
    fn default_path() -> Option<PathBuf> {
        let local_config = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_config.exists() {
            return Some(local_config);
        }

        dirs::config_dir()
            .map(|dir| dir.join("yt-transcript").join("config.yaml"))
            .filter(|path| path.exists())
    }

    fn validate(&self) -> Result<()> {
        if self.languages.iter().all(|code| code.trim().is_empty()) {
            anyhow::bail!("At least one language must be configured");
        }

        if self.http.timeout_secs == 0 {
            anyhow::bail!("HTTP timeout must be greater than zero");
        }

        Ok(())
    }

    /// Combine command line flags with this configuration; flags win
    pub fn run_request(&self, cli: &Cli) -> RunRequest {
        let languages = if cli.languages.is_empty() {
            LanguagePreference::new(&self.languages)
        } else {
            LanguagePreference::new(&cli.languages)
        };

        let target = if cli.no_save {
            OutputTarget::Console
        } else {
            OutputTarget::Directory(
                cli.output_dir
                    .clone()
                    .unwrap_or_else(|| self.output_dir.clone()),
            )
        };

        RunRequest {
            input: cli.url.clone(),
            languages,
            formatting: FormattingOptions {
                strip_stage_directions: !(cli.keep_stage || self.keep_stage_directions),
            },
            target,
        }
    }
}

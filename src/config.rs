use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

use crate::coach::{DEFAULT_TEXT_MODEL, DEFAULT_TEXT_URL};
use crate::live::LiveConfig;

/// Environment prefix; `TRAINER__GEMINI__API_KEY` overrides `gemini.api_key`
const ENV_PREFIX: &str = "TRAINER";

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub gemini: GeminiConfig,
    pub audio: AudioConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct GeminiConfig {
    pub api_key: String,
    pub live_url: String,
    pub live_model: String,
    pub text_url: String,
    pub text_model: String,
}

#[derive(Debug, Deserialize)]
pub struct AudioConfig {
    pub input_sample_rate: u32,
    pub output_sample_rate: u32,
    /// Samples per captured frame
    pub frame_size: usize,
    /// WAV file replayed as the agent's microphone
    pub input_wav: Option<PathBuf>,
    /// Where customer audio recordings are written
    pub output_dir: PathBuf,
}

impl Config {
    /// Load defaults, then `path` if it exists, then the environment.
    pub fn load(path: &str) -> Result<Self> {
        let live = LiveConfig::default();

        let settings = config::Config::builder()
            .set_default("service.name", "reservation-trainer")?
            .set_default("service.http.bind", "127.0.0.1")?
            .set_default("service.http.port", 8080)?
            .set_default("gemini.api_key", "")?
            .set_default("gemini.live_url", live.url)?
            .set_default("gemini.live_model", live.model)?
            .set_default("gemini.text_url", DEFAULT_TEXT_URL)?
            .set_default("gemini.text_model", DEFAULT_TEXT_MODEL)?
            .set_default("audio.input_sample_rate", live.input_sample_rate as i64)?
            .set_default("audio.output_sample_rate", live.output_sample_rate as i64)?
            .set_default("audio.frame_size", 4096)?
            .set_default("audio.output_dir", "recordings")?
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()
            .with_context(|| format!("Failed to load configuration from {}", path))?;

        let mut config: Config = settings
            .try_deserialize()
            .context("Invalid configuration")?;

        if config.gemini.api_key.is_empty() {
            if let Ok(key) = std::env::var("GEMINI_API_KEY") {
                config.gemini.api_key = key;
            }
        }

        Ok(config)
    }

    pub fn live(&self) -> LiveConfig {
        LiveConfig {
            url: self.gemini.live_url.clone(),
            api_key: self.gemini.api_key.clone(),
            model: self.gemini.live_model.clone(),
            input_sample_rate: self.audio.input_sample_rate,
            output_sample_rate: self.audio.output_sample_rate,
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.service.http.bind, self.service.http.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[service.http]\nport = 9191\n\n[audio]\nframe_size = 2048\ninput_wav = \"agent.wav\""
        )
        .unwrap();

        let config = Config::load(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.service.http.port, 9191);
        assert_eq!(config.service.http.bind, "127.0.0.1");
        assert_eq!(config.audio.frame_size, 2048);
        assert_eq!(config.audio.input_wav, Some(PathBuf::from("agent.wav")));
        assert_eq!(config.audio.output_sample_rate, 24000);
        assert_eq!(config.gemini.text_model, DEFAULT_TEXT_MODEL);
        assert_eq!(config.bind_addr(), "127.0.0.1:9191");
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = Config::load("/nonexistent/reservation-trainer").unwrap();
        assert_eq!(config.service.name, "reservation-trainer");
        assert_eq!(config.audio.input_sample_rate, 16000);
        assert_eq!(config.audio.frame_size, 4096);
        assert!(config.audio.input_wav.is_none());

        let live = config.live();
        assert_eq!(live.model, crate::live::LiveConfig::default().model);
    }
}

//! Server configuration: TOML file named by `BILLSPLIT_CONFIG`, then environment overrides.

use std::env;
use std::path::Path;

use billsplit_ocr::{OcrConfig, ParserConfig};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Toml(#[from] toml::de::Error),
    #[error(transparent)]
    Parser(#[from] billsplit_ocr::ConfigError),
    #[error("Invalid value for {name}: {value}")]
    Env { name: &'static str, value: String },
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub ocr: OcrConfig,
    pub parser: ParserConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Browser origins allowed to call the API.
    pub cors_origins: Vec<String>,
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

impl Config {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.parser.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Defaults, or the file named by `BILLSPLIT_CONFIG`, with `BILLSPLIT_HOST` and
    /// `BILLSPLIT_PORT` applied on top.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match env::var("BILLSPLIT_CONFIG") {
            Ok(path) => {
                tracing::info!("Loading config from {path}");
                Self::from_file(Path::new(&path))?
            }
            Err(_) => Self::default(),
        };
        config.apply_overrides(|name| env::var(name).ok())?;
        Ok(config)
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(host) = lookup("BILLSPLIT_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("BILLSPLIT_PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| ConfigError::Env { name: "BILLSPLIT_PORT", value: port })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use billsplit_ocr::BackendKind;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn defaults() {
        let c = Config::default();
        assert_eq!(c.server.port, 8000);
        assert_eq!(c.server.cors_origins.len(), 2);
        assert_eq!(c.ocr.backends, [BackendKind::Tesseract]);
        assert_eq!(c.parser, ParserConfig::default());
    }

    #[test]
    fn reads_all_sections_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
            [server]
            port = 9090
            cors_origins = ["https://split.example"]

            [ocr]
            backends = ["tesseract", "mock"]
            tesseract_lang = "deu"

            [parser]
            tax_keywords = ["mwst", "tax"]
            "#
        )
        .unwrap();

        let c = Config::from_file(file.path()).unwrap();
        assert_eq!(c.server.port, 9090);
        assert_eq!(c.server.host, "0.0.0.0");
        assert_eq!(c.server.cors_origins, ["https://split.example"]);
        assert_eq!(c.ocr.backends, [BackendKind::Tesseract, BackendKind::Mock]);
        assert_eq!(c.ocr.tesseract_lang, "deu");
        assert_eq!(c.parser.tax_keywords, ["mwst", "tax"]);
        assert_eq!(c.parser.total_keywords, ParserConfig::default().total_keywords);
    }

    #[test]
    fn invalid_parser_section_is_rejected() {
        let err = Config::from_toml_str("[parser]\nsimilarity_threshold = 2.0").unwrap_err();
        assert!(matches!(err, ConfigError::Parser(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = Config::from_file(Path::new("/nonexistent/billsplit.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn env_overrides_win() {
        let vars: HashMap<&str, &str> = [("BILLSPLIT_HOST", "127.0.0.1"), ("BILLSPLIT_PORT", "7000")].into();
        let mut c = Config::default();
        c.apply_overrides(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(c.server.host, "127.0.0.1");
        assert_eq!(c.server.port, 7000);
    }

    #[test]
    fn bad_port_override_is_an_error() {
        let mut c = Config::default();
        let err = c
            .apply_overrides(|k| (k == "BILLSPLIT_PORT").then(|| "eighty".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("BILLSPLIT_PORT"));
    }
}

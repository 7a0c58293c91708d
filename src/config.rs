use crate::error::{AppError, Result};
use crate::models::{ClimateRequest, OutputFormat, SiloFormat};
use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub silo: SiloConfig,
    pub request: RequestConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SiloConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    pub username: String,
    pub password: String,
    #[serde(default = "default_timeout", deserialize_with = "deserialize_u64")]
    pub timeout_seconds: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_base_url() -> String {
    "https://www.longpaddock.qld.gov.au/cgi-bin/silo".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

/// Custom deserializer that handles a number given either bare or quoted
///
/// Accepts:
/// - `timeout_seconds: 30` (number)
/// - `timeout_seconds: "30"` (string that parses to number)
/// - `timeout_seconds: ${SILO_TIMEOUT}` (env var substituted to either)
fn deserialize_u64<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberValue {
        Number(u64),
        String(String),
    }

    match NumberValue::deserialize(deserializer)? {
        NumberValue::Number(n) => Ok(n),
        NumberValue::String(s) => s
            .parse::<u64>()
            .map_err(|_| serde::de::Error::custom(format!("Invalid number: '{}'", s))),
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RequestConfig {
    pub latitude: f64,
    pub longitude: f64,
    pub start_year: i32,
    pub end_year: i32,
    #[serde(default = "default_format")]
    pub format: SiloFormat,
}

fn default_format() -> SiloFormat {
    SiloFormat::Fao56
}

impl RequestConfig {
    pub fn to_request(&self) -> ClimateRequest {
        ClimateRequest::new(
            self.latitude,
            self.longitude,
            self.start_year,
            self.end_year,
            self.format,
        )
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub directory: PathBuf,
    #[serde(default = "default_output_formats")]
    pub formats: Vec<OutputFormat>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_dir(),
            formats: default_output_formats(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_output_formats() -> Vec<OutputFormat> {
    vec![OutputFormat::Met, OutputFormat::Csv]
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| AppError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        // Substitute environment variables
        let expanded = expand_env_vars(content)?;

        let config: Config = serde_yaml::from_str(&expanded)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    ///
    /// Checks for:
    /// - Unexpanded environment variables
    /// - Non-empty credentials
    /// - Valid HTTPS base URL
    /// - Ordered year range
    /// - At least one output format
    fn validate(&self) -> Result<()> {
        let fields_to_check = [
            ("SILO_USERNAME", &self.silo.username),
            ("SILO_PASSWORD", &self.silo.password),
        ];

        for (field_name, value) in &fields_to_check {
            if value.contains("${") {
                return Err(AppError::Config(format!(
                    "{} environment variable is not set. \
                     Please set it or create a .env file. \
                     See .env.example for required variables.",
                    field_name
                )));
            }
            if value.trim().is_empty() {
                return Err(AppError::Config(format!("{} cannot be empty", field_name)));
            }
        }

        match url::Url::parse(&self.silo.base_url) {
            Ok(parsed) if parsed.scheme() != "https" => {
                return Err(AppError::Config(format!(
                    "SILO base_url must use HTTPS, got: {}",
                    parsed.scheme()
                )));
            }
            Ok(_) => {}
            Err(e) => {
                return Err(AppError::Config(format!(
                    "Invalid SILO base_url '{}': {}",
                    self.silo.base_url, e
                )));
            }
        }

        if self.silo.timeout_seconds == 0 {
            return Err(AppError::Config(
                "SILO timeout_seconds must be greater than 0".to_string(),
            ));
        }

        if self.request.start_year > self.request.end_year {
            return Err(AppError::Config(format!(
                "request.start_year {} is after request.end_year {}",
                self.request.start_year, self.request.end_year
            )));
        }

        if self.output.formats.is_empty() {
            return Err(AppError::Config(
                "output.formats must list at least one of: met, csv".to_string(),
            ));
        }

        Ok(())
    }
}

fn expand_env_vars(content: &str) -> Result<String> {
    let mut result = content.to_string();
    let re = regex_lite::Regex::new(r"\$\{([^}]+)\}")
        .map_err(|e| AppError::Config(format!("Invalid placeholder pattern: {}", e)))?;

    let mut missing_vars = Vec::new();

    for cap in re.captures_iter(content) {
        let var_name = &cap[1];
        match std::env::var(var_name) {
            Ok(value) => {
                result = result.replace(&cap[0], &value);
            }
            Err(_) => {
                missing_vars.push(var_name.to_string());
            }
        }
    }

    if !missing_vars.is_empty() {
        return Err(AppError::Config(format!(
            "Missing required environment variable{}: {}\n\n\
             To fix this:\n\
             1. Create a .env file in the project root (copy .env.example)\n\
             2. Set the missing variable{}: export {}=<value>\n\
             3. Or set {} in your environment before running",
            if missing_vars.len() > 1 { "s" } else { "" },
            missing_vars.join(", "),
            if missing_vars.len() > 1 { "s" } else { "" },
            missing_vars[0],
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = r#"
silo:
  username: someone@example.com
  password: secret
request:
  latitude: -31.75
  longitude: 117.6
  start_year: 1990
  end_year: 2024
"#;

    #[test]
    fn test_defaults_applied() {
        let config = Config::from_yaml(BASE).unwrap();
        assert_eq!(config.silo.timeout_seconds, 30);
        assert_eq!(config.silo.max_retries, 3);
        assert!(config.silo.base_url.starts_with("https://"));
        assert_eq!(config.request.format, SiloFormat::Fao56);
        assert_eq!(config.output.directory, PathBuf::from("."));
        assert_eq!(config.output.formats, vec![OutputFormat::Met, OutputFormat::Csv]);
    }

    #[test]
    fn test_request_from_config() {
        let config = Config::from_yaml(BASE).unwrap();
        let request = config.request.to_request();
        assert_eq!(request.latitude, -31.75);
        assert_eq!(request.start_year, 1990);
        assert_eq!(request.end_year, 2024);
    }

    #[test]
    fn test_format_and_outputs_parse() {
        let yaml = format!(
            "{}  format: daily\noutput:\n  directory: out\n  formats: [csv]\n",
            BASE
        );
        let config = Config::from_yaml(&yaml).unwrap();
        assert_eq!(config.request.format, SiloFormat::Daily);
        assert_eq!(config.output.formats, vec![OutputFormat::Csv]);
        assert_eq!(config.output.directory, PathBuf::from("out"));
    }

    #[test]
    fn test_rejects_http_base_url() {
        let yaml = BASE.replace(
            "silo:\n",
            "silo:\n  base_url: http://www.longpaddock.qld.gov.au/cgi-bin/silo\n",
        );
        let err = Config::from_yaml(&yaml).unwrap_err();
        assert!(err.to_string().contains("must use HTTPS"));
    }

    #[test]
    fn test_rejects_empty_formats() {
        let yaml = format!("{}output:\n  formats: []\n", BASE);
        let err = Config::from_yaml(&yaml).unwrap_err();
        assert!(err.to_string().contains("output.formats"));
    }

    #[test]
    fn test_missing_env_var_reported() {
        let yaml = BASE.replace("secret", "${SILO_MET_TEST_UNSET_PASSWORD}");
        let err = Config::from_yaml(&yaml).unwrap_err();
        assert!(err.to_string().contains("SILO_MET_TEST_UNSET_PASSWORD"));
    }

    #[test]
    fn test_timeout_deserialize_from_string() {
        let yaml = r#"
username: a
password: b
timeout_seconds: "45"
"#;
        let config: SiloConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.timeout_seconds, 45);
    }

    #[test]
    fn test_timeout_deserialize_invalid_string() {
        let yaml = r#"
username: a
password: b
timeout_seconds: "soon"
"#;
        let result: std::result::Result<SiloConfig, _> = serde_yaml::from_str(yaml);
        assert!(result.is_err());
    }
}

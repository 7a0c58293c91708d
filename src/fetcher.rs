use crate::config::SiloConfig;
use crate::error::{AppError, Result};
use crate::models::{ClimateRequest, RawObservationTable};
use crate::parser::Parser;
use crate::pipeline::DataSource;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, info, warn};

const DATA_DRILL_PATH: &str = "DataDrillDataset.php";

pub struct SiloClient {
    client: Client,
    base_url: String,
    username: String,
    password: String,
    max_retries: u32,
    retry_delay: Duration,
}

impl SiloClient {
    pub fn new(config: &SiloConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent("silo-met/0.1.0")
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
            max_retries: config.max_retries,
            retry_delay: Duration::from_secs(1),
        })
    }

    /// Base delay before the first retry; doubles on each further attempt
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Download the raw DataDrill response body for `request`
    pub async fn download(&self, request: &ClimateRequest) -> Result<String> {
        let url = format!("{}/{}", self.base_url, DATA_DRILL_PATH);
        let params = [
            ("format", request.format.as_str().to_string()),
            ("lat", round_coordinate(request.latitude)),
            ("lon", round_coordinate(request.longitude)),
            ("start", format!("{}0101", request.start_year)),
            ("finish", format!("{}1231", request.end_year)),
            ("username", self.username.clone()),
            ("password", self.password.clone()),
        ];
        debug!(
            "Requesting {} for lat={} lon={} {}-{}",
            url, params[1].1, params[2].1, request.start_year, request.end_year
        );

        retry_with_backoff(self.max_retries, self.retry_delay, || async {
            let response = self.client.get(&url).query(&params).send().await?;

            if response.status() == StatusCode::UNAUTHORIZED {
                return Err(AppError::Authentication(
                    "SILO rejected the credentials - check username and password".to_string(),
                ));
            }

            let content = response.error_for_status()?.text().await?;
            check_auth_message(&content)?;
            Ok(content)
        })
        .await
    }
}

#[async_trait::async_trait]
impl DataSource for SiloClient {
    async fn fetch(&self, request: &ClimateRequest) -> Result<RawObservationTable> {
        request.validate()?;

        let content = self.download(request).await.map_err(into_source_error)?;
        let (table, stats) = Parser::parse_response(&content).map_err(into_source_error)?;

        info!(
            "Parsed SILO response: {} rows, {} failures, {} columns",
            stats.parsed_successfully,
            stats.parse_failures,
            table.columns.len()
        );

        if table.is_empty() {
            return Err(AppError::DataSource(
                "SILO response contained no data rows".to_string(),
            ));
        }

        Ok(table)
    }
}

/// Transport and body failures leave the client as a single data-source kind;
/// authentication and request errors pass through.
fn into_source_error(err: AppError) -> AppError {
    match err {
        AppError::Http(e) => AppError::DataSource(format!("SILO request failed: {}", e)),
        AppError::Io(e) => AppError::DataSource(format!("SILO request failed: {}", e)),
        AppError::Parse(msg) => AppError::DataSource(format!("Malformed SILO response: {}", msg)),
        other => other,
    }
}

/// SILO answers bad credentials with a 200 and an explanatory text body
fn check_auth_message(content: &str) -> Result<()> {
    let lower = content.to_lowercase();
    if lower.contains("username")
        && lower.contains("password")
        && (lower.contains("invalid") || lower.contains("error"))
    {
        return Err(AppError::Authentication(
            "SILO rejected the credentials - check username and password".to_string(),
        ));
    }
    Ok(())
}

fn round_coordinate(value: f64) -> String {
    ((value * 10_000.0).round() / 10_000.0).to_string()
}

/// Retry a future with exponential backoff
async fn retry_with_backoff<F, Fut, T>(max_retries: u32, base_delay: Duration, mut f: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut retries = 0;
    loop {
        match f().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                retries += 1;

                if retries > max_retries {
                    return Err(e);
                }

                // Check if error is transient (retryable)
                let should_retry = match &e {
                    AppError::Http(reqwest_err) => {
                        // Retry on connection errors, timeouts, server errors (5xx)
                        reqwest_err.is_timeout()
                            || reqwest_err.is_connect()
                            || reqwest_err
                                .status()
                                .map(|s| s.is_server_error())
                                .unwrap_or(false)
                    }
                    AppError::Io(_) => true, // Retry IO errors
                    _ => false,              // Authentication, parse errors etc. are final
                };

                if !should_retry {
                    return Err(e);
                }

                let delay = base_delay * 2u32.pow(retries.saturating_sub(1));
                warn!(
                    "SILO request failed (attempt {}/{}): {}. Retrying in {:?}...",
                    retries, max_retries, e, delay
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

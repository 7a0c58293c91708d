use silo_met::config::Config;
use silo_met::fetcher::SiloClient;
use silo_met::pipeline::{export_series, Pipeline};
use silo_met::stats::{DerivedStats, SeriesSummary};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,silo_met=debug,reqwest=warn")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("SILO met export starting...");

    let config_path =
        std::env::var("SILO_MET_CONFIG").unwrap_or_else(|_| "config/config.yaml".to_string());
    let config = Config::load(&config_path).map_err(|e| {
        anyhow::anyhow!(
            "Failed to load configuration from {}: {}\n\n\
             Make sure:\n\
             1. The config file exists (or point SILO_MET_CONFIG at one)\n\
             2. SILO_USERNAME and SILO_PASSWORD are set (check .env.example)\n\
             3. Create a .env file if needed",
            config_path,
            e
        )
    })?;
    info!("Configuration loaded");

    let request = config.request.to_request();
    let client = SiloClient::new(&config.silo)?;
    let pipeline = Pipeline::new(client);

    let series = pipeline.fetch_series(&request).await.map_err(|e| {
        error!("SILO retrieval failed: {}", e);
        e
    })?;

    for format in &config.output.formats {
        let rendered = export_series(&series, &request, *format, &config.output.directory)?;
        info!("Created: {}", rendered.path.display());
    }

    let summary = SeriesSummary::from_series(&series);
    info!("Fetched {} days of data", summary.days);
    for (variable, mean) in &summary.means {
        match mean {
            Some(mean) => info!("{} mean: {:.2}", variable, mean),
            None => warn!("{} has no values in the requested range", variable),
        }
    }

    match DerivedStats::from_series(&series) {
        Ok(stats) => info!("TAV: {:.2} oC, AMP: {:.2} oC", stats.tav, stats.amp),
        Err(e) => warn!("{}", e),
    }

    info!("Export completed");
    Ok(())
}

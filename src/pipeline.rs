use crate::error::Result;
use crate::mapper::map_observations;
use crate::models::{
    ClimateRequest, NormalizedSeries, OutputFormat, RawObservationTable, RenderedFile,
};
use crate::render::{render_csv, render_met, MetHeader};
use crate::stats::DerivedStats;
use chrono::NaiveDate;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::{debug, info};

/// Anything that can answer a SILO point request with a raw table
#[async_trait::async_trait]
pub trait DataSource: Send + Sync {
    async fn fetch(&self, request: &ClimateRequest) -> Result<RawObservationTable>;
}

/// `SILO_{start}-{end}_{lat}_{lon}.{ext}` with coordinates to two decimals
pub fn output_filename(request: &ClimateRequest, format: OutputFormat) -> String {
    format!(
        "SILO_{}-{}_{:.2}_{:.2}.{}",
        request.start_year,
        request.end_year,
        request.latitude,
        request.longitude,
        format.extension()
    )
}

pub struct Pipeline<S> {
    source: S,
}

impl<S: DataSource> Pipeline<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Retrieve and normalize the series for `request`
    pub async fn fetch_series(&self, request: &ClimateRequest) -> Result<NormalizedSeries> {
        info!(
            "Fetching SILO {} data for ({}, {}) {}-{}",
            request.format, request.latitude, request.longitude, request.start_year, request.end_year
        );

        let raw = self.source.fetch(request).await?;
        let series = map_observations(&raw, request.format)?;

        info!("Normalized {} days of observations", series.len());
        Ok(series)
    }

    /// Fetch, normalize and write one output file
    pub async fn export(
        &self,
        request: &ClimateRequest,
        format: OutputFormat,
        output_dir: &Path,
    ) -> Result<RenderedFile> {
        let series = self.fetch_series(request).await?;
        export_series(&series, request, format, output_dir)
    }
}

/// Write an already normalized series. The .met path recomputes TAV and AMP
/// from `series` on every call.
pub fn export_series(
    series: &NormalizedSeries,
    request: &ClimateRequest,
    format: OutputFormat,
    output_dir: &Path,
) -> Result<RenderedFile> {
    std::fs::create_dir_all(output_dir)?;
    let path = output_dir.join(output_filename(request, format));

    match format {
        OutputFormat::Met => {
            let stats = DerivedStats::from_series(series)?;
            debug!("TAV = {:.2}, AMP = {:.2}", stats.tav, stats.amp);

            let header = MetHeader {
                latitude: request.latitude,
                longitude: request.longitude,
                start_year: request.start_year,
                extracted_on: today(),
            };
            std::fs::write(&path, render_met(series, &header, stats))?;
        }
        OutputFormat::Csv => {
            let file = File::create(&path)?;
            render_csv(series, BufWriter::new(file))?;
        }
    }

    info!("Wrote {} rows to {}", series.len(), path.display());
    Ok(RenderedFile { path, format })
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

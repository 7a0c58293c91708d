use crate::error::{AppError, Result};
use chrono::{Datelike, NaiveDate};
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;

/// Australian bounds accepted by SILO's gridded datasets
pub const LAT_MIN: f64 = -44.0;
pub const LAT_MAX: f64 = -10.0;
pub const LON_MIN: f64 = 112.0;
pub const LON_MAX: f64 = 154.0;

/// First year covered by the SILO patched point dataset
pub const FIRST_SILO_YEAR: i32 = 1889;

/// Response schema requested from SILO
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiloFormat {
    Fao56,
    Daily,
}

impl SiloFormat {
    /// Value of the `format` query parameter
    pub fn as_str(&self) -> &'static str {
        match self {
            SiloFormat::Fao56 => "fao56",
            SiloFormat::Daily => "daily",
        }
    }
}

impl fmt::Display for SiloFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Met,
    Csv,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Met => "met",
            OutputFormat::Csv => "csv",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClimateRequest {
    pub latitude: f64,
    pub longitude: f64,
    pub start_year: i32,
    pub end_year: i32,
    pub format: SiloFormat,
}

impl ClimateRequest {
    pub fn new(
        latitude: f64,
        longitude: f64,
        start_year: i32,
        end_year: i32,
        format: SiloFormat,
    ) -> Self {
        Self {
            latitude,
            longitude,
            start_year,
            end_year,
            format,
        }
    }

    /// Check coordinates against the Australian bounds and the year range
    /// against what SILO can serve.
    pub fn validate(&self) -> Result<()> {
        if !(LAT_MIN..=LAT_MAX).contains(&self.latitude) {
            return Err(AppError::InvalidCoordinates(format!(
                "Latitude {} is outside Australian bounds ({} to {})",
                self.latitude, LAT_MIN, LAT_MAX
            )));
        }
        if !(LON_MIN..=LON_MAX).contains(&self.longitude) {
            return Err(AppError::InvalidCoordinates(format!(
                "Longitude {} is outside Australian bounds ({} to {})",
                self.longitude, LON_MIN, LON_MAX
            )));
        }

        let current_year = chrono::Utc::now().year();
        if self.start_year < FIRST_SILO_YEAR || self.end_year > current_year {
            return Err(AppError::InvalidRequest(format!(
                "Date range must be between {} and {}, got {}-{}",
                FIRST_SILO_YEAR, current_year, self.start_year, self.end_year
            )));
        }
        if self.start_year > self.end_year {
            return Err(AppError::InvalidRequest(format!(
                "start_year {} must be <= end_year {}",
                self.start_year, self.end_year
            )));
        }

        Ok(())
    }
}

/// The seven variables every normalized observation carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClimateVariable {
    DailyRain,
    MaxTemp,
    MinTemp,
    Vp,
    Radiation,
    EtShortCrop,
    EvapPan,
}

impl ClimateVariable {
    pub const ALL: [ClimateVariable; 7] = [
        ClimateVariable::DailyRain,
        ClimateVariable::MaxTemp,
        ClimateVariable::MinTemp,
        ClimateVariable::Vp,
        ClimateVariable::Radiation,
        ClimateVariable::EtShortCrop,
        ClimateVariable::EvapPan,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ClimateVariable::DailyRain => "daily_rain",
            ClimateVariable::MaxTemp => "max_temp",
            ClimateVariable::MinTemp => "min_temp",
            ClimateVariable::Vp => "vp",
            ClimateVariable::Radiation => "radiation",
            ClimateVariable::EtShortCrop => "et_short_crop",
            ClimateVariable::EvapPan => "evap_pan",
        }
    }
}

impl fmt::Display for ClimateVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    pub date: NaiveDate,
    /// Raw field text, parallel to `RawObservationTable::columns`
    pub values: Vec<String>,
}

impl RawRow {
    pub fn get(&self, index: usize) -> Option<&str> {
        self.values.get(index).map(String::as_str)
    }
}

/// Table as returned by the data source, before any renaming
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawObservationTable {
    pub columns: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl RawObservationTable {
    /// Index of the first column matching any of `names`, compared
    /// case-insensitively. Earlier names take priority.
    pub fn column_index(&self, names: &[&str]) -> Option<usize> {
        names.iter().find_map(|name| {
            self.columns
                .iter()
                .position(|col| col.trim().eq_ignore_ascii_case(name.trim()))
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// SILO data source code, collapsed to the single digit used in .met files
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityFlag {
    Observed = 0,
    CompositeStation = 1,
    Interpolated = 2,
    AnomalyInterpolated = 3,
    SyntheticPan = 6,
    LongTermAverage = 7,
}

impl QualityFlag {
    /// Interpret a source flag field. SILO's two-digit codes (25, 26, 35, 75)
    /// map onto their one-digit equivalents; anything unrecognised counts as
    /// interpolated.
    pub fn from_source(raw: &str) -> Self {
        let Ok(code) = raw.trim().parse::<u32>() else {
            return QualityFlag::Interpolated;
        };
        match code {
            25 => QualityFlag::Interpolated,
            26 => QualityFlag::SyntheticPan,
            35 => QualityFlag::AnomalyInterpolated,
            75 => QualityFlag::LongTermAverage,
            10..=99 => Self::from_digit(code / 10),
            _ => Self::from_digit(code),
        }
    }

    fn from_digit(digit: u32) -> Self {
        match digit {
            0 => QualityFlag::Observed,
            1 => QualityFlag::CompositeStation,
            3 => QualityFlag::AnomalyInterpolated,
            6 => QualityFlag::SyntheticPan,
            7 => QualityFlag::LongTermAverage,
            _ => QualityFlag::Interpolated,
        }
    }

    pub fn digit(&self) -> char {
        match self {
            QualityFlag::Observed => '0',
            QualityFlag::CompositeStation => '1',
            QualityFlag::Interpolated => '2',
            QualityFlag::AnomalyInterpolated => '3',
            QualityFlag::SyntheticPan => '6',
            QualityFlag::LongTermAverage => '7',
        }
    }
}

/// Six-digit composite source code in the order
/// rain, max_temp, min_temp, vp, radiation, evaporation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualityCode {
    pub rain: QualityFlag,
    pub max_temp: QualityFlag,
    pub min_temp: QualityFlag,
    pub vp: QualityFlag,
    pub radiation: QualityFlag,
    pub evap: QualityFlag,
}

impl QualityCode {
    pub fn flags(&self) -> [QualityFlag; 6] {
        [
            self.rain,
            self.max_temp,
            self.min_temp,
            self.vp,
            self.radiation,
            self.evap,
        ]
    }
}

impl Default for QualityCode {
    fn default() -> Self {
        Self {
            rain: QualityFlag::Interpolated,
            max_temp: QualityFlag::Interpolated,
            min_temp: QualityFlag::Interpolated,
            vp: QualityFlag::Interpolated,
            radiation: QualityFlag::Interpolated,
            evap: QualityFlag::Interpolated,
        }
    }
}

impl fmt::Display for QualityCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code: String = self.flags().iter().map(QualityFlag::digit).collect();
        f.pad(&code)
    }
}

/// One calendar day with all seven variables. `None` means SILO had no value
/// for that day.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedObservation {
    pub date: NaiveDate,
    pub daily_rain: Option<f64>,
    pub max_temp: Option<f64>,
    pub min_temp: Option<f64>,
    pub vp: Option<f64>,
    pub radiation: Option<f64>,
    pub et_short_crop: Option<f64>,
    pub evap_pan: Option<f64>,
    pub code: QualityCode,
}

impl NormalizedObservation {
    pub fn year(&self) -> i32 {
        self.date.year()
    }

    /// Day of year, 1-366
    pub fn day_of_year(&self) -> u32 {
        self.date.ordinal()
    }

    pub fn value(&self, variable: ClimateVariable) -> Option<f64> {
        match variable {
            ClimateVariable::DailyRain => self.daily_rain,
            ClimateVariable::MaxTemp => self.max_temp,
            ClimateVariable::MinTemp => self.min_temp,
            ClimateVariable::Vp => self.vp,
            ClimateVariable::Radiation => self.radiation,
            ClimateVariable::EtShortCrop => self.et_short_crop,
            ClimateVariable::EvapPan => self.evap_pan,
        }
    }

    /// (max + min) / 2, when both temperatures are present
    pub fn mean_temp(&self) -> Option<f64> {
        match (self.max_temp, self.min_temp) {
            (Some(max), Some(min)) => Some((max + min) / 2.0),
            _ => None,
        }
    }
}

/// Chronological daily observations
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedSeries {
    observations: Vec<NormalizedObservation>,
}

impl NormalizedSeries {
    pub fn new(mut observations: Vec<NormalizedObservation>) -> Self {
        observations.sort_by_key(|obs| obs.date);
        Self { observations }
    }

    pub fn observations(&self) -> &[NormalizedObservation] {
        &self.observations
    }

    pub fn iter(&self) -> std::slice::Iter<'_, NormalizedObservation> {
        self.observations.iter()
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

impl<'a> IntoIterator for &'a NormalizedSeries {
    type Item = &'a NormalizedObservation;
    type IntoIter = std::slice::Iter<'a, NormalizedObservation>;

    fn into_iter(self) -> Self::IntoIter {
        self.observations.iter()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedFile {
    pub path: PathBuf,
    pub format: OutputFormat,
}

//! Renames SILO's response columns onto the seven canonical variables.

use crate::error::{AppError, Result};
use crate::models::{
    ClimateVariable, NormalizedObservation, NormalizedSeries, QualityCode, QualityFlag,
    RawObservationTable, RawRow, SiloFormat,
};
use tracing::debug;

/// Sentinel values SILO writes in place of missing data
const MISSING_CODES: [f64; 4] = [-9999.0, -999.0, -99.9, -99.0];

/// Source flag columns for the six quality code positions:
/// rain, max_temp, min_temp, vp, radiation, evaporation
const FLAG_COLUMNS: [&str; 6] = ["Srn", "Smx", "Smn", "Svp", "Ssl", "Sev"];

/// Accepted SILO column names for `variable`, primary name first
pub fn source_columns(format: SiloFormat, variable: ClimateVariable) -> &'static [&'static str] {
    match (format, variable) {
        (SiloFormat::Fao56, ClimateVariable::DailyRain) => &["Rain", "Rainfall"],
        (SiloFormat::Fao56, ClimateVariable::MaxTemp) => &["T.Max"],
        (SiloFormat::Fao56, ClimateVariable::MinTemp) => &["T.Min"],
        (SiloFormat::Fao56, ClimateVariable::Vp) => &["VP"],
        (SiloFormat::Fao56, ClimateVariable::Radiation) => &["Radn", "Radiation"],
        (SiloFormat::Fao56, ClimateVariable::EtShortCrop) => &["FAO56"],
        (SiloFormat::Fao56, ClimateVariable::EvapPan) => &["Evap", "Evaporation"],
        (SiloFormat::Daily, ClimateVariable::DailyRain) => &["Rain"],
        (SiloFormat::Daily, ClimateVariable::MaxTemp) => &["Tmax"],
        (SiloFormat::Daily, ClimateVariable::MinTemp) => &["Tmin"],
        (SiloFormat::Daily, ClimateVariable::Vp) => &["VP"],
        (SiloFormat::Daily, ClimateVariable::Radiation) => &["Radiation"],
        (SiloFormat::Daily, ClimateVariable::EtShortCrop) => &["FAO56"],
        (SiloFormat::Daily, ClimateVariable::EvapPan) => &["Evap"],
    }
}

/// Resolved column positions for one response
struct ColumnMap {
    values: [usize; 7],
    flags: [Option<usize>; 6],
}

impl ColumnMap {
    fn resolve(raw: &RawObservationTable, format: SiloFormat) -> Result<Self> {
        let mut values = [0usize; 7];
        let mut missing = Vec::new();

        for (slot, variable) in values.iter_mut().zip(ClimateVariable::ALL) {
            match raw.column_index(source_columns(format, variable)) {
                Some(idx) => *slot = idx,
                None => missing.push(variable.name().to_string()),
            }
        }

        if !missing.is_empty() {
            return Err(AppError::MissingVariable { variables: missing });
        }

        let flags = FLAG_COLUMNS.map(|name| raw.column_index(&[name]));
        debug!(
            "Resolved {} format columns: values={:?}, flags={:?}",
            format, values, flags
        );

        Ok(Self { values, flags })
    }

    fn value(&self, row: &RawRow, variable: ClimateVariable) -> Option<f64> {
        let idx = self.values[variable as usize];
        parse_value(row.get(idx))
    }

    fn flag(&self, row: &RawRow, position: usize) -> QualityFlag {
        self.flags[position]
            .and_then(|idx| row.get(idx))
            .map(QualityFlag::from_source)
            .unwrap_or(QualityFlag::Interpolated)
    }
}

/// Map a raw SILO table onto the canonical variables.
///
/// Fails with [`AppError::MissingVariable`] when any variable has no column
/// anywhere in the response. Individual missing values become `None`.
pub fn map_observations(raw: &RawObservationTable, format: SiloFormat) -> Result<NormalizedSeries> {
    let columns = ColumnMap::resolve(raw, format)?;

    let observations = raw
        .rows
        .iter()
        .map(|row| NormalizedObservation {
            date: row.date,
            daily_rain: columns.value(row, ClimateVariable::DailyRain),
            max_temp: columns.value(row, ClimateVariable::MaxTemp),
            min_temp: columns.value(row, ClimateVariable::MinTemp),
            vp: columns.value(row, ClimateVariable::Vp),
            radiation: columns.value(row, ClimateVariable::Radiation),
            et_short_crop: columns.value(row, ClimateVariable::EtShortCrop),
            evap_pan: columns.value(row, ClimateVariable::EvapPan),
            code: QualityCode {
                rain: columns.flag(row, 0),
                max_temp: columns.flag(row, 1),
                min_temp: columns.flag(row, 2),
                vp: columns.flag(row, 3),
                radiation: columns.flag(row, 4),
                evap: columns.flag(row, 5),
            },
        })
        .collect();

    Ok(NormalizedSeries::new(observations))
}

fn parse_value(s: Option<&str>) -> Option<f64> {
    let val = s?.trim().parse::<f64>().ok()?;
    if !val.is_finite() || MISSING_CODES.iter().any(|code| (val - code).abs() < 1e-6) {
        None
    } else {
        Some(val)
    }
}

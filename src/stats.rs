//! Long-term temperature statistics written into the .met header.

use crate::error::{AppError, Result};
use crate::models::{ClimateVariable, NormalizedSeries};
use chrono::Datelike;

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedStats {
    /// Annual average ambient temperature (oC)
    pub tav: f64,
    /// Annual amplitude in mean monthly temperature (oC)
    pub amp: f64,
}

impl DerivedStats {
    pub fn from_series(series: &NormalizedSeries) -> Result<Self> {
        Ok(Self {
            tav: calculate_tav(series)?,
            amp: calculate_amp(series)?,
        })
    }
}

/// Mean of the daily (max + min) / 2 over every day with both temperatures.
pub fn calculate_tav(series: &NormalizedSeries) -> Result<f64> {
    let (sum, count) = series
        .iter()
        .filter_map(|obs| obs.mean_temp())
        .fold((0.0, 0usize), |(sum, count), t| (sum + t, count + 1));

    if count == 0 {
        return Err(AppError::UndefinedStatistic {
            statistic: "TAV",
            reason: format!(
                "no day with both max_temp and min_temp among {} observations",
                series.len()
            ),
        });
    }

    Ok(sum / count as f64)
}

/// Difference between the warmest and coolest calendar-month mean of the
/// daily mean temperature, pooling all years in the series.
pub fn calculate_amp(series: &NormalizedSeries) -> Result<f64> {
    let mut sums = [0.0f64; 12];
    let mut counts = [0usize; 12];

    for obs in series {
        if let Some(t) = obs.mean_temp() {
            let month = obs.date.month0() as usize;
            sums[month] += t;
            counts[month] += 1;
        }
    }

    if let Some(empty) = counts.iter().position(|&c| c == 0) {
        return Err(AppError::UndefinedStatistic {
            statistic: "AMP",
            reason: format!("no valid temperature days in {}", MONTH_NAMES[empty]),
        });
    }

    let monthly_means: Vec<f64> = sums
        .iter()
        .zip(counts)
        .map(|(sum, count)| sum / count as f64)
        .collect();

    let max = monthly_means.iter().copied().fold(f64::MIN, f64::max);
    let min = monthly_means.iter().copied().fold(f64::MAX, f64::min);

    Ok(max - min)
}

/// Per-variable means over present values
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesSummary {
    pub days: usize,
    pub means: Vec<(ClimateVariable, Option<f64>)>,
}

impl SeriesSummary {
    pub fn from_series(series: &NormalizedSeries) -> Self {
        let means = ClimateVariable::ALL
            .iter()
            .map(|&variable| {
                let (sum, count) = series
                    .iter()
                    .filter_map(|obs| obs.value(variable))
                    .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
                let mean = (count > 0).then(|| sum / count as f64);
                (variable, mean)
            })
            .collect();

        Self {
            days: series.len(),
            means,
        }
    }

    pub fn mean(&self, variable: ClimateVariable) -> Option<f64> {
        self.means
            .iter()
            .find(|(v, _)| *v == variable)
            .and_then(|(_, mean)| *mean)
    }
}

use crate::error::Result;
use crate::models::{NormalizedObservation, NormalizedSeries};
use std::io;

pub const CSV_COLUMNS: [&str; 10] = [
    "year",
    "day",
    "radiation",
    "max_temp",
    "min_temp",
    "daily_rain",
    "evap_pan",
    "vp",
    "et_short_crop",
    "code",
];

/// One CSV row in `CSV_COLUMNS` order. Missing values are empty fields.
pub fn csv_record(obs: &NormalizedObservation) -> [String; 10] {
    [
        obs.year().to_string(),
        obs.day_of_year().to_string(),
        format_field(obs.radiation),
        format_field(obs.max_temp),
        format_field(obs.min_temp),
        format_field(obs.daily_rain),
        format_field(obs.evap_pan),
        format_field(obs.vp),
        format_field(obs.et_short_crop),
        obs.code.to_string(),
    ]
}

pub fn csv_records(series: &NormalizedSeries) -> impl Iterator<Item = [String; 10]> + '_ {
    series.iter().map(csv_record)
}

/// Write the header and one row per day. Evaporation is not shifted here.
pub fn render_csv<W: io::Write>(series: &NormalizedSeries, writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(CSV_COLUMNS)?;
    for record in csv_records(series) {
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

fn format_field(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{QualityCode, QualityFlag};
    use chrono::NaiveDate;

    fn sample() -> NormalizedSeries {
        let day = |d: u32, evap: Option<f64>| NormalizedObservation {
            date: NaiveDate::from_ymd_opt(2000, 1, d).unwrap(),
            daily_rain: Some(1.5),
            max_temp: Some(33.7),
            min_temp: None,
            vp: Some(12.7),
            radiation: Some(26.8),
            et_short_crop: Some(7.1),
            evap_pan: evap,
            code: QualityCode {
                rain: QualityFlag::Observed,
                ..QualityCode::default()
            },
        };
        NormalizedSeries::new(vec![day(1, Some(9.8)), day(2, Some(8.6))])
    }

    #[test]
    fn test_render_csv() {
        let mut buf = Vec::new();
        render_csv(&sample(), &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(
            lines[0],
            "year,day,radiation,max_temp,min_temp,daily_rain,evap_pan,vp,et_short_crop,code"
        );
        assert_eq!(lines[1], "2000,1,26.8,33.7,,1.5,9.8,12.7,7.1,022222");
        // No evaporation shift in CSV output
        assert_eq!(lines[2], "2000,2,26.8,33.7,,1.5,8.6,12.7,7.1,022222");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_csv_records_in_order() {
        let records: Vec<[String; 10]> = csv_records(&sample()).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0][1], "1");
        assert_eq!(records[1][1], "2");
        assert_eq!(records[0][4], "");
    }
}

//! APSIM `.met` fixed-width writer.
//!
//! APSIM reads pan evaporation at 9am, so the value SILO reports for day N
//! belongs on the row for day N-1. [`shift_evaporation`] performs that
//! realignment; every other column is written as-is.

use crate::models::{NormalizedObservation, NormalizedSeries};
use crate::stats::DerivedStats;
use chrono::NaiveDate;

/// Written in place of a value SILO did not supply
pub const MISSING_LITERAL: &str = "NaN";
pub const INDEX_WIDTH: usize = 4;
pub const VALUE_WIDTH: usize = 6;
pub const VALUE_PRECISION: usize = 1;
pub const CODE_WIDTH: usize = 7;
/// year, day, six value columns and the code, single-space separated
pub const LINE_WIDTH: usize = 2 * INDEX_WIDTH + 6 * VALUE_WIDTH + CODE_WIDTH + 8;

#[derive(Debug, Clone)]
pub struct MetHeader {
    pub latitude: f64,
    pub longitude: f64,
    pub start_year: i32,
    pub extracted_on: NaiveDate,
}

/// Realign evaporation so that position `i` holds the value measured on
/// day `i + 1`. The first measurement has no earlier row in range and is
/// dropped; the last row has no later measurement and gets `None`.
pub fn shift_evaporation(evap: &[Option<f64>]) -> Vec<Option<f64>> {
    evap.iter()
        .skip(1)
        .copied()
        .chain(std::iter::once(None))
        .take(evap.len())
        .collect()
}

pub fn render_met(series: &NormalizedSeries, header: &MetHeader, stats: DerivedStats) -> String {
    let mut out = String::new();
    write_header(&mut out, header, stats);

    let evap: Vec<Option<f64>> = series.iter().map(|obs| obs.evap_pan).collect();
    let shifted = shift_evaporation(&evap);

    for (obs, evap) in series.iter().zip(shifted) {
        out.push_str(&format_line(obs, evap));
        out.push('\n');
    }

    out
}

fn write_header(out: &mut String, header: &MetHeader, stats: DerivedStats) {
    out.push_str(&format!(
        "[weather.met.weather]\n\
         !Your Ref:  \"\n\
         latitude = {lat:.2}  (DECIMAL DEGREES)\n\
         longitude =  {lon:.2}  (DECIMAL DEGREES)\n\
         tav = {tav:.2} (oC) ! Annual average ambient temperature. Based on 1 Jan {start} to current.\n\
         amp = {amp:.2} (oC) ! Annual amplitude in mean monthly temperature. Based on 1 Jan {start} to current.\n\
         !Data Extracted from SILO 'BoM Only' dataset on {extracted} \" for APSIM\n\
         !As evaporation is read at 9am, it has been shifted to day before\n\
         !ie The evaporation measured on 20 April is in row for 19 April\n\
         !The 6 digit code indicates the source of the 6 data columns\n\
         !0 actual observation, 1 actual observation composite station\n\
         !2 interpolated from daily observations\n\
         !3 interpolated from daily observations using anomaly interpolation method for CLIMARC data\n\
         !6 synthetic pan\n\
         !7 interpolated long term averages\n\
         !more detailed two digit codes are available in SILO's 'Standard' format files\n\
         !\n\
         !For further information see the documentation on the datadrill\n\
         !  http://www.longpaddock.qld.gov.au/silo\n\
         !\n\
         year  day radn  maxt   mint  rain  evap    vp   code\n \
         ()   () (MJ/m^2) (oC)  (oC)  (mm)  (mm) (hPa)     ()\n",
        lat = header.latitude,
        lon = header.longitude,
        tav = stats.tav,
        amp = stats.amp,
        start = header.start_year,
        extracted = header.extracted_on.format("%d/%m/%Y"),
    ));
}

fn format_line(obs: &NormalizedObservation, evap: Option<f64>) -> String {
    format!(
        "{:0iw$} {:0iw$} {} {} {} {} {} {} {:>cw$}",
        obs.year(),
        obs.day_of_year(),
        format_value(obs.radiation),
        format_value(obs.max_temp),
        format_value(obs.min_temp),
        format_value(obs.daily_rain),
        format_value(evap),
        format_value(obs.vp),
        obs.code,
        iw = INDEX_WIDTH,
        cw = CODE_WIDTH,
    )
}

/// Values that do not fit the column (below -999.9 or above 9999.9) are
/// written as missing so every line keeps `LINE_WIDTH`.
fn format_value(value: Option<f64>) -> String {
    let formatted = value.map(|v| format!("{:>w$.p$}", v, w = VALUE_WIDTH, p = VALUE_PRECISION));
    match formatted {
        Some(text) if text.len() <= VALUE_WIDTH => text,
        _ => format!("{:>w$}", MISSING_LITERAL, w = VALUE_WIDTH),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::QualityCode;

    fn obs(date: NaiveDate, evap: Option<f64>) -> NormalizedObservation {
        NormalizedObservation {
            date,
            daily_rain: Some(0.0),
            max_temp: Some(33.7),
            min_temp: Some(16.4),
            vp: Some(12.7),
            radiation: Some(26.8),
            et_short_crop: Some(7.1),
            evap_pan: evap,
            code: QualityCode::default(),
        }
    }

    #[test]
    fn test_shift_evaporation() {
        let shifted = shift_evaporation(&[Some(1.0), Some(2.0), None, Some(4.0)]);
        assert_eq!(shifted, vec![Some(2.0), None, Some(4.0), None]);
    }

    #[test]
    fn test_shift_evaporation_edges() {
        assert!(shift_evaporation(&[]).is_empty());
        assert_eq!(shift_evaporation(&[Some(5.0)]), vec![None]);
    }

    #[test]
    fn test_format_line() {
        let date = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
        let line = format_line(&obs(date, None), Some(9.8));
        assert_eq!(
            line,
            "2000 0001   26.8   33.7   16.4    0.0    9.8   12.7  222222"
        );
        assert_eq!(line.len(), LINE_WIDTH);
    }

    #[test]
    fn test_format_missing_value() {
        assert_eq!(format_value(None), "   NaN");
        assert_eq!(format_value(Some(-2.26)), "  -2.3");
        assert_eq!(format_value(Some(0.0)), "   0.0");
    }

    #[test]
    fn test_format_value_out_of_range() {
        assert_eq!(format_value(Some(9999.9)), "9999.9");
        assert_eq!(format_value(Some(12345.6)), "   NaN");
        assert_eq!(format_value(Some(-1000.0)), "   NaN");
    }

    #[test]
    fn test_header_parameters() {
        let header = MetHeader {
            latitude: -31.75,
            longitude: 117.6,
            start_year: 1990,
            extracted_on: NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
        };
        let mut out = String::new();
        write_header(&mut out, &header, DerivedStats { tav: 17.456, amp: 12.0 });

        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "[weather.met.weather]");
        assert_eq!(lines[2], "latitude = -31.75  (DECIMAL DEGREES)");
        assert_eq!(lines[3], "longitude =  117.60  (DECIMAL DEGREES)");
        assert!(lines[4].starts_with("tav = 17.46 (oC)"));
        assert!(lines[5].starts_with("amp = 12.00 (oC)"));
        assert!(lines[6].contains("05/03/2024"));
        assert_eq!(lines[lines.len() - 2], "year  day radn  maxt   mint  rain  evap    vp   code");
        assert_eq!(lines[lines.len() - 1], " ()   () (MJ/m^2) (oC)  (oC)  (mm)  (mm) (hPa)     ()");
    }
}

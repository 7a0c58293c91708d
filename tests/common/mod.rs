#![allow(dead_code)]

use chrono::{Datelike, NaiveDate};

pub const FAO56_COLUMNS: [&str; 16] = [
    "Date", "Day", "Date2", "T.Max", "Smx", "T.Min", "Smn", "Rain", "Srn", "Evap", "Sev",
    "Radn", "Ssl", "VP", "Svp", "FAO56",
];

pub const DAILY_COLUMNS: [&str; 16] = [
    "Date", "Day", "Date2", "Tmax", "Smx", "Tmin", "Smn", "Rain", "Srn", "Evap", "Sev",
    "Radiation", "Ssl", "VP", "Svp", "FAO56",
];

/// Pan evaporation reported for `date`, unique per day of year
pub fn evap_for(date: NaiveDate) -> f64 {
    date.ordinal() as f64 / 10.0
}

fn field(column: &str, date: NaiveDate) -> String {
    match column {
        "Date" => date.format("%Y%m%d").to_string(),
        "Day" => date.ordinal().to_string(),
        "Date2" => date.format("%-d-%m-%Y").to_string(),
        "T.Max" | "Tmax" => "30.0".to_string(),
        "T.Min" | "Tmin" => "10.0".to_string(),
        "Rain" => "1.2".to_string(),
        "Evap" => format!("{:.1}", evap_for(date)),
        "Radn" | "Radiation" => "20.5".to_string(),
        "VP" => "12.3".to_string(),
        "FAO56" => "5.4".to_string(),
        "Srn" => "0".to_string(),
        "Sev" => "26".to_string(),
        _ => "25".to_string(),
    }
}

/// Build a SILO DataDrill style response covering whole calendar years
pub fn silo_response(columns: &[&str], start_year: i32, end_year: i32) -> String {
    let mut out = String::from(
        " Patched Point data for grid point\n Latitude: -31.75  Longitude: 117.60\n",
    );
    out.push_str(&columns.join(" "));
    out.push('\n');

    let start = NaiveDate::from_ymd_opt(start_year, 1, 1).unwrap();
    let end = NaiveDate::from_ymd_opt(end_year, 12, 31).unwrap();
    for date in start.iter_days().take_while(|d| *d <= end) {
        let row: Vec<String> = columns.iter().map(|c| field(c, date)).collect();
        out.push_str(&row.join("  "));
        out.push('\n');
    }
    out
}

pub fn without(columns: &[&'static str], drop: &str) -> Vec<&'static str> {
    columns.iter().copied().filter(|c| *c != drop).collect()
}

pub fn days_in_range(start_year: i32, end_year: i32) -> usize {
    (start_year..=end_year)
        .map(|y| if NaiveDate::from_ymd_opt(y, 2, 29).is_some() { 366 } else { 365 })
        .sum()
}

use crate::error::{AppError, Result};
use crate::models::{RawObservationTable, RawRow};
use chrono::NaiveDate;
use tracing::{debug, warn};

/// Default failure threshold - fail if more than 10% of data lines fail to parse
const DEFAULT_FAILURE_THRESHOLD: f64 = 0.10;

/// Column names that identify SILO's data header line
const HEADER_MARKERS: [&str; 6] = ["Rainfall", "Rain", "T.Max", "Tmax", "T.Min", "Tmin"];

#[derive(Debug, Clone, Default)]
pub struct ParseStats {
    pub total_lines: usize,
    pub parsed_successfully: usize,
    pub parse_failures: usize,
    /// Rows kept with fewer fields than the header; absent values read as missing
    pub short_rows: usize,
    pub empty_lines: usize,
    pub failure_rate: f64,
}

impl ParseStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn finalize(&mut self) {
        let non_empty = self.total_lines - self.empty_lines;
        self.failure_rate = if non_empty > 0 {
            self.parse_failures as f64 / non_empty as f64
        } else {
            0.0
        };
    }

    pub fn exceeds_threshold(&self, threshold: f64) -> bool {
        self.failure_rate > threshold
    }
}

pub struct Parser;

impl Parser {
    /// Parse a SILO DataDrill response body into a raw table
    pub fn parse_response(content: &str) -> Result<(RawObservationTable, ParseStats)> {
        Self::parse_response_with_threshold(content, DEFAULT_FAILURE_THRESHOLD)
    }

    /// Parse a SILO DataDrill response body with a custom failure threshold
    pub fn parse_response_with_threshold(
        content: &str,
        failure_threshold: f64,
    ) -> Result<(RawObservationTable, ParseStats)> {
        let lines: Vec<&str> = content.lines().collect();
        let header_idx = find_header_line(&lines).ok_or_else(|| {
            AppError::Parse("Could not find data start in SILO response".to_string())
        })?;

        let columns: Vec<String> = lines[header_idx]
            .split_whitespace()
            .map(str::to_string)
            .collect();

        if !columns
            .first()
            .is_some_and(|c| c.to_ascii_lowercase().contains("date"))
        {
            return Err(AppError::Parse(format!(
                "Could not find date column in SILO header: {:?}",
                columns
            )));
        }
        debug!("SILO header at line {}: {:?}", header_idx + 1, columns);

        let mut rows = Vec::new();
        let mut stats = ParseStats::new();

        for (offset, line) in lines[header_idx + 1..].iter().enumerate() {
            stats.total_lines += 1;

            let line = line.trim();
            if line.is_empty() {
                stats.empty_lines += 1;
                continue;
            }

            match parse_line(line) {
                Ok(row) => {
                    if row.values.len() < columns.len() {
                        stats.short_rows += 1;
                        warn!(
                            "Line {} for {} has {} of {} fields; trailing values treated as missing",
                            header_idx + offset + 2,
                            row.date,
                            row.values.len(),
                            columns.len()
                        );
                    }
                    rows.push(row);
                    stats.parsed_successfully += 1;
                }
                Err(e) => {
                    stats.parse_failures += 1;
                    warn!(
                        "Failed to parse line {} (failure {}/{}): {} - {}",
                        header_idx + offset + 2,
                        stats.parse_failures,
                        stats.total_lines - stats.empty_lines,
                        e,
                        line
                    );
                }
            }
        }

        stats.finalize();

        if stats.exceeds_threshold(failure_threshold) {
            return Err(AppError::Parse(format!(
                "Parse failure rate {:.1}% exceeds threshold {:.1}%: {} failures out of {} non-empty lines",
                stats.failure_rate * 100.0,
                failure_threshold * 100.0,
                stats.parse_failures,
                stats.total_lines - stats.empty_lines
            )));
        }

        rows.sort_by_key(|row| row.date);

        Ok((RawObservationTable { columns, rows }, stats))
    }
}

/// Locate the column header line. SILO prefixes its data with free-text
/// metadata, so look for a line naming the date and a rain or temperature
/// column; failing that, take the line before the first YYYYMMDD row.
fn find_header_line(lines: &[&str]) -> Option<usize> {
    let by_name = lines.iter().position(|line| {
        line.to_ascii_lowercase().contains("date")
            && line
                .split_whitespace()
                .any(|token| HEADER_MARKERS.contains(&token))
    });
    if by_name.is_some() {
        return by_name;
    }

    lines
        .iter()
        .position(|line| {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            tokens.len() > 5 && parse_date(tokens[0]).is_ok()
        })
        .filter(|&idx| idx > 0)
        .map(|idx| idx - 1)
}

/// A row is usable as long as it starts with a valid date
fn parse_line(line: &str) -> Result<RawRow> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let date = parse_date(fields[0])?;

    Ok(RawRow {
        date,
        values: fields.iter().map(|f| f.to_string()).collect(),
    })
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    // Date format: YYYYMMDD
    if s.len() != 8 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AppError::Parse(format!(
            "Expected YYYYMMDD date, got '{}'",
            s
        )));
    }

    NaiveDate::parse_from_str(s, "%Y%m%d")
        .map_err(|e| AppError::Parse(format!("Invalid date '{}': {}", s, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
 Patched point data for station: Grid point
 Latitude: -31.75  Longitude: 117.60
Date       Day Date2      T.Max Smx T.Min Smn Rain   Srn  Evap Sev Radn   Ssl VP    Svp  FAO56
20000101     1  1-01-2000  33.7  25  16.4  25   0.0  25   9.8  25  26.8  25  12.7  25    7.1
20000102     2  2-01-2000  31.2  25  15.0  25   2.4  25   8.6  25  25.1  25  13.0  25    6.5";

    #[test]
    fn test_parse_date() {
        let result = parse_date("20240115").unwrap();
        assert_eq!(result, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        assert!(parse_date("2024-01-15").is_err());
        assert!(parse_date("20241345").is_err());
    }

    #[test]
    fn test_find_header_by_column_names() {
        let lines: Vec<&str> = SAMPLE.lines().collect();
        assert_eq!(find_header_line(&lines), Some(2));
    }

    #[test]
    fn test_find_header_from_first_data_row() {
        let lines = vec![
            "metadata",
            "Stamp X1 X2 X3 X4 X5",
            "20000101 1.0 2.0 3.0 4.0 5.0",
        ];
        assert_eq!(find_header_line(&lines), Some(1));
    }

    #[test]
    fn test_parse_response() {
        let (table, stats) = Parser::parse_response(SAMPLE).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.columns[0], "Date");
        assert_eq!(table.column_index(&["T.Max"]), Some(3));
        assert_eq!(table.rows[1].get(3), Some("31.2"));
        assert_eq!(stats.parsed_successfully, 2);
        assert_eq!(stats.parse_failures, 0);
        assert_eq!(stats.short_rows, 0);
    }

    #[test]
    fn test_short_row_is_kept() {
        let content = format!("{}\n20000103     3  3-01-2000  30.0  25", SAMPLE);
        let (table, stats) = Parser::parse_response(&content).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(stats.parse_failures, 0);
        assert_eq!(stats.short_rows, 1);
        assert_eq!(table.rows[2].get(3), Some("30.0"));
        assert_eq!(table.rows[2].get(15), None);
    }

    #[test]
    fn test_parse_response_without_header() {
        let result = Parser::parse_response("nothing useful here\nat all");
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Could not find data start"));
    }

    #[test]
    fn test_parse_response_failure_threshold() {
        let content = format!("{}\ngarbage\nmore garbage", SAMPLE);
        // 2 failures out of 4 lines = 50%
        let result = Parser::parse_response(&content);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("exceeds threshold"));
    }
}

pub mod met;
pub mod table;

pub use met::{render_met, shift_evaporation, MetHeader};
pub use table::{csv_record, csv_records, render_csv, CSV_COLUMNS};

//! Output formatting for command replies

pub mod reports;

pub use reports::{format_compact_table, format_key_values, format_value};

// Market data domain
pub mod raw_table;
pub mod series;
pub mod symbol_filter;

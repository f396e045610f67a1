//! Delimited (CSV) file support

pub mod reader;

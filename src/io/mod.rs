//! File loading for directive targets

pub mod data_reader;

pub use data_reader::{DataFormat, DataReader};

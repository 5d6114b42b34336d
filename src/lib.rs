pub mod config;
pub mod domain;
pub mod error;
pub mod fs_util;
pub mod output;
pub mod processor;
pub mod reference;
pub mod runner;
pub mod sample;
pub mod sample_table;
pub mod samples;
pub mod schema;
pub mod store;
pub mod table;
pub mod value;

use std::io::{self, Write};

use serde::Serialize;

use crate::runner::RunState;

#[derive(Debug, Clone, Serialize)]
pub struct ResolveSummary {
    pub references: usize,
    pub samples: usize,
    pub remote_samples: usize,
    pub records: usize,
    pub sample_table: Option<String>,
    pub remote_sample_table: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub identifier: String,
    pub records: usize,
    pub sample_table: String,
    pub state: RunState,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_resolve(result: &ResolveSummary) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_run(result: &RunSummary) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

use std::io::{self, Write};

use crate::record::RunSummary;

pub struct JsonOutput;

impl JsonOutput {
    /// Pretty JSON of the published locations, one document on stdout.
    pub fn print_summary(summary: &RunSummary) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        serde_json::to_writer_pretty(&mut stdout, summary)?;
        writeln!(stdout)
    }
}

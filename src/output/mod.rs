//! Output formatting for scan results

use crate::network::PortResult;
use crate::scanner::ScanStats;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use std::time::Instant;

/// Output format options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    /// `Port 80: open`
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Invalid output format: {}", s)),
        }
    }
}

/// Writes one line per port result
pub struct Reporter<W: Write> {
    writer: W,
    format: OutputFormat,
}

impl<W: Write> Reporter<W> {
    pub fn new(writer: W, format: OutputFormat) -> Self {
        Self { writer, format }
    }

    /// Render results as they arrive
    ///
    /// Lines are written in the order the stream yields them; pair with a
    /// [`ScanHandle`](crate::scanner::ScanHandle) for ascending port order.
    pub async fn report<S>(&mut self, results: S) -> io::Result<ScanStats>
    where
        S: Stream<Item = PortResult>,
    {
        let started = Instant::now();
        let mut stats = ScanStats::new();
        futures::pin_mut!(results);

        while let Some(result) = results.next().await {
            self.write_result(&result)?;
            stats.record(&result);
        }

        self.writer.flush()?;
        stats.duration = started.elapsed();
        Ok(stats)
    }

    /// Render an already collected set of results
    pub fn report_all<'a, I>(&mut self, results: I) -> io::Result<ScanStats>
    where
        I: IntoIterator<Item = &'a PortResult>,
    {
        let started = Instant::now();
        let mut stats = ScanStats::new();

        for result in results {
            self.write_result(result)?;
            stats.record(result);
        }

        self.writer.flush()?;
        stats.duration = started.elapsed();
        Ok(stats)
    }

    fn write_result(&mut self, result: &PortResult) -> io::Result<()> {
        match self.format {
            OutputFormat::Text => writeln!(self.writer, "Port {}: {}", result.port, result.status),
            OutputFormat::Json => {
                serde_json::to_writer(&mut self.writer, result)?;
                writeln!(self.writer)
            }
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

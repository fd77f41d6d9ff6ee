//! Per-run mustering log and summary.
//!
//! Each run writes a header, one line per elapsed minute with the number of
//! agents mustered so far, and a footer with the total simulated time:
//!
//! ```text
//! Minute | AgentsMustered
//! Minute: 1 | Agents Mustered: 12
//! Minute: 2 | Agents Mustered: 57
//! TotalTimeSeconds,143.27
//! ```

use std::io::{self, Write};

use serde::{Deserialize, Serialize};

/// Run timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    /// Seconds between minute lines.
    pub log_interval: f32,
    /// Seconds after which an unfinished run is abandoned.
    pub timeout: f32,
    /// Fixed frame step used by [`SimulationEngine::run`].
    ///
    /// [`SimulationEngine::run`]: crate::engine::SimulationEngine::run
    pub frame_dt: f32,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            log_interval: 60.0,
            timeout: 1800.0,
            frame_dt: 1.0 / 30.0,
        }
    }
}

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunEnd {
    AllMustered,
    TimedOut,
}

/// Counters gathered over one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub mustered: usize,
    pub shrinks: usize,
    pub restores: usize,
    pub off_surface: usize,
    pub recoveries: usize,
    pub congestion_changes: usize,
}

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub agents: usize,
    pub elapsed_seconds: f64,
    pub end: RunEnd,
    pub stats: RunStats,
}

impl RunReport {
    pub fn all_mustered(&self) -> bool {
        self.end == RunEnd::AllMustered
    }
}

/// Line-oriented writer for one run.
pub struct RunLog<W: Write> {
    out: W,
    minutes: u32,
}

impl<W: Write> RunLog<W> {
    /// Start a log, writing the header.
    pub fn new(mut out: W) -> io::Result<Self> {
        writeln!(out, "Minute | AgentsMustered")?;
        Ok(Self { out, minutes: 0 })
    }

    pub fn minutes_logged(&self) -> u32 {
        self.minutes
    }

    /// Append the next minute line.
    pub fn log_minute(&mut self, mustered: usize) -> io::Result<()> {
        self.minutes += 1;
        writeln!(self.out, "Minute: {} | Agents Mustered: {}", self.minutes, mustered)
    }

    /// Write the footer and hand back the writer.
    pub fn finish(mut self, total_seconds: f64) -> io::Result<W> {
        writeln!(self.out, "TotalTimeSeconds,{:.2}", total_seconds)?;
        self.out.flush()?;
        Ok(self.out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format() {
        let mut log = RunLog::new(Vec::new()).unwrap();
        log.log_minute(12).unwrap();
        log.log_minute(57).unwrap();
        assert_eq!(log.minutes_logged(), 2);
        let bytes = log.finish(143.271).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "Minute | AgentsMustered\n\
             Minute: 1 | Agents Mustered: 12\n\
             Minute: 2 | Agents Mustered: 57\n\
             TotalTimeSeconds,143.27\n"
        );
    }
}

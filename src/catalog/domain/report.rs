//! Aggregate counts over the registry.

use super::{ServerEntry, StepStatus};
use std::fmt;

/// A working server and its tool count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingServer {
    /// Server name.
    pub name: String,
    /// Number of discovered tools.
    pub tool_count: usize,
}

/// Summary of registry progress.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogReport {
    /// Number of entries.
    pub total: usize,
    /// Entries with at least one completed attempt.
    pub tested: usize,
    /// Entries whose last discovery succeeded.
    pub discovery_successes: usize,
    /// Entries whose last generation succeeded.
    pub generation_successes: usize,
    /// Entries that are actually working.
    pub actually_working: usize,
    /// Entries whose last discovery was skipped.
    pub skipped: usize,
    /// Names of entries not yet tested, in registry order.
    pub pending: Vec<String>,
    /// Working servers in registry order.
    pub working: Vec<WorkingServer>,
}

impl CatalogReport {
    /// Builds a report from registry entries.
    #[must_use]
    pub fn from_entries(entries: &[ServerEntry]) -> Self {
        let mut report = Self {
            total: entries.len(),
            ..Self::default()
        };
        for entry in entries {
            if !entry.tested() {
                report.pending.push(entry.name().as_str().to_owned());
                continue;
            }
            report.tested += 1;
            match entry.discovery_status() {
                StepStatus::Success => report.discovery_successes += 1,
                StepStatus::Skipped => report.skipped += 1,
                StepStatus::Failure | StepStatus::NotAttempted => {}
            }
            if entry.generation_status().is_success() {
                report.generation_successes += 1;
            }
            if entry.actually_working() {
                report.actually_working += 1;
                report.working.push(WorkingServer {
                    name: entry.name().as_str().to_owned(),
                    tool_count: entry.tool_count(),
                });
            }
        }
        report
    }
}

impl fmt::Display for CatalogReport {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            formatter,
            "registry with {} entries, {} tested",
            self.total, self.tested
        )?;
        writeln!(formatter, "  discovery succeeded: {}", self.discovery_successes)?;
        writeln!(formatter, "  generation succeeded: {}", self.generation_successes)?;
        writeln!(formatter, "  actually working: {}", self.actually_working)?;
        writeln!(formatter, "  skipped: {}", self.skipped)?;
        writeln!(formatter, "  pending: {}", self.pending.len())?;
        for name in &self.pending {
            writeln!(formatter, "    - {name}")?;
        }
        if !self.working.is_empty() {
            writeln!(formatter, "working servers:")?;
            for server in &self.working {
                writeln!(formatter, "    - {} ({} tools)", server.name, server.tool_count)?;
            }
        }
        Ok(())
    }
}

/// Result of asking for a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportOutcome {
    /// No registry document exists.
    NoRegistry,
    /// The registry exists but holds no entries.
    Empty,
    /// The registry holds entries.
    Populated(CatalogReport),
}

impl fmt::Display for ReportOutcome {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoRegistry => writeln!(formatter, "no registry found"),
            Self::Empty => writeln!(formatter, "registry is empty"),
            Self::Populated(report) => report.fmt(formatter),
        }
    }
}

use std::fmt;

use super::ProfileSession;
use super::stats::StatementCounts;

/// Text rendering of a profile session.
pub struct ProfileReport<'a> {
    session: &'a ProfileSession,
}

impl<'a> ProfileReport<'a> {
    pub fn new(session: &'a ProfileSession) -> Self {
        Self { session }
    }

    pub fn log(&self) {
        for line in self.to_string().lines() {
            log::info!("{}", line);
        }
    }
}

fn write_counts(f: &mut fmt::Formatter<'_>, title: &str, counts: &StatementCounts) -> fmt::Result {
    if counts.is_empty() {
        return Ok(());
    }
    writeln!(f, "    {title}:")?;
    for (key, count) in counts {
        writeln!(f, "      {key} : {count} calls")?;
    }
    Ok(())
}

impl fmt::Display for ProfileReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let line = "#".repeat(60);
        writeln!(f, "{line}")?;
        writeln!(f, "Profile session '{}'", self.session.name())?;
        writeln!(f, "  started at {}", self.session.start_time().to_rfc3339())?;
        writeln!(f, "  total time {:?}", self.session.total_time())?;
        writeln!(f, "{line}")?;

        for (command, stats) in self.session.calculate_summary_statistics() {
            writeln!(f)?;
            writeln!(f, "Command : {command}")?;
            writeln!(f, "  executions       : {}", stats.execution_count)?;
            if stats.failed_count > 0 {
                writeln!(f, "  failed           : {}", stats.failed_count)?;
            }
            writeln!(f, "  avg time         : {:?}", stats.average_execution_time())?;
            writeln!(f, "  avg database time: {:?}", stats.average_database_time())?;
            write_counts(f, "selects", &stats.db_selects)?;
            write_counts(f, "inserts", &stats.db_inserts)?;
            write_counts(f, "updates", &stats.db_updates)?;
            write_counts(f, "deletes", &stats.db_deletes)?;
        }
        Ok(())
    }
}

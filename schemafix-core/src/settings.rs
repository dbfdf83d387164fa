//! Clap-free settings for the repair pipeline.

use camino::Utf8PathBuf;
use schemafix_types::options::{PlanOptions, RepairOptions};

/// Run mode controls exit-code semantics.
///
/// In `Embedded` mode residual errors map to exit 0, because the report
/// still carries the failing verdict for the host to act on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RunMode {
    #[default]
    Standalone,
    Embedded,
}

/// Settings for the repair pipeline.
#[derive(Debug, Clone)]
pub struct RepairSettings {
    pub out_dir: Utf8PathBuf,

    pub plan: PlanOptions,
    pub options: RepairOptions,

    /// Worker threads. `0` means one per available core.
    pub jobs: usize,

    pub mode: RunMode,
}

impl Default for RepairSettings {
    fn default() -> Self {
        Self {
            out_dir: Utf8PathBuf::from("artifacts/schemafix"),
            plan: PlanOptions::default(),
            options: RepairOptions::default(),
            jobs: 1,
            mode: RunMode::default(),
        }
    }
}

impl RepairSettings {
    /// Threads to use for `items` items: never more than there are items, never zero.
    pub fn effective_jobs(&self, items: usize) -> usize {
        let wanted = if self.jobs == 0 {
            std::thread::available_parallelism().map_or(1, |n| n.get())
        } else {
            self.jobs
        };
        wanted.min(items).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_jobs_is_bounded_by_items() {
        let settings = RepairSettings {
            jobs: 8,
            ..Default::default()
        };
        assert_eq!(settings.effective_jobs(3), 3);
        assert_eq!(settings.effective_jobs(0), 1);
        assert_eq!(RepairSettings::default().effective_jobs(10), 1);
    }

    #[test]
    fn zero_jobs_uses_available_cores() {
        let settings = RepairSettings {
            jobs: 0,
            ..Default::default()
        };
        assert!(settings.effective_jobs(1024) >= 1);
    }
}

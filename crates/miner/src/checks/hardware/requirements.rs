use super::memory::{convert_to_gb, get_memory_info};
use super::storage::get_storage_info;
use crate::checks::issue::{IssueReport, IssueType};
use crate::console::Console;
use log::debug;
use std::path::{Path, PathBuf};
use sysinfo::System;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RequirementThresholds {
    pub min_ram_gb: f64,
    pub min_cpu_cores: usize,
    pub min_free_disk_gb: f64,
}

impl Default for RequirementThresholds {
    fn default() -> Self {
        Self {
            min_ram_gb: 4.0,
            min_cpu_cores: 2,
            min_free_disk_gb: 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SystemSnapshot {
    pub ram_gb: f64,
    pub cpu_cores: usize,
    /// `None` when the free space could not be measured.
    pub free_disk_gb: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RequirementCheck {
    pub name: &'static str,
    pub required: f64,
    pub available: Option<f64>,
    pub passed: bool,
}

impl RequirementCheck {
    fn new(name: &'static str, required: f64, available: Option<f64>) -> Self {
        // An unmeasurable value is reported but does not block mining.
        let passed = available.map_or(true, |available| available >= required);
        Self {
            name,
            required,
            available,
            passed,
        }
    }
}

pub fn evaluate(
    snapshot: &SystemSnapshot,
    thresholds: &RequirementThresholds,
) -> Vec<RequirementCheck> {
    vec![
        RequirementCheck::new("RAM", thresholds.min_ram_gb, Some(snapshot.ram_gb)),
        RequirementCheck::new(
            "CPU_Cores",
            thresholds.min_cpu_cores as f64,
            Some(snapshot.cpu_cores as f64),
        ),
        RequirementCheck::new(
            "Disk_Space",
            thresholds.min_free_disk_gb,
            snapshot.free_disk_gb,
        ),
    ]
}

pub struct RequirementsChecker {
    sys: System,
    disk_path: PathBuf,
    thresholds: RequirementThresholds,
    issues: IssueReport,
}

impl RequirementsChecker {
    pub fn new(disk_path: &Path, issues: Option<IssueReport>) -> Self {
        let mut sys = System::new_all();

        sys.refresh_all();
        Self {
            sys,
            disk_path: disk_path.to_path_buf(),
            thresholds: RequirementThresholds::default(),
            issues: issues.unwrap_or_default(),
        }
    }

    pub fn snapshot(&self) -> SystemSnapshot {
        let (total_memory, _) = get_memory_info(&self.sys);
        let free_disk_gb = match get_storage_info(&self.disk_path) {
            Ok((_, free_gb)) => Some(free_gb),
            Err(e) => {
                debug!("Storage check failed for {}: {e}", self.disk_path.display());
                self.issues.add_issue(
                    IssueType::StorageUnknown,
                    format!("Could not measure free disk space: {e}"),
                );
                None
            }
        };

        SystemSnapshot {
            ram_gb: convert_to_gb(total_memory),
            cpu_cores: self.sys.cpus().len(),
            free_disk_gb,
        }
    }

    /// Measures the host, prints the requirement table and records every
    /// unmet threshold in the issue report.
    pub fn check(&self) -> Vec<RequirementCheck> {
        let checks = evaluate(&self.snapshot(), &self.thresholds);

        Console::title("System Requirements Check:");
        for check in &checks {
            let available = check
                .available
                .map_or_else(|| "unknown".to_string(), |v| format!("{v:.2}"));
            Console::check(
                check.name,
                check.passed,
                &format!("(Required: {}, Available: {available})", check.required),
            );

            if !check.passed {
                let (issue_type, message) = match check.name {
                    "RAM" => (
                        IssueType::InsufficientMemory,
                        format!("Minimum {}GB RAM required", check.required),
                    ),
                    "CPU_Cores" => (
                        IssueType::InsufficientCpu,
                        format!("Minimum {} CPU cores required", check.required),
                    ),
                    _ => (
                        IssueType::InsufficientStorage,
                        format!("Minimum {}GB free disk space required", check.required),
                    ),
                };
                self.issues.add_issue(issue_type, message);
            }
        }

        checks
    }

    pub fn meets_minimum(&self) -> bool {
        self.check().iter().all(|check| check.passed)
    }

    pub fn issues(&self) -> &IssueReport {
        &self.issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evaluate_all_passing() {
        let snapshot = SystemSnapshot {
            ram_gb: 16.0,
            cpu_cores: 8,
            free_disk_gb: Some(120.0),
        };
        let checks = evaluate(&snapshot, &RequirementThresholds::default());
        assert_eq!(checks.len(), 3);
        assert!(checks.iter().all(|c| c.passed));
    }

    #[test]
    fn test_evaluate_thresholds_are_inclusive() {
        let snapshot = SystemSnapshot {
            ram_gb: 4.0,
            cpu_cores: 2,
            free_disk_gb: Some(2.0),
        };
        let checks = evaluate(&snapshot, &RequirementThresholds::default());
        assert!(checks.iter().all(|c| c.passed));
    }

    #[test]
    fn test_evaluate_reports_each_shortfall() {
        let snapshot = SystemSnapshot {
            ram_gb: 3.5,
            cpu_cores: 1,
            free_disk_gb: Some(0.5),
        };
        let failed: Vec<&str> = evaluate(&snapshot, &RequirementThresholds::default())
            .into_iter()
            .filter(|c| !c.passed)
            .map(|c| c.name)
            .collect();
        assert_eq!(failed, vec!["RAM", "CPU_Cores", "Disk_Space"]);
    }

    #[test]
    fn test_unknown_disk_does_not_fail() {
        let snapshot = SystemSnapshot {
            ram_gb: 8.0,
            cpu_cores: 4,
            free_disk_gb: None,
        };
        let checks = evaluate(&snapshot, &RequirementThresholds::default());
        let disk = checks.iter().find(|c| c.name == "Disk_Space").unwrap();
        assert!(disk.passed);
        assert_eq!(disk.available, None);
    }

    #[test]
    fn test_snapshot_reads_host() {
        let checker = RequirementsChecker::new(&std::env::temp_dir(), None);
        let snapshot = checker.snapshot();
        assert!(snapshot.cpu_cores > 0);
        assert!(snapshot.ram_gb > 0.0);
    }
}

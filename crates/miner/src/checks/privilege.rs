use crate::checks::issue::{IssueReport, IssueType};
use crate::console::Console;

#[cfg(unix)]
pub fn is_elevated() -> bool {
    unsafe { libc::geteuid() == 0 }
}

/// `net session` only succeeds from an elevated prompt.
#[cfg(windows)]
pub fn is_elevated() -> bool {
    std::process::Command::new("net")
        .arg("session")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

#[cfg(not(any(unix, windows)))]
pub fn is_elevated() -> bool {
    false
}

pub fn check_elevation(issues: &IssueReport) -> bool {
    Console::title("Privileges:");
    if is_elevated() {
        Console::success("Running with elevated privileges");
        true
    } else {
        issues.add_issue(
            IssueType::NotElevated,
            "Raw USB access requires Administrator (or root) privileges",
        );
        false
    }
}

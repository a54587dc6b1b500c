//! Feature availability checks.
//!
//! Capabilities are checked eagerly so a missing device or tool disables the
//! feature up front instead of failing halfway through an operation.

use std::process::Command;

use slidecut_common::error::{SlidecutError, SlidecutResult};

/// A system capability that Slidecut may need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capability {
    pub name: String,
    pub description: String,
    pub available: bool,
    pub required: bool,
    pub fix_instructions: Option<String>,
}

impl Capability {
    /// Fail with `Unavailable` unless the capability is present.
    pub fn ensure_available(&self) -> SlidecutResult<()> {
        if self.available {
            return Ok(());
        }
        let mut message = format!("{} is not available", self.name);
        if let Some(fix) = &self.fix_instructions {
            message.push_str(&format!(" ({fix})"));
        }
        Err(SlidecutError::unavailable(message))
    }
}

/// Whether `program` resolves on `PATH` (or exists, for a path).
pub fn program_exists(program: &str) -> bool {
    if program.contains('/') {
        return std::path::Path::new(program).is_file();
    }
    Command::new("sh")
        .arg("-c")
        .arg(format!("command -v {program} >/dev/null 2>&1"))
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Print a user-friendly capability report.
pub fn print_capability_report(capabilities: &[Capability]) {
    println!("Slidecut System Capabilities:");
    println!("{}", "-".repeat(60));

    for cap in capabilities {
        let status = if cap.available {
            "[OK]"
        } else if cap.required {
            "[MISSING - REQUIRED]"
        } else {
            "[MISSING - OPTIONAL]"
        };

        println!("  {} {}: {}", status, cap.name, cap.description);

        if let Some(ref fix) = cap.fix_instructions {
            println!("    Fix: {fix}");
        }
    }
}

//! CLI argument parsing for per-crate debug flags
//!
//! Supports flags like `--debug-streamsense-inlet` or `--debug-all`.

use std::collections::BTreeSet;
use std::env;

use crate::KNOWN_CRATES;

/// Debug flags gathered from command-line arguments
///
/// # Example
/// ```rust
/// use streamsense_observability::CrateDebugFlags;
///
/// let flags = CrateDebugFlags::from_args(vec!["--debug-streamsense-inlet".to_string()]);
/// assert!(flags.is_enabled("streamsense-inlet"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrateDebugFlags {
    pub enabled_crates: BTreeSet<String>,
}

impl CrateDebugFlags {
    /// Looks for arguments matching `--debug-{crate-name}`; `--debug-all`
    /// enables every known crate. Other arguments are ignored.
    pub fn from_args<I>(args: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut enabled_crates = BTreeSet::new();

        for arg in args {
            if arg == "--debug-all" {
                enabled_crates.extend(KNOWN_CRATES.iter().map(|c| c.to_string()));
                continue;
            }

            if let Some(crate_name) = arg.strip_prefix("--debug-") {
                if !crate_name.is_empty() {
                    enabled_crates.insert(crate_name.to_string());
                }
            }
        }

        CrateDebugFlags { enabled_crates }
    }

    /// Enable debug output for one crate
    pub fn enable(&mut self, crate_name: impl Into<String>) {
        self.enabled_crates.insert(crate_name.into());
    }

    pub fn is_enabled(&self, crate_name: &str) -> bool {
        self.enabled_crates.contains(crate_name)
    }

    pub fn any_enabled(&self) -> bool {
        !self.enabled_crates.is_empty()
    }

    /// `DEBUG` if enabled for the crate, `INFO` otherwise
    pub fn log_level(&self, crate_name: &str) -> tracing::Level {
        if self.is_enabled(crate_name) {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// Directive string for `EnvFilter`.
    ///
    /// Tracing targets are module paths, so `streamsense-inlet` becomes
    /// `streamsense_inlet=debug`. Everything else stays at `info`.
    pub fn to_filter_string(&self) -> String {
        let mut filters: Vec<String> = self
            .enabled_crates
            .iter()
            .map(|crate_name| format!("{}=debug", crate_name.replace('-', "_")))
            .collect();
        filters.push("info".to_string());
        filters.join(",")
    }
}

/// Parse debug flags from this process's arguments
pub fn parse_debug_flags() -> CrateDebugFlags {
    CrateDebugFlags::from_args(env::args())
}

/// Generate help text for debug flags
pub fn debug_flags_help() -> String {
    format!(
        r#"Debug Flags:
  --debug-all                    Enable debug logging for all crates
  --debug-{{crate-name}}          Enable debug logging for specific crate

Available crates:
  {}

Examples:
  --debug-streamsense-inlet
  --debug-streamsense-inlet --debug-streamsense-transports
"#,
        KNOWN_CRATES.join(", ")
    )
}

//! Provider context for passing runtime options to providers
//!
//! This module provides a context structure that can be passed to provider
//! constructors, allowing for runtime configuration without breaking the API.

use std::env;

/// Runtime context for provider operations
#[derive(Debug, Clone, Default)]
pub struct ProviderContext {
    /// Show detailed/verbose output
    pub verbose: bool,
    /// Kill any single cloud CLI call running longer than this
    pub command_timeout_secs: Option<u64>,
}

impl ProviderContext {
    /// Create a context with verbose output enabled
    pub fn with_verbose(verbose: bool) -> Self {
        Self {
            verbose,
            ..Default::default()
        }
    }

    /// Set the per-call timeout
    pub fn with_timeout(mut self, timeout_secs: Option<u64>) -> Self {
        self.command_timeout_secs = timeout_secs;
        self
    }

    /// Check if verbose mode is enabled (CLI flag or environment variable)
    pub fn is_verbose(&self) -> bool {
        self.verbose || env::var("DSNAP_VERBOSE").is_ok()
    }

    /// Extra flag for the gcloud CLI matching the verbosity
    pub fn gcloud_verbosity(&self) -> Option<&'static str> {
        if self.is_verbose() {
            Some("--verbosity=info")
        } else {
            None
        }
    }
}

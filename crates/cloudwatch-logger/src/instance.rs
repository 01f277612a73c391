// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Instance identity written into every record's `instance` field.

use std::env;
use tracing::warn;

const UNKNOWN_INSTANCE: &str = "unknown";

/// Resolves the identity of the running instance.
///
/// Tried in order:
/// 1. the configured override
/// 2. the `HOSTNAME` environment variable
/// 3. the system hostname
/// 4. `"unknown"`
#[must_use]
pub fn resolve(configured: Option<&str>) -> String {
    if let Some(instance) = configured.map(str::trim).filter(|s| !s.is_empty()) {
        return instance.to_string();
    }

    if let Ok(hostname) = env::var("HOSTNAME") {
        if !hostname.is_empty() {
            return hostname;
        }
    }

    if let Some(hostname) = system_hostname() {
        return hostname;
    }

    warn!("CWL | Could not determine instance identity, using '{UNKNOWN_INSTANCE}'");
    UNKNOWN_INSTANCE.to_string()
}

#[cfg(unix)]
fn system_hostname() -> Option<String> {
    match nix::unistd::gethostname() {
        Ok(hostname) => hostname
            .to_str()
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        Err(e) => {
            warn!("CWL | Failed to get system hostname: {}", e);
            None
        }
    }
}

#[cfg(not(unix))]
fn system_hostname() -> Option<String> {
    env::var("COMPUTERNAME").ok().filter(|s| !s.is_empty())
}

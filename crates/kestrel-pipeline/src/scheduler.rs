// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Exit-mode scheduler
//!
//! Decides how long the node keeps delivering events once the pipeline is
//! running. The mode is read once from configuration.

use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::TransportError;
use crate::transport::{Transport, CLOCK_TOPIC, SHUTDOWN_SERVICE};

/// Poll period of the waiting loops (50 Hz)
pub const SPIN_PERIOD: Duration = Duration::from_millis(20);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExitMode {
    /// Run while something publishes the clock topic
    Clock,
    /// Run until the `shutdown` service is called
    Service,
    /// Run until the transport shuts down
    Normal,
}

impl ExitMode {
    /// Parse the configured mode; unknown strings fall back to `Normal`
    pub fn from_config_str(mode: &str) -> Self {
        match mode {
            "CLOCK" => ExitMode::Clock,
            "SERVICE" => ExitMode::Service,
            "NORMAL" => ExitMode::Normal,
            other => {
                warn!(
                    "[SCHEDULER] Unrecognized option: {}. Defaulting to NORMAL",
                    other
                );
                ExitMode::Normal
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExitMode::Clock => "CLOCK",
            ExitMode::Service => "SERVICE",
            ExitMode::Normal => "NORMAL",
        }
    }
}

impl std::fmt::Display for ExitMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn spin_period(transport: &dyn Transport) {
    transport.spin_once();
    std::thread::sleep(SPIN_PERIOD);
}

/// Wait for a clock publisher to appear, then run until it disappears
///
/// With simulated time the clock is already subscribed by the transport, so
/// no extra subscription is made.
pub fn spin_while_clock_present(
    transport: &dyn Transport,
    use_sim_time: bool,
) -> Result<(), TransportError> {
    let _clock = if use_sim_time {
        None
    } else {
        Some(transport.subscribe_clock()?)
    };

    info!("[SCHEDULER] Waiting for bag to start");
    while transport.ok() && transport.num_publishers(CLOCK_TOPIC) == 0 {
        spin_period(transport);
    }

    info!("[SCHEDULER] Running...");
    while transport.ok() && transport.num_publishers(CLOCK_TOPIC) > 0 {
        spin_period(transport);
    }

    transport.spin_once();
    warn!("[SCHEDULER] Exiting!");
    Ok(())
}

/// Run until the shutdown service is called
pub fn spin_until_exit_requested(transport: &dyn Transport) -> Result<(), TransportError> {
    let should_exit = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&should_exit);
    let _service = transport.advertise_shutdown_service(
        SHUTDOWN_SERVICE,
        Arc::new(move || {
            info!("[SCHEDULER] Exit requested");
            flag.store(true, Ordering::SeqCst);
        }),
    )?;

    info!("[SCHEDULER] Running...");
    while transport.ok() && !should_exit.load(Ordering::SeqCst) {
        spin_period(transport);
    }

    transport.spin_once();
    warn!("[SCHEDULER] Exiting!");
    Ok(())
}

/// Keep delivering events according to `mode`
pub fn spin_and_wait(
    transport: &dyn Transport,
    mode: ExitMode,
    use_sim_time: bool,
) -> Result<(), TransportError> {
    info!("[SCHEDULER] Exit mode: {}", mode);
    match mode {
        ExitMode::Clock => spin_while_clock_present(transport, use_sim_time),
        ExitMode::Service => spin_until_exit_requested(transport),
        ExitMode::Normal => {
            transport.spin();
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_mode_parsing() {
        assert_eq!(ExitMode::from_config_str("CLOCK"), ExitMode::Clock);
        assert_eq!(ExitMode::from_config_str("SERVICE"), ExitMode::Service);
        assert_eq!(ExitMode::from_config_str("NORMAL"), ExitMode::Normal);
        assert_eq!(ExitMode::from_config_str("BOGUS"), ExitMode::Normal);
        // Matching is exact
        assert_eq!(ExitMode::from_config_str("clock"), ExitMode::Normal);
    }

    #[test]
    fn test_exit_mode_display() {
        assert_eq!(ExitMode::Service.to_string(), "SERVICE");
    }
}

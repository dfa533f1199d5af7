// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Output directory for a pipeline run, plus callbacks flushed at process exit

use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

/// Work deferred until the process exits
pub type ExitCallback = Box<dyn FnOnce(&LogSetup) + Send>;

const TIMER_FILE_NAME: &str = "timing_stats.csv";
const TIMING_DIR_NAME: &str = "timing";

/// Destination for run artifacts (timing, stage output)
///
/// A setup is valid only when it has a log directory that exists or could be
/// created. Exit callbacks run at most once: either via
/// [`LogSetup::run_exit_callbacks`] or when the setup is dropped.
pub struct LogSetup {
    log_dir: Option<PathBuf>,
    valid: bool,
    log_timing_incrementally: bool,
    callbacks: Mutex<Vec<ExitCallback>>,
    exited: AtomicBool,
}

impl LogSetup {
    pub fn new(log_dir: Option<PathBuf>, log_timing_incrementally: bool) -> Self {
        let valid = match &log_dir {
            Some(dir) => match std::fs::create_dir_all(dir) {
                Ok(()) => true,
                Err(e) => {
                    warn!(
                        "[LOG-SETUP] Cannot create log directory {}: {}. Output disabled",
                        dir.display(),
                        e
                    );
                    false
                }
            },
            None => false,
        };

        Self {
            log_dir,
            valid,
            log_timing_incrementally,
            callbacks: Mutex::new(Vec::new()),
            exited: AtomicBool::new(false),
        }
    }

    /// Setup with no output directory
    pub fn disabled() -> Self {
        Self::new(None, false)
    }

    pub fn valid(&self) -> bool {
        self.valid
    }

    pub fn log_dir(&self) -> Option<&Path> {
        if self.valid {
            self.log_dir.as_deref()
        } else {
            None
        }
    }

    pub fn log_timing_incrementally(&self) -> bool {
        self.log_timing_incrementally
    }

    /// Summary statistics file, `<log_dir>/timing_stats.csv`
    pub fn timer_filepath(&self) -> Option<PathBuf> {
        self.log_dir().map(|dir| dir.join(TIMER_FILE_NAME))
    }

    /// Directory holding one raw-measurement file per timer
    pub fn timing_dir(&self) -> Option<PathBuf> {
        self.log_dir().map(|dir| dir.join(TIMING_DIR_NAME))
    }

    /// Per-stage output directory, created on demand
    pub fn stage_dir(&self, stage: &str) -> std::io::Result<Option<PathBuf>> {
        match self.log_dir() {
            Some(dir) => {
                let path = dir.join(stage);
                std::fs::create_dir_all(&path)?;
                Ok(Some(path))
            }
            None => Ok(None),
        }
    }

    pub fn register_exit_callback<F>(&self, callback: F)
    where
        F: FnOnce(&LogSetup) + Send + 'static,
    {
        if self.exited.load(Ordering::Acquire) {
            warn!("[LOG-SETUP] Exit callbacks already ran; ignoring late registration");
            return;
        }
        self.callbacks.lock().push(Box::new(callback));
    }

    /// Run every registered callback in registration order
    ///
    /// Returns the number of callbacks run; later calls return 0.
    pub fn run_exit_callbacks(&self) -> usize {
        if self.exited.swap(true, Ordering::AcqRel) {
            return 0;
        }

        let callbacks = std::mem::take(&mut *self.callbacks.lock());
        let count = callbacks.len();
        if count > 0 {
            info!("[LOG-SETUP] Running {} exit callback(s)", count);
        }
        for callback in callbacks {
            callback(self);
        }
        debug!("[LOG-SETUP] Exit callbacks complete");
        count
    }
}

impl Drop for LogSetup {
    fn drop(&mut self) {
        self.run_exit_callbacks();
    }
}

impl std::fmt::Debug for LogSetup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogSetup")
            .field("log_dir", &self.log_dir)
            .field("valid", &self.valid)
            .field("pending_callbacks", &self.callbacks.lock().len())
            .field("exited", &self.exited.load(Ordering::Relaxed))
            .finish()
    }
}

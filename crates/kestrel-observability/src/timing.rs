// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Elapsed-time recording
//!
//! One [`ElapsedTimeRecorder`] is created per process and shared through `Arc`.
//! Measurements are kept in memory and written out when the run's
//! [`LogSetup`] runs its exit callbacks. With incremental logging enabled,
//! each measurement is also appended to `timing_incremental.csv` as it arrives.

use ahash::AHashMap;
use parking_lot::Mutex;
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::log_setup::LogSetup;

const INCREMENTAL_FILE_NAME: &str = "timing_incremental.csv";

/// Summary of one timer's measurements, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimingStats {
    pub count: usize,
    pub mean_s: f64,
    pub min_s: f64,
    pub max_s: f64,
    pub last_s: f64,
}

impl TimingStats {
    fn from_samples(samples: &[Duration]) -> Option<Self> {
        let last = samples.last()?;
        let secs: Vec<f64> = samples.iter().map(Duration::as_secs_f64).collect();
        let total: f64 = secs.iter().sum();
        Some(Self {
            count: secs.len(),
            mean_s: total / secs.len() as f64,
            min_s: secs.iter().copied().fold(f64::INFINITY, f64::min),
            max_s: secs.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            last_s: last.as_secs_f64(),
        })
    }
}

#[derive(Default)]
struct TimerEntry {
    started: Option<Instant>,
    samples: Vec<Duration>,
}

/// Toggles read from the `[timing]` configuration section
#[derive(Debug, Clone, Copy, Default)]
pub struct TimingOptions {
    pub timing_disabled: bool,
    pub disable_timer_output: bool,
}

/// Process-wide elapsed-time sink
pub struct ElapsedTimeRecorder {
    timers: Mutex<AHashMap<String, TimerEntry>>,
    timing_disabled: AtomicBool,
    disable_output: AtomicBool,
    incremental: Mutex<Option<BufWriter<File>>>,
}

impl Default for ElapsedTimeRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl ElapsedTimeRecorder {
    pub fn new() -> Self {
        Self {
            timers: Mutex::new(AHashMap::new()),
            timing_disabled: AtomicBool::new(false),
            disable_output: AtomicBool::new(false),
            incremental: Mutex::new(None),
        }
    }

    pub fn set_timing_disabled(&self, disabled: bool) {
        self.timing_disabled.store(disabled, Ordering::Relaxed);
    }

    pub fn timing_disabled(&self) -> bool {
        self.timing_disabled.load(Ordering::Relaxed)
    }

    /// Suppress the per-measurement debug line
    pub fn set_disable_output(&self, disabled: bool) {
        self.disable_output.store(disabled, Ordering::Relaxed);
    }

    pub fn start(&self, name: &str) {
        if self.timing_disabled() {
            return;
        }
        self.timers.lock().entry(name.to_string()).or_default().started = Some(Instant::now());
    }

    /// Stop a running timer and record its elapsed time
    ///
    /// Returns `None` for a timer that was never started.
    pub fn stop(&self, name: &str) -> Option<Duration> {
        if self.timing_disabled() {
            return None;
        }
        let started = self
            .timers
            .lock()
            .get_mut(name)
            .and_then(|entry| entry.started.take());
        match started {
            Some(started) => {
                let elapsed = started.elapsed();
                self.record(name, elapsed);
                Some(elapsed)
            }
            None => {
                warn!("[TIMING] Timer '{}' stopped without being started", name);
                None
            }
        }
    }

    /// Record a measurement taken elsewhere
    pub fn record(&self, name: &str, elapsed: Duration) {
        if self.timing_disabled() {
            return;
        }
        self.timers
            .lock()
            .entry(name.to_string())
            .or_default()
            .samples
            .push(elapsed);

        if !self.disable_output.load(Ordering::Relaxed) {
            debug!("[TIMING] {}: {:.6} s", name, elapsed.as_secs_f64());
        }

        if let Some(writer) = self.incremental.lock().as_mut() {
            let written = writeln!(writer, "{},{:.9}", name, elapsed.as_secs_f64())
                .and_then(|_| writer.flush());
            if let Err(e) = written {
                warn!("[TIMING] Incremental timing write failed: {}", e);
            }
        }
    }

    /// Time a scope; the measurement is recorded when the guard drops
    pub fn scoped<'a>(&'a self, name: &str) -> ScopedTimer<'a> {
        ScopedTimer {
            recorder: self,
            name: name.to_string(),
            started: Instant::now(),
        }
    }

    pub fn stats(&self, name: &str) -> Option<TimingStats> {
        self.timers
            .lock()
            .get(name)
            .and_then(|entry| TimingStats::from_samples(&entry.samples))
    }

    /// Names of timers with at least one measurement, sorted
    pub fn timer_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .timers
            .lock()
            .iter()
            .filter(|(_, entry)| !entry.samples.is_empty())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    /// Write every raw measurement, one `<timing_dir>/<timer>.csv` per timer
    pub fn log_all_elapsed(&self, log_setup: &LogSetup) -> io::Result<()> {
        let Some(timing_dir) = log_setup.timing_dir() else {
            return Ok(());
        };
        fs::create_dir_all(&timing_dir)?;

        let snapshot: Vec<(String, Vec<Duration>)> = self
            .timers
            .lock()
            .iter()
            .filter(|(_, entry)| !entry.samples.is_empty())
            .map(|(name, entry)| (name.clone(), entry.samples.clone()))
            .collect();

        for (name, samples) in snapshot {
            let path = timing_dir.join(format!("{}.csv", sanitize_timer_name(&name)));
            let mut writer = BufWriter::new(File::create(&path)?);
            writeln!(writer, "elapsed_s")?;
            for sample in samples {
                writeln!(writer, "{:.9}", sample.as_secs_f64())?;
            }
            writer.flush()?;
        }
        Ok(())
    }

    /// Write one summary row per timer to `path`
    pub fn log_stats(&self, path: &Path) -> io::Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        writeln!(writer, "name,count,mean_s,min_s,max_s,last_s")?;
        for name in self.timer_names() {
            if let Some(stats) = self.stats(&name) {
                writeln!(
                    writer,
                    "{},{},{:.9},{:.9},{:.9},{:.9}",
                    name, stats.count, stats.mean_s, stats.min_s, stats.max_s, stats.last_s
                )?;
            }
        }
        writer.flush()
    }

    /// Append each future measurement to `<log_dir>/timing_incremental.csv`
    pub fn setup_incremental_logging(&self, log_setup: &LogSetup) -> io::Result<()> {
        let Some(dir) = log_setup.log_dir() else {
            return Ok(());
        };
        let path = dir.join(INCREMENTAL_FILE_NAME);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "name,elapsed_s")?;
        writer.flush()?;
        *self.incremental.lock() = Some(writer);
        info!("[TIMING] Incremental timing output: {}", path.display());
        Ok(())
    }
}

fn sanitize_timer_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

/// RAII guard returned by [`ElapsedTimeRecorder::scoped`]
pub struct ScopedTimer<'a> {
    recorder: &'a ElapsedTimeRecorder,
    name: String,
    started: Instant,
}

impl Drop for ScopedTimer<'_> {
    fn drop(&mut self) {
        self.recorder.record(&self.name, self.started.elapsed());
    }
}

/// Flush all measurements and summary statistics into the log setup
pub fn save_timing_information(log_setup: &LogSetup, recorder: &ElapsedTimeRecorder) {
    let Some(stats_path) = log_setup.timer_filepath() else {
        return;
    };

    info!(
        "[TIMING] Saving timing information to {}",
        stats_path.parent().unwrap_or(&stats_path).display()
    );
    if let Err(e) = recorder.log_all_elapsed(log_setup) {
        warn!("[TIMING] Failed to write elapsed times: {}", e);
    }
    if let Err(e) = recorder.log_stats(&stats_path) {
        warn!("[TIMING] Failed to write timing statistics: {}", e);
    }
    info!("[TIMING] Saved timing information");
}

/// Apply timing toggles and arrange for the exit-time flush
///
/// Nothing beyond the toggles happens when timing is disabled or the log
/// setup has no valid directory.
pub fn configure_timers(
    options: TimingOptions,
    log_setup: &LogSetup,
    recorder: &Arc<ElapsedTimeRecorder>,
) {
    recorder.set_timing_disabled(options.timing_disabled);
    recorder.set_disable_output(options.disable_timer_output);
    if options.timing_disabled || !log_setup.valid() {
        return;
    }

    let flush_target = Arc::clone(recorder);
    log_setup.register_exit_callback(move |setup| save_timing_information(setup, &flush_target));

    if log_setup.log_timing_incrementally() {
        if let Err(e) = recorder.setup_incremental_logging(log_setup) {
            warn!("[TIMING] Incremental timing disabled: {}", e);
        }
    }
}

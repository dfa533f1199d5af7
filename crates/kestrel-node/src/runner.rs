// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Node lifecycle: timers, context, pipeline, scheduler, shutdown

use anyhow::{Context, Result};
use kestrel_config::KestrelConfig;
use kestrel_observability::{configure_timers, ElapsedTimeRecorder, LogSetup, TimingOptions};
use kestrel_pipeline::{spin_and_wait, ExitMode, PerceptionPipeline, StageFactory, Transport};
use kestrel_state_manager::PipelineContext;
use once_cell::sync::{Lazy, OnceCell};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tracing::{info, warn};

/// Transport the Ctrl-C handler shuts down; replaced on every run
static INTERRUPT_TARGET: Lazy<Mutex<Option<Weak<dyn Transport>>>> = Lazy::new(|| Mutex::new(None));

/// The process can only hold one handler
static HANDLER_INSTALLED: OnceCell<bool> = OnceCell::new();

fn install_interrupt_handler(transport: &Arc<dyn Transport>) {
    *INTERRUPT_TARGET.lock() = Some(Arc::downgrade(transport));

    HANDLER_INSTALLED.get_or_init(|| {
        let installed = ctrlc::set_handler(|| {
            info!("[NODE] Shutdown signal received...");
            let target = INTERRUPT_TARGET.lock().as_ref().and_then(Weak::upgrade);
            match target {
                Some(transport) => transport.shutdown(),
                None => warn!("[NODE] No running transport to shut down"),
            }
        });
        match installed {
            Ok(()) => true,
            Err(e) => {
                warn!("[NODE] Interrupt handler not installed: {}", e);
                false
            }
        }
    });
}

/// What a finished run did
#[derive(Debug, Clone)]
pub struct NodeSummary {
    pub exit_mode: ExitMode,
    /// Registry names of the stages that ran
    pub stages: Vec<String>,
    /// Exit-time callbacks executed at shutdown
    pub exit_callbacks_run: usize,
}

/// Run one node to completion
///
/// Builds the pipeline described by `config`, keeps the transport spinning
/// according to the configured exit mode, then stops and saves every stage
/// and flushes timing output.
pub fn run_node(
    config: KestrelConfig,
    factory: Arc<dyn StageFactory>,
    transport: Arc<dyn Transport>,
) -> Result<NodeSummary> {
    let log_setup = Arc::new(LogSetup::new(
        config.logging.log_dir.clone(),
        config.logging.log_timing_incrementally,
    ));
    let recorder = Arc::new(ElapsedTimeRecorder::new());
    configure_timers(
        TimingOptions {
            timing_disabled: config.timing.timing_disabled,
            disable_timer_output: config.timing.disable_timer_output,
        },
        &log_setup,
        &recorder,
    );

    let context = Arc::new(PipelineContext::new(
        config.node.robot_id,
        recorder,
        Arc::clone(&log_setup),
    ));
    let exit_mode = ExitMode::from_config_str(&config.node.exit_mode);
    let use_sim_time = config.node.use_sim_time;

    info!(
        "[NODE] Starting robot {} (exit mode {})",
        config.node.robot_id, exit_mode
    );

    let mut pipeline = PerceptionPipeline::new(
        config,
        factory,
        Arc::clone(&transport),
        Arc::clone(&context),
    )
    .context("Failed to construct pipeline")?;

    install_interrupt_handler(&transport);

    pipeline.start().context("Failed to start pipeline")?;
    pipeline.print_info();

    spin_and_wait(transport.as_ref(), exit_mode, use_sim_time)
        .context("Scheduler could not register with the transport")?;

    let stages: Vec<String> = pipeline.registry().names().map(str::to_string).collect();
    pipeline.stop();
    pipeline.save();
    drop(pipeline);

    let exit_callbacks_run = log_setup.run_exit_callbacks();
    info!(
        "[NODE] Shutdown complete ({} exit callbacks, state {})",
        exit_callbacks_run,
        context.state()
    );

    Ok(NodeSummary {
        exit_mode,
        stages,
        exit_callbacks_run,
    })
}

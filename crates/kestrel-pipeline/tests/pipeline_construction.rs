// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Controller construction order, toggles and failure policy

mod common;

use common::*;
use kestrel_config::KestrelConfig;
use kestrel_pipeline::*;
use kestrel_state_manager::{event_channel, PipelineContext, PipelineState, StateEvent};
use std::sync::Arc;

#[test]
fn test_default_config_builds_core_stages_in_order() {
    let factory = ScriptedFactory::new();
    let (pipeline, transport) = build(KestrelConfig::default(), &factory);
    let pipeline = pipeline.unwrap();

    assert_eq!(
        factory.journal.with_prefix("create:"),
        vec![
            "create:frontend",
            "create:frontend_publisher",
            "create:reconstruction",
            "create:backend",
            "create:backend_publisher",
        ]
    );
    assert_eq!(pipeline.context().state(), PipelineState::Ready);
    assert!(pipeline.registry().contains(names::FRONTEND));
    assert!(pipeline.registry().contains(names::BACKEND));
    assert!(!pipeline.registry().contains(names::LOOP_CLOSURE));
    assert!(transport.has_service(FREESPACE_SERVICE));
}

#[test]
fn test_label_space_published_before_frontend() {
    let mut config = KestrelConfig::default();
    config.label_space.total_labels = 12;
    let factory = ScriptedFactory::new();
    let (pipeline, _transport) = build(config, &factory);
    let pipeline = pipeline.unwrap();

    assert_eq!(*factory.label_count_seen.lock(), Some(12));
    assert_eq!(pipeline.context().total_labels(), 12);
}

#[test]
fn test_reconstruction_disabled_builds_no_reconstruction() {
    let mut config = KestrelConfig::default();
    config.pipeline.do_reconstruction = false;
    config.pipeline.visualize_reconstruction = true;
    let factory = ScriptedFactory::new();
    let (pipeline, _transport) = build(config, &factory);
    let pipeline = pipeline.unwrap();

    assert!(!factory.journal.contains("create:reconstruction"));
    assert!(!factory.journal.contains("create:reconstruction_visualizer"));
    assert!(pipeline.reconstruction().is_none());
}

#[test]
fn test_reconstruction_feeds_frontend_queue() {
    let factory = ScriptedFactory::new();
    let (pipeline, _transport) = build(KestrelConfig::default(), &factory);
    let _pipeline = pipeline.unwrap();

    let frontend = factory.frontend();
    let reconstruction = factory.reconstruction.lock().clone().unwrap();
    let queue = reconstruction.output_queue.clone().unwrap();
    assert!(Arc::ptr_eq(&queue, &frontend.queue));
}

#[test]
fn test_frontend_failure_stops_construction() {
    let factory = ScriptedFactory::failing(&["frontend"]);
    let (pipeline, transport) = build(KestrelConfig::default(), &factory);

    match pipeline {
        Err(PipelineError::RequiredStageMissing { stage, .. }) => assert_eq!(stage, "frontend"),
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("construction should fail"),
    }
    assert_eq!(factory.journal.with_prefix("create:"), vec!["create:frontend"]);
    assert!(!transport.has_service(FREESPACE_SERVICE));
}

#[test]
fn test_backend_failure_is_fatal() {
    let factory = ScriptedFactory::failing(&["backend"]);
    let (pipeline, _transport) = build(KestrelConfig::default(), &factory);

    assert!(matches!(
        pipeline,
        Err(PipelineError::RequiredStageMissing { stage: "backend", .. })
    ));
    assert!(!factory.journal.contains("create:backend_publisher"));
}

#[test]
fn test_backend_publisher_failure_is_fatal() {
    let mut config = KestrelConfig::default();
    config.pipeline.enable_lcd = true;
    let factory = ScriptedFactory::failing(&["backend_publisher"]);
    let context = detached_context();
    let transport = Arc::new(LocalTransport::new());
    let pipeline = PerceptionPipeline::new(
        config,
        Arc::clone(&factory) as Arc<dyn StageFactory>,
        Arc::clone(&transport) as Arc<dyn Transport>,
        Arc::clone(&context),
    );

    assert!(matches!(
        pipeline,
        Err(PipelineError::RequiredStageMissing {
            stage: "backend_publisher",
            ..
        })
    ));
    assert_eq!(context.state(), PipelineState::Stopped);
    assert!(!factory.journal.contains("create:lcd"));
    assert_eq!(transport.subscription_queue_size(BOW_TOPIC), None);
}

#[test]
fn test_optional_stage_failures_degrade() {
    let mut config = KestrelConfig::default();
    config.pipeline.visualize_places = true;
    config.pipeline.enable_lcd = true;
    let factory = ScriptedFactory::failing(&[
        "reconstruction",
        "frontend_publisher",
        "places_visualizer",
        "lcd",
    ]);
    let (pipeline, transport) = build(config, &factory);
    let pipeline = pipeline.unwrap();

    assert!(pipeline.reconstruction().is_none());
    assert!(pipeline.registry().loop_closure(names::LOOP_CLOSURE).is_none());
    assert!(pipeline.registry().publisher(names::FRONTEND_PUBLISHER).is_none());
    assert!(pipeline.backend().is_some());
    assert!(transport.has_service(FREESPACE_SERVICE));

    // Without a detector nothing drains the visual queue, so nothing feeds it
    assert_eq!(transport.subscription_queue_size(BOW_TOPIC), None);
    assert!(!transport.publish_bow_queries(BOW_TOPIC, BowQueries::default()));
    assert!(pipeline.context().shared().visual_lcd_queue().is_empty());
}

#[test]
fn test_frontend_output_disabled_skips_publisher_and_service() {
    let mut config = KestrelConfig::default();
    config.pipeline.enable_frontend_output = false;
    config.pipeline.visualize_places = true;
    let factory = ScriptedFactory::new();
    let (pipeline, transport) = build(config, &factory);
    let _pipeline = pipeline.unwrap();

    assert!(!factory.journal.contains("create:frontend_publisher"));
    assert!(!factory.journal.contains("create:places_visualizer"));
    assert!(!transport.has_service(FREESPACE_SERVICE));
    assert!(factory.frontend().output.is_empty());
}

#[test]
fn test_outputs_forwarded_to_publishers() {
    let mut config = KestrelConfig::default();
    config.pipeline.visualize_places = true;
    config.pipeline.visualize_reconstruction = true;
    config.pipeline.places_visualizer_namespace = "~gvd".to_string();
    let factory = ScriptedFactory::new();
    let (pipeline, _transport) = build(config, &factory);
    let _pipeline = pipeline.unwrap();

    let frontend = factory.frontend();
    let input = BackendInput {
        timestamp_ns: 5,
        new_agent_nodes: vec![1, 2],
        ..Default::default()
    };
    frontend.output.emit(&SceneGraph::new(), &input, &5);
    frontend.places.emit(
        &6,
        &VoxelLayerSnapshot {
            voxel_size: 0.1,
            allocated_blocks: vec![[0, 0, 0]],
        },
        &PlacesSnapshot {
            num_places: 3,
            num_edges: 2,
        },
    );
    factory.backend().output.emit(
        &SceneGraph::new(),
        &DeformationGraphSnapshot {
            num_loop_closures: 4,
            ..Default::default()
        },
        &7,
    );
    factory
        .reconstruction
        .lock()
        .clone()
        .unwrap()
        .visualization
        .emit(&8, &Pose::from_translation([2.0, 0.0, 0.0]), &VoxelLayerSnapshot::default());

    assert!(factory.journal.contains("publish:frontend:0:2:5"));
    assert!(factory.journal.contains("visualize:places:6:1:3"));
    assert!(factory.journal.contains("publish:backend:0:4:7"));
    assert!(factory.journal.contains("visualize:reconstruction:8:2:0"));
    assert_eq!(
        factory.places_visualizer.lock().as_ref().unwrap().namespace,
        "~gvd"
    );
}

#[test]
fn test_lcd_receives_label_count_and_solver() {
    let mut config = KestrelConfig::default();
    config.pipeline.enable_lcd = true;
    config.label_space.total_labels = 9;
    config.loop_closure.detector.enable_agent_registration = true;
    config.loop_closure.bow_queue_size = 5;
    config.loop_closure.lcd_agent_horizon_s = 3.0;
    let factory = ScriptedFactory::new();
    let (pipeline, transport) = build(config, &factory);
    let pipeline = pipeline.unwrap();

    let lcd = factory.lcd.lock().clone().unwrap();
    assert_eq!(lcd.config.detector.num_semantic_classes, 9);
    assert_eq!(lcd.config.lcd_agent_horizon_s, 3.0);
    assert_eq!(*lcd.solvers.lock(), vec![(0, "teaser".to_string())]);
    assert!(pipeline.context().shared().lcd_queue().is_some());
    assert_eq!(transport.subscription_queue_size(BOW_TOPIC), Some(5));
}

#[test]
fn test_lcd_disabled_creates_no_queue() {
    let factory = ScriptedFactory::new();
    let (pipeline, transport) = build(KestrelConfig::default(), &factory);
    let pipeline = pipeline.unwrap();

    assert!(pipeline.context().shared().lcd_queue().is_none());
    assert_eq!(transport.subscription_queue_size(BOW_TOPIC), None);
}

#[test]
fn test_invalid_config_rejected_before_construction() {
    let mut config = KestrelConfig::default();
    config.label_space.total_labels = 0;
    let factory = ScriptedFactory::new();
    let (pipeline, _transport) = build(config, &factory);

    assert!(matches!(pipeline, Err(PipelineError::Config(_))));
    assert!(factory.journal.entries().is_empty());
}

#[test]
fn test_lifecycle_starts_and_stops_every_stage() {
    let factory = ScriptedFactory::new();
    let (pipeline, transport) = build(KestrelConfig::default(), &factory);
    let mut pipeline = pipeline.unwrap();

    pipeline.start().unwrap();
    assert_eq!(pipeline.context().state(), PipelineState::Running);
    assert_eq!(factory.journal.with_prefix("start:").len(), 5);
    assert_eq!(
        factory.journal.with_prefix("start:").first().map(String::as_str),
        Some("start:frontend")
    );

    pipeline.stop();
    assert_eq!(pipeline.context().state(), PipelineState::Stopped);
    let stops = factory.journal.with_prefix("stop:");
    assert_eq!(stops.len(), 5);
    assert_eq!(stops.last().map(String::as_str), Some("stop:frontend"));
    assert!(!transport.has_service(FREESPACE_SERVICE));

    // Stopping twice is a no-op
    pipeline.stop();
    assert_eq!(factory.journal.with_prefix("stop:").len(), 5);
}

#[test]
fn test_start_requires_ready_state() {
    let factory = ScriptedFactory::new();
    let (pipeline, _transport) = build(KestrelConfig::default(), &factory);
    let pipeline = pipeline.unwrap();

    pipeline.start().unwrap();
    assert!(matches!(pipeline.start(), Err(PipelineError::State(_))));
}

#[test]
fn test_context_cannot_be_reused() {
    let context = detached_context();
    let transport: Arc<dyn Transport> = Arc::new(LocalTransport::new());
    let first = PerceptionPipeline::new(
        KestrelConfig::default(),
        ScriptedFactory::new(),
        Arc::clone(&transport),
        Arc::clone(&context),
    );
    assert!(first.is_ok());

    let second = PerceptionPipeline::new(
        KestrelConfig::default(),
        ScriptedFactory::new(),
        transport,
        context,
    );
    assert!(matches!(second, Err(PipelineError::State(_))));
}

#[test]
fn test_print_info_lists_stages() {
    let factory = ScriptedFactory::new();
    let (pipeline, _transport) = build(KestrelConfig::default(), &factory);
    let pipeline = pipeline.unwrap();

    let info = pipeline.print_info();
    assert!(info.contains("frontend (frontend): scripted frontend"));
    assert!(info.contains("backend_publisher (publisher)"));
}

#[test]
fn test_state_events_emitted_during_construction() {
    let (sender, receiver) = event_channel();
    let context = Arc::new(PipelineContext::detached(3).with_events(sender));
    let pipeline = PerceptionPipeline::new(
        KestrelConfig::default(),
        ScriptedFactory::new(),
        Arc::new(LocalTransport::new()),
        context,
    )
    .unwrap();

    let events: Vec<StateEvent> = receiver.try_iter().collect();
    assert!(events.contains(&StateEvent::LabelSpacePublished { total_labels: 20 }));
    assert!(events.contains(&StateEvent::PipelineStateChanged {
        from: PipelineState::Initializing,
        to: PipelineState::Ready,
    }));
    drop(pipeline);
}

#[test]
fn test_construction_steps_are_timed() {
    let factory = ScriptedFactory::new();
    let (pipeline, _transport) = build(KestrelConfig::default(), &factory);
    let pipeline = pipeline.unwrap();

    let timer = pipeline.context().timer();
    assert_eq!(timer.stats("construct/frontend").map(|s| s.count), Some(1));
    assert!(timer.stats("construct/lcd").is_none());
}

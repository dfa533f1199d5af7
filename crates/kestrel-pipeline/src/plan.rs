// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Construction plan
//!
//! The ordered list of construction steps implied by a configuration. It is
//! computed without touching any stage, so tools can show what a node would
//! build and the controller can execute the same list.

use kestrel_config::KestrelConfig;
use serde::Serialize;
use std::fmt;

use crate::bow::BOW_TOPIC;
use crate::freespace::FREESPACE_SERVICE;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum ConstructionStep {
    PublishLabelSpace { total_labels: usize },
    Frontend,
    FrontendPublisher,
    PlacesVisualizer { namespace: String },
    FreespaceService { service: String },
    Reconstruction,
    ReconstructionVisualizer { namespace: String },
    Backend { remote: bool },
    BackendPublisher,
    LoopClosure { num_semantic_classes: usize },
    BowSubscription { topic: String, queue_size: usize },
    AgentRegistration,
}

impl ConstructionStep {
    /// Short stable name, used for timer keys
    pub fn key(&self) -> &'static str {
        match self {
            ConstructionStep::PublishLabelSpace { .. } => "label_space",
            ConstructionStep::Frontend => "frontend",
            ConstructionStep::FrontendPublisher => "frontend_publisher",
            ConstructionStep::PlacesVisualizer { .. } => "places_visualizer",
            ConstructionStep::FreespaceService { .. } => "freespace_service",
            ConstructionStep::Reconstruction => "reconstruction",
            ConstructionStep::ReconstructionVisualizer { .. } => "reconstruction_visualizer",
            ConstructionStep::Backend { .. } => "backend",
            ConstructionStep::BackendPublisher => "backend_publisher",
            ConstructionStep::LoopClosure { .. } => "lcd",
            ConstructionStep::BowSubscription { .. } => "bow_subscription",
            ConstructionStep::AgentRegistration => "agent_registration",
        }
    }

    /// Steps whose failure aborts construction
    pub fn is_required(&self) -> bool {
        matches!(
            self,
            ConstructionStep::PublishLabelSpace { .. }
                | ConstructionStep::Frontend
                | ConstructionStep::Backend { .. }
                | ConstructionStep::BackendPublisher
        )
    }
}

impl fmt::Display for ConstructionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstructionStep::PublishLabelSpace { total_labels } => {
                write!(f, "publish label space ({} labels)", total_labels)
            }
            ConstructionStep::Frontend => write!(f, "frontend"),
            ConstructionStep::FrontendPublisher => write!(f, "frontend publisher"),
            ConstructionStep::PlacesVisualizer { namespace } => {
                write!(f, "places visualizer [{}]", namespace)
            }
            ConstructionStep::FreespaceService { service } => {
                write!(f, "freespace service '{}'", service)
            }
            ConstructionStep::Reconstruction => write!(f, "reconstruction"),
            ConstructionStep::ReconstructionVisualizer { namespace } => {
                write!(f, "reconstruction visualizer [{}]", namespace)
            }
            ConstructionStep::Backend { remote: true } => write!(f, "backend (remote)"),
            ConstructionStep::Backend { remote: false } => write!(f, "backend"),
            ConstructionStep::BackendPublisher => write!(f, "backend publisher"),
            ConstructionStep::LoopClosure {
                num_semantic_classes,
            } => write!(f, "loop closure ({} classes)", num_semantic_classes),
            ConstructionStep::BowSubscription { topic, queue_size } => {
                write!(f, "subscribe '{}' (queue {})", topic, queue_size)
            }
            ConstructionStep::AgentRegistration => write!(f, "agent registration solver"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConstructionPlan {
    steps: Vec<ConstructionStep>,
}

impl ConstructionPlan {
    pub fn from_config(config: &KestrelConfig) -> Self {
        let pipeline = &config.pipeline;
        let total_labels = config.label_space.total_labels;
        let mut steps = vec![
            ConstructionStep::PublishLabelSpace { total_labels },
            ConstructionStep::Frontend,
        ];

        if pipeline.enable_frontend_output {
            steps.push(ConstructionStep::FrontendPublisher);
            if pipeline.visualize_places {
                steps.push(ConstructionStep::PlacesVisualizer {
                    namespace: pipeline.places_visualizer_namespace.clone(),
                });
            }
            steps.push(ConstructionStep::FreespaceService {
                service: FREESPACE_SERVICE.to_string(),
            });
        }

        if pipeline.do_reconstruction {
            steps.push(ConstructionStep::Reconstruction);
            if pipeline.visualize_reconstruction {
                steps.push(ConstructionStep::ReconstructionVisualizer {
                    namespace: pipeline.reconstruction_visualizer_namespace.clone(),
                });
            }
        }

        steps.push(ConstructionStep::Backend {
            remote: pipeline.use_ros_backend,
        });
        steps.push(ConstructionStep::BackendPublisher);

        if pipeline.enable_lcd {
            steps.push(ConstructionStep::LoopClosure {
                num_semantic_classes: total_labels,
            });
            steps.push(ConstructionStep::BowSubscription {
                topic: BOW_TOPIC.to_string(),
                queue_size: config.loop_closure.bow_queue_size,
            });
            if config.loop_closure.detector.enable_agent_registration {
                steps.push(ConstructionStep::AgentRegistration);
            }
        }

        Self { steps }
    }

    pub fn steps(&self) -> &[ConstructionStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn contains(&self, step: &ConstructionStep) -> bool {
        self.steps.contains(step)
    }

    /// True if any step matches `predicate`
    pub fn any(&self, predicate: impl Fn(&ConstructionStep) -> bool) -> bool {
        self.steps.iter().any(predicate)
    }
}

impl fmt::Display for ConstructionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, step) in self.steps.iter().enumerate() {
            let marker = if step.is_required() { "*" } else { " " };
            writeln!(f, "{:>2}.{} {}", index + 1, marker, step)?;
        }
        Ok(())
    }
}

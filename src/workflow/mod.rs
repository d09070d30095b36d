// Nightshift — Workflow template model, node lookup and field mutation

pub mod parser;

use crate::config::NodeLabels;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("missing workflow file: {0}")]
    Missing(PathBuf),
    #[error("failed to read workflow file: {0}")]
    Read(#[from] std::io::Error),
    #[error("failed to parse workflow: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("workflow missing nodes titled {}", .0.join(" and "))]
    MissingPromptNodes(Vec<String>),
    #[error("workflow missing {0} nodes")]
    MissingSamplers(String),
}

/// Display metadata attached to a node. Only the title is interpreted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One unit of the workflow graph.
///
/// Fields other than `class_type`, `inputs` and `_meta` are carried through
/// untouched so the submitted payload matches the template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    #[serde(default)]
    pub class_type: String,
    #[serde(default)]
    pub inputs: Map<String, Value>,
    #[serde(rename = "_meta", default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<NodeMeta>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Node {
    pub fn title(&self) -> Option<&str> {
        self.meta.as_ref().and_then(|m| m.title.as_deref())
    }
}

/// A node-graph job description, keyed by node id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Workflow {
    pub nodes: BTreeMap<String, Node>,
}

impl Workflow {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Ids of every node whose display title equals `title` exactly.
    pub fn find_nodes_by_title(&self, title: &str) -> Vec<String> {
        self.nodes
            .iter()
            .filter(|(_, node)| node.title() == Some(title))
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Ids of every node whose type tag equals `class_type`.
    pub fn find_nodes_by_class(&self, class_type: &str) -> Vec<String> {
        self.nodes
            .iter()
            .filter(|(_, node)| node.class_type == class_type)
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn set_text(&mut self, node_ids: &[String], text: &str) {
        self.set_input(node_ids, "text", Value::String(text.to_string()));
    }

    pub fn set_seed(&mut self, node_ids: &[String], seed: u64) {
        self.set_input(node_ids, "seed", Value::from(seed));
    }

    fn set_input(&mut self, node_ids: &[String], field: &str, value: Value) {
        for id in node_ids {
            match self.nodes.get_mut(id) {
                Some(node) => {
                    node.inputs.insert(field.to_string(), value.clone());
                }
                None => tracing::debug!(node = %id, field, "Skipping unknown node"),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Node bindings
// ---------------------------------------------------------------------------

/// Node ids a batch run writes into, resolved once against the template.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeBindings {
    pub day: Vec<String>,
    pub night: Vec<String>,
    pub negative: Vec<String>,
    pub samplers: Vec<String>,
}

impl NodeBindings {
    /// Resolve every binding, failing if the day or night prompt nodes or the
    /// sampler nodes are absent. Negative nodes are optional.
    pub fn resolve(workflow: &Workflow, labels: &NodeLabels) -> Result<Self, WorkflowError> {
        let day = workflow.find_nodes_by_title(&labels.day_title);
        let night = workflow.find_nodes_by_title(&labels.night_title);
        let negative = workflow.find_nodes_by_title(&labels.negative_title);

        let mut missing = Vec::new();
        if day.is_empty() {
            missing.push(labels.day_title.clone());
        }
        if night.is_empty() {
            missing.push(labels.night_title.clone());
        }
        if !missing.is_empty() {
            return Err(WorkflowError::MissingPromptNodes(missing));
        }

        let samplers = workflow.find_nodes_by_class(&labels.sampler_class);
        if samplers.is_empty() {
            return Err(WorkflowError::MissingSamplers(labels.sampler_class.clone()));
        }

        if negative.is_empty() {
            tracing::debug!(title = %labels.negative_title, "No negative prompt nodes, skipping");
        }

        Ok(Self {
            day,
            night,
            negative,
            samplers,
        })
    }
}

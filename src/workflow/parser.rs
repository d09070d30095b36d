use crate::workflow::{Workflow, WorkflowError};
use std::path::Path;

/// Read a workflow template from a JSON file.
pub fn load_workflow(path: &Path) -> Result<Workflow, WorkflowError> {
    if !path.exists() {
        return Err(WorkflowError::Missing(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path)?;
    let workflow: Workflow = serde_json::from_str(&content)?;
    tracing::debug!(path = %path.display(), nodes = workflow.len(), "Loaded workflow template");

    Ok(workflow)
}

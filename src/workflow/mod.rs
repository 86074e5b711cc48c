//! Workflow definitions, parsing, and structure analysis.
//!
//! A GitHub Actions workflow file goes through two stages:
//! - Parsing: YAML text into a validated [`WorkflowDefinition`]
//! - Analysis: the job `needs` relationships into a [`DependencyGraph`]

mod analyzer;
mod annotations;
mod calls;
mod parser;
mod types;

pub use analyzer::{
    analyze, Complexity, DependencyGraph, GraphNode, MatrixUsage, NodeClass, WorkflowCall,
};
pub use annotations::{extract_annotations, Annotations, InputAnnotation};
pub use calls::CallGraph;
pub use parser::{parse_workflow, parse_workflow_file};
pub use types::*;

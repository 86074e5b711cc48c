//! gha-doc - documentation generator for GitHub Actions workflows
//!
//! gha-doc reads workflow files, builds the job dependency graph, renders a
//! Mermaid diagram and writes one Markdown or HTML page per workflow.
//!
//! ## Key Features
//!
//! - **Structure analysis**: topological job order, cycle and dangling `needs` detection,
//!   job classification (conditional, matrix, reusable workflow call)
//! - **Diagrams**: declarative diagram description, Mermaid text, optional images via `mmdc`
//! - **Optional AI narrative**: usage notes and improvement suggestions; failures only
//!   drop the section
//! - **Deterministic output**: identical input gives byte-identical documents
//!
//! ## Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use gha_doc::config::Config;
//! use gha_doc::pipeline::Generator;
//!
//! # async fn run() -> gha_doc::Result<()> {
//! let workspace = Path::new(".");
//! let config = Config::load(workspace)?;
//! let report = Generator::from_config(config, workspace)?.run().await?;
//! println!("{} documented, {} failed", report.documented.len(), report.failed.len());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod diagram;
pub mod discovery;
pub mod docs;
pub mod error;
pub mod narrative;
pub mod output;
pub mod pipeline;
pub mod workflow;

pub use error::{Error, Result};

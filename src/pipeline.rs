//! Documentation run.
//!
//! Files are documented one at a time: load, parse, analyze, diagram,
//! narrative, assemble, write. A failing file is reported and skipped; the
//! rest of the batch still runs.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::diagram::{self, to_mermaid, ImageRenderer, MermaidCli};
use crate::discovery::{discover, WorkflowSource};
use crate::docs::{assemble, assemble_index, AssembleOptions, DiagramArtifact, OutputFormat};
use crate::error::{Error, Result};
use crate::narrative::{collect_narrative, Constraints, NarrativeProvider, ProviderRegistry};
use crate::output::{FsSink, OutputSink};
use crate::workflow::{analyze, parse_workflow, CallGraph, WorkflowDefinition};

/// Name of the index page.
pub const INDEX_FILE: &str = "index.md";

/// Outcome for one documented file.
#[derive(Debug, Clone)]
pub struct FileReport {
    pub source: PathBuf,
    pub document: PathBuf,
    pub mermaid: PathBuf,
    /// Rendered diagram image, when rendering succeeded.
    pub diagram: Option<PathBuf>,
    /// Whether any AI section was included.
    pub narrative: bool,
}

/// A file that could not be documented.
#[derive(Debug)]
pub struct FileFailure {
    pub source: PathBuf,
    pub error: Error,
}

/// Outcome of a whole run.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub documented: Vec<FileReport>,
    pub failed: Vec<FileFailure>,
    pub index: Option<PathBuf>,
}

impl BatchReport {
    /// No file matched the pattern.
    pub fn is_empty(&self) -> bool {
        self.documented.is_empty() && self.failed.is_empty()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Documentation generator for one workspace.
pub struct Generator {
    config: Config,
    workspace: PathBuf,
    sink: Arc<dyn OutputSink>,
    renderer: Option<Arc<dyn ImageRenderer>>,
    narrator: Option<Arc<dyn NarrativeProvider>>,
}

impl Generator {
    /// Create a generator that writes through `sink`, without image rendering
    /// or narrative.
    pub fn new(config: Config, workspace: impl Into<PathBuf>, sink: Arc<dyn OutputSink>) -> Self {
        Self {
            config,
            workspace: workspace.into(),
            sink,
            renderer: None,
            narrator: None,
        }
    }

    /// Create a generator wired from configuration: files go to the output
    /// directory, diagrams through the Mermaid CLI, narrative through the
    /// configured provider.
    pub fn from_config(config: Config, workspace: impl Into<PathBuf>) -> Result<Self> {
        let workspace = workspace.into();
        let sink = Arc::new(FsSink::new(workspace.join(&config.output.output_dir)));

        let renderer: Option<Arc<dyn ImageRenderer>> = if config.diagram.enabled {
            Some(Arc::new(
                MermaidCli::new(config.diagram.command.clone())
                    .with_theme(config.diagram.theme.clone())
                    .with_timeout(config.diagram.timeout()),
            ))
        } else {
            None
        };

        let narrator = if config.ai.enabled {
            let registry = ProviderRegistry::from_config(&config.ai);
            let provider = registry.select(&config.ai.provider)?;
            if provider.name() == "openai" && config.ai.api_key.is_none() {
                warn!("No AI API key provided, skipping AI enhancement");
                None
            } else {
                Some(provider)
            }
        } else {
            None
        };

        let mut generator = Self::new(config, workspace, sink);
        generator.renderer = renderer;
        generator.narrator = narrator;
        Ok(generator)
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn ImageRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn with_narrator(mut self, narrator: Arc<dyn NarrativeProvider>) -> Self {
        self.narrator = Some(narrator);
        self
    }

    /// Document every file matching the configured pattern.
    pub async fn run(&self) -> Result<BatchReport> {
        let pattern = &self.config.input.workflow_files;
        let paths = discover(&self.workspace, pattern)?;
        info!(pattern = %pattern, files = paths.len(), "Discovered workflow files");

        let mut report = BatchReport::default();
        let mut workflows = Vec::new();

        // Document name -> who wrote it. Outputs are named after the file
        // stem, so two sources with the same stem would share every output.
        let mut claimed: HashMap<String, String> = HashMap::new();
        if self.config.output.index && self.config.output.format == OutputFormat::Markdown {
            claimed.insert(INDEX_FILE.to_string(), "the workflow index".to_string());
        }

        for path in paths {
            let shown = self.relative(&path);
            let name = self.document_name(&path);
            let result = match claimed.get(&name) {
                Some(owner) => Err(Error::sink(
                    name.clone(),
                    std::io::Error::new(
                        std::io::ErrorKind::AlreadyExists,
                        format!("already written for {}", owner),
                    ),
                )),
                None => self.document_file(&path).await,
            };

            match result {
                Ok((workflow, file_report)) => {
                    info!(file = %shown.display(), output = %file_report.document.display(), "Documented workflow");
                    claimed.insert(name, shown.display().to_string());
                    workflows.push(workflow);
                    report.documented.push(file_report);
                }
                Err(e) => {
                    error!(file = %shown.display(), code = e.code(), error = %e, "Failed to document workflow");
                    report.failed.push(FileFailure {
                        source: shown,
                        error: e,
                    });
                }
            }
        }

        if self.config.output.index && !workflows.is_empty() {
            match self.write_index(&workflows).await {
                Ok(path) => report.index = Some(path),
                Err(e) => {
                    error!(code = e.code(), error = %e, "Failed to write index");
                    report.failed.push(FileFailure {
                        source: PathBuf::from(INDEX_FILE),
                        error: e,
                    });
                }
            }
        }

        Ok(report)
    }

    /// Document a single workflow file.
    pub async fn document_file(&self, path: &Path) -> Result<(WorkflowDefinition, FileReport)> {
        let source = WorkflowSource::load(path).await?;
        let relative = self.relative(path);

        let workflow = parse_workflow(&source.raw, &relative)?;
        let graph = analyze(&workflow)?;
        debug!(
            file = %relative.display(),
            jobs = graph.nodes().len(),
            order = ?graph.topological_order(),
            "Analyzed workflow"
        );

        let description = diagram::render(&graph, &self.config.diagram.style);
        let stem = workflow.file_stem.clone();

        let mermaid_name = format!("{}-diagram.mmd", stem);
        let mermaid = self
            .sink
            .write(Path::new(&mermaid_name), to_mermaid(&description).as_bytes())
            .await?;

        let mut artifact = DiagramArtifact {
            image: None,
            source: Some(mermaid_name),
        };
        let mut diagram_path = None;

        if let Some(renderer) = &self.renderer {
            let format = self.config.diagram.format;
            match renderer.render_image(&description, format).await {
                Ok(bytes) => {
                    let image_name = format!("{}-diagram.{}", stem, format.extension());
                    diagram_path = Some(self.sink.write(Path::new(&image_name), &bytes).await?);
                    artifact.image = Some(image_name);
                }
                Err(e) => {
                    warn!(file = %relative.display(), error = %e, "Diagram image unavailable, embedding Mermaid source only");
                }
            }
        }

        let narrative = match &self.narrator {
            Some(provider) => {
                let constraints = Constraints::from_config(&self.config.ai);
                collect_narrative(provider.as_ref(), &workflow.raw, &constraints).await
            }
            None => None,
        };

        let options = AssembleOptions {
            include_source: self.config.output.include_source,
            diagram: artifact,
        };
        let doc = assemble(&workflow, &graph, &description, narrative.as_ref(), &options);

        let format = self.config.output.format;
        let rendered = doc.render(format)?;
        let document_name = self.document_name(path);
        let document = self
            .sink
            .write(Path::new(&document_name), rendered.as_bytes())
            .await?;

        let report = FileReport {
            source: relative,
            document,
            mermaid,
            diagram: diagram_path,
            narrative: narrative.is_some(),
        };
        Ok((workflow, report))
    }

    async fn write_index(&self, workflows: &[WorkflowDefinition]) -> Result<PathBuf> {
        // Source paths are workspace-relative, so the graph resolves against "".
        let graph = CallGraph::build(workflows, Path::new(""));
        if let Err(e) = graph.validate() {
            warn!(error = %e, "Workflow call graph contains a cycle");
        }

        let doc = assemble_index(&graph, Path::new(""), self.config.output.format);
        let content = doc.render(OutputFormat::Markdown)?;
        self.sink.write(Path::new(INDEX_FILE), content.as_bytes()).await
    }

    fn document_name(&self, path: &Path) -> String {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "workflow".to_string());
        format!("{}.{}", stem, self.config.output.format.extension())
    }

    fn relative(&self, path: &Path) -> PathBuf {
        path.strip_prefix(&self.workspace)
            .unwrap_or(path)
            .to_path_buf()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagram::{DiagramDescription, ImageFormat};
    use crate::narrative::SectionKind;
    use async_trait::async_trait;

    const CI: &str = r#"name: CI
on: push
jobs:
  lint:
    runs-on: ubuntu-latest
    steps:
      - run: make lint
  test:
    runs-on: ubuntu-latest
    steps:
      - run: make test
  build:
    needs: [lint, test]
    runs-on: ubuntu-latest
    steps:
      - run: make build
  deploy:
    needs: build
    if: github.ref == 'refs/heads/main'
    uses: ./.github/workflows/release.yml
"#;

    const RELEASE: &str = r#"name: Release
on: workflow_call
jobs:
  publish:
    runs-on: ubuntu-latest
    steps:
      - run: make publish
"#;

    const CYCLE: &str = r#"on: push
jobs:
  a:
    needs: b
    steps: [{run: a}]
  b:
    needs: a
    steps: [{run: b}]
"#;

    struct FakeRenderer;

    #[async_trait]
    impl ImageRenderer for FakeRenderer {
        async fn render_image(
            &self,
            _diagram: &DiagramDescription,
            format: ImageFormat,
        ) -> Result<Vec<u8>> {
            Ok(format!("image/{}", format).into_bytes())
        }
    }

    struct BrokenRenderer;

    #[async_trait]
    impl ImageRenderer for BrokenRenderer {
        async fn render_image(
            &self,
            _diagram: &DiagramDescription,
            _format: ImageFormat,
        ) -> Result<Vec<u8>> {
            Err(Error::RenderUnavailable("mmdc not installed".to_string()))
        }
    }

    struct Offline;

    #[async_trait]
    impl NarrativeProvider for Offline {
        fn name(&self) -> &str {
            "offline"
        }

        async fn generate(
            &self,
            _kind: SectionKind,
            _workflow_raw: &str,
            _constraints: &Constraints,
        ) -> Result<String> {
            Err(Error::NarrativeUnavailable("connection refused".to_string()))
        }
    }

    struct Helpful;

    #[async_trait]
    impl NarrativeProvider for Helpful {
        fn name(&self) -> &str {
            "helpful"
        }

        async fn generate(
            &self,
            kind: SectionKind,
            _workflow_raw: &str,
            _constraints: &Constraints,
        ) -> Result<String> {
            Ok(format!("Notes for {}.", kind.as_str()))
        }
    }

    fn workspace(files: &[(&str, &str)]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let workflows = dir.path().join(".github/workflows");
        std::fs::create_dir_all(&workflows).unwrap();
        for (name, content) in files {
            let path = workflows.join(name);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, content).unwrap();
        }
        dir
    }

    fn generator(ws: &Path, config: Config) -> Generator {
        let sink = Arc::new(FsSink::new(ws.join("docs/workflows")));
        Generator::new(config, ws, sink)
    }

    #[tokio::test]
    async fn test_batch_writes_documents_and_diagrams() {
        let ws = workspace(&[("ci.yml", CI), ("release.yml", RELEASE)]);
        let report = generator(ws.path(), Config::default())
            .with_renderer(Arc::new(FakeRenderer))
            .run()
            .await
            .unwrap();

        assert!(report.is_success());
        assert_eq!(report.documented.len(), 2);
        assert!(report.index.is_none());

        let out = ws.path().join("docs/workflows");
        let md = std::fs::read_to_string(out.join("ci.md")).unwrap();
        assert!(md.starts_with("# GitHub Actions Workflow: CI\n"));
        assert!(md.contains("![Workflow Diagram](ci-diagram.png)"));
        assert!(md.contains("**File Path**: `.github/workflows/ci.yml`"));
        assert_eq!(
            std::fs::read_to_string(out.join("ci-diagram.png")).unwrap(),
            "image/png"
        );
        let mermaid = std::fs::read_to_string(out.join("ci-diagram.mmd")).unwrap();
        assert!(mermaid.starts_with("graph TD\n"));
        assert!(out.join("release.md").exists());
    }

    #[tokio::test]
    async fn test_failures_are_per_file() {
        let ws = workspace(&[("ci.yml", CI), ("cycle.yml", CYCLE), ("empty.yml", "")]);
        let report = generator(ws.path(), Config::default()).run().await.unwrap();

        assert!(!report.is_success());
        assert_eq!(report.documented.len(), 1);
        assert_eq!(report.failed.len(), 2);

        let cycle = report
            .failed
            .iter()
            .find(|f| f.source.ends_with("cycle.yml"))
            .unwrap();
        assert_eq!(cycle.error.code(), "ANALYSIS_ERROR");
        let empty = report
            .failed
            .iter()
            .find(|f| f.source.ends_with("empty.yml"))
            .unwrap();
        assert_eq!(empty.error.code(), "DEFINITION_ERROR");

        assert!(ws.path().join("docs/workflows/ci.md").exists());
        assert!(!ws.path().join("docs/workflows/cycle.md").exists());
    }

    #[tokio::test]
    async fn test_degradations_do_not_fail_the_file() {
        let ws = workspace(&[("ci.yml", CI)]);
        let report = generator(ws.path(), Config::default())
            .with_renderer(Arc::new(BrokenRenderer))
            .with_narrator(Arc::new(Offline))
            .run()
            .await
            .unwrap();

        assert!(report.is_success());
        let file = &report.documented[0];
        assert!(file.diagram.is_none());
        assert!(!file.narrative);

        let md = std::fs::read_to_string(&file.document).unwrap();
        assert!(md.contains("```mermaid\ngraph TD"));
        assert!(!md.contains("AI-Generated"));
        assert!(!md.contains("connection refused"));
    }

    #[tokio::test]
    async fn test_narrative_and_html_output() {
        let ws = workspace(&[("ci.yml", CI)]);
        let mut config = Config::default();
        config.output.format = OutputFormat::Html;
        config.output.include_source = true;

        let report = generator(ws.path(), config)
            .with_narrator(Arc::new(Helpful))
            .run()
            .await
            .unwrap();

        let file = &report.documented[0];
        assert!(file.narrative);
        assert!(file.document.ends_with("ci.html"));

        let html = std::fs::read_to_string(&file.document).unwrap();
        assert!(html.contains("<h2>AI-Generated Usage Information</h2>"));
        assert!(html.contains("<p>Notes for suggested_improvements.</p>"));
        assert!(html.contains("<h2>Workflow Source</h2>"));
    }

    #[tokio::test]
    async fn test_index_links_workflow_calls() {
        let ws = workspace(&[("ci.yml", CI), ("release.yml", RELEASE), ("lint.yml", RELEASE)]);
        let mut config = Config::default();
        config.output.index = true;

        let report = generator(ws.path(), config).run().await.unwrap();
        let index = std::fs::read_to_string(report.index.unwrap()).unwrap();

        assert!(index.contains("```\nci.yml\n  └─ release.yml\n```"));
        assert!(index.contains("## Standalone Workflows\n\n- [lint](lint.md)"));
    }

    #[tokio::test]
    async fn test_workflow_named_index_does_not_replace_index_page() {
        let ws = workspace(&[("index.yml", RELEASE), ("lint.yml", RELEASE)]);
        let mut config = Config::default();
        config.output.index = true;

        let report = generator(ws.path(), config).run().await.unwrap();

        assert_eq!(report.documented.len(), 1);
        assert_eq!(report.failed.len(), 1);
        let clash = &report.failed[0];
        assert!(clash.source.ends_with("index.yml"));
        assert_eq!(clash.error.code(), "SINK_ERROR");
        assert!(clash.error.to_string().contains("'index.md'"));
        assert!(clash.error.to_string().contains("workflow index"));

        let index = std::fs::read_to_string(report.index.unwrap()).unwrap();
        assert!(index.starts_with("# GitHub Actions Workflows\n"));
    }

    #[tokio::test]
    async fn test_html_workflow_named_index_is_documented() {
        let ws = workspace(&[("index.yml", RELEASE)]);
        let mut config = Config::default();
        config.output.index = true;
        config.output.format = OutputFormat::Html;

        let report = generator(ws.path(), config).run().await.unwrap();
        assert!(report.is_success());
        assert!(report.documented[0].document.ends_with("index.html"));
        assert!(report.index.unwrap().ends_with("index.md"));
    }

    #[tokio::test]
    async fn test_same_stem_in_nested_directory_fails_later_file() {
        let ws = workspace(&[("ci.yml", CI), ("nested/ci.yml", RELEASE)]);
        let mut config = Config::default();
        config.input.workflow_files = ".github/**/*.yml".to_string();

        let report = generator(ws.path(), config).run().await.unwrap();

        assert_eq!(report.documented.len(), 1);
        assert!(report.documented[0].source.ends_with(".github/workflows/ci.yml"));
        assert_eq!(report.failed.len(), 1);
        let clash = &report.failed[0];
        assert!(clash.source.ends_with("nested/ci.yml"));
        assert_eq!(clash.error.code(), "SINK_ERROR");
        assert!(clash
            .error
            .to_string()
            .contains("already written for .github/workflows/ci.yml"));

        let md = std::fs::read_to_string(ws.path().join("docs/workflows/ci.md")).unwrap();
        assert!(md.starts_with("# GitHub Actions Workflow: CI\n"));
    }

    #[tokio::test]
    async fn test_no_matching_files() {
        let ws = workspace(&[]);
        let mut config = Config::default();
        config.input.workflow_files = ".github/workflows/*.yaml".to_string();
        let report = generator(ws.path(), config).run().await.unwrap();
        assert!(report.is_empty());
    }

    #[test]
    fn test_from_config_rejects_unknown_provider() {
        let mut config = Config::default();
        config.ai.enabled = true;
        config.ai.provider = "nonexistent".to_string();
        let err = Generator::from_config(config, "/tmp").err().unwrap();
        assert_eq!(err.code(), "CONFIG_ERROR");
    }

    #[test]
    fn test_from_config_without_key_skips_narrative() {
        let mut config = Config::default();
        config.ai.enabled = true;
        config.diagram.enabled = false;
        let generator = Generator::from_config(config, "/tmp").unwrap();
        assert!(generator.narrator.is_none());
        assert!(generator.renderer.is_none());
    }
}

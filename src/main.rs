use std::path::{Path, PathBuf};

use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gha_doc::config::{parse_flag, Config};

#[derive(Parser)]
#[command(name = "gha-doc")]
#[command(about = "Generate documentation for GitHub Actions workflows", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    generate: GenerateArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate documentation for every matching workflow (default)
    Generate(GenerateArgs),
    /// Parse and analyze a workflow file
    Validate {
        /// Path to workflow YAML file
        file: PathBuf,
    },
    /// Print the job dependency graph of a workflow
    Graph {
        /// Path to workflow YAML file
        file: PathBuf,
        /// Print the topological order instead of the execution flow
        #[arg(long, conflicts_with = "mermaid")]
        order: bool,
        /// Print the Mermaid diagram source
        #[arg(long)]
        mermaid: bool,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: CompletionShell,
    },
}

/// Options of a documentation run.
///
/// Each flag also reads the matching GitHub Action input (`INPUT_*`). Empty
/// values count as unset, so the configuration files and defaults apply.
#[derive(Args, Clone)]
struct GenerateArgs {
    /// Glob pattern for workflow files, relative to the workspace
    #[arg(long, env = "INPUT_WORKFLOW_FILES")]
    workflow_files: Option<String>,

    /// Output directory, relative to the workspace
    #[arg(long, env = "INPUT_OUTPUT_DIR")]
    output_dir: Option<String>,

    /// Output format (markdown or html)
    #[arg(long, env = "INPUT_FORMAT")]
    format: Option<String>,

    /// Render diagram images (true or false)
    #[arg(long, env = "INPUT_GENERATE_DIAGRAMS", num_args = 0..=1, default_missing_value = "true")]
    generate_diagrams: Option<String>,

    /// Diagram image format (png, svg or pdf)
    #[arg(long, env = "INPUT_DIAGRAM_FORMAT")]
    diagram_format: Option<String>,

    /// Append the workflow source to each document
    #[arg(long, env = "INPUT_INCLUDE_SOURCE", num_args = 0..=1, default_missing_value = "true")]
    include_source: Option<String>,

    /// Add AI-generated usage notes and suggestions
    #[arg(long, env = "INPUT_AI_ENHANCEMENT", num_args = 0..=1, default_missing_value = "true")]
    ai_enhancement: Option<String>,

    /// AI provider (openai or agent)
    #[arg(long, env = "INPUT_AI_PROVIDER")]
    ai_provider: Option<String>,

    /// API key for the AI provider
    #[arg(long, env = "INPUT_AI_API_KEY", hide_env_values = true)]
    ai_api_key: Option<String>,

    /// Also write index.md with the workflow call graph
    #[arg(long, env = "INPUT_INDEX", num_args = 0..=1, default_missing_value = "true")]
    index: Option<String>,

    /// Repository root
    #[arg(long, env = "GITHUB_WORKSPACE", default_value = ".")]
    workspace: PathBuf,
}

impl GenerateArgs {
    /// Apply command-line values on top of the loaded configuration.
    fn apply(&self, config: &mut Config) -> anyhow::Result<()> {
        if let Some(pattern) = non_empty(&self.workflow_files) {
            config.input.workflow_files = pattern.to_string();
        }
        if let Some(dir) = non_empty(&self.output_dir) {
            config.output.output_dir = PathBuf::from(dir);
        }
        if let Some(format) = non_empty(&self.format) {
            config.output.format = format.parse()?;
        }
        if let Some(flag) = non_empty(&self.generate_diagrams) {
            config.diagram.enabled = parse_flag("--generate-diagrams", flag)?;
        }
        if let Some(format) = non_empty(&self.diagram_format) {
            config.diagram.format = format.parse()?;
        }
        if let Some(flag) = non_empty(&self.include_source) {
            config.output.include_source = parse_flag("--include-source", flag)?;
        }
        if let Some(flag) = non_empty(&self.ai_enhancement) {
            config.ai.enabled = parse_flag("--ai-enhancement", flag)?;
        }
        if let Some(provider) = non_empty(&self.ai_provider) {
            config.ai.provider = provider.to_string();
        }
        if let Some(key) = non_empty(&self.ai_api_key) {
            config.ai.api_key = Some(key.to_string());
        }
        if let Some(flag) = non_empty(&self.index) {
            config.output.index = parse_flag("--index", flag)?;
        }
        Ok(())
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "gha_doc=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        None => cmd_generate(&cli.generate).await?,
        Some(Commands::Generate(args)) => cmd_generate(&args).await?,
        Some(Commands::Validate { file }) => cmd_validate(&file)?,
        Some(Commands::Graph {
            file,
            order,
            mermaid,
        }) => cmd_graph(&file, order, mermaid)?,
        Some(Commands::Completions { shell }) => cmd_completions(shell)?,
    }

    Ok(())
}

/// Shell completion variants
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum CompletionShell {
    /// Bash shell
    Bash,
    /// Zsh shell
    Zsh,
    /// Fish shell
    Fish,
    /// PowerShell
    PowerShell,
    /// Elvish shell
    Elvish,
}

impl From<CompletionShell> for Shell {
    fn from(shell: CompletionShell) -> Self {
        match shell {
            CompletionShell::Bash => Shell::Bash,
            CompletionShell::Zsh => Shell::Zsh,
            CompletionShell::Fish => Shell::Fish,
            CompletionShell::PowerShell => Shell::PowerShell,
            CompletionShell::Elvish => Shell::Elvish,
        }
    }
}

/// Generate shell completions
fn cmd_completions(shell: CompletionShell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    let shell: Shell = shell.into();
    generate(shell, &mut cmd, name, &mut std::io::stdout());
    Ok(())
}

// ============================================================================
// Documentation Commands
// ============================================================================

async fn cmd_generate(args: &GenerateArgs) -> anyhow::Result<()> {
    use gha_doc::pipeline::Generator;

    let workspace = args.workspace.clone();
    let mut config = Config::load(&workspace)?;
    args.apply(&mut config)?;

    let pattern = config.input.workflow_files.clone();
    let generator = Generator::from_config(config, &workspace)?;
    let report = generator.run().await?;

    if report.is_empty() {
        anyhow::bail!("No workflow files found matching pattern: {}", pattern);
    }

    for file in &report.documented {
        println!(
            "✓ {} -> {}",
            file.source.display(),
            file.document.display()
        );
        if let Some(diagram) = &file.diagram {
            println!("  Diagram: {}", diagram.display());
        }
    }
    if let Some(index) = &report.index {
        println!("✓ Index: {}", index.display());
    }
    for failure in &report.failed {
        println!(
            "✗ {} [{}]: {}",
            failure.source.display(),
            failure.error.code(),
            failure.error
        );
    }

    if !report.is_success() {
        anyhow::bail!(
            "{} of {} workflow files failed",
            report.failed.len(),
            report.documented.len() + report.failed.len()
        );
    }

    Ok(())
}

fn cmd_validate(file: &Path) -> anyhow::Result<()> {
    use gha_doc::workflow::{analyze, parse_workflow_file};

    if !file.exists() {
        anyhow::bail!("File not found: {}", file.display());
    }

    let workflow = parse_workflow_file(file)?;
    let graph = analyze(&workflow)?;

    println!("✓ Workflow '{}' is valid", workflow.name);
    println!();
    println!("  Triggers: {}", workflow.triggers.len());
    println!("  Inputs: {}", workflow.inputs.len());
    println!("  Jobs: {}", graph.complexity.jobs);
    println!("  Steps: {}", graph.complexity.steps);
    println!("  Longest chain: {}", graph.complexity.max_chain_length);

    if !graph.calls.is_empty() {
        println!("  Reusable workflow calls: {}", graph.calls.len());
    }
    if !graph.matrices.is_empty() {
        println!(
            "  Matrix combinations: {}",
            graph.total_matrix_combinations()
        );
    }

    Ok(())
}

fn cmd_graph(file: &Path, show_order: bool, mermaid: bool) -> anyhow::Result<()> {
    use gha_doc::diagram::{render, to_mermaid};
    use gha_doc::workflow::{analyze, parse_workflow_file};

    let workflow = parse_workflow_file(file)?;
    let graph = analyze(&workflow)?;

    if mermaid {
        let config = Config::load(Path::new("."))?;
        print!("{}", to_mermaid(&render(&graph, &config.diagram.style)));
    } else if show_order {
        println!("Execution order for '{}':", workflow.name);
        for (i, id) in graph.topological_order().iter().enumerate() {
            println!("  {}. {}", i + 1, id);
        }
    } else {
        println!("{}", graph.flow_text());
    }

    Ok(())
}

//! Command-line front end for the Gooey RAD builder.
//!
//! Creates, inspects, migrates and compiles `.xml` project files without the
//! visual designer.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use gooey_rad_builder::config::{self, BuilderConfig};
use gooey_rad_builder::highlight::Highlighter;
use gooey_rad_builder::runner::{self, CancelToken, OutputLine, RunError};
use gooey_rad_builder::serialize::{self, LoadOutcome};
use gooey_rad_builder::{CodeGenFormat, CodeGenOptions, EditorSession, Slot};
use std::io::{BufReader, IsTerminal};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "GOOEY_BUILDER_LOG";

/// Build Gooey GUI projects from the command line
#[derive(Parser, Debug)]
#[command(name = "gooey-rad-builder")]
#[command(version, about)]
struct Cli {
    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (defaults to ./gooey-builder.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create an empty project file
    New {
        path: PathBuf,
        /// Project name
        #[arg(long, default_value = "Untitled")]
        name: String,
        /// Window title
        #[arg(long)]
        title: Option<String>,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the widget tree of a project
    Tree { project: PathBuf },
    /// Generate C source for a project
    Generate {
        project: PathBuf,
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long, value_enum)]
        format: Option<FormatArg>,
        /// Leave out header and section comments
        #[arg(long)]
        no_comments: bool,
        /// Colorize the source (stdout only)
        #[arg(long)]
        highlight: bool,
    },
    /// Compile and run a project
    Run { project: PathBuf },
    /// Rewrite a project in the current file format
    Migrate {
        project: PathBuf,
        /// Write here instead of replacing the input
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FormatArg {
    Full,
    InitOnly,
}

impl From<FormatArg> for CodeGenFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Full => CodeGenFormat::Full,
            FormatArg::InitOnly => CodeGenFormat::InitOnly,
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let cwd = std::env::current_dir().context("cannot determine working directory")?;
    let config = config::load(cli.config.as_deref(), &cwd)?;

    match cli.command {
        Command::New {
            path,
            name,
            title,
            force,
        } => new_project(&path, name, title, force),
        Command::Tree { project } => {
            let outcome = open(&project)?;
            print_tree(&outcome.session);
            Ok(())
        }
        Command::Generate {
            project,
            output,
            format,
            no_comments,
            highlight,
        } => {
            let mut options = CodeGenOptions::from(config.codegen);
            if let Some(format) = format {
                options.format = format.into();
            }
            if no_comments {
                options.comments = false;
            }
            generate(&project, output.as_deref(), &options, highlight)
        }
        Command::Run { project } => run(&project, &config),
        Command::Migrate { project, output } => migrate(&project, output.as_deref()),
    }
}

fn open(path: &Path) -> Result<LoadOutcome> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    let outcome =
        serialize::load(&text).with_context(|| format!("cannot load {}", path.display()))?;
    for diagnostic in &outcome.diagnostics {
        warn!("{}: {diagnostic}", path.display());
    }
    Ok(outcome)
}

fn write(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents).with_context(|| format!("cannot write {}", path.display()))
}

fn new_project(path: &Path, name: String, title: Option<String>, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    let mut session = EditorSession::new();
    session.window.title = title.unwrap_or_else(|| name.clone());
    session.project.name = name;
    write(path, &session.save_xml()?)?;
    info!(path = %path.display(), "created project");
    Ok(())
}

fn print_tree(session: &EditorSession) {
    println!(
        "{} ({}x{}, {} widgets)",
        session.project.name,
        session.window.width,
        session.window.height,
        session.len()
    );
    for visit in session.walk() {
        let w = visit.widget;
        let slot = match visit.placement.map(|p| p.slot) {
            Some(Slot::Pane(i)) => format!(" [pane {i}]"),
            Some(Slot::Tab(i)) => format!(" [tab {i}]"),
            Some(Slot::None) | None => String::new(),
        };
        let mut line = format!(
            "{}{} ({}){slot} @ {},{} {}x{}",
            "  ".repeat(visit.depth + 1),
            w.var_name,
            w.kind,
            w.geometry.x,
            w.geometry.y,
            w.geometry.width,
            w.geometry.height
        );
        if let Some(name) = &w.macro_name {
            line.push_str(&format!(" #{name}"));
        }
        if let Some(cb) = w.callback.as_ref().filter(|cb| !cb.name.is_empty()) {
            line.push_str(&format!(" -> {}()", cb.name));
        }
        println!("{line}");
    }
}

fn generate(
    project: &Path,
    output: Option<&Path>,
    options: &CodeGenOptions,
    highlight: bool,
) -> Result<()> {
    let outcome = open(project)?;
    let source = outcome
        .session
        .generate_source(options)
        .with_context(|| format!("cannot generate code for {}", project.display()))?;

    match output {
        Some(path) => {
            write(path, &source)?;
            info!(path = %path.display(), format = options.format.display_name(), "wrote source");
        }
        None if highlight && std::io::stdout().is_terminal() => {
            print!("{}", Highlighter::new().to_ansi(&source));
        }
        None => print!("{source}"),
    }
    Ok(())
}

fn run(project: &Path, config: &BuilderConfig) -> Result<()> {
    let outcome = open(project)?;
    let options = CodeGenOptions {
        format: CodeGenFormat::Full,
        comments: config.codegen.comments,
    };
    let source = outcome.session.generate_source(&options)?;

    let cancel = CancelToken::new();
    if std::io::stdin().is_terminal() {
        info!("type q and press Enter to stop the program");
        runner::cancel_on_quit(BufReader::new(std::io::stdin()), cancel.clone());
    }
    let result = runner::build_and_run(&source, config, &cancel, |line| match line {
        OutputLine::Stdout(text) => println!("{text}"),
        OutputLine::Stderr(text) => eprintln!("{text}"),
    });
    let report = match result {
        Err(RunError::Cancelled { stage }) => {
            info!(%stage, "stopped");
            return Ok(());
        }
        other => other?,
    };

    info!(
        started = %report.started.format("%H:%M:%S"),
        finished = %report.finished.format("%H:%M:%S"),
        "run complete"
    );
    if !report.success() {
        bail!("program exited with code {:?}", report.exit_code);
    }
    Ok(())
}

fn migrate(project: &Path, output: Option<&Path>) -> Result<()> {
    let outcome = open(project)?;
    let target = output.unwrap_or(project);
    if !outcome.was_migrated() && outcome.diagnostics.is_empty() && output.is_none() {
        info!(path = %project.display(), "already current, nothing to do");
        return Ok(());
    }
    write(target, &outcome.session.save_xml()?)?;
    info!(
        from = outcome.version.as_deref().unwrap_or("legacy"),
        path = %target.display(),
        repairs = outcome.diagnostics.len(),
        "migrated project"
    );
    Ok(())
}

//! # Page Designer CLI
//!
//! Inspect design documents from the command line.
//!
//! ## Usage
//!
//! ```bash
//! page-designer layout design.json --width 1440 --height 900
//! page-designer align design.json button-1 --x 101 --y 40 --threshold 8
//! page-designer validate design.json --min-spacing 4
//! page-designer history exported-history.json
//! ```
//!
//! `--config <file.json>` loads a `DesignerConfig`; every section is optional.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use designer_core::history::ExportDocument;
use designer_core::{
    ComponentId, DesignDocument, DesignSession, DesignerConfig, LayoutCalculationResult, Point,
    Viewport,
};

/// Command-line arguments for page-designer.
#[derive(Debug, Clone, Parser)]
#[command(name = "page-designer")]
#[command(about = "Inspect page designer documents")]
#[command(version)]
pub struct CliArgs {
    /// Designer configuration file (JSON)
    #[arg(long, global = true, env = "PAGE_DESIGNER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log output format
    #[arg(long, global = true, env = "RUST_LOG_FORMAT", value_enum, default_value = "text")]
    pub log_format: LogFormat,

    /// What to do
    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    Text,
    /// One JSON object per line.
    Json,
}

/// Viewport size arguments.
#[derive(Debug, Clone, Copy, Args)]
pub struct ViewportArgs {
    /// Viewport width in pixels
    #[arg(long, default_value = "1200")]
    pub width: f32,

    /// Viewport height in pixels
    #[arg(long, default_value = "800")]
    pub height: f32,
}

impl From<ViewportArgs> for Viewport {
    fn from(args: ViewportArgs) -> Self {
        Viewport::new(args.width, args.height)
    }
}

/// Subcommands.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Print every component's resolved rectangle
    Layout {
        /// Design document
        design: PathBuf,
        /// Viewport size
        #[command(flatten)]
        viewport: ViewportArgs,
    },
    /// Print guides and the snapped position for a hypothetical drag
    Align {
        /// Design document
        design: PathBuf,
        /// Component being dragged
        component: String,
        /// Proposed x of the component's origin
        #[arg(long, allow_negative_numbers = true)]
        x: f32,
        /// Proposed y of the component's origin
        #[arg(long, allow_negative_numbers = true)]
        y: f32,
        /// Snap threshold in pixels (overrides the configuration)
        #[arg(long)]
        threshold: Option<f32>,
        /// Viewport size
        #[command(flatten)]
        viewport: ViewportArgs,
    },
    /// Report structural, overlap and spacing problems
    Validate {
        /// Design document
        design: PathBuf,
        /// Minimum distance between siblings
        #[arg(long, default_value = "0")]
        min_spacing: f32,
        /// Viewport size
        #[command(flatten)]
        viewport: ViewportArgs,
    },
    /// Summarize an exported history document
    History {
        /// Exported history
        export: PathBuf,
    },
}

/// Result of running a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// Text to print.
    pub output: String,
    /// Whether the command found nothing wrong.
    pub success: bool,
}

impl Outcome {
    fn ok(output: String) -> Self {
        Self {
            output,
            success: true,
        }
    }
}

/// Load a configuration file, or the defaults when no path is given.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<DesignerConfig> {
    let Some(path) = path else {
        return Ok(DesignerConfig::default());
    };
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    DesignerConfig::from_json(&json).with_context(|| format!("Invalid config {}", path.display()))
}

/// Load a design document.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_design(path: &Path) -> anyhow::Result<DesignDocument> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read design {}", path.display()))?;
    DesignDocument::from_json(&json).with_context(|| format!("Invalid design {}", path.display()))
}

/// Run a command.
///
/// # Errors
///
/// Returns an error if an input file cannot be loaded or the command fails.
pub fn run(args: &CliArgs) -> anyhow::Result<Outcome> {
    let config = load_config(args.config.as_deref())?;
    match &args.command {
        Command::Layout { design, viewport } => {
            let mut session = open_session(config, *viewport, design)?;
            Ok(Outcome::ok(render_layout(&session.calculate_layout())))
        }
        Command::Align {
            design,
            component,
            x,
            y,
            threshold,
            viewport,
        } => {
            let mut config = config;
            if let Some(threshold) = threshold {
                config.alignment.snap_threshold = *threshold;
            }
            let mut session = open_session(config, *viewport, design)?;
            align(&mut session, &ComponentId::new(component.as_str()), Point::new(*x, *y))
        }
        Command::Validate {
            design,
            min_spacing,
            viewport,
        } => {
            let mut session = open_session(config, *viewport, design)?;
            Ok(validate(&mut session, *min_spacing))
        }
        Command::History { export } => history_summary(export),
    }
}

fn open_session(config: DesignerConfig, viewport: ViewportArgs, design: &Path) -> anyhow::Result<DesignSession> {
    let document = load_design(design)?;
    let mut session = DesignSession::new(config, viewport.into());
    session.load_design(document);
    tracing::debug!(
        components = session.components().len(),
        breakpoint = %session.viewport().breakpoint,
        "Opened design"
    );
    Ok(session)
}

/// Render layout results, one component per line, indented by depth.
#[must_use]
pub fn render_layout(results: &[LayoutCalculationResult]) -> String {
    fn walk(result: &LayoutCalculationResult, depth: usize, out: &mut String) {
        if !result.visible {
            return;
        }
        let info = &result.layout_info;
        let _ = writeln!(
            out,
            "{:indent$}{} ({}) x={} y={} w={} h={}",
            "",
            result.component_id,
            result.component_type,
            info.position.x,
            info.position.y,
            info.width,
            info.height,
            indent = depth * 2
        );
        for child in &result.children {
            walk(child, depth + 1, out);
        }
    }

    let mut out = String::new();
    for result in results {
        walk(result, 0, &mut out);
    }
    for warning in results.iter().flat_map(LayoutCalculationResult::all_warnings) {
        let _ = writeln!(out, "warning: {warning}");
    }
    out
}

fn align(session: &mut DesignSession, id: &ComponentId, proposed: Point) -> anyhow::Result<Outcome> {
    let result = session
        .drag_preview(id, proposed)
        .with_context(|| format!("Cannot preview drag of {id}"))?;

    let mut out = String::new();
    let _ = writeln!(
        out,
        "snapped: x={} y={}",
        result.snapped_position.x, result.snapped_position.y
    );
    for guide in &result.guides {
        let _ = writeln!(
            out,
            "{} {} guide at {} from {}",
            guide.strength, guide.orientation, guide.position, guide.source
        );
    }
    for edge in &result.aligned_edges {
        let _ = writeln!(out, "aligned: {} on {}", edge.edge, edge.position);
    }
    Ok(Outcome::ok(out))
}

fn validate(session: &mut DesignSession, min_spacing: f32) -> Outcome {
    let report = session.validate(min_spacing);
    if report.is_clean() {
        return Outcome::ok("ok\n".to_string());
    }

    let mut out = String::new();
    for issue in &report.tree_issues {
        let _ = writeln!(out, "tree: {}", serde_json::to_string(issue).unwrap_or_default());
    }
    for issue in &report.layout_issues {
        let _ = writeln!(out, "layout: {}", serde_json::to_string(issue).unwrap_or_default());
    }
    for warning in &report.layout_warnings {
        let _ = writeln!(out, "warning: {warning}");
    }
    Outcome {
        output: out,
        success: report.tree_issues.is_empty() && report.layout_issues.is_empty(),
    }
}

fn history_summary(path: &Path) -> anyhow::Result<Outcome> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read history {}", path.display()))?;
    let document =
        ExportDocument::parse(&json).with_context(|| format!("Invalid history {}", path.display()))?;

    let mut out = String::new();
    let _ = writeln!(out, "version: {}", document.version);
    let _ = writeln!(out, "exported: {}", document.exported_at.to_rfc3339());
    let _ = writeln!(out, "entries: {}", document.history.len());
    let _ = writeln!(out, "cursor: {}", document.current_index);
    for (i, item) in document.history.iter().enumerate() {
        let marker = if i64::try_from(i).ok() == Some(document.current_index) {
            '*'
        } else {
            ' '
        };
        let _ = writeln!(
            out,
            "{marker} [{i}] {} {} ({})",
            item.timestamp.to_rfc3339(),
            item.action,
            item.description
        );
    }
    Ok(Outcome::ok(out))
}

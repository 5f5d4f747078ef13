use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use sqldiagram::handler::{DEFAULT_MAX_QUERY_BYTES, RequestConfig, diagram_for, handle_request};
use sqldiagram::svg::SvgRenderer;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Draw the CTEs and tables of a SQL query as a data-flow diagram
#[derive(Parser)]
#[command(name = "sqldiagram")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// SQL file to read (default: stdin)
    input: Option<PathBuf>,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Json)]
    format: Format,

    /// Treat the input as a JSON request body and print the JSON response
    #[arg(long)]
    request: bool,

    /// Largest accepted query, in bytes
    #[arg(long, env = "SQLDIAGRAM_MAX_QUERY_BYTES", default_value_t = DEFAULT_MAX_QUERY_BYTES)]
    max_query_bytes: usize,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Json,
    Svg,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let input = read_input(cli.input.as_ref())?;
    let config = RequestConfig {
        max_query_bytes: cli.max_query_bytes,
    };

    if cli.request {
        let response = handle_request(&input, &config);
        write_output(cli.output.as_ref(), &response.to_json()?)?;
        if !response.is_success() {
            bail!("request failed with status {}", response.status);
        }
        return Ok(());
    }

    let diagram = diagram_for(&input, &config)?;
    tracing::info!(
        nodes = diagram.nodes.len(),
        edges = diagram.edges.len(),
        "generated diagram"
    );

    let rendered = match cli.format {
        Format::Json => serde_json::to_string_pretty(&diagram)?,
        Format::Svg => SvgRenderer::default()
            .render(&diagram)
            .context("Failed to render SVG")?,
    };
    write_output(cli.output.as_ref(), &rendered)
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn read_input(path: Option<&PathBuf>) -> Result<String> {
    match path {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        None => {
            let mut input = String::new();
            io::stdin()
                .read_to_string(&mut input)
                .context("Failed to read stdin")?;
            Ok(input)
        }
    }
}

fn write_output(path: Option<&PathBuf>, content: &str) -> Result<()> {
    match path {
        Some(path) => fs::write(path, content)
            .with_context(|| format!("Failed to write {}", path.display())),
        None => {
            println!("{}", content);
            Ok(())
        }
    }
}

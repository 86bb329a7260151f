use anyhow::{Context, Result};
use benchcharts::caliper;
use benchcharts::config::{Height, ViewConfig};
use benchcharts::data::ResultSet;
use benchcharts::query::{parse_height, parse_query, ViewOptions};
use benchcharts::variables::extract_variables;
use benchcharts::{build_view, render, OutputFormat};
use clap::Parser;
use serde_json::Value;
use std::fs::{self, File};
use std::io::{self, BufReader, Write};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "benchcharts")]
#[command(about = "Summarise benchmark results as grouped bar charts", long_about = None)]
struct Args {
    /// Benchmark results (JSON). Read from stdin when neither this nor `input=` in --query is given
    input: Option<PathBuf>,

    /// Variable whose values become the chart rows
    #[arg(long)]
    rows: Option<String>,

    /// Variable whose values become the bars within each row
    #[arg(long)]
    groups: Option<String>,

    /// Display unit (defaults to the one giving the shortest axis labels)
    #[arg(long)]
    unit: Option<String>,

    #[arg(long)]
    width: Option<u32>,

    /// Height of each chart in pixels, or `auto`
    #[arg(long, value_parser = parse_height)]
    height: Option<Height>,

    /// URL-style options, e.g. '?rows=parser&groups=input'. Flags win over these
    #[arg(short, long)]
    query: Option<String>,

    /// Output format (guessed from --output, otherwise json)
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,

    /// Write to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// The input is a Caliper results file
    #[arg(long)]
    caliper: bool,
}

impl Args {
    fn view_options(&self) -> ViewOptions {
        ViewOptions {
            input: self.input.as_ref().map(|p| p.to_string_lossy().into_owned()),
            rows: self.rows.clone(),
            groups: self.groups.clone(),
            unit: self.unit.clone(),
            width: self.width,
            height: self.height,
            ..ViewOptions::default()
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();

    let from_query = match &args.query {
        Some(query) => parse_query(query).context("Failed to parse --query")?,
        None => ViewOptions::default(),
    };
    let options = from_query.merge(args.view_options());
    for (key, value) in &options.extra {
        warn!(key = key.as_str(), value = value.as_str(), "ignoring unknown option");
    }

    // Read the results document
    let document: Value = match options.input.as_deref() {
        Some(path) => {
            info!(path, "reading benchmark results");
            let file = File::open(path).with_context(|| format!("Failed to open {}", path))?;
            serde_json::from_reader(BufReader::new(file))
                .with_context(|| format!("Failed to parse {}", path))?
        }
        None => serde_json::from_reader(io::stdin().lock())
            .context("Failed to read benchmark results from stdin")?,
    };

    let results = if args.caliper {
        caliper::preprocess(&document)
    } else {
        ResultSet::from_value(&document)
    }
    .context("Failed to load benchmark results")?;
    info!(
        name = results.name.as_str(),
        measurements = results.measurements.len(),
        "loaded results"
    );

    let variables = extract_variables(&results.measurements);
    let view = build_view(&results, &variables, options.apply(ViewConfig::default()))
        .context("Failed to build chart")?;

    let format = args
        .format
        .or_else(|| args.output.as_deref().and_then(OutputFormat::from_path))
        .unwrap_or_default();
    let bytes = render(&view, format).context("Failed to render chart")?;

    match &args.output {
        Some(path) => {
            fs::write(path, &bytes)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(path = %path.display(), ?format, "wrote chart");
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(&bytes)
                .context("Failed to write chart to stdout")?;
            handle.flush().context("Failed to flush stdout")?;
        }
    }

    Ok(())
}

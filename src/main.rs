//! cimplexml CLI - load XML files and print their element trees

use anyhow::{Context, Result};
use clap::{Parser as ClapParser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

use cimplexml::{Document, Parser};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// Minimal XML document loader
#[derive(ClapParser)]
#[command(name = "cimplexml")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Load XML files and print what was found
    Parse {
        /// Input files
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output the element tree as JSON
        #[arg(short, long)]
        json: bool,

        /// Print the element tree as an indented outline
        #[arg(short, long, conflicts_with = "json")]
        tree: bool,

        /// Show statistics
        #[arg(short, long)]
        stats: bool,

        /// Keep whitespace-only text inside elements
        #[arg(long)]
        keep_whitespace: bool,

        /// Reject documents nested deeper than this
        #[arg(long)]
        max_depth: Option<usize>,
    },

    /// Benchmark loading performance
    Bench {
        /// Input file
        input: PathBuf,

        /// Number of iterations
        #[arg(short, long, default_value = "100")]
        iterations: usize,
    },
}

struct Output {
    json: bool,
    tree: bool,
    stats: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            error!("{:?}", e);
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> Result<bool> {
    match cli.command {
        Commands::Parse {
            inputs,
            json,
            tree,
            stats,
            keep_whitespace,
            max_depth,
        } => {
            let mut parser = Parser::new().with_whitespace_text(keep_whitespace);
            if let Some(depth) = max_depth {
                parser = parser.with_max_depth(depth);
            }
            let output = Output { json, tree, stats };

            let results = load_all(&parser, &inputs);
            let mut all_ok = true;
            for (input, result) in inputs.iter().zip(results) {
                match result {
                    Ok((doc, elapsed)) => print_document(input, &doc, elapsed, &output)?,
                    Err(e) => {
                        all_ok = false;
                        println!("{} {}", "✗".red().bold(), input.display());
                        println!("  {} {:#}", "ERROR:".red(), e);
                    }
                }
            }
            Ok(all_ok)
        }

        Commands::Bench { input, iterations } => {
            let parser = Parser::new();
            let iterations = iterations.max(1);

            // Warmup
            for _ in 0..3 {
                parser
                    .parse_file(&input)
                    .with_context(|| format!("Failed to load {}", input.display()))?;
            }

            let mut times = Vec::with_capacity(iterations);
            let mut nodes = 0;

            for _ in 0..iterations {
                let start = Instant::now();
                let doc = parser.parse_file(&input)?;
                times.push(start.elapsed());
                nodes = doc.node_count();
            }

            times.sort();
            let min = times[0];
            let max = times[times.len() - 1];
            let median = times[times.len() / 2];
            let mean = times.iter().sum::<Duration>() / times.len() as u32;

            println!("Benchmark Results for {}", input.display());
            println!("  Iterations: {}", iterations);
            println!("  Elements: {}", nodes);
            println!("  Min:    {:.3}ms", min.as_secs_f64() * 1000.0);
            println!("  Median: {:.3}ms", median.as_secs_f64() * 1000.0);
            println!("  Mean:   {:.3}ms", mean.as_secs_f64() * 1000.0);
            println!("  Max:    {:.3}ms", max.as_secs_f64() * 1000.0);
            println!(
                "  Throughput: {:.0} elements/sec",
                nodes as f64 / mean.as_secs_f64()
            );
            Ok(true)
        }
    }
}

fn load_one(parser: &Parser, input: &Path) -> Result<(Document, Duration)> {
    let start = Instant::now();
    let doc = parser
        .parse_file(input)
        .with_context(|| format!("Failed to load {}", input.display()))?;
    let elapsed = start.elapsed();
    debug!("Loaded {} in {:?}", input.display(), elapsed);
    Ok((doc, elapsed))
}

/// Every file is loaded independently; results come back in input order.
#[cfg(feature = "parallel")]
fn load_all(parser: &Parser, inputs: &[PathBuf]) -> Vec<Result<(Document, Duration)>> {
    use rayon::prelude::*;

    inputs
        .par_iter()
        .map(|input| load_one(parser, input))
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn load_all(parser: &Parser, inputs: &[PathBuf]) -> Vec<Result<(Document, Duration)>> {
    inputs.iter().map(|input| load_one(parser, input)).collect()
}

fn print_document(input: &Path, doc: &Document, elapsed: Duration, output: &Output) -> Result<()> {
    if output.json {
        let json = serde_json::to_string_pretty(doc)
            .with_context(|| format!("Failed to write {} as JSON", input.display()))?;
        println!("{}", json);
        return Ok(());
    }

    println!("{} {}", "✓".green().bold(), input.display());
    if output.tree {
        print!("{}", doc);
    } else {
        let root = doc.root();
        println!("  tag: {}, text: {}", root.tag(), root.text().unwrap_or(""));
        for attr in root.attributes() {
            println!("  {}: {}", attr.key, attr.value);
        }
        println!("  Children: {}", root.child_count());
    }

    if output.stats {
        println!("  Elements: {}", doc.node_count());
        println!("  Depth: {}", doc.max_depth());
        println!("  Time: {:.2}ms", elapsed.as_secs_f64() * 1000.0);
    }
    Ok(())
}

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use medsearch_core::persist::{load_index, save_index, IndexPaths};
use medsearch_core::{DrugRecord, SearchIndex, SearchOptions, DEFAULT_TOP_K};
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build and query the drug TF-IDF index", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Prescription {
    Yes,
    No,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index from JSON/JSONL drug records (file or directory)
    Build {
        /// Input path (file or directory)
        #[arg(long)]
        input: String,
        /// Output index directory
        #[arg(long)]
        output: String,
        /// Directory of `{id}.txt` files whose contents are indexed instead of the record fields
        #[arg(long)]
        texts: Option<String>,
    },
    /// Run one query against a built index
    Query {
        #[arg(long, default_value = "./index")]
        index: String,
        query: String,
        #[arg(long, default_value_t = DEFAULT_TOP_K)]
        k: usize,
        /// Only drugs that do (yes) or do not (no) need a prescription
        #[arg(long, value_enum)]
        rx: Option<Prescription>,
        #[arg(long)]
        min_price: Option<u64>,
        #[arg(long)]
        max_price: Option<u64>,
        /// Keep documents that share no term with the query
        #[arg(long, default_value_t = false)]
        include_zero: bool,
        /// Print the outcome as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Print corpus and index statistics
    Stats {
        #[arg(long, default_value = "./index")]
        index: String,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, output, texts } => build_index(&input, &output, texts.as_deref()),
        Commands::Query { index, query, k, rx, min_price, max_price, include_zero, json } => {
            let mut options = SearchOptions::default().with_top_k(k);
            options.filters.requires_prescription = rx.map(|r| matches!(r, Prescription::Yes));
            options.filters.price_range = price_range(min_price, max_price);
            options.include_zero_scores = include_zero;
            run_query(&index, &query, &options, json)
        }
        Commands::Stats { index } => {
            let idx = load_index(&IndexPaths::new(&index)).with_context(|| format!("loading index from {index}"))?;
            println!("{}", serde_json::to_string_pretty(&idx.stats())?);
            Ok(())
        }
    }
}

/// Open-ended bounds become 0 / u64::MAX.
fn price_range(min: Option<u64>, max: Option<u64>) -> Option<(u64, u64)> {
    match (min, max) {
        (None, None) => None,
        (min, max) => Some((min.unwrap_or(0), max.unwrap_or(u64::MAX))),
    }
}

fn build_index(input: &str, output: &str, texts: Option<&str>) -> Result<()> {
    let mut records = load_records(Path::new(input))?;
    if let Some(dir) = texts {
        attach_texts(&mut records, Path::new(dir))?;
    }
    if records.is_empty() {
        bail!("no drug records found under {input}");
    }
    tracing::info!(num_records = records.len(), "ingested records");

    let index = SearchIndex::build(records)?;
    let meta = save_index(&IndexPaths::new(output), &index)?;
    tracing::info!(output, num_docs = meta.num_docs, num_terms = meta.num_terms, "index build complete");
    Ok(())
}

fn run_query(index: &str, query: &str, options: &SearchOptions, json: bool) -> Result<()> {
    let idx = load_index(&IndexPaths::new(index)).with_context(|| format!("loading index from {index}"))?;
    let outcome = idx.search(query, options);
    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }
    println!("terms: {}", outcome.terms.join(", "));
    if outcome.results.is_empty() {
        println!("no results");
    }
    for (rank, hit) in outcome.results.iter().enumerate() {
        let rx = if hit.record.requires_prescription { "rx" } else { "otc" };
        println!("#{} {:.4} {} {} [{}] Rp {}", rank + 1, hit.score, hit.id, hit.record.name, rx, hit.record.price);
    }
    Ok(())
}

/// Collect records from a .json/.jsonl file, or every such file under a directory.
fn load_records(input: &Path) -> Result<Vec<DrugRecord>> {
    let mut files: Vec<PathBuf> = Vec::new();
    if input.is_dir() {
        for entry in WalkDir::new(input).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() && matches!(extension(p), Some("json" | "jsonl")) {
                files.push(p.to_path_buf());
            }
        }
    } else if input.is_file() {
        files.push(input.to_path_buf());
    } else {
        bail!("input {} does not exist", input.display());
    }

    let mut records = Vec::new();
    let mut seen = HashSet::new();
    for file in files {
        let batch = if extension(&file) == Some("jsonl") { read_jsonl(&file)? } else { read_json(&file)? };
        for record in batch {
            if !seen.insert(record.id.clone()) {
                bail!("duplicate record id {} in {}", record.id, file.display());
            }
            records.push(record);
        }
    }
    Ok(records)
}

fn extension(p: &Path) -> Option<&str> {
    p.extension().and_then(|s| s.to_str())
}

fn read_jsonl(file: &Path) -> Result<Vec<DrugRecord>> {
    let reader = BufReader::new(File::open(file)?);
    let mut out = Vec::new();
    for (n, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() { continue; }
        let record: DrugRecord = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}", file.display(), n + 1))?;
        out.push(record);
    }
    Ok(out)
}

fn read_json(file: &Path) -> Result<Vec<DrugRecord>> {
    let reader = BufReader::new(File::open(file)?);
    let json: serde_json::Value = serde_json::from_reader(reader)?;
    let records = match json {
        serde_json::Value::Array(arr) => arr
            .into_iter()
            .map(serde_json::from_value)
            .collect::<std::result::Result<Vec<DrugRecord>, _>>()?,
        serde_json::Value::Object(_) => vec![serde_json::from_value(json)?],
        _ => bail!("{}: expected a record or an array of records", file.display()),
    };
    Ok(records)
}

/// Use `dir/{id}.txt` as the indexed body when it exists.
fn attach_texts(records: &mut [DrugRecord], dir: &Path) -> Result<()> {
    let mut attached = 0usize;
    for record in records.iter_mut() {
        let path = dir.join(format!("{}.txt", record.id));
        if path.is_file() {
            record.text = Some(fs::read_to_string(&path)?);
            attached += 1;
        }
    }
    tracing::info!(attached, dir = %dir.display(), "attached corpus texts");
    Ok(())
}

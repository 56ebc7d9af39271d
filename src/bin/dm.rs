//! CLI for record-level data management on JSON Lines files.
//!
//! Usage:
//!   dm update -i base.jsonl --other extra.jsonl --key id -o out.jsonl
//!   dm merge --inputs a.jsonl b.jsonl --keys score --reducer mean -o out.jsonl
//!   dm convert excel2jsonl -i sheet.xlsx -o out.jsonl
//!   dm pick -i samples.jsonl -o kept.jsonl
//!
//! Every command computes its full result before writing, so a failed run
//! leaves no partial output behind. `pick` and `label` are the exception:
//! they append each decision as it is made.

use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use dm_rs::{
    ColumnPolicy, ConvertMode, LogSink, Record, Reducer, SessionOptions, SourceKeys,
    TerminalPrompter, UnmatchedPolicy, UpdateOptions, convert, dedupe, drop_columns, keep_columns,
    label, merge_fields, parse_key_mapping, pick, read_jsonl, rename_keys, update_ordered,
    update_unordered, write_jsonl,
};

/// dm: a collection of tools for data management.
#[derive(Parser)]
#[command(name = "dm", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log debug detail on stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Update fields of a jsonl file with data from another jsonl file
    Update(UpdateArgs),
    /// Merge one field across several row-aligned jsonl files
    Merge(MergeArgs),
    /// Keep one line per primary key
    Dedupe(DedupeArgs),
    /// Keep or drop columns
    Filter(FilterArgs),
    /// Rename keys
    Rename(RenameArgs),
    /// Convert file formats
    Convert(ConvertArgs),
    /// Pick samples from a jsonl file
    Pick(PickArgs),
    /// Write a label into each line of a jsonl file
    Label(LabelArgs),
}

#[derive(clap::Args)]
struct UpdateArgs {
    /// The input jsonl file
    #[arg(short, long)]
    input: PathBuf,

    /// The output jsonl file
    #[arg(short, long, default_value = "output.jsonl")]
    output: PathBuf,

    /// The other jsonl file where the new data comes from
    #[arg(long)]
    other: PathBuf,

    /// The key to join the two jsonl files
    #[arg(long, required_unless_present = "ordered")]
    key: Option<String>,

    /// Overwrite with every column of the other file
    #[arg(long)]
    overwrite: bool,

    /// Columns to update (default: columns the input file lacks)
    #[arg(long, num_args = 1..)]
    columns: Option<Vec<String>>,

    /// Pair lines by position instead of by key
    #[arg(long, conflicts_with_all = ["key", "skip_unmatched", "unique_keys"])]
    ordered: bool,

    /// Warn about and keep input lines whose key is missing from the other file
    #[arg(long)]
    skip_unmatched: bool,

    /// Fail if the other file repeats a key
    #[arg(long)]
    unique_keys: bool,
}

#[derive(clap::Args)]
struct MergeArgs {
    /// The row-aligned input jsonl files
    #[arg(short, long, num_args = 2.., required = true)]
    inputs: Vec<PathBuf>,

    /// The source field, or one field per input file
    #[arg(long, num_args = 1.., required = true)]
    keys: Vec<String>,

    /// How the gathered values are combined
    #[arg(long, default_value = "concat")]
    reducer: Reducer,

    /// Field for the merged value (default: the first source field)
    #[arg(long)]
    result_key: Option<String>,

    /// The output jsonl file
    #[arg(short, long, default_value = "output.jsonl")]
    output: PathBuf,
}

#[derive(clap::Args)]
struct DedupeArgs {
    /// The input jsonl file
    #[arg(short, long)]
    input: PathBuf,

    /// The primary key to deduplicate on
    #[arg(long)]
    primary_key: String,

    /// The output jsonl file
    #[arg(short, long, default_value = "output.jsonl")]
    output: PathBuf,
}

#[derive(Clone, Copy, ValueEnum)]
enum FilterMode {
    Keepcols,
    Dropcols,
}

#[derive(clap::Args)]
struct FilterArgs {
    mode: FilterMode,

    /// The input jsonl file
    #[arg(short, long = "input-path")]
    input: PathBuf,

    /// The output jsonl file
    #[arg(short, long = "output-path", default_value = "output.jsonl")]
    output: PathBuf,

    /// Columns to keep or drop
    #[arg(long, num_args = 1.., required = true)]
    columns: Vec<String>,
}

#[derive(clap::Args)]
struct RenameArgs {
    /// The input jsonl file
    #[arg(short, long)]
    input: PathBuf,

    /// The output jsonl file
    #[arg(short, long, default_value = "output.jsonl")]
    output: PathBuf,

    /// Mapping in the form 'src_key1:dst_key1,src_key2:dst_key2'
    #[arg(long)]
    mapping: String,
}

#[derive(clap::Args)]
struct ConvertArgs {
    /// excel2jsonl, excel2csv, jsonl2excel, jsonl2csv, csv2jsonl,
    /// jsonl2json, json2jsonl or md2html
    mode: ConvertMode,

    #[arg(short, long = "input-path")]
    input: PathBuf,

    #[arg(short, long = "output-path")]
    output: PathBuf,
}

#[derive(clap::Args)]
struct PickArgs {
    /// The input jsonl file
    #[arg(short, long)]
    input: PathBuf,

    /// The output jsonl file
    #[arg(short, long, default_value = "output.jsonl")]
    output: PathBuf,

    /// Skip this many lines first
    #[arg(long, default_value_t = 0)]
    start_from: usize,

    /// Do not render markdown
    #[arg(long)]
    not_render: bool,
}

#[derive(clap::Args)]
struct LabelArgs {
    /// The input jsonl file
    #[arg(short, long)]
    input: PathBuf,

    /// The output jsonl file
    #[arg(short, long, default_value = "output.jsonl")]
    output: PathBuf,

    /// Skip this many lines first
    #[arg(long, default_value_t = 0)]
    start_from: usize,

    /// The result key to add to each line
    #[arg(long, default_value = "label")]
    label: String,
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .format_target(false)
        .init();

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Update(args) => run_update(args),
        Commands::Merge(args) => run_merge(args),
        Commands::Dedupe(args) => {
            let records = load(&args.input)?;
            let input_count = records.len();
            let output = dedupe(records, &args.primary_key)?;
            save(&args.output, &output)?;
            log::info!("Processed {input_count} -> {} records", output.len());
            Ok(())
        }
        Commands::Filter(args) => {
            let records = load(&args.input)?;
            let output = match args.mode {
                FilterMode::Keepcols => keep_columns(&records, &args.columns)?,
                FilterMode::Dropcols => drop_columns(records, &args.columns),
            };
            save(&args.output, &output)
        }
        Commands::Rename(args) => {
            let mapping = parse_key_mapping(&args.mapping)?;
            let records = load(&args.input)?;
            save(&args.output, &rename_keys(records, &mapping))
        }
        Commands::Convert(args) => convert(args.mode, &args.input, &args.output)
            .with_context(|| format!("{} failed", args.mode)),
        Commands::Pick(args) => {
            let records = load(&args.input)?;
            let options = SessionOptions {
                start_from: args.start_from,
                render: !args.not_render,
            };
            pick(&records, &args.output, &options, &mut TerminalPrompter)?;
            Ok(())
        }
        Commands::Label(args) => {
            let records = load(&args.input)?;
            let options = SessionOptions {
                start_from: args.start_from,
                ..Default::default()
            };
            label(
                records,
                &args.output,
                &args.label,
                &options,
                &mut TerminalPrompter,
            )?;
            Ok(())
        }
    }
}

fn run_update(args: UpdateArgs) -> Result<()> {
    let other = load(&args.other)?;
    let base = load(&args.input)?;
    if base.is_empty() {
        log::warn!("The input file is empty");
    }

    let policy = ColumnPolicy::from_flags(args.columns, args.overwrite);
    let columns = policy.resolve(&base, &other);
    log::debug!("columns to update: {columns:?}");

    let input_count = base.len();
    let updated = match args.key {
        Some(key) if !args.ordered => {
            let options = UpdateOptions {
                unmatched: if args.skip_unmatched {
                    UnmatchedPolicy::Skip
                } else {
                    UnmatchedPolicy::Fail
                },
                unique_keys: args.unique_keys,
            };
            update_unordered(base, &other, &key, &columns, &options, &LogSink)?
        }
        _ => update_ordered(base, &other, &columns)?,
    };

    save(&args.output, &updated)?;
    log::info!(
        "Processed {input_count} -> {} records, output: {}",
        updated.len(),
        args.output.display()
    );
    Ok(())
}

fn run_merge(args: MergeArgs) -> Result<()> {
    let sequences = args
        .inputs
        .iter()
        .map(|path| load(path))
        .collect::<Result<Vec<_>>>()?;
    let keys = match args.keys.as_slice() {
        [single] => SourceKeys::Single(single.clone()),
        _ => SourceKeys::PerSequence(args.keys.clone()),
    };

    let merged = merge_fields(
        &sequences,
        &keys,
        |values| args.reducer.apply(values),
        args.result_key.as_deref(),
    )?;

    save(&args.output, &merged)?;
    log::info!(
        "Merged {} files ({}) -> {} records",
        sequences.len(),
        args.reducer,
        merged.len()
    );
    Ok(())
}

fn load(path: &Path) -> Result<Vec<Record>> {
    read_jsonl(path).with_context(|| format!("Error reading '{}'", path.display()))
}

fn save(path: &Path, records: &[Record]) -> Result<()> {
    write_jsonl(path, records, false)
        .with_context(|| format!("Error writing output file '{}'", path.display()))
}

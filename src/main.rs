use std::path::PathBuf;

use clap::Parser;
use tokio::io::AsyncWriteExt;
use tracing::info;
use tracing_subscriber::EnvFilter;
use udstore::{OperationStore, StoreConfig, TableSchema, TextFormat, Type};

/// Decode a binary row dump and write it out as delimited text or
/// re-encoded binary.
#[derive(Parser, Debug)]
#[command(name = "udstore", version)]
struct Args {
    /// Column types in order, comma separated. The last one is the row id
    /// and must be `int`.
    #[arg(long, value_delimiter = ',', required = true)]
    types: Vec<String>,

    /// Field delimiter for text output.
    #[arg(long, default_value = ",")]
    delimiter: String,

    /// Token written for NULL values in text output.
    #[arg(long = "null", default_value = "\\N")]
    null_token: String,

    /// Write the binary wire format instead of text.
    #[arg(long)]
    binary: bool,

    /// Snapshot time to read at.
    #[arg(long, default_value_t = 0)]
    snapshot_time: i64,

    /// Binary row dump to read.
    input: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let types = args
        .types
        .iter()
        .map(|name| Type::from_name(name).ok_or_else(|| format!("unknown column type \"{}\"", name)))
        .collect::<Result<Vec<_>, _>>()?;
    let names = (0..types.len().saturating_sub(1))
        .map(|i| format!("c{}", i))
        .collect();
    let schema = TableSchema::new(names, types, None)?;
    let store = OperationStore::new(&schema, StoreConfig::default());

    let input = tokio::fs::read(&args.input).await?;
    let format = TextFormat::new(args.delimiter, args.null_token);
    let format = (!args.binary).then_some(&format);

    let mut output = Vec::with_capacity(input.len());
    let written = store.process_rows(&mut input.as_slice(), args.snapshot_time, &mut output, format)?;

    let mut stdout = tokio::io::stdout();
    stdout.write_all(&output).await?;
    stdout.flush().await?;

    info!(
        input = %args.input.display(),
        bytes_in = input.len(),
        bytes_out = written,
        "done"
    );
    Ok(())
}

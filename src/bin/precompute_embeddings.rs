use clap::Parser;
use kb_query::chunker::DEFAULT_CHUNK_SIZE;
use kb_query::embedder::OnnxEmbedder;
use kb_query::precompute::{precompute, write_records};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Precompute sentence embeddings for the knowledge document
#[derive(Parser, Debug)]
#[command(name = "precompute-embeddings", version)]
struct Args {
    /// Knowledge document to embed
    #[arg(long, default_value = "knowledgebase.md")]
    input: PathBuf,

    /// Output JSON file, overwritten on success
    #[arg(long, default_value = "embeddings.json")]
    output: PathBuf,

    /// Words per chunk
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    /// ONNX export of all-MiniLM-L6-v2
    #[arg(long, default_value = "model/model.onnx")]
    model: String,

    /// Tokenizer JSON matching the model
    #[arg(long, default_value = "model/tokenizer.json")]
    tokenizer: String,
}

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    if let Err(e) = execute(&args) {
        error!("Embedding precomputation failed: {}", e);
        return Err(e);
    }
    Ok(())
}

fn execute(args: &Args) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // The ONNX Runtime environment must exist before any session is created
    ort::init().with_name("precompute-embeddings").commit()?;

    let document = std::fs::read_to_string(&args.input)?;
    let mut embedder = OnnxEmbedder::new(&args.model, &args.tokenizer)?;

    let records = precompute(&document, args.chunk_size, &mut embedder)?;
    write_records(&args.output, &records)?;

    info!(
        records = records.len(),
        output = %args.output.display(),
        "Embeddings written"
    );
    Ok(())
}

//! Offline embedding precomputation
//!
//! Splits the knowledge document into word chunks, embeds them in one batch
//! and writes the `(text, embedding)` pairs as a JSON array.

use crate::chunker::split_words;
use crate::embedder::EmbeddingModel;
use crate::error::EmbedError;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{info, warn};

/// One chunk of the document and its vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    pub text: String,
    pub embedding: Vec<f32>,
}

/// Chunks `document` and embeds every chunk with a single model call.
///
/// Records come back in document order. Fails if the model breaks the
/// one-vector-per-input contract or returns vectors of differing length.
pub fn precompute<M: EmbeddingModel + ?Sized>(
    document: &str,
    chunk_size: usize,
    model: &mut M,
) -> Result<Vec<EmbeddingRecord>, EmbedError> {
    let chunks = split_words(document, chunk_size)?;
    info!(chunks = chunks.len(), chunk_size, "Document split into chunks");

    let embeddings = model.embed_batch(&chunks)?;
    if embeddings.len() != chunks.len() {
        return Err(EmbedError::CountMismatch {
            expected: chunks.len(),
            got: embeddings.len(),
        });
    }

    if let Some(first) = embeddings.first() {
        let expected = first.len();
        if let Some((index, bad)) = embeddings
            .iter()
            .enumerate()
            .find(|(_, e)| e.len() != expected)
        {
            return Err(EmbedError::DimensionMismatch {
                index,
                expected,
                got: bad.len(),
            });
        }
    }

    Ok(chunks
        .into_iter()
        .zip(embeddings)
        .map(|(text, embedding)| EmbeddingRecord { text, embedding })
        .collect())
}

/// Writes the records as a pretty-printed JSON array, replacing `path`.
///
/// The data goes to a sibling temporary file that is renamed into place only
/// after a complete write, so a failure never leaves a partial output.
pub fn write_records(path: impl AsRef<Path>, records: &[EmbeddingRecord]) -> Result<(), EmbedError> {
    let path = path.as_ref();
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    let result = write_json(&tmp_path, records).and_then(|()| {
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    });

    if result.is_err() {
        if let Err(e) = std::fs::remove_file(&tmp_path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %tmp_path.display(), "Failed to remove temporary output: {}", e);
            }
        }
    }
    result
}

fn write_json(path: &Path, records: &[EmbeddingRecord]) -> Result<(), EmbedError> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, records)?;
    writer.flush()?;
    writer.get_ref().sync_all()?;
    Ok(())
}

use crate::error::EmbedError;
use ndarray::{ArrayView1, ArrayView3, Axis, ErrorKind, ShapeError};
use ort::{session::Session, value::Value};
use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};

/// Maximum sequence length in tokens.
/// Longer inputs are truncated, matching the model's training setup.
const MAX_SEQUENCE_LENGTH: usize = 256;

/// Maps an ordered batch of texts to one vector per text, in the same order.
pub trait EmbeddingModel {
    fn embed_batch(&mut self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError>;
}

/// Sentence embedder backed by ONNX Runtime.
///
/// Loads an exported all-MiniLM-L6-v2 model and its tokenizer, and turns a
/// batch of texts into L2-normalized, mean-pooled sentence vectors.
pub struct OnnxEmbedder {
    session: Session,
    tokenizer: Tokenizer,
}

impl OnnxEmbedder {
    /// Creates a new OnnxEmbedder instance.
    ///
    /// # Arguments
    /// * `model_path` - Path to the ONNX model file (e.g., "model/model.onnx")
    /// * `tokenizer_path` - Path to the tokenizer JSON file (e.g., "model/tokenizer.json")
    pub fn new(model_path: &str, tokenizer_path: &str) -> Result<Self, EmbedError> {
        let session = Session::builder()?
            .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level1)?
            .commit_from_file(model_path)?;

        let mut tokenizer =
            Tokenizer::from_file(tokenizer_path).map_err(|e| EmbedError::TokenizerLoad {
                path: tokenizer_path.to_string(),
                reason: e.to_string(),
            })?;

        // Pad every batch to its longest member so inputs form a rectangle
        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::BatchLongest,
            ..Default::default()
        }));
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: MAX_SEQUENCE_LENGTH,
                ..Default::default()
            }))
            .map_err(|e| EmbedError::TokenizerLoad {
                path: tokenizer_path.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self { session, tokenizer })
    }

    /// Tokenizes a batch into flattened `[batch, seq_len]` tensors.
    ///
    /// Returns (input_ids, attention_mask, token_type_ids, seq_len).
    fn tokenize(
        &self,
        texts: &[String],
    ) -> Result<(Vec<i64>, Vec<i64>, Vec<i64>, usize), EmbedError> {
        let inputs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let encodings = self
            .tokenizer
            .encode_batch(inputs, true)
            .map_err(|e| EmbedError::Tokenization(e.to_string()))?;

        let seq_len = encodings.first().map(|e| e.len()).unwrap_or(0);
        let capacity = encodings.len() * seq_len;
        let mut input_ids = Vec::with_capacity(capacity);
        let mut attention_mask = Vec::with_capacity(capacity);
        let mut token_type_ids = Vec::with_capacity(capacity);

        // Convert to i64 as required by ONNX Runtime
        for encoding in &encodings {
            input_ids.extend(encoding.get_ids().iter().map(|&id| id as i64));
            attention_mask.extend(encoding.get_attention_mask().iter().map(|&m| m as i64));
            token_type_ids.extend(encoding.get_type_ids().iter().map(|&t| t as i64));
        }

        Ok((input_ids, attention_mask, token_type_ids, seq_len))
    }

    /// Applies mean pooling to the token embeddings of one batch row.
    ///
    /// The attention mask excludes padding tokens from the average.
    fn mean_pooling(hidden_states: &ArrayView3<f32>, row: usize, attention_mask: &[i64]) -> Vec<f32> {
        // [seq_len, hidden_dim] for this row
        let states_2d = hidden_states.index_axis(Axis(0), row);

        let mask_f32: Vec<f32> = attention_mask.iter().map(|&x| x as f32).collect();
        let mask_1d: ArrayView1<f32> = ArrayView1::from(mask_f32.as_slice());
        let count = mask_1d.sum();

        // Broadcast multiply zeros out padding tokens
        let mask_col = mask_1d.insert_axis(Axis(1));
        let masked_states = &states_2d * &mask_col;
        let sum = masked_states.sum_axis(Axis(0));

        let mean = if count > 0.0 { sum / count } else { sum };
        mean.to_vec()
    }

    /// Pools and normalizes every row of the model output.
    ///
    /// The output must hold exactly one row per input and one position per
    /// input token, otherwise the mask cannot be lined up with it.
    fn pool_rows(
        hidden_states: &ArrayView3<f32>,
        attention_mask: &[i64],
        expected_rows: usize,
    ) -> Result<Vec<Vec<f32>>, EmbedError> {
        let (rows, seq_len, _) = hidden_states.dim();
        if rows != expected_rows {
            return Err(EmbedError::CountMismatch {
                expected: expected_rows,
                got: rows,
            });
        }
        if attention_mask.len() != rows * seq_len {
            return Err(EmbedError::ArrayShape(ShapeError::from_kind(
                ErrorKind::IncompatibleShape,
            )));
        }

        Ok((0..rows)
            .map(|row| {
                let mask = &attention_mask[row * seq_len..(row + 1) * seq_len];
                Self::normalize(&Self::mean_pooling(hidden_states, row, mask))
            })
            .collect())
    }

    /// Applies L2 normalization to the embedding vector.
    fn normalize(embedding: &[f32]) -> Vec<f32> {
        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();

        if norm > 0.0 {
            embedding.iter().map(|x| x / norm).collect()
        } else {
            embedding.to_vec()
        }
    }
}

impl EmbeddingModel for OnnxEmbedder {
    fn embed_batch(&mut self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let (input_ids, attention_mask, token_type_ids, seq_len) = self.tokenize(texts)?;
        let shape = vec![texts.len(), seq_len];

        let outputs = self.session.run(ort::inputs![
            "input_ids" => Value::from_array((shape.clone(), input_ids))?,
            "attention_mask" => Value::from_array((shape.clone(), attention_mask.clone()))?,
            "token_type_ids" => Value::from_array((shape, token_type_ids))?,
        ])?;

        // last_hidden_state: [batch_size, seq_len, hidden_dim]
        let (output_shape, output_data) = outputs[0].try_extract_tensor::<f32>()?;
        let batch_size = output_shape[0] as usize;
        let seq_len_out = output_shape[1] as usize;
        let hidden_dim = output_shape[2] as usize;

        let output_view = ArrayView3::from_shape((batch_size, seq_len_out, hidden_dim), output_data)?;

        Self::pool_rows(&output_view, &attention_mask, texts.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn mean_pooling_ignores_padding() {
        // one row, three tokens (last is padding), two dims
        let states = Array3::from_shape_vec((1, 3, 2), vec![1.0, 2.0, 3.0, 4.0, 100.0, 100.0]).unwrap();
        let pooled = OnnxEmbedder::mean_pooling(&states.view(), 0, &[1, 1, 0]);
        assert_eq!(pooled, vec![2.0, 3.0]);
    }

    #[test]
    fn mean_pooling_selects_row() {
        let states = Array3::from_shape_vec((2, 1, 2), vec![1.0, 1.0, 5.0, 7.0]).unwrap();
        assert_eq!(OnnxEmbedder::mean_pooling(&states.view(), 1, &[1]), vec![5.0, 7.0]);
    }

    #[test]
    fn pool_rows_normalizes_each_row() {
        let states = Array3::from_shape_vec((2, 2, 2), vec![3.0, 4.0, 9.0, 9.0, 0.0, 2.0, 0.0, 2.0]).unwrap();
        let pooled = OnnxEmbedder::pool_rows(&states.view(), &[1, 0, 1, 1], 2).unwrap();
        assert_eq!(pooled.len(), 2);
        assert!((pooled[0][0] - 0.6).abs() < 1e-6);
        assert!((pooled[0][1] - 0.8).abs() < 1e-6);
        assert_eq!(pooled[1], vec![0.0, 1.0]);
    }

    #[test]
    fn extra_output_rows_are_a_count_mismatch() {
        let states = Array3::from_shape_vec((3, 1, 2), vec![1.0; 6]).unwrap();
        let err = OnnxEmbedder::pool_rows(&states.view(), &[1, 1], 2).unwrap_err();
        assert!(matches!(err, EmbedError::CountMismatch { expected: 2, got: 3 }));
    }

    #[test]
    fn output_sequence_length_must_match_mask() {
        let states = Array3::from_shape_vec((1, 3, 2), vec![1.0; 6]).unwrap();
        let err = OnnxEmbedder::pool_rows(&states.view(), &[1, 1], 1).unwrap_err();
        assert!(matches!(err, EmbedError::ArrayShape(_)));
    }

    #[test]
    fn normalize_produces_unit_vector() {
        let normalized = OnnxEmbedder::normalize(&[3.0, 4.0]);
        assert!((normalized[0] - 0.6).abs() < 1e-6);
        assert!((normalized[1] - 0.8).abs() < 1e-6);
        assert_eq!(OnnxEmbedder::normalize(&[0.0, 0.0]), vec![0.0, 0.0]);
    }
}

use thiserror::Error;

/// Errors produced while answering a query
#[derive(Error, Debug)]
pub enum QueryError {
    /// Malformed or empty input field
    #[error("{0}")]
    Client(String),

    /// Missing or invalid startup configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Completion API answered with a non-success status
    #[error("Upstream returned status {status}: {body}")]
    Upstream {
        status: u16,
        body: String,
    },

    /// Anything else: parsing, network, serialization
    #[error("{0}")]
    Unexpected(String),
}

impl QueryError {
    /// Returns true if this error should be reported as a client error (4xx)
    pub fn is_client_error(&self) -> bool {
        matches!(self, QueryError::Client(_))
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            QueryError::Client(_) => 400,
            QueryError::Upstream { status, .. } => *status,
            QueryError::Configuration(_) | QueryError::Unexpected(_) => 500,
        }
    }

    /// Message placed in the `error` field of the response body.
    ///
    /// Upstream failures surface the raw upstream text unchanged.
    pub fn user_message(&self) -> String {
        match self {
            QueryError::Upstream { body, .. } => body.clone(),
            _ => self.to_string(),
        }
    }
}

impl From<reqwest::Error> for QueryError {
    fn from(e: reqwest::Error) -> Self {
        QueryError::Unexpected(e.to_string())
    }
}

impl From<serde_json::Error> for QueryError {
    fn from(e: serde_json::Error) -> Self {
        QueryError::Unexpected(e.to_string())
    }
}

/// Errors that can occur while precomputing embeddings
#[derive(Error, Debug)]
pub enum EmbedError {
    /// Chunk size must be at least one word
    #[error("Invalid chunk size: {0}. Must be greater than zero")]
    InvalidChunkSize(usize),

    /// The model returned a different number of vectors than inputs
    #[error("Embedding model returned {got} vectors for {expected} inputs")]
    CountMismatch {
        expected: usize,
        got: usize,
    },

    /// Vectors in one batch do not share a length
    #[error("Embedding at index {index} has dimension {got}, expected {expected}")]
    DimensionMismatch {
        index: usize,
        expected: usize,
        got: usize,
    },

    /// Failed to load tokenizer
    #[error("Failed to load tokenizer from {path}: {reason}")]
    TokenizerLoad {
        path: String,
        reason: String,
    },

    /// Tokenization failed
    #[error("Tokenization failed: {0}")]
    Tokenization(String),

    /// ONNX Runtime error
    #[error("ONNX Runtime error: {0}")]
    OnnxRuntime(#[from] ort::Error),

    /// Array shape mismatch
    #[error("Array shape error: {0}")]
    ArrayShape(#[from] ndarray::ShapeError),

    /// Reading the document or writing the output failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serializing the records failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

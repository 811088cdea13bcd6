pub mod chunker;
pub mod completion;
pub mod config;
pub mod embedder;
pub mod error;
pub mod http_handler;
pub mod knowledge;
pub mod precompute;

pub mod analyzer;
pub mod cli;
pub mod collector;
pub mod config;
pub mod i18n;
pub mod llm;
pub mod types;
pub mod utils;
pub mod workflow;

// Re-export commonly used types
pub use analyzer::AnalyzerContext;
pub use config::Config;
pub use workflow::run_pipeline;

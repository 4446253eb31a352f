pub mod aggregate;
pub mod clock;
pub mod config;
pub mod error;
pub mod fetch;
pub mod input;
pub mod keywords;
pub mod llm;
pub mod oracle;
pub mod pipeline;
pub mod rate_limit;
pub mod retry;
pub mod search;
pub mod types;

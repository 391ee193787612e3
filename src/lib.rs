pub mod cli;
pub mod config;
pub mod executor;
pub mod expr;
pub mod interpolate;
pub mod parser;
pub mod session;
pub mod types;

// Re-export main types
pub use types::*;

pub use config::Config;
pub use executor::{Engine, EngineBuilder, EngineError, EngineOptions, Run, Snapshot, Status};
pub use parser::{parse, ParseError};
pub use session::{Session, SessionManager};

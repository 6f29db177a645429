//! Deluge script compatibility layer.
//!
//! - [`translate`]: Deluge source → indentation-structured host statements
//! - [`runtime`]: `Map`, `List`, string and [`Value`](runtime::Value) types
//! - [`builtins`]: the name → callable table translated code calls into
//! - [`host`]: parses and runs translated code ([`Runtime`], [`run_script`])

pub mod builtins;
pub mod config;
pub mod error;
pub mod host;
pub mod http;
pub mod runtime;
pub mod translate;

pub use config::Config;
pub use error::{ParseError, RuntimeError, RuntimeResult, TranslateError};
pub use host::{run_script, Runtime};
pub use translate::{translate, Translation, Translator};

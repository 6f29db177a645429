//! Deluge runtime value model.
//!
//! - [`value`]: the dynamic [`Value`] variant
//! - [`string`]: immutable [`DelugeString`]
//! - [`map`]: insertion-ordered [`Map`]
//! - [`list`]: bounds-safe [`List`]
//! - [`methods`]: `receiver.method(args)` dispatch

pub mod list;
pub mod map;
pub mod methods;
pub mod string;
pub mod value;

pub use list::List;
pub use map::Map;
pub use methods::{call_method, is_runtime_method};
pub use string::DelugeString;
pub use value::{Shared, Value};

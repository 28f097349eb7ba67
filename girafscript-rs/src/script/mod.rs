//! Marker expansion engine.
//!
//! Page fragments carry *markers*, directive tags framed by a delimiter pair
//! (`{{` … `}}` by default).  The engine finds each marker, runs the command
//! it names, and splices the output back into the text:
//!
//! - [`tokenize`]: find the next raw marker and its byte span
//! - [`marker`]: split marker content into a name and parameters
//! - [`command`]: the command set (`loop`, `if`, `unless`, `var`, `set`, `comment`)
//! - [`registry`]: map marker names to commands
//! - [`engine`]: the scan/invoke/splice loop and the per-call [`Session`]
//!
//! # Quick start
//!
//! ```rust
//! use girafscript::script::{Context, Engine};
//!
//! let mut ctx = Context::new().with("names", vec!["Ada", "Grace"]);
//! let out = Engine::new()
//!     .process("{{loop names as=n}}<li>{{var n}}</li>{{/loop}}", &mut ctx)
//!     .unwrap();
//! assert_eq!(out, "<li>Ada</li><li>Grace</li>");
//! ```

pub mod command;
pub mod context;
pub mod engine;
pub mod error;
pub mod marker;
pub mod registry;
pub mod tokenize;
pub mod value;

// Re-exports for convenience.
pub use command::{Command, CommandKind};
pub use context::Context;
pub use engine::{Engine, Limits, Session};
pub use error::{ErrorKind, Result, ScriptError};
pub use marker::{Marker, MarkerKind, Param};
pub use registry::Registry;
pub use tokenize::Delimiters;
pub use value::Value;

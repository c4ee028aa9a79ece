//! Deterministic pipeline around a text-generation oracle for array-literal
//! fragments: sequential `/* N */` markers, comment stripping, and verse
//! restructuring, plus Latin word analysis and translation.
pub mod config;
pub mod error;
pub mod extract;
pub mod fragment;
pub mod latin;
pub mod markers;
pub mod oracle;
pub mod pipeline;
pub mod prompt;
pub mod scan;
pub mod strip;
pub mod util;
pub mod validate;
pub mod verses;

pub use config::Config;
pub use error::PipelineError;
pub use markers::Numbering;
pub use oracle::{Gateway, Oracle, OracleError};
pub use pipeline::{AnnotationOutcome, Pipeline, StripOutcome, VerseAdjustment};

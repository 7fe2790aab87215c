//! KDL configuration parsing for hookpipe.
//!
//! This crate handles parsing of the pipeline definition file
//! (hookpipe.kdl): pipeline name, listen address, optional TLS paths,
//! and the ordered step list.

pub mod error;
pub mod pipeline;

pub use error::{ConfigError, ConfigResult};
pub use pipeline::{PipelineFile, TlsConfig, load_pipeline_file, parse_pipeline_file};

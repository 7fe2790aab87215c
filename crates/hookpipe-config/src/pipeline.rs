//! Pipeline configuration parsing.

use crate::{ConfigError, ConfigResult};
use hookpipe_core::pipeline::PipelineStep;
use kdl::{KdlDocument, KdlNode};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Listen address used when the config file has no `listen` node.
const DEFAULT_LISTEN: &str = "127.0.0.1:8443";

/// TLS certificate and key paths for the listening socket.
#[derive(Debug, Clone)]
pub struct TlsConfig {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

/// Fully parsed pipeline definition file.
///
/// The shared secret is deliberately not part of this structure; it is
/// provisioned through the environment at startup.
#[derive(Debug, Clone)]
pub struct PipelineFile {
    pub pipeline_name: String,
    pub listen: SocketAddr,
    pub tls: Option<TlsConfig>,
    pub steps: Vec<PipelineStep>,
}

/// Read and parse a pipeline definition file from disk.
pub fn load_pipeline_file(path: &Path) -> ConfigResult<PipelineFile> {
    let text = std::fs::read_to_string(path)?;
    parse_pipeline_file(&text)
}

/// Parse a pipeline definition from KDL text.
pub fn parse_pipeline_file(kdl: &str) -> ConfigResult<PipelineFile> {
    let doc: KdlDocument = kdl.parse()?;

    let mut name = String::new();
    let mut listen: Option<SocketAddr> = None;
    let mut tls = None;
    let mut steps: Vec<PipelineStep> = Vec::new();

    for node in doc.nodes() {
        match node.name().value() {
            "pipeline" => {
                name = get_first_string_arg(node)
                    .ok_or_else(|| ConfigError::MissingField("pipeline name".to_string()))?;
            }
            "listen" => {
                let addr = get_first_string_arg(node)
                    .ok_or_else(|| ConfigError::MissingField("listen address".to_string()))?;
                listen = Some(addr.parse().map_err(|e| ConfigError::InvalidValue {
                    field: "listen".to_string(),
                    message: format!("{}: {}", addr, e),
                })?);
            }
            "tls" => {
                tls = Some(parse_tls(node)?);
            }
            "step" => {
                steps.push(parse_step(node)?);
            }
            _ => {} // Ignore unknown nodes
        }
    }

    if name.is_empty() {
        return Err(ConfigError::MissingField("pipeline name".to_string()));
    }
    if steps.is_empty() {
        return Err(ConfigError::MissingField("at least one step".to_string()));
    }

    // Step names must be unique so failure reports are unambiguous.
    let mut seen = Vec::with_capacity(steps.len());
    for step in &steps {
        if seen.contains(&step.name.as_str()) {
            return Err(ConfigError::Duplicate(format!("step '{}'", step.name)));
        }
        seen.push(step.name.as_str());
    }

    let listen = match listen {
        Some(addr) => addr,
        None => DEFAULT_LISTEN.parse().map_err(|e| ConfigError::InvalidValue {
            field: "listen".to_string(),
            message: format!("{}: {}", DEFAULT_LISTEN, e),
        })?,
    };

    Ok(PipelineFile {
        pipeline_name: name,
        listen,
        tls,
        steps,
    })
}

fn parse_tls(node: &KdlNode) -> ConfigResult<TlsConfig> {
    let cert = get_string_prop(node, "cert")
        .ok_or_else(|| ConfigError::MissingField("tls cert".to_string()))?;
    let key = get_string_prop(node, "key")
        .ok_or_else(|| ConfigError::MissingField("tls key".to_string()))?;

    Ok(TlsConfig {
        cert_path: PathBuf::from(cert),
        key_path: PathBuf::from(key),
    })
}

fn parse_step(node: &KdlNode) -> ConfigResult<PipelineStep> {
    let name = get_first_string_arg(node)
        .ok_or_else(|| ConfigError::MissingField("step name".to_string()))?;
    if name.is_empty() {
        return Err(ConfigError::InvalidValue {
            field: "step name".to_string(),
            message: "must not be empty".to_string(),
        });
    }

    let mut command = String::new();
    let mut env = HashMap::new();

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "run" => {
                    command = get_first_string_arg(child).unwrap_or_default();
                }
                "env" => {
                    if let Some(grandchildren) = child.children() {
                        for gc in grandchildren.nodes() {
                            let key = gc.name().value().to_string();
                            if let Some(val) = get_first_string_arg(gc) {
                                env.insert(key, val);
                            }
                        }
                    }
                }
                _ => {}
            }
        }
    }

    if command.is_empty() {
        return Err(ConfigError::MissingField(format!(
            "run command for step '{}'",
            name
        )));
    }

    Ok(PipelineStep { name, command, env })
}

// Helper functions for extracting values from KDL nodes

fn get_first_string_arg(node: &KdlNode) -> Option<String> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_string())
        .map(|s| s.to_string())
}

fn get_string_prop(node: &KdlNode, name: &str) -> Option<String> {
    node.get(name)
        .and_then(|v| v.as_string())
        .map(|s| s.to_string())
}

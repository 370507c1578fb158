//! 诊断旁路：把每个检查项的 host → actual value 抽出，JSON → gzip → base64
//!
//! Raw actual values grow with cluster size, so they are moved out of the primary
//! report into a single compressed string field.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{Read, Write};

use crate::summarize::record::GroupRecord;
use crate::utils::{Result, SummarizerError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticGroup {
    pub id: String,
    pub description: String,
    pub checks: Vec<DiagnosticCheck>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticCheck {
    pub id: String,
    pub description: String,
    pub actual_values: BTreeMap<String, String>,
}

/// Mirrors the group/check tree, keeping only ids, descriptions and actual values.
pub fn collect(groups: &[GroupRecord]) -> Vec<DiagnosticGroup> {
    groups
        .iter()
        .map(|g| DiagnosticGroup {
            id: g.id.clone(),
            description: g.description.clone(),
            checks: g
                .checks
                .iter()
                .map(|c| DiagnosticCheck {
                    id: c.id.clone(),
                    description: c.description.clone(),
                    actual_values: c.actual_value_per_node.clone(),
                })
                .collect(),
        })
        .collect()
}

pub fn compress(tree: &[DiagnosticGroup]) -> Result<String> {
    compress_json(tree)
}

/// base64(gzip(json(value))).
pub fn compress_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let json = serde_json::to_vec(value)
        .map_err(|e| SummarizerError::Encode(format!("encoding diagnostics: {}", e)))?;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(&json)
        .map_err(|e| SummarizerError::Encode(format!("writing compressed data: {}", e)))?;
    let compressed = encoder
        .finish()
        .map_err(|e| SummarizerError::Encode(format!("closing gzip stream: {}", e)))?;

    Ok(BASE64.encode(compressed))
}

/// Encodes every actual value into one blob, then clears them from the records.
pub fn encode(groups: &mut [GroupRecord]) -> Result<String> {
    let blob = compress(&collect(groups))?;
    for check in groups.iter_mut().flat_map(|g| g.checks.iter_mut()) {
        check.actual_value_per_node.clear();
    }
    log::debug!("diagnostic blob: {} bytes", blob.len());
    Ok(blob)
}

/// Inverse of `compress`. An empty blob decodes to an empty tree.
pub fn decode(blob: &str) -> Result<Vec<DiagnosticGroup>> {
    if blob.is_empty() {
        return Ok(Vec::new());
    }
    decompress_json(blob)
}

pub fn decompress_json<T: DeserializeOwned>(blob: &str) -> Result<T> {
    let compressed = BASE64
        .decode(blob)
        .map_err(|e| SummarizerError::Encode(format!("decoding base64: {}", e)))?;

    let mut json = Vec::new();
    GzDecoder::new(compressed.as_slice())
        .read_to_end(&mut json)
        .map_err(|e| SummarizerError::Encode(format!("decompressing diagnostics: {}", e)))?;

    serde_json::from_slice(&json)
        .map_err(|e| SummarizerError::Encode(format!("decoding diagnostics: {}", e)))
}

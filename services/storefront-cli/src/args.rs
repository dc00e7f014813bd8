//! Parsing helpers for `request` arguments

use std::path::Path;

use reqwest::Method;
use storefront_api::FormPart;

use crate::error::{Error, Result};

/// Parse `key=value`. The value may itself contain `=`.
pub fn parse_pair(raw: &str) -> Result<(String, String)> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(Error::Argument(format!("expected key=value, got: {raw}"))),
    }
}

pub fn parse_method(raw: &str) -> Result<Method> {
    Method::from_bytes(raw.to_ascii_uppercase().as_bytes())
        .map_err(|_| Error::Argument(format!("invalid HTTP method: {raw}")))
}

/// Parse a `--data` argument as JSON.
pub fn parse_json(raw: &str) -> Result<serde_json::Value> {
    serde_json::from_str(raw).map_err(|e| Error::Argument(format!("--data is not JSON: {e}")))
}

/// Build multipart parts from `--form name=value` and `--file field=path`.
/// Files are read fully into memory.
pub fn form_parts(fields: &[(String, String)], files: &[(String, String)]) -> Result<Vec<FormPart>> {
    let mut parts: Vec<FormPart> = fields
        .iter()
        .map(|(name, value)| FormPart::text(name.clone(), value.clone()))
        .collect();

    for (field, path) in files {
        let path = Path::new(path);
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| Error::Argument(format!("not a file path: {}", path.display())))?;
        let mut part = FormPart::file(field.clone(), file_name.clone(), bytes);
        if let Some(mime) = mime_for(&file_name) {
            part = part.with_mime(mime);
        }
        parts.push(part);
    }

    Ok(parts)
}

/// Content type for common upload extensions; others go out untyped.
fn mime_for(file_name: &str) -> Option<&'static str> {
    let ext = file_name.rsplit_once('.')?.1.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "json" => Some("application/json"),
        "pdf" => Some("application/pdf"),
        _ => None,
    }
}

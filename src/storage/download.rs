//! Fetching image bytes from a remote reference (URL or base64 data URI).

use crate::error::{FluxError, Result};
use crate::flux::REQUEST_TIMEOUT;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use futures::StreamExt;
use reqwest::{Client, Url};
use tokio::io::{AsyncWrite, AsyncWriteExt};

pub const DEFAULT_FILE_NAME: &str = "image.png";

/// Stored names get a uuid prefix, so keep the rest well under NAME_MAX.
pub const MAX_FILE_NAME_LEN: usize = 100;

const MAX_EXTENSION_LEN: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// `None` when the reference is not a data URI at all.
pub fn parse_data_uri(reference: &str) -> Option<Result<InlineImage>> {
    let rest = reference.trim().strip_prefix("data:")?;
    Some(decode_data_uri(rest))
}

fn decode_data_uri(rest: &str) -> Result<InlineImage> {
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| FluxError::ResponseError("Malformed data URI".into()))?;
    let mime = meta
        .strip_suffix(";base64")
        .ok_or_else(|| FluxError::ResponseError("Only base64 data URIs are supported".into()))?;
    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| FluxError::ResponseError(format!("Invalid base64 image data: {}", e)))?;

    Ok(InlineImage {
        mime: if mime.is_empty() {
            "image/png".to_string()
        } else {
            mime.to_string()
        },
        bytes,
    })
}

/// File name suggested by a reference: the last URL path segment with
/// anything outside `[A-Za-z0-9._-]` replaced.
pub fn file_name_from_reference(reference: &str) -> String {
    if let Some(Ok(inline)) = parse_data_uri(reference) {
        let ext = match inline.mime.as_str() {
            "image/jpeg" | "image/jpg" => "jpg",
            "image/webp" => "webp",
            "image/gif" => "gif",
            _ => "png",
        };
        return format!("image.{}", ext);
    }

    let segment = match Url::parse(reference) {
        Ok(url) => url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .map(str::to_string),
        Err(_) => reference
            .split(['?', '#'])
            .next()
            .and_then(|path| path.rsplit('/').next())
            .map(str::to_string),
    };

    let sanitized: String = segment
        .unwrap_or_default()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '-'
            }
        })
        .collect();
    let sanitized = sanitized.trim_start_matches('.');

    if sanitized.is_empty() || !sanitized.chars().any(|c| c.is_ascii_alphanumeric()) {
        DEFAULT_FILE_NAME.to_string()
    } else {
        shorten_file_name(sanitized)
    }
}

/// `name` is ASCII here, so byte offsets are char offsets.
fn shorten_file_name(name: &str) -> String {
    if name.len() <= MAX_FILE_NAME_LEN {
        return name.to_string();
    }

    let extension = name
        .rfind('.')
        .map(|dot| &name[dot..])
        .filter(|ext| ext.len() <= MAX_EXTENSION_LEN)
        .unwrap_or("");
    let stem_len = MAX_FILE_NAME_LEN - extension.len();
    format!("{}{}", &name[..stem_len], extension)
}

/// Writes the referenced image into `dest`, returning the byte count.
///
/// Network and HTTP status problems come back as `RequestError` or
/// `ResponseError`; local write problems as `IoError`.
pub async fn download_to<W>(client: &Client, reference: &str, dest: &mut W) -> Result<u64>
where
    W: AsyncWrite + Unpin + Send,
{
    if let Some(inline) = parse_data_uri(reference) {
        let inline = inline?;
        dest.write_all(&inline.bytes).await?;
        dest.flush().await?;
        return Ok(inline.bytes.len() as u64);
    }

    let response = client
        .get(reference)
        .timeout(REQUEST_TIMEOUT)
        .send()
        .await
        .map_err(|e| FluxError::RequestError(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(FluxError::ResponseError(format!("HTTP {}", status)));
    }

    let mut written = 0u64;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| FluxError::RequestError(e.to_string()))?;
        dest.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    dest.flush().await?;

    if written == 0 {
        return Err(FluxError::ResponseError("Downloaded image is empty".into()));
    }
    Ok(written)
}

//! Normalizes untrusted caller input into a [`GenerationRequest`].
//!
//! Only an empty prompt is rejected. Every other field self-heals: unknown
//! styles and resolutions fall back to their defaults and the image count
//! is clamped into range. The leniency is intentional.

use crate::error::HandlerError;
use crate::models::{GenerationRequest, RawInput, Resolution, Style};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;

static SCRIPT_STYLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<(?:script|style)\b[^>]*>.*?</(?:script|style)\s*>")
        .expect("script/style pattern is valid")
});
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("tag pattern is valid"));
static OCTET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"%[a-fA-F0-9]{2}").expect("octet pattern is valid"));
static WHITESPACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Prompt is required")]
    EmptyPrompt,
}

impl From<ValidationError> for HandlerError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::EmptyPrompt => HandlerError::InvalidInput,
        }
    }
}

pub fn validate(raw: &RawInput) -> Result<GenerationRequest, ValidationError> {
    let prompt = text_field(raw, "prompt");
    if prompt.is_empty() {
        return Err(ValidationError::EmptyPrompt);
    }

    let style = Style::from_allowed(&text_field(raw, "style")).unwrap_or_default();
    let resolution = Resolution::from_allowed(&text_field(raw, "resolution")).unwrap_or_default();
    let num_images = raw
        .get("num_images")
        .or_else(|| raw.get("numImages"))
        .map(coerce_int)
        .unwrap_or(1);

    Ok(GenerationRequest {
        prompt,
        style,
        resolution,
        num_images: clamp_images(num_images),
    })
}

/// Strips markup, percent-encoded octets and redundant whitespace.
pub fn sanitize_text(input: &str) -> String {
    let without_blocks = SCRIPT_STYLE_RE.replace_all(input, "");
    let mut text = TAG_RE.replace_all(&without_blocks, "").into_owned();
    // "%%4141" leaves a fresh "%41" behind after one pass.
    while OCTET_RE.is_match(&text) {
        text = OCTET_RE.replace_all(&text, "").into_owned();
    }
    WHITESPACE_RE.replace_all(&text, " ").trim().to_string()
}

fn text_field(raw: &RawInput, key: &str) -> String {
    match raw.get(key) {
        Some(Value::String(s)) => sanitize_text(s),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(true)) => "1".to_string(),
        _ => String::new(),
    }
}

/// Integer cast with the loose semantics form posts need: leading digits
/// of a string count, anything unparseable is zero.
fn coerce_int(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| if f.is_finite() { f.trunc() as i64 } else { 0 }))
            .unwrap_or(0),
        Value::Bool(b) => i64::from(*b),
        Value::String(s) => leading_int(s),
        _ => 0,
    }
}

fn leading_int(s: &str) -> i64 {
    let s = s.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    // Overlong digit strings saturate; the clamp makes the exact value irrelevant.
    let magnitude = digits[..end].parse::<i64>().unwrap_or(if end == 0 { 0 } else { i64::MAX });
    if negative {
        -magnitude
    } else {
        magnitude
    }
}

fn clamp_images(count: i64) -> u8 {
    count.clamp(
        i64::from(GenerationRequest::MIN_IMAGES),
        i64::from(GenerationRequest::MAX_IMAGES),
    ) as u8
}

impl From<&GenerationRequest> for RawInput {
    fn from(request: &GenerationRequest) -> Self {
        RawInput::new()
            .with("prompt", request.prompt.clone())
            .with("style", request.style.as_str())
            .with("resolution", request.resolution.as_str())
            .with("num_images", request.num_images)
    }
}

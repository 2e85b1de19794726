use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use crate::llm::CompletionProvider;
use crate::models::CardFields;

// ── Constants ────────────────────────────────────────────────────────────────

pub const EXTRACTION_PROMPT: &str = "Analyze the image of the business card and extract the key information.
Return the data as a clean JSON object with the following keys: 'company', 'name', 'title', 'phone', 'email', 'address'.
If a piece of information is not found, return an empty string for that key.";

const IMAGE_MEDIA_TYPE: &str = "image/jpeg";

/// Marker prepended to phone numbers so spreadsheets keep them as text.
const PHONE_ESCAPE: char = '\'';

// ── Lazy static regexes ──────────────────────────────────────────────────────

// First ```json fence up to the next closing fence, or to the end of the
// text when the model never closed it.
static JSON_FENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```json(.*?)(?:```|\z)").unwrap());

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("{0}")]
    Request(String),
    #[error("Upstream returned status {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("Completion contained no message content")]
    EmptyCompletion,
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

// ── Public API ───────────────────────────────────────────────────────────────

pub async fn extract_card(
    provider: &dyn CompletionProvider,
    base64_image: &str,
) -> Result<CardFields, ExtractionError> {
    let payload = strip_data_uri_prefix(base64_image);
    let image_uri = format!("data:{};base64,{}", IMAGE_MEDIA_TYPE, payload);

    tracing::info!("Sending image to the model for analysis...");
    let completion = provider.complete(EXTRACTION_PROMPT, &image_uri).await?;
    tracing::info!("Received from model: {}", completion);

    parse_completion(&completion)
}

/// Turn raw completion text into a normalized record.
pub fn parse_completion(completion: &str) -> Result<CardFields, ExtractionError> {
    let payload = extract_json_payload(completion);

    // Go through a map first so a bare JSON array is rejected instead of
    // being read positionally into the struct.
    let object: Map<String, Value> = serde_json::from_str(payload)?;
    let mut fields: CardFields = serde_json::from_value(Value::Object(object))?;

    fields.phone = normalize_phone(fields.phone);
    Ok(fields)
}

// ── Input cleanup ────────────────────────────────────────────────────────────

/// Drop a `data:<mime>;base64,` style header, keeping what follows the
/// first comma.
pub fn strip_data_uri_prefix(image: &str) -> &str {
    match image.split_once(',') {
        Some((_, payload)) => payload,
        None => image,
    }
}

// ── Completion parsing ───────────────────────────────────────────────────────

pub fn extract_json_payload(text: &str) -> &str {
    match JSON_FENCE_RE.captures(text).and_then(|caps| caps.get(1)) {
        Some(inner) => inner.as_str().trim(),
        None => text,
    }
}

pub fn normalize_phone(phone: String) -> String {
    if phone.starts_with('+') {
        format!("{}{}", PHONE_ESCAPE, phone)
    } else {
        phone
    }
}

use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct OcrRequest {
    #[serde(rename = "base64Image")]
    pub base64_image: String,
}

/// Fields read off a business card. Keys missing from the model's output
/// deserialize to empty strings so every key is always serialized back.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CardFields {
    pub company: String,
    pub name: String,
    pub title: String,
    pub phone: String,
    pub email: String,
    pub address: String,
}

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Style {
    #[default]
    Photorealistic,
    Artistic,
    DigitalArt,
}

impl Style {
    pub const ALL: [Style; 3] = [Style::Photorealistic, Style::Artistic, Style::DigitalArt];

    pub fn as_str(&self) -> &'static str {
        match self {
            Style::Photorealistic => "photorealistic",
            Style::Artistic => "artistic",
            Style::DigitalArt => "digital-art",
        }
    }

    /// Exact, case-sensitive match against the allow-list.
    pub fn from_allowed(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|style| style.as_str() == value)
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Resolution {
    #[default]
    #[serde(rename = "1024x1024")]
    Square1024,
    #[serde(rename = "2048x2048")]
    Square2048,
    #[serde(rename = "4096x4096")]
    Square4096,
}

impl Resolution {
    pub const ALL: [Resolution; 3] = [
        Resolution::Square1024,
        Resolution::Square2048,
        Resolution::Square4096,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::Square1024 => "1024x1024",
            Resolution::Square2048 => "2048x2048",
            Resolution::Square4096 => "4096x4096",
        }
    }

    pub fn from_allowed(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|res| res.as_str() == value)
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated request, serialized as-is into the API request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub prompt: String,
    pub style: Style,
    pub resolution: Resolution,
    pub num_images: u8,
}

impl GenerationRequest {
    pub const MIN_IMAGES: u8 = 1;
    pub const MAX_IMAGES: u8 = 4;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationResult {
    /// URL or data URI of the first generated image.
    pub image_reference: String,
}

#[derive(Debug, Deserialize)]
pub struct FluxImageResponse {
    #[serde(default)]
    pub images: Vec<serde_json::Value>,
}

impl FluxImageResponse {
    pub fn first_image(&self) -> Option<&str> {
        self.images
            .first()
            .and_then(|image| image.as_str())
            .map(str::trim)
            .filter(|image| !image.is_empty())
    }
}

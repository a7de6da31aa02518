use std::fmt;
use std::str::FromStr;

use image::imageops::FilterType;
use image::{DynamicImage, RgbImage};
use reqwest::blocking::Client;
use serde::Deserialize;

use super::{fetch_bytes, http_client, load_image, resolve_url, AssetError};

/// Edge of the square box the branding logo is fitted into, px
const LOGO_SIZE: u32 = 42;

/// How much of the employee card is shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrivacyLevel {
    #[default]
    Low,
    Medium,
    High,
    Hidden,
}

impl PrivacyLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            PrivacyLevel::Low => "low",
            PrivacyLevel::Medium => "medium",
            PrivacyLevel::High => "high",
            PrivacyLevel::Hidden => "hidden",
        }
    }
}

impl fmt::Display for PrivacyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PrivacyLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(PrivacyLevel::Low),
            "medium" => Ok(PrivacyLevel::Medium),
            "high" => Ok(PrivacyLevel::High),
            "hidden" => Ok(PrivacyLevel::Hidden),
            other => Err(format!("unknown privacy level `{other}`")),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct PrivacyDocument {
    #[serde(default)]
    employee: Employee,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Employee {
    pub full_name: Option<String>,
    pub position: Option<String>,
    pub company: Option<String>,
    pub department: Option<String>,
    pub office_location: Option<String>,
    pub contact: Contact,
    pub branding: Branding,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Contact {
    pub email: Option<String>,
    pub telegram: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Branding {
    pub logo_url: Option<String>,
    pub slogan: Option<String>,
}

/// Turn escaped `\r\n` / `\n` sequences stored in documents into real
/// line breaks.
pub fn normalize_multiline(value: &str) -> String {
    value.replace("\\r\\n", "\n").replace("\\n", "\n")
}

/// Text (and optional logo) drawn in the overlay panel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverlayText {
    pub slogan: Vec<String>,
    pub lines: Vec<String>,
    pub logo: Option<RgbImage>,
}

impl OverlayText {
    pub fn from_employee(employee: &Employee) -> Self {
        let mut lines = Vec::new();
        let mut push = |value: Option<String>| {
            if let Some(value) = value.filter(|v| !v.is_empty()) {
                lines.extend(normalize_multiline(&value).split('\n').map(str::to_string));
            }
        };

        push(employee.full_name.clone());
        push(employee.position.clone());
        push(employee.company.clone());
        push(employee.department.clone());
        push(employee.office_location.clone());
        let contact = &employee.contact;
        push(contact.email.as_ref().map(|v| format!("Email: {v}")));
        push(contact.telegram.as_ref().map(|v| format!("Telegram: {v}")));
        push(contact.phone.as_ref().map(|v| format!("Phone: {v}")));

        let slogan = employee
            .branding
            .slogan
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(|s| normalize_multiline(s).split('\n').map(str::to_string).collect())
            .unwrap_or_default();

        Self {
            slogan,
            lines,
            logo: None,
        }
    }

    /// Overlay shown when the document could not be loaded.
    pub fn error(level: PrivacyLevel, err: &dyn fmt::Display) -> Self {
        Self {
            lines: vec![format!("Could not load data ({level}): {err}")],
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.slogan.is_empty() && self.lines.is_empty() && self.logo.is_none()
    }

    /// All text lines, slogan first.
    pub fn text(&self) -> String {
        self.slogan
            .iter()
            .chain(self.lines.iter())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Fetches `{base}/{level}_privacy.json` documents.
pub struct PrivacyService {
    base_url: String,
    client: Client,
}

impl PrivacyService {
    pub fn new(base_url: impl Into<String>) -> Result<Self, AssetError> {
        Ok(Self {
            base_url: base_url.into(),
            client: http_client()?,
        })
    }

    fn document_url(&self, level: PrivacyLevel) -> String {
        format!("{}/{}_privacy.json", self.base_url.trim_end_matches('/'), level)
    }

    pub fn fetch(&self, level: PrivacyLevel) -> Result<Employee, AssetError> {
        let url = self.document_url(level);
        let bytes = fetch_bytes(&self.client, &url)?;
        let document: PrivacyDocument =
            serde_json::from_slice(&bytes).map_err(|source| AssetError::Json {
                url: url.clone(),
                source,
            })?;
        Ok(document.employee)
    }

    /// Overlay for `level`: empty for `Hidden`, an error line when the
    /// document cannot be loaded.
    pub fn overlay(&self, level: PrivacyLevel) -> OverlayText {
        if level == PrivacyLevel::Hidden {
            return OverlayText::default();
        }
        let employee = match self.fetch(level) {
            Ok(employee) => employee,
            Err(e) => {
                tracing::warn!(%level, "Employee overlay fetch failed: {}", e);
                return OverlayText::error(level, &e);
            }
        };

        let mut overlay = OverlayText::from_employee(&employee);
        if let Some(logo_url) = employee.branding.logo_url.as_deref().filter(|u| !u.is_empty()) {
            match self.load_logo(logo_url) {
                Ok(logo) => overlay.logo = Some(logo),
                Err(e) => tracing::warn!("Logo unavailable: {}", e),
            }
        }
        overlay
    }

    fn load_logo(&self, logo_url: &str) -> Result<RgbImage, AssetError> {
        let url = resolve_url(&self.base_url, logo_url)?;
        let logo = load_image(&self.client, url.as_str())?;
        // Fit inside the box, keeping the aspect ratio.
        let fitted = DynamicImage::ImageRgb8(logo).resize(LOGO_SIZE, LOGO_SIZE, FilterType::Triangle);
        Ok(fitted.to_rgb8())
    }
}

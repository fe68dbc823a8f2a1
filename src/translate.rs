//! Translation adapter - maps receipt line text into another language.
//!
//! Wraps a MyMemory-compatible translation API. The adapter is fail-open:
//! any failure (network, HTTP status, unexpected response shape) yields the
//! original text unchanged and the sentinel `"unknown"` language marker, so
//! a translation outage never blocks the parsing pipeline.

use crate::models::ReceiptLine;
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

/// Sentinel language marker used when the service fails or reports nothing.
pub const UNKNOWN_LANGUAGE: &str = "unknown";

const DEFAULT_ENDPOINT: &str = "https://api.mymemory.translated.net/get";

/// A completed translation of one piece of text.
#[derive(Debug, Clone)]
pub struct Translation {
    pub translated: String,
    pub detected_language: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(rename = "responseData")]
    response_data: Option<ResponseData>,
}

#[derive(Debug, Deserialize)]
struct ResponseData {
    #[serde(rename = "translatedText")]
    translated_text: Option<String>,
    #[serde(rename = "match")]
    match_marker: Option<serde_json::Value>,
}

/// Client for a MyMemory-style translation endpoint.
#[derive(Debug, Clone)]
pub struct Translator {
    client: reqwest::Client,
    endpoint: String,
    langpair: String,
}

impl Translator {
    /// Creates a translator for the given language pair (e.g. `de|en`)
    /// against the public MyMemory endpoint.
    #[must_use]
    pub fn new(langpair: impl Into<String>) -> Self {
        Self::with_endpoint(DEFAULT_ENDPOINT, langpair)
    }

    /// Creates a translator against a custom endpoint, used for self-hosted
    /// mirrors and for tests.
    #[must_use]
    pub fn with_endpoint(endpoint: impl Into<String>, langpair: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
            endpoint: endpoint.into(),
            langpair: langpair.into(),
        }
    }

    /// Translates one piece of text, falling back to the original text and
    /// [`UNKNOWN_LANGUAGE`] on any failure.
    pub async fn translate(&self, text: &str) -> Translation {
        match self.request(text).await {
            Ok(translation) => translation,
            Err(e) => {
                warn!(error = %e, "translation failed, keeping original text");
                Translation {
                    translated: text.to_string(),
                    detected_language: UNKNOWN_LANGUAGE.to_string(),
                }
            }
        }
    }

    /// Fills `translated_text` and `detected_language` on each line,
    /// sequentially. Lines that fail to translate keep their original text.
    pub async fn translate_lines(&self, lines: &mut [ReceiptLine]) {
        for line in lines {
            let translation = self.translate(&line.text).await;
            line.translated_text = Some(translation.translated);
            line.detected_language = Some(translation.detected_language);
        }
    }

    async fn request(&self, text: &str) -> std::result::Result<Translation, reqwest::Error> {
        let response: ApiResponse = self
            .client
            .get(&self.endpoint)
            .query(&[("q", text), ("langpair", &self.langpair)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let data = response.response_data;
        let translated = data
            .as_ref()
            .and_then(|d| d.translated_text.clone())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| text.to_string());
        let detected_language = data
            .and_then(|d| d.match_marker)
            .map_or_else(|| UNKNOWN_LANGUAGE.to_string(), |m| marker_to_string(&m));

        Ok(Translation {
            translated,
            detected_language,
        })
    }
}

/// The service reports the match marker as either a string or a number.
fn marker_to_string(marker: &serde_json::Value) -> String {
    match marker {
        serde_json::Value::String(s) if !s.is_empty() => s.clone(),
        serde_json::Value::Number(n) => n.to_string(),
        _ => UNKNOWN_LANGUAGE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::recognized_line;

    #[tokio::test]
    async fn test_translate_fails_open_on_unreachable_endpoint() {
        // Nothing listens on the discard port, so the request fails fast.
        let translator = Translator::with_endpoint("http://127.0.0.1:9/get", "de|en");
        let result = translator.translate("Vollmilch").await;
        assert_eq!(result.translated, "Vollmilch");
        assert_eq!(result.detected_language, UNKNOWN_LANGUAGE);
    }

    #[tokio::test]
    async fn test_translate_lines_fills_fields_on_failure() {
        let translator = Translator::with_endpoint("http://127.0.0.1:9/get", "de|en");
        let mut lines = vec![recognized_line("Brot 2.20", 90, "a.jpg", 0)];
        translator.translate_lines(&mut lines).await;

        assert_eq!(lines[0].translated_text.as_deref(), Some("Brot 2.20"));
        assert_eq!(lines[0].detected_language.as_deref(), Some(UNKNOWN_LANGUAGE));
    }

    #[test]
    fn test_response_shape_parses() {
        let body = r#"{"responseData":{"translatedText":"Whole milk","match":0.98}}"#;
        let parsed: ApiResponse = serde_json::from_str(body).expect("valid response");
        let data = parsed.response_data.expect("data");
        assert_eq!(data.translated_text.as_deref(), Some("Whole milk"));
        assert_eq!(
            marker_to_string(&data.match_marker.expect("marker")),
            "0.98"
        );
    }
}

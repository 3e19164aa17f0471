//! Client side of the generation service.
//!
//! `GET /api/options`, `POST /api/generate-object`, `POST /api/generate-from-text`
//! and plain downloads of the files those calls point at.

use std::io::Read;
use std::time::Duration;

use serde::Deserialize;

use crate::config::AppConfig;
use crate::mapper::ObjectParams;

/// Upper bound for a downloaded archive or file.
const MAX_DOWNLOAD_BYTES: u64 = 256 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },
    #[error("{url} answered {status}: {message}")]
    Status {
        url: String,
        status: u16,
        message: String,
    },
    #[error("generation rejected: {0}")]
    Rejected(String),
    #[error("unexpected response from {url}: {source}")]
    InvalidResponse {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to read response from {url}: {source}")]
    Read {
        url: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{url} is larger than {limit} bytes")]
    TooLarge { url: String, limit: u64 },
}

pub type Result<T> = std::result::Result<T, BackendError>;

/// `/api/options` as sent; any field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawOptions {
    #[serde(default)]
    pub shapes: Option<Vec<String>>,
    #[serde(default)]
    pub textures: Option<Vec<String>>,
    #[serde(default)]
    pub colors: Option<Vec<String>>,
}

/// Choices offered to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionSet {
    pub shapes: Vec<String>,
    pub textures: Vec<String>,
    pub colors: Vec<String>,
}

impl OptionSet {
    pub fn fallback(config: &AppConfig) -> Self {
        Self {
            shapes: config.fallback_shapes.clone(),
            textures: config.fallback_textures.clone(),
            colors: config.fallback_colors.clone(),
        }
    }

    /// Takes each field from `raw` when present and non-empty, from the
    /// configured fallback otherwise. `None` (failed request) means all
    /// fallback.
    pub fn with_fallback(raw: Option<RawOptions>, config: &AppConfig) -> Self {
        let raw = raw.unwrap_or_default();
        let pick = |field: Option<Vec<String>>, fallback: &Vec<String>, what: &str| match field {
            Some(values) if !values.is_empty() => values,
            _ => {
                log::info!("Using fallback {}", what);
                fallback.clone()
            }
        };
        Self {
            shapes: pick(raw.shapes, &config.fallback_shapes, "shapes"),
            textures: pick(raw.textures, &config.fallback_textures, "textures"),
            colors: pick(raw.colors, &config.fallback_colors, "colors"),
        }
    }
}

/// Where the generated model can be downloaded from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum GenerationResponse {
    Archive {
        zip_url: String,
    },
    Files {
        obj_url: String,
        #[serde(default)]
        mtl_url: Option<String>,
        #[serde(default)]
        textures: Vec<String>,
    },
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .map(|body| body.error)
}

/// Parses a successful generation body. An `{error}` body is a rejection even
/// with a 2xx status.
pub fn parse_generation_body(url: &str, body: &str) -> Result<GenerationResponse> {
    if let Some(message) = error_message(body) {
        return Err(BackendError::Rejected(message));
    }
    serde_json::from_str(body).map_err(|source| BackendError::InvalidResponse {
        url: url.to_string(),
        source,
    })
}

/// The generation service as the session sees it.
pub trait GenerationBackend {
    fn options(&self) -> Result<RawOptions>;
    fn generate(&self, params: &ObjectParams) -> Result<GenerationResponse>;
    fn generate_from_text(&self, text: &str) -> Result<GenerationResponse>;
    /// Downloads a file named in a generation response. Relative URLs are
    /// resolved against the service base URL.
    fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

pub struct HttpBackend {
    agent: ureq::Agent,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.backend_url, config.request_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn resolve_url(&self, url: &str) -> String {
        resolve_url(&self.base_url, url)
    }

    fn call(&self, url: &str, request: ureq::Request, body: Option<serde_json::Value>) -> Result<ureq::Response> {
        let result = match body {
            Some(body) => request.send_json(body),
            None => request.call(),
        };
        match result {
            Ok(response) => Ok(response),
            Err(ureq::Error::Status(status, response)) => {
                let message = response
                    .into_string()
                    .ok()
                    .and_then(|body| error_message(&body))
                    .unwrap_or_else(|| format!("HTTP {}", status));
                Err(BackendError::Status {
                    url: url.to_string(),
                    status,
                    message,
                })
            }
            Err(ureq::Error::Transport(transport)) => Err(BackendError::Transport {
                url: url.to_string(),
                message: transport.to_string(),
            }),
        }
    }

    fn read_string(url: &str, response: ureq::Response) -> Result<String> {
        response.into_string().map_err(|source| BackendError::Read {
            url: url.to_string(),
            source,
        })
    }

    fn post_generation(&self, path: &str, body: serde_json::Value) -> Result<GenerationResponse> {
        let url = self.resolve_url(path);
        log::info!("POST {}", url);
        let response = self.call(&url, self.agent.post(&url), Some(body))?;
        let text = Self::read_string(&url, response)?;
        parse_generation_body(&url, &text)
    }
}

impl GenerationBackend for HttpBackend {
    fn options(&self) -> Result<RawOptions> {
        let url = self.resolve_url("/api/options");
        let response = self.call(&url, self.agent.get(&url), None)?;
        let text = Self::read_string(&url, response)?;
        serde_json::from_str(&text).map_err(|source| BackendError::InvalidResponse { url, source })
    }

    fn generate(&self, params: &ObjectParams) -> Result<GenerationResponse> {
        let body = serde_json::to_value(params).map_err(|source| BackendError::InvalidResponse {
            url: self.resolve_url("/api/generate-object"),
            source,
        })?;
        self.post_generation("/api/generate-object", body)
    }

    fn generate_from_text(&self, text: &str) -> Result<GenerationResponse> {
        self.post_generation("/api/generate-from-text", serde_json::json!({ "text": text }))
    }

    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let url = self.resolve_url(url);
        log::info!("GET {}", url);
        let response = self.call(&url, self.agent.get(&url), None)?;
        let bytes = read_limited(&url, response.into_reader(), MAX_DOWNLOAD_BYTES)?;
        log::debug!("Fetched {} bytes from {}", bytes.len(), url);
        Ok(bytes)
    }
}

/// Reads a whole body, failing instead of truncating when it exceeds `limit`.
pub fn read_limited(url: &str, reader: impl Read, limit: u64) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    reader
        .take(limit.saturating_add(1))
        .read_to_end(&mut bytes)
        .map_err(|source| BackendError::Read {
            url: url.to_string(),
            source,
        })?;
    if bytes.len() as u64 > limit {
        return Err(BackendError::TooLarge {
            url: url.to_string(),
            limit,
        });
    }
    Ok(bytes)
}

/// Joins a possibly relative URL onto `base`.
pub fn resolve_url(base: &str, url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        return url.to_string();
    }
    let base = base.trim_end_matches('/');
    if url.starts_with('/') {
        format!("{base}{url}")
    } else {
        format!("{base}/{url}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_fall_back_per_field() {
        let config = AppConfig::default();
        let raw = RawOptions {
            shapes: Some(vec!["cube".into(), "torus".into()]),
            textures: Some(Vec::new()),
            colors: None,
        };
        let options = OptionSet::with_fallback(Some(raw), &config);
        assert_eq!(options.shapes, vec!["cube", "torus"]);
        assert_eq!(options.textures, config.fallback_textures);
        assert_eq!(options.colors, vec!["#6952BE"]);

        assert_eq!(OptionSet::with_fallback(None, &config), OptionSet::fallback(&config));
    }

    #[test]
    fn raw_options_tolerate_missing_fields() {
        let raw: RawOptions = serde_json::from_str(r#"{"shapes": ["cube"]}"#).unwrap();
        assert_eq!(raw.shapes, Some(vec!["cube".to_string()]));
        assert_eq!(raw.textures, None);
    }

    #[test]
    fn parses_both_response_forms() {
        assert_eq!(
            parse_generation_body("u", r#"{"zip_url": "/files/cube_stone.zip"}"#).unwrap(),
            GenerationResponse::Archive {
                zip_url: "/files/cube_stone.zip".into()
            }
        );
        assert_eq!(
            parse_generation_body("u", r#"{"obj_url": "/files/a.obj", "textures": ["/files/a.png"]}"#)
                .unwrap(),
            GenerationResponse::Files {
                obj_url: "/files/a.obj".into(),
                mtl_url: None,
                textures: vec!["/files/a.png".into()],
            }
        );
    }

    #[test]
    fn error_bodies_are_rejections() {
        assert!(matches!(
            parse_generation_body("u", r#"{"error": "empty text"}"#),
            Err(BackendError::Rejected(message)) if message == "empty text"
        ));
        assert!(matches!(
            parse_generation_body("u", r#"{"status": "ok"}"#),
            Err(BackendError::InvalidResponse { .. })
        ));
    }

    #[test]
    fn oversized_downloads_fail_instead_of_truncating() {
        let body = vec![7u8; 16];
        assert_eq!(read_limited("u", body.as_slice(), 16).unwrap(), body);
        assert!(matches!(
            read_limited("http://gen/files/big.obj", body.as_slice(), 15),
            Err(BackendError::TooLarge { url, limit: 15 }) if url == "http://gen/files/big.obj"
        ));
    }

    #[test]
    fn relative_urls_join_the_base() {
        assert_eq!(
            resolve_url("http://127.0.0.1:8000/", "/files/x.zip"),
            "http://127.0.0.1:8000/files/x.zip"
        );
        assert_eq!(
            resolve_url("http://127.0.0.1:8000", "files/x.zip"),
            "http://127.0.0.1:8000/files/x.zip"
        );
        assert_eq!(
            resolve_url("http://127.0.0.1:8000", "https://cdn.example/x.zip"),
            "https://cdn.example/x.zip"
        );
        let backend = HttpBackend::new("http://gen.local:9000/", Duration::from_secs(1));
        assert_eq!(backend.base_url(), "http://gen.local:9000");
    }
}

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use base64::Engine as _;

use crate::foundation::error::{ReelError, ReelResult};

const HTTP_TIMEOUT: Duration = Duration::from_secs(60);

/// Where an image, audio or video asset comes from.
///
/// A `Reference` is resolved once by the media loader:
/// - `data:<mime>;base64,<payload>` decodes inline base64,
/// - `http://` / `https://` is fetched with a blocking GET,
/// - `file://<path>` or any other string is read from the filesystem.
#[derive(Clone)]
pub enum MediaSource {
    /// Encoded bytes already in memory.
    Bytes(Arc<[u8]>),
    /// URI or filesystem path.
    Reference(String),
}

impl std::fmt::Debug for MediaSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.describe())
    }
}

impl<'de> serde::Deserialize<'de> for MediaSource {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        Ok(Self::Reference(s))
    }
}

impl From<Vec<u8>> for MediaSource {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(Arc::from(bytes))
    }
}

impl From<&Path> for MediaSource {
    fn from(path: &Path) -> Self {
        Self::Reference(path.to_string_lossy().into_owned())
    }
}

impl MediaSource {
    /// Wrap raw base64 (with or without a `data:` prefix) as a reference.
    pub fn from_base64(payload: impl Into<String>) -> Self {
        let payload = payload.into();
        if payload.starts_with("data:") {
            Self::Reference(payload)
        } else {
            Self::Reference(format!("data:application/octet-stream;base64,{payload}"))
        }
    }

    /// Short human-readable description used in logs and errors.
    pub fn describe(&self) -> String {
        match self {
            Self::Bytes(b) => format!("<{} bytes>", b.len()),
            Self::Reference(r) if r.starts_with("data:") => {
                let mime = r[5..].split([';', ',']).next().unwrap_or("");
                format!("data:{mime} ({} chars)", r.len())
            }
            Self::Reference(r) if r.chars().count() > 120 => {
                let head: String = r.chars().take(117).collect();
                format!("{head}...")
            }
            Self::Reference(r) => r.clone(),
        }
    }

    /// Resolve to encoded bytes. All failures are [`ReelError::MediaDecode`].
    pub fn resolve_bytes(&self) -> ReelResult<Arc<[u8]>> {
        let bytes = match self {
            Self::Bytes(b) => return non_empty(self, b.clone()),
            Self::Reference(r) => {
                let r = r.trim();
                if let Some(rest) = r.strip_prefix("data:") {
                    decode_data_uri(rest).map_err(|e| ReelError::decode(self.describe(), e))?
                } else if r.starts_with("http://") || r.starts_with("https://") {
                    fetch_http(r).map_err(|e| ReelError::decode(self.describe(), e))?
                } else {
                    let path = r.strip_prefix("file://").unwrap_or(r);
                    std::fs::read(path).map_err(|e| ReelError::decode(self.describe(), e))?
                }
            }
        };
        non_empty(self, Arc::from(bytes))
    }
}

fn non_empty(src: &MediaSource, bytes: Arc<[u8]>) -> ReelResult<Arc<[u8]>> {
    if bytes.is_empty() {
        return Err(ReelError::decode(src.describe(), "source is empty"));
    }
    Ok(bytes)
}

fn decode_data_uri(rest: &str) -> anyhow::Result<Vec<u8>> {
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| anyhow::anyhow!("data URI has no ',' separator"))?;
    if !meta.split(';').any(|p| p.eq_ignore_ascii_case("base64")) {
        anyhow::bail!("only base64 data URIs are supported");
    }
    let cleaned: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(cleaned.as_bytes())
        .or_else(|_| base64::engine::general_purpose::STANDARD_NO_PAD.decode(cleaned.as_bytes()))?;
    Ok(bytes)
}

fn fetch_http(url: &str) -> anyhow::Result<Vec<u8>> {
    use anyhow::Context as _;

    let client = reqwest::blocking::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .context("build http client")?;
    let resp = client
        .get(url)
        .send()
        .with_context(|| format!("GET {url}"))?
        .error_for_status()
        .with_context(|| format!("GET {url}"))?;
    let bytes = resp.bytes().context("read response body")?;
    Ok(bytes.to_vec())
}

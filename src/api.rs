// API client module: a small blocking HTTP client for the compression
// endpoint. One call uploads raw image bytes and parses the JSON reply,
// another fetches the compressed bytes back. Retrying and looping live in
// `compress`; this module only does single exchanges.

use indicatif::{ProgressBar, ProgressStyle};
use reqwest::blocking::{Body, Client};
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use serde::Deserialize;
use serde_json::Value;
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

use crate::agent::{FixedUserAgent, RandomUserAgent, UserAgentSource};
use crate::compress::CompressionResult;
use crate::config::ClientSettings;
use crate::error::CompressError;

const MAX_ERROR_BODY: usize = 200;

/// What the endpoint said about one upload.
#[derive(Debug, Clone, PartialEq)]
pub enum ShrinkReply {
    Accepted(CompressionResult),
    /// The reply carried an `error` key. The server uses this for rate
    /// limiting, so callers treat it as transient.
    Rejected(String),
}

/// One upload/download exchange with a compression backend.
pub trait Compressor {
    fn shrink(&self, data: &[u8], content_type: &str) -> Result<ShrinkReply, CompressError>;
    fn download(&self, url: &str) -> Result<Vec<u8>, CompressError>;
}

/// Success shape: `{ input: { size }, output: { url, size, ratio } }`.
#[derive(Deserialize, Debug)]
struct ShrinkResponse {
    input: ShrinkInput,
    output: ShrinkOutput,
}

#[derive(Deserialize, Debug)]
struct ShrinkInput {
    size: u64,
}

#[derive(Deserialize, Debug)]
struct ShrinkOutput {
    size: u64,
    ratio: f64,
    url: String,
}

/// Interpret a reply body. Any JSON with an `error` key is a rejection,
/// whatever the status code; any other JSON must have the success shape.
pub fn parse_shrink_reply(status: u16, body: &str) -> Result<ShrinkReply, CompressError> {
    let value: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(_) if !(200..300).contains(&status) => {
            return Err(CompressError::Status {
                status,
                body: truncate(body),
            })
        }
        Err(e) => {
            return Err(CompressError::MalformedResponse(format!(
                "Parsing shrink response json: {}",
                e
            )))
        }
    };

    if let Some(error) = value.get("error") {
        return Ok(ShrinkReply::Rejected(rejection_reason(error, value.get("message"))));
    }

    let resp: ShrinkResponse = serde_json::from_value(value)
        .map_err(|e| CompressError::MalformedResponse(format!("Unexpected shrink response: {}", e)))?;

    Ok(ShrinkReply::Accepted(CompressionResult::from_server(
        resp.input.size,
        resp.output.size,
        resp.output.ratio,
        resp.output.url,
    )))
}

fn rejection_reason(error: &Value, message: Option<&Value>) -> String {
    let error = match error {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    match message.and_then(Value::as_str) {
        Some(message) => format!("{}: {}", error, message),
        None => error,
    }
}

fn truncate(body: &str) -> String {
    let mut out: String = body.chars().take(MAX_ERROR_BODY).collect();
    if out.len() < body.len() {
        out.push_str("...");
    }
    out
}

/// MIME type sent with an upload, from the file extension.
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_ascii_lowercase());
    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        _ => "image/png",
    }
}

/// Blocking client for the real endpoint. Holds the reqwest client, the
/// upload URL and the user-agent source used for every request.
pub struct ShrinkClient {
    client: Client,
    endpoint: String,
    agents: Box<dyn UserAgentSource>,
    show_progress: bool,
}

impl ShrinkClient {
    /// Build a client from settings. A fixed user agent from the settings
    /// wins over the randomized default.
    pub fn new(settings: &ClientSettings) -> Result<Self, CompressError> {
        let agents: Box<dyn UserAgentSource> = match &settings.user_agent {
            Some(ua) => Box::new(FixedUserAgent(ua.clone())),
            None => Box::new(RandomUserAgent),
        };
        Self::with_user_agents(settings, agents)
    }

    pub fn with_user_agents(
        settings: &ClientSettings,
        agents: Box<dyn UserAgentSource>,
    ) -> Result<Self, CompressError> {
        let client = Client::builder().timeout(settings.timeout).build()?;
        Ok(ShrinkClient {
            client,
            endpoint: settings.endpoint.clone(),
            agents,
            show_progress: settings.show_progress,
        })
    }

    fn upload_bar(&self, len: u64) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new(len);
        if let Ok(style) = ProgressStyle::with_template("{spinner} uploading [{bar:30}] {bytes}/{total_bytes}") {
            bar.set_style(style);
        }
        bar
    }
}

impl Compressor for ShrinkClient {
    fn shrink(&self, data: &[u8], content_type: &str) -> Result<ShrinkReply, CompressError> {
        let len = data.len() as u64;
        let bar = self.upload_bar(len);
        let body = Body::sized(bar.wrap_read(Cursor::new(data.to_vec())), len);

        debug!(endpoint = %self.endpoint, bytes = len, content_type, "Uploading");
        let res = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, content_type)
            .header(USER_AGENT, self.agents.user_agent())
            .body(body)
            .send();
        bar.finish_and_clear();

        let res = res?;
        let status = res.status().as_u16();
        let text = res.text()?;
        debug!(status, "Shrink response received");
        parse_shrink_reply(status, &text)
    }

    fn download(&self, url: &str) -> Result<Vec<u8>, CompressError> {
        debug!(url, "Downloading");
        let res = self
            .client
            .get(url)
            .header(USER_AGENT, self.agents.user_agent())
            .send()?;
        if !res.status().is_success() {
            let status = res.status().as_u16();
            let txt = res.text().unwrap_or_default();
            return Err(CompressError::Status {
                status,
                body: truncate(&txt),
            });
        }
        Ok(res.bytes()?.to_vec())
    }
}

//! HTTP requests carrying Base64 chunks in the User-Agent header

use covertcap_core::{ChannelDescriptor, Error, Result};
use covertcap_packet::{Dissection, HttpRequest, HttpResponse};
use regex::Regex;

/// Default marker preceding each chunk
pub const DEFAULT_MARKER: &str = "ExfilChunk-";

/// Marker used by the decoy stream
pub const DECOY_MARKER: &str = "TelemetryChunk-";

/// Base64 characters per request
pub const CHUNK_SIZE: usize = 20;

/// Host header of every request on the signal flow
pub const DEFAULT_HOST: &str = "metrics.internal.corp";

/// Marker-free requests sent before and after the chunks
pub const PRELUDE_REQUESTS: usize = 5;
pub const TAIL_REQUESTS: usize = 5;

/// User-Agent of the marker-free requests
pub const PLAIN_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// User-Agent header value carrying one chunk
pub fn signal_user_agent(marker: &str, chunk: &str) -> String {
    format!("Mozilla/5.0 (compatible; {}{})", marker, chunk)
}

/// Request carrying a chunk
pub fn signal_request(host: &str, marker: &str, chunk: &str, id: u16) -> Vec<u8> {
    let ua = signal_user_agent(marker, chunk);
    HttpRequest::get(format!("/api/metrics?id={}", id), host, Some(&ua)).to_bytes()
}

/// Marker-free request on the signal flow
pub fn plain_request(host: &str, endpoint: &str, t: u32) -> Vec<u8> {
    HttpRequest::get(format!("/api/{}?t={}", endpoint, t), host, Some(PLAIN_USER_AGENT)).to_bytes()
}

/// Empty `200 OK` sent back for every request
pub fn ok_response() -> Vec<u8> {
    HttpResponse::ok(Vec::new()).to_bytes()
}

/// Finds `<marker><chunk>` inside a header value
#[derive(Debug, Clone)]
pub struct ChunkMatcher {
    regex: Regex,
}

impl ChunkMatcher {
    pub fn new(marker: &str) -> Result<Self> {
        if marker.is_empty() {
            return Err(Error::invalid_parameter("marker", "must not be empty"));
        }
        let pattern = format!("{}([A-Za-z0-9_-]+)", regex::escape(marker));
        let regex = Regex::new(&pattern)
            .map_err(|e| Error::invalid_parameter("marker".to_string(), e.to_string()))?;
        Ok(Self { regex })
    }

    /// The chunk following the marker, if any
    pub fn find<'a>(&self, value: &'a str) -> Option<&'a str> {
        self.regex
            .captures(value)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
    }
}

/// The chunk carried by a frame, if it is a marked request on the signal flow
pub fn extract_chunk(frame: &[u8], descriptor: &ChannelDescriptor, matcher: &ChunkMatcher) -> Option<String> {
    let dissection = Dissection::from_frame(frame)?;
    dissection.tcp()?;

    let (src, dst) = dissection.network()?;
    let (sport, dport) = dissection.ports()?;
    if !descriptor.matches_flow(src, dst, sport, dport) {
        return None;
    }

    let request = HttpRequest::from_bytes(dissection.payload())?;
    matcher.find(request.user_agent()?).map(str::to_string)
}

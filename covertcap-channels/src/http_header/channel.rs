//! HTTP header chunking channel

use super::noise;
use super::packet::{
    self, ChunkMatcher, CHUNK_SIZE, DECOY_MARKER, DEFAULT_HOST, DEFAULT_MARKER, PRELUDE_REQUESTS,
    TAIL_REQUESTS,
};
use crate::chunking::{decode_chunks, encode_chunks};
use crate::flow::TcpConversation;
use crate::hosts::{disjoint_from, sibling_host};
use covertcap_core::{
    ChannelDescriptor, CovertChannel, EncodeContext, Endpoint, Error, Frame, FrameKind, MacAddr,
    RecoveredMessage, Result, SignalPattern,
};
use std::net::Ipv4Addr;
use tracing::debug;

/// Decoy client host octet and port
pub const DECOY_HOST_OCTET: u8 = 66;
pub const DECOY_CLIENT_PORT: u16 = 51066;

/// Hides a message in the User-Agent of keep-alive HTTP requests
#[derive(Debug, Clone)]
pub struct HttpHeaderChannel {
    descriptor: ChannelDescriptor,
    marker: String,
    matcher: ChunkMatcher,
    host: String,
    chunk_size: usize,
}

impl HttpHeaderChannel {
    /// Create a channel from a descriptor with a [`SignalPattern::HeaderMarker`]
    pub fn new(descriptor: ChannelDescriptor) -> Result<Self> {
        let marker = match &descriptor.pattern {
            SignalPattern::HeaderMarker(marker) => marker.clone(),
            other => {
                return Err(Error::invalid_parameter(
                    "pattern".to_string(),
                    format!("HTTP header channel needs a header marker, got {}", other),
                ))
            }
        };
        let matcher = ChunkMatcher::new(&marker)?;

        Ok(Self {
            descriptor,
            marker,
            matcher,
            host: DEFAULT_HOST.to_string(),
            chunk_size: CHUNK_SIZE,
        })
    }

    /// Client 10.13.37.10:51022 talking to 10.13.37.80:80, marker `ExfilChunk-`
    pub fn default_descriptor() -> ChannelDescriptor {
        ChannelDescriptor::new(
            Endpoint::new(
                MacAddr([0x02, 0x42, 0xac, 0x11, 0x00, 0x10]),
                Ipv4Addr::new(10, 13, 37, 10),
                51022,
            ),
            Endpoint::new(
                MacAddr([0x02, 0x42, 0xac, 0x11, 0x00, 0x11]),
                Ipv4Addr::new(10, 13, 37, 80),
                80,
            ),
            SignalPattern::HeaderMarker(DEFAULT_MARKER.to_string()),
        )
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::invalid_parameter("chunk_size", "must be at least 1"));
        }
        self.chunk_size = chunk_size;
        Ok(self)
    }

    /// Change the Host header sent on the signal flow
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Descriptor of the decoy stream: host .66 on port 51066, marker
    /// `TelemetryChunk-`. The port moves to 51067 if the signal uses 51066.
    pub fn decoy_descriptor(&self) -> ChannelDescriptor {
        let client = &self.descriptor.client;
        let port = disjoint_from(DECOY_CLIENT_PORT, client.port, u16::MAX);
        ChannelDescriptor::new(
            Endpoint::new(client.mac, sibling_host(client.ip, DECOY_HOST_OCTET), port),
            self.descriptor.server,
            SignalPattern::HeaderMarker(DECOY_MARKER.to_string()),
        )
    }
}

impl Default for HttpHeaderChannel {
    fn default() -> Self {
        let matcher = match ChunkMatcher::new(DEFAULT_MARKER) {
            Ok(m) => m,
            Err(e) => unreachable!("default marker is a valid pattern: {}", e),
        };
        Self {
            descriptor: Self::default_descriptor(),
            marker: DEFAULT_MARKER.to_string(),
            matcher,
            host: DEFAULT_HOST.to_string(),
            chunk_size: CHUNK_SIZE,
        }
    }
}

impl CovertChannel for HttpHeaderChannel {
    fn name(&self) -> &'static str {
        "HTTP header chunking"
    }

    fn shortname(&self) -> &'static str {
        "http"
    }

    fn descriptor(&self) -> &ChannelDescriptor {
        &self.descriptor
    }

    fn encode(&self, message: &[u8], ctx: &mut EncodeContext) -> Result<Vec<Frame>> {
        let chunks = encode_chunks(message, self.chunk_size);

        let mut requests = Vec::with_capacity(PRELUDE_REQUESTS + chunks.len() + TAIL_REQUESTS);
        for _ in 0..PRELUDE_REQUESTS {
            let t = ctx.gen_range(1_000_000..10_000_000u32);
            requests.push(packet::plain_request(&self.host, "health", t));
        }
        for chunk in &chunks {
            let id = ctx.gen_range(1000..10_000u16);
            requests.push(packet::signal_request(&self.host, &self.marker, chunk, id));
        }
        for _ in 0..TAIL_REQUESTS {
            let t = ctx.gen_range(1_000_000..10_000_000u32);
            requests.push(packet::plain_request(&self.host, "status", t));
        }

        let mut conv = TcpConversation::new(
            self.descriptor.client,
            self.descriptor.server,
            FrameKind::Signal,
            ctx,
        );
        let mut t = conv.handshake(ctx.now(), ctx)? + 10_000;
        let response = packet::ok_response();
        for request in requests {
            t += ctx.gen_range(50_000..200_000u64);
            conv.client_send(t, request, ctx)?;
            t += 5_000;
            conv.server_send(t, response.clone(), ctx)?;
        }
        ctx.set_clock(t);

        debug!(
            channel = self.shortname(),
            chunks = chunks.len(),
            frames = conv.len(),
            marker = %self.marker,
            "encoded message into HTTP requests"
        );
        Ok(conv.into_frames())
    }

    fn decode(&self, frames: &[Frame]) -> RecoveredMessage {
        let mut chunks: Vec<(u64, String)> = frames
            .iter()
            .filter_map(|f| {
                packet::extract_chunk(&f.data, &self.descriptor, &self.matcher)
                    .map(|chunk| (f.timestamp_us, chunk))
            })
            .collect();

        debug!(
            channel = self.shortname(),
            matched = chunks.len(),
            scanned = frames.len(),
            "filtered HTTP signal requests"
        );
        if chunks.is_empty() {
            return RecoveredMessage::no_signal();
        }

        chunks.sort_by_key(|(ts, _)| *ts);
        let matched = chunks.len();
        let bytes = decode_chunks(chunks.into_iter().map(|(_, chunk)| chunk));
        RecoveredMessage::new(bytes, matched)
    }

    fn noise(&self, count: usize, ctx: &mut EncodeContext) -> Result<Vec<Frame>> {
        noise::generate(self, count, ctx)
    }

    fn decoy(&self) -> Box<dyn CovertChannel> {
        let mut decoy = self.clone();
        decoy.descriptor = self.decoy_descriptor();
        decoy.marker = DECOY_MARKER.to_string();
        decoy.matcher = match ChunkMatcher::new(DECOY_MARKER) {
            Ok(m) => m,
            Err(e) => unreachable!("decoy marker is a valid pattern: {}", e),
        };
        Box::new(decoy)
    }
}

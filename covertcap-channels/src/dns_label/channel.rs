//! DNS label chunking channel

use super::noise;
use super::packet::{
    self, base_domain, BASE_IDENT, CHUNK_SIZE, DECOY_LABEL, DEFAULT_SUFFIX, QUERY_JITTER_US,
    QUERY_SPACING_US,
};
use crate::chunking::{decode_chunks, encode_chunks};
use crate::hosts::{disjoint_from, sibling_host};
use covertcap_core::{
    ChannelDescriptor, CovertChannel, EncodeContext, Endpoint, Error, Frame, MacAddr,
    RecoveredMessage, Result, SignalPattern,
};
use covertcap_packet::dns::{encode_name, MAX_LABEL_LEN};
use std::net::Ipv4Addr;
use tracing::debug;

/// Hides a message in the leftmost label of DNS query names
///
/// The message is URL-safe Base64 encoded without padding and split into
/// chunks; chunk `i` is sent as an `A` query for `<chunk>.<suffix>` from
/// the client to the server. Decoding keeps queries on the exact flow whose
/// name ends in the suffix and joins their chunks in timestamp order.
#[derive(Debug, Clone)]
pub struct DnsLabelChannel {
    descriptor: ChannelDescriptor,
    suffix: String,
    chunk_size: usize,
}

impl DnsLabelChannel {
    /// Create a channel from a descriptor with a [`SignalPattern::DomainSuffix`]
    pub fn new(descriptor: ChannelDescriptor) -> Result<Self> {
        let suffix = match &descriptor.pattern {
            SignalPattern::DomainSuffix(suffix) => suffix.trim_matches('.').to_string(),
            other => {
                return Err(Error::invalid_parameter(
                    "pattern".to_string(),
                    format!("DNS label channel needs a domain suffix, got {}", other),
                ))
            }
        };

        if suffix.is_empty() {
            return Err(Error::invalid_parameter("suffix", "must not be empty"));
        }

        let channel = Self {
            descriptor,
            suffix,
            chunk_size: CHUNK_SIZE,
        };
        channel.check_name_fits()?;
        Ok(channel)
    }

    /// Client 10.0.5.42:54321 querying 10.0.5.53:53 under the default suffix
    pub fn default_descriptor() -> ChannelDescriptor {
        ChannelDescriptor::new(
            Endpoint::new(
                MacAddr([0x02, 0x42, 0xac, 0x11, 0x00, 0x02]),
                Ipv4Addr::new(10, 0, 5, 42),
                54321,
            ),
            Endpoint::new(
                MacAddr([0x02, 0x42, 0xac, 0x11, 0x00, 0x01]),
                Ipv4Addr::new(10, 0, 5, 53),
                53,
            ),
            SignalPattern::DomainSuffix(DEFAULT_SUFFIX.to_string()),
        )
    }

    /// Change the number of Base64 characters per label
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Result<Self> {
        if chunk_size == 0 || chunk_size > MAX_LABEL_LEN {
            return Err(Error::invalid_parameter(
                "chunk_size".to_string(),
                format!("must be between 1 and {}", MAX_LABEL_LEN),
            ));
        }
        self.chunk_size = chunk_size;
        self.check_name_fits()?;
        Ok(self)
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Descriptor of the decoy stream: a neighbouring client (host .99,
    /// next port) under `backup.<base domain>`
    pub fn decoy_descriptor(&self) -> ChannelDescriptor {
        let client = &self.descriptor.client;
        ChannelDescriptor::new(
            Endpoint::new(
                client.mac,
                sibling_host(client.ip, 99),
                disjoint_from(client.port.saturating_add(1), client.port, u16::MAX),
            ),
            self.descriptor.server,
            SignalPattern::DomainSuffix(format!("{}.{}", DECOY_LABEL, base_domain(&self.suffix))),
        )
    }

    // A full-size chunk under the suffix must still be a valid name
    fn check_name_fits(&self) -> Result<()> {
        let longest = format!("{}.{}", "A".repeat(self.chunk_size), self.suffix);
        encode_name(&longest).map(|_| ())
    }
}

impl Default for DnsLabelChannel {
    fn default() -> Self {
        Self {
            descriptor: Self::default_descriptor(),
            suffix: DEFAULT_SUFFIX.to_string(),
            chunk_size: CHUNK_SIZE,
        }
    }
}

impl CovertChannel for DnsLabelChannel {
    fn name(&self) -> &'static str {
        "DNS label chunking"
    }

    fn shortname(&self) -> &'static str {
        "dns"
    }

    fn descriptor(&self) -> &ChannelDescriptor {
        &self.descriptor
    }

    fn encode(&self, message: &[u8], ctx: &mut EncodeContext) -> Result<Vec<Frame>> {
        let chunks = encode_chunks(message, self.chunk_size);
        let base = ctx.now();

        let mut frames = Vec::with_capacity(chunks.len());
        for (i, chunk) in chunks.iter().enumerate() {
            let qname = format!("{}.{}", chunk, self.suffix);
            let data = packet::query_frame(
                &self.descriptor.client,
                &self.descriptor.server,
                &qname,
                ctx.gen_range(1..=u16::MAX),
                BASE_IDENT.wrapping_add(i as u16),
                64,
            )?;

            let ts = base + i as u64 * QUERY_SPACING_US + ctx.gen_range(0..QUERY_JITTER_US);
            frames.push(Frame::signal(ts, data));
        }

        ctx.set_clock(base + chunks.len() as u64 * QUERY_SPACING_US);
        debug!(
            channel = self.shortname(),
            chunks = chunks.len(),
            suffix = %self.suffix,
            "encoded message into DNS queries"
        );
        Ok(frames)
    }

    fn decode(&self, frames: &[Frame]) -> RecoveredMessage {
        let mut chunks: Vec<(u64, String)> = frames
            .iter()
            .filter_map(|f| {
                packet::extract_chunk(&f.data, &self.descriptor, &self.suffix)
                    .map(|chunk| (f.timestamp_us, chunk))
            })
            .collect();

        debug!(
            channel = self.shortname(),
            matched = chunks.len(),
            scanned = frames.len(),
            "filtered DNS signal queries"
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
        let suffix = format!("{}.{}", DECOY_LABEL, base_domain(&self.suffix));
        Box::new(Self {
            descriptor: self.decoy_descriptor(),
            suffix,
            chunk_size: self.chunk_size,
        })
    }
}

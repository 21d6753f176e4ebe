//! TLS record length channel

use super::noise;
use super::packet::{
    self, filler_record, records_payload, server_hello, RecordSeries, DECOY_CLIENT_PORT,
    OFF_SERIES_CHANCE,
};
use crate::chunking::{base32_symbols, decode_base32_symbols};
use crate::flow::TcpConversation;
use crate::hosts::disjoint_from;
use covertcap_core::{
    ChannelDescriptor, CovertChannel, EncodeContext, Endpoint, Error, Frame, FrameKind, MacAddr,
    RecoveredMessage, Result, SignalPattern,
};
use covertcap_packet::TlsRecord;
use std::net::Ipv4Addr;
use tracing::debug;

/// Hides Base32 symbols in the length field of TLS application-data records
#[derive(Debug, Clone)]
pub struct TlsLengthChannel {
    descriptor: ChannelDescriptor,
    series: RecordSeries,
}

impl TlsLengthChannel {
    /// Create a channel from a descriptor with a [`SignalPattern::RecordLength`]
    pub fn new(descriptor: ChannelDescriptor) -> Result<Self> {
        let series = match descriptor.pattern {
            SignalPattern::RecordLength { base, step } => RecordSeries::new(base, step)?,
            ref other => {
                return Err(Error::invalid_parameter(
                    "pattern".to_string(),
                    format!("TLS length channel needs a record length series, got {}", other),
                ))
            }
        };
        Ok(Self { descriptor, series })
    }

    /// Client 10.20.0.15:51514 talking to 10.20.0.53:443, lengths 480 + 7v
    pub fn default_descriptor() -> ChannelDescriptor {
        let series = RecordSeries::default();
        ChannelDescriptor::new(
            Endpoint::new(
                MacAddr([0x02, 0x42, 0xac, 0x14, 0x00, 0x0f]),
                Ipv4Addr::new(10, 20, 0, 15),
                51514,
            ),
            Endpoint::new(
                MacAddr([0x02, 0x42, 0xac, 0x14, 0x00, 0x35]),
                Ipv4Addr::new(10, 20, 0, 53),
                443,
            ),
            SignalPattern::RecordLength {
                base: series.base,
                step: series.step,
            },
        )
    }

    pub fn series(&self) -> &RecordSeries {
        &self.series
    }

    /// Same hosts and series, client port 51599 (51600 if the signal uses 51599)
    pub fn decoy_descriptor(&self) -> ChannelDescriptor {
        let mut descriptor = self.descriptor.clone();
        descriptor.client.port =
            disjoint_from(DECOY_CLIENT_PORT, self.descriptor.client.port, u16::MAX);
        descriptor
    }
}

impl Default for TlsLengthChannel {
    fn default() -> Self {
        Self {
            descriptor: Self::default_descriptor(),
            series: RecordSeries::default(),
        }
    }
}

impl CovertChannel for TlsLengthChannel {
    fn name(&self) -> &'static str {
        "TLS record length"
    }

    fn shortname(&self) -> &'static str {
        "tls"
    }

    fn descriptor(&self) -> &ChannelDescriptor {
        &self.descriptor
    }

    fn encode(&self, message: &[u8], ctx: &mut EncodeContext) -> Result<Vec<Frame>> {
        let symbols = base32_symbols(message);

        let mut conv = TcpConversation::new(
            self.descriptor.client,
            self.descriptor.server,
            FrameKind::Signal,
            ctx,
        );
        let mut t = conv.handshake(ctx.now(), ctx)? + 10_000;

        let mut random = [0u8; 32];
        random.copy_from_slice(&ctx.random_bytes(32));
        conv.client_send(t, TlsRecord::client_hello(random).to_bytes()?, ctx)?;
        t += ctx.gen_range(5_000..20_000u64);
        let hello = server_hello(ctx);
        conv.server_send(t, hello.to_bytes()?, ctx)?;

        let mut off_series = 0usize;
        for &value in &symbols {
            t += ctx.gen_range(30_000..120_000u64);
            let signal = filler_record(self.series.length_for(value), ctx);

            let mut records = Vec::with_capacity(2);
            if ctx.chance(OFF_SERIES_CHANCE) {
                off_series += 1;
                let extra = filler_record(self.series.off_series_length(ctx), ctx);
                if ctx.chance(0.5) {
                    // Same segment, ahead of the signal record
                    records.push(extra);
                } else {
                    conv.client_send(t, extra.to_bytes()?, ctx)?;
                    t += ctx.gen_range(2_000..10_000u64);
                }
            }
            records.push(signal);
            conv.client_send(t, records_payload(&records)?, ctx)?;

            if ctx.chance(0.5) {
                t += ctx.gen_range(3_000..15_000u64);
                let length = ctx.gen_range(40..900usize);
                conv.server_send(t, filler_record(length, ctx).to_bytes()?, ctx)?;
            }
        }
        ctx.set_clock(t);

        debug!(
            channel = self.shortname(),
            symbols = symbols.len(),
            off_series,
            frames = conv.len(),
            "encoded message into TLS record lengths"
        );
        Ok(conv.into_frames())
    }

    fn decode(&self, frames: &[Frame]) -> RecoveredMessage {
        let mut symbols: Vec<(u64, usize, u8)> = Vec::new();
        for frame in frames {
            let values = packet::extract_symbols(&frame.data, &self.descriptor, &self.series);
            symbols.extend(
                values
                    .into_iter()
                    .enumerate()
                    .map(|(pos, v)| (frame.timestamp_us, pos, v)),
            );
        }

        debug!(
            channel = self.shortname(),
            matched = symbols.len(),
            scanned = frames.len(),
            "filtered TLS signal records"
        );
        if symbols.is_empty() {
            return RecoveredMessage::no_signal();
        }

        symbols.sort_by_key(|&(ts, pos, _)| (ts, pos));
        let matched = symbols.len();
        let values: Vec<u8> = symbols.into_iter().map(|(_, _, v)| v).collect();
        RecoveredMessage::new(decode_base32_symbols(&values), matched)
    }

    fn noise(&self, count: usize, ctx: &mut EncodeContext) -> Result<Vec<Frame>> {
        noise::generate(self, count, ctx)
    }

    fn decoy(&self) -> Box<dyn CovertChannel> {
        Box::new(Self {
            descriptor: self.decoy_descriptor(),
            series: self.series,
        })
    }
}

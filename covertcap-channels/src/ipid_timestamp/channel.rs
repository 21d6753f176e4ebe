//! IP-ID / TCP timestamp XOR channel

use super::noise;
use super::packet::{
    self, mask_byte, xor_key, RecordFields, Tunnel, DECOY_CLIENT_PORT, DECOY_SERVER_PORT,
    DECOY_VLAN, DEFAULT_VLAN, INDEX_MASK, MAX_MESSAGE_LEN,
};
use crate::hosts::disjoint_from;
use covertcap_core::{
    ChannelDescriptor, CovertChannel, EncodeContext, Endpoint, Error, Frame, MacAddr,
    RecoveredMessage, Result, SignalPattern,
};
use covertcap_packet::vlan::VLAN_MAX_ID;
use std::collections::BTreeMap;
use std::net::{Ipv4Addr, Ipv6Addr};
use tracing::{debug, warn};

/// Hides one byte per tunnelled record in the low bytes of the outer IPv4
/// identification and the TCP timestamp value
///
/// Byte `i` is masked as `c = p ^ key ^ (i & 0xFF)` where `key` is the low
/// byte of `client_port ^ server_port`. The record carries a random
/// `ts_low` in the timestamp and `c ^ ts_low` in the identification, and
/// `i` in the low 12 bits of the inner IPv6 flow label, so records can be
/// reordered freely.
#[derive(Debug, Clone)]
pub struct IpidTimestampChannel {
    descriptor: ChannelDescriptor,
    tunnel: Tunnel,
    key: u8,
}

impl IpidTimestampChannel {
    /// Create a channel from a descriptor with a [`SignalPattern::Tunnel`]
    pub fn new(descriptor: ChannelDescriptor) -> Result<Self> {
        let tunnel = Tunnel::from_descriptor(&descriptor)?;
        let key = xor_key(descriptor.client.port, descriptor.server.port);
        Ok(Self {
            descriptor,
            tunnel,
            key,
        })
    }

    /// VLAN 133, 172.16.133.10 to 172.16.133.1 outside,
    /// [fd00:133::10]:40133 to [fd00:133::1]:443 inside
    pub fn default_descriptor() -> ChannelDescriptor {
        ChannelDescriptor::new(
            Endpoint::new(
                MacAddr([0x02, 0x42, 0xac, 0x10, 0x85, 0x0a]),
                Ipv6Addr::new(0xfd00, 0x133, 0, 0, 0, 0, 0, 0x10),
                40133,
            ),
            Endpoint::new(
                MacAddr([0x02, 0x42, 0xac, 0x10, 0x85, 0x01]),
                Ipv6Addr::new(0xfd00, 0x133, 0, 0, 0, 0, 0, 0x1),
                443,
            ),
            SignalPattern::Tunnel {
                outer_client: Ipv4Addr::new(172, 16, 133, 10),
                outer_server: Ipv4Addr::new(172, 16, 133, 1),
                vlan_id: DEFAULT_VLAN,
            },
        )
    }

    pub fn key(&self) -> u8 {
        self.key
    }

    pub fn tunnel(&self) -> &Tunnel {
        &self.tunnel
    }

    /// Same hosts on VLAN 134, ports 40134 to 8443
    ///
    /// A signal already on VLAN 134 pushes the decoy to VLAN 135.
    pub fn decoy_descriptor(&self) -> ChannelDescriptor {
        let tunnel = self.decoy_tunnel();
        let mut descriptor = self.descriptor.clone();
        descriptor.client.port = tunnel.client_port;
        descriptor.server.port = tunnel.server_port;
        descriptor.pattern = SignalPattern::Tunnel {
            outer_client: tunnel.outer_client,
            outer_server: tunnel.outer_server,
            vlan_id: tunnel.vlan_id,
        };
        descriptor
    }

    fn decoy_tunnel(&self) -> Tunnel {
        Tunnel {
            vlan_id: disjoint_from(DECOY_VLAN, self.tunnel.vlan_id, VLAN_MAX_ID),
            client_port: DECOY_CLIENT_PORT,
            server_port: DECOY_SERVER_PORT,
            ..self.tunnel
        }
    }
}

impl Default for IpidTimestampChannel {
    fn default() -> Self {
        let descriptor = Self::default_descriptor();
        let tunnel = Tunnel {
            vlan_id: DEFAULT_VLAN,
            client_mac: descriptor.client.mac,
            server_mac: descriptor.server.mac,
            outer_client: Ipv4Addr::new(172, 16, 133, 10),
            outer_server: Ipv4Addr::new(172, 16, 133, 1),
            inner_client: Ipv6Addr::new(0xfd00, 0x133, 0, 0, 0, 0, 0, 0x10),
            inner_server: Ipv6Addr::new(0xfd00, 0x133, 0, 0, 0, 0, 0, 0x1),
            client_port: descriptor.client.port,
            server_port: descriptor.server.port,
        };
        let key = xor_key(tunnel.client_port, tunnel.server_port);
        Self {
            descriptor,
            tunnel,
            key,
        }
    }
}

impl CovertChannel for IpidTimestampChannel {
    fn name(&self) -> &'static str {
        "IP-ID/TCP timestamp XOR"
    }

    fn shortname(&self) -> &'static str {
        "ipid"
    }

    fn descriptor(&self) -> &ChannelDescriptor {
        &self.descriptor
    }

    fn encode(&self, message: &[u8], ctx: &mut EncodeContext) -> Result<Vec<Frame>> {
        if message.len() > MAX_MESSAGE_LEN {
            return Err(Error::construction(format!(
                "message of {} bytes exceeds the {}-record index space",
                message.len(),
                MAX_MESSAGE_LEN
            )));
        }

        // Timestamp values count up per record; only the low byte is chosen
        let ts_base = ctx.gen_range(0x0001_0000..0x0040_0000u32);
        let echo_base = ctx.gen_u32();
        let mut seq = ctx.gen_u32();
        let ack = ctx.gen_u32();

        let mut frames = Vec::with_capacity(message.len());
        for (i, &byte) in message.iter().enumerate() {
            let c = mask_byte(byte, self.key, i);
            let ts_low: u8 = ctx.gen_range(0..=u8::MAX);
            let ip_id_low = c ^ ts_low;

            let payload_len = ctx.gen_range(8..48usize);
            let fields = RecordFields {
                identification: ((ctx.gen_range(0..=u8::MAX) as u16) << 8) | ip_id_low as u16,
                flow_label: ((ctx.gen_range(0..=u8::MAX) as u32) << 12) | (i as u32 & INDEX_MASK),
                ts_value: (ts_base.wrapping_add(i as u32) << 8) | ts_low as u32,
                ts_echo: echo_base.wrapping_add(i as u32),
                seq,
                ack,
                payload: ctx.random_bytes(payload_len),
            };
            seq = seq.wrapping_add(payload_len as u32);

            let data = packet::tunnel_frame(&self.tunnel, fields)?;
            let ts = ctx.advance_random(20_000..80_000);
            frames.push(Frame::signal(ts, data));
        }

        debug!(
            channel = self.shortname(),
            records = frames.len(),
            vlan = self.tunnel.vlan_id,
            "encoded message into tunnel records"
        );
        Ok(frames)
    }

    fn decode(&self, frames: &[Frame]) -> RecoveredMessage {
        let mut records: Vec<(u64, packet::TunnelRecord)> = frames
            .iter()
            .filter_map(|f| packet::extract_record(&f.data, &self.tunnel).map(|r| (f.timestamp_us, r)))
            .collect();

        debug!(
            channel = self.shortname(),
            matched = records.len(),
            scanned = frames.len(),
            "filtered tunnel records"
        );
        if records.is_empty() {
            return RecoveredMessage::no_signal();
        }

        // The earliest record wins when an index repeats
        records.sort_by_key(|(ts, _)| *ts);
        let mut by_index: BTreeMap<u16, u8> = BTreeMap::new();
        let mut duplicates = 0usize;
        for (_, record) in &records {
            if by_index.contains_key(&record.index) {
                duplicates += 1;
                continue;
            }
            let plain = mask_byte(record.ciphertext(), self.key, record.index as usize);
            by_index.insert(record.index, plain);
        }

        if duplicates > 0 {
            warn!(duplicates, "ignoring repeated record indices");
        }
        if let Some(&last) = by_index.keys().next_back() {
            let missing = last as usize + 1 - by_index.len();
            if missing > 0 {
                warn!(missing, last_index = last, "record indices are missing, output has gaps");
            }
        }

        let matched = by_index.len();
        RecoveredMessage::new(by_index.into_values().collect(), matched)
    }

    fn noise(&self, count: usize, ctx: &mut EncodeContext) -> Result<Vec<Frame>> {
        noise::generate(self, count, ctx)
    }

    fn decoy(&self) -> Box<dyn CovertChannel> {
        let tunnel = self.decoy_tunnel();
        Box::new(Self {
            descriptor: self.decoy_descriptor(),
            key: xor_key(tunnel.client_port, tunnel.server_port),
            tunnel,
        })
    }
}

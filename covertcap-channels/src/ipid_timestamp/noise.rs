//! Cover traffic for the IP-ID channel
//!
//! Tunnel records with the same layering and option layout as the signal.
//! Most travel on other VLANs between other tunnel endpoints; the rest
//! share the signal's VLAN and hosts but use ephemeral client ports.

use super::channel::IpidTimestampChannel;
use super::packet::{tunnel_frame, RecordFields, Tunnel};
use crate::hosts::{ephemeral_port, noise_window};
use covertcap_core::{CovertChannel, EncodeContext, Frame, Result};
use covertcap_packet::ipv6::FLOW_LABEL_MAX;
use std::net::{Ipv4Addr, Ipv6Addr};
use tracing::debug;

/// Minimum window cover traffic is spread over
pub const NOISE_WINDOW_US: u64 = 3_000_000;

/// Share of records sent on foreign tunnels
pub const FOREIGN_TUNNEL_RATIO: f64 = 0.7;

const SERVER_PORTS: &[u16] = &[443, 8443, 22, 993, 5432];

/// Produce exactly `count` cover records for `channel`
pub fn generate(channel: &IpidTimestampChannel, count: usize, ctx: &mut EncodeContext) -> Result<Vec<Frame>> {
    let window = noise_window(ctx, NOISE_WINDOW_US);
    let mut foreign = 0usize;

    let mut frames = Vec::with_capacity(count);
    for _ in 0..count {
        let tunnel = if ctx.chance(FOREIGN_TUNNEL_RATIO) {
            foreign += 1;
            foreign_tunnel(channel.tunnel(), ctx)
        } else {
            sibling_flow(channel.tunnel(), ctx)
        };
        frames.push(random_record(&tunnel, window, ctx)?);
    }

    debug!(
        channel = channel.shortname(),
        frames = frames.len(),
        foreign,
        "generated tunnel cover traffic"
    );
    Ok(frames)
}

/// A tunnel on another VLAN between other hosts
pub fn foreign_tunnel(signal: &Tunnel, ctx: &mut EncodeContext) -> Tunnel {
    let mut vlan_id = ctx.gen_range(100..200u16);
    if vlan_id == signal.vlan_id {
        vlan_id += 100;
    }
    let subnet = (vlan_id & 0xFF) as u8;

    Tunnel {
        vlan_id,
        client_mac: signal.client_mac,
        server_mac: signal.server_mac,
        outer_client: Ipv4Addr::new(172, 16, subnet, ctx.gen_range(2..255u8)),
        outer_server: Ipv4Addr::new(172, 16, subnet, 1),
        inner_client: Ipv6Addr::new(0xfd00, vlan_id, 0, 0, 0, 0, 0, ctx.gen_range(2..0x100u16)),
        inner_server: Ipv6Addr::new(0xfd00, vlan_id, 0, 0, 0, 0, 0, 1),
        client_port: ephemeral_port(ctx),
        server_port: *ctx.pick(SERVER_PORTS),
    }
}

/// The signal tunnel with an ephemeral client port
pub fn sibling_flow(signal: &Tunnel, ctx: &mut EncodeContext) -> Tunnel {
    let mut client_port = ephemeral_port(ctx);
    if client_port == signal.client_port {
        client_port = client_port.wrapping_add(1).max(1024);
    }
    Tunnel {
        client_port,
        ..*signal
    }
}

/// One record with random header values
pub fn random_record(tunnel: &Tunnel, window: u64, ctx: &mut EncodeContext) -> Result<Frame> {
    let payload_len = ctx.gen_range(8..64usize);
    let fields = RecordFields {
        identification: ctx.gen_u16(),
        flow_label: ctx.gen_range(0..=FLOW_LABEL_MAX),
        ts_value: ctx.gen_u32(),
        ts_echo: ctx.gen_u32(),
        seq: ctx.gen_u32(),
        ack: ctx.gen_u32(),
        payload: ctx.random_bytes(payload_len),
    };
    let data = tunnel_frame(tunnel, fields)?;
    Ok(Frame::noise(ctx.timestamp_in_window(window), data))
}

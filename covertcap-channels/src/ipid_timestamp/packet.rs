//! Tunnelled TCP records carrying one masked byte each
//!
//! Layering of every record:
//!
//! ```text
//! Ethernet / 802.1Q / IPv4 (GRE) / GRE (0x86DD) / IPv6 / TCP [NOP NOP TS]
//! ```

use covertcap_core::{ChannelDescriptor, Error, MacAddr, Result, SignalPattern};
use covertcap_packet::vlan::{VLAN_MAX_ID, VLAN_MIN_ID};
use covertcap_packet::{Dissection, PacketBuilder, TcpFlags, TcpOption};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// VLAN of the signal tunnel
pub const DEFAULT_VLAN: u16 = 133;

/// VLAN and ports of the decoy tunnel
pub const DECOY_VLAN: u16 = 134;
pub const DECOY_CLIENT_PORT: u16 = 40134;
pub const DECOY_SERVER_PORT: u16 = 8443;

/// Bits of the flow label holding the byte index
pub const INDEX_MASK: u32 = 0x0FFF;

/// Longest message the 12-bit index can address
pub const MAX_MESSAGE_LEN: usize = INDEX_MASK as usize + 1;

/// Keystream byte derived from the transport ports
pub fn xor_key(client_port: u16, server_port: u16) -> u8 {
    ((client_port ^ server_port) & 0xFF) as u8
}

/// Mask or unmask the byte at `index`; the operation is its own inverse
pub fn mask_byte(byte: u8, key: u8, index: usize) -> u8 {
    byte ^ key ^ (index & 0xFF) as u8
}

/// Values one record carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TunnelRecord {
    pub index: u16,
    pub ip_id_low: u8,
    pub ts_low: u8,
}

impl TunnelRecord {
    /// Masked byte split across the two fields
    pub fn ciphertext(&self) -> u8 {
        self.ip_id_low ^ self.ts_low
    }
}

/// Addressing of one GRE tunnel flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tunnel {
    pub vlan_id: u16,
    pub client_mac: MacAddr,
    pub server_mac: MacAddr,
    pub outer_client: Ipv4Addr,
    pub outer_server: Ipv4Addr,
    pub inner_client: Ipv6Addr,
    pub inner_server: Ipv6Addr,
    pub client_port: u16,
    pub server_port: u16,
}

impl Tunnel {
    /// Tunnel addressing from a descriptor with a [`SignalPattern::Tunnel`]
    /// and IPv6 endpoints
    pub fn from_descriptor(descriptor: &ChannelDescriptor) -> Result<Self> {
        let (outer_client, outer_server, vlan_id) = match descriptor.pattern {
            SignalPattern::Tunnel {
                outer_client,
                outer_server,
                vlan_id,
            } => (outer_client, outer_server, vlan_id),
            ref other => {
                return Err(Error::invalid_parameter(
                    "pattern".to_string(),
                    format!("IP-ID channel needs a tunnel pattern, got {}", other),
                ))
            }
        };

        if !(VLAN_MIN_ID..=VLAN_MAX_ID).contains(&vlan_id) {
            return Err(Error::invalid_parameter(
                "vlan_id".to_string(),
                format!("{} is outside {}..={}", vlan_id, VLAN_MIN_ID, VLAN_MAX_ID),
            ));
        }

        let (inner_client, inner_server) = match (descriptor.client.ip, descriptor.server.ip) {
            (IpAddr::V6(c), IpAddr::V6(s)) => (c, s),
            _ => {
                return Err(Error::invalid_parameter(
                    "endpoints",
                    "tunnelled endpoints must be IPv6 addresses",
                ))
            }
        };

        Ok(Self {
            vlan_id,
            client_mac: descriptor.client.mac,
            server_mac: descriptor.server.mac,
            outer_client,
            outer_server,
            inner_client,
            inner_server,
            client_port: descriptor.client.port,
            server_port: descriptor.server.port,
        })
    }

    /// True when a dissected frame travelled through this tunnel on its
    /// exact client-to-server flow
    pub fn carries(&self, d: &Dissection) -> bool {
        if d.vlan_id != Some(self.vlan_id) || !d.tunneled {
            return false;
        }
        let (outer, inner) = match (d.outer, d.inner_ipv6) {
            (Some(outer), Some(inner)) => (outer, inner),
            _ => return false,
        };

        outer.source == self.outer_client
            && outer.destination == self.outer_server
            && inner.source == self.inner_client
            && inner.destination == self.inner_server
            && d.ports() == Some((self.client_port, self.server_port))
    }
}

/// Header values of one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFields {
    pub identification: u16,
    pub flow_label: u32,
    pub ts_value: u32,
    pub ts_echo: u32,
    pub seq: u32,
    pub ack: u32,
    pub payload: Vec<u8>,
}

/// Build one client-to-server record frame through `tunnel`
pub fn tunnel_frame(tunnel: &Tunnel, fields: RecordFields) -> Result<Vec<u8>> {
    PacketBuilder::new()
        .ethernet(tunnel.client_mac, tunnel.server_mac)
        .vlan(tunnel.vlan_id)
        .ipv4(tunnel.outer_client, tunnel.outer_server)
        .identification(fields.identification)
        .gre_ipv6(tunnel.inner_client, tunnel.inner_server)
        .flow_label(fields.flow_label)
        .tcp(
            tunnel.client_port,
            tunnel.server_port,
            fields.seq,
            fields.ack,
            TcpFlags::PSH_ACK,
        )
        .tcp_options(vec![
            TcpOption::Nop,
            TcpOption::Nop,
            TcpOption::Timestamp {
                value: fields.ts_value,
                echo: fields.ts_echo,
            },
        ])
        .payload(fields.payload)
        .build()
}

/// The record carried by a frame, if it belongs to `tunnel`
pub fn extract_record(frame: &[u8], tunnel: &Tunnel) -> Option<TunnelRecord> {
    let d = Dissection::from_frame(frame)?;
    if !tunnel.carries(&d) {
        return None;
    }

    let (ts_value, _) = d.tcp()?.timestamp()?;
    let outer = d.outer?;
    let inner = d.inner_ipv6?;

    Some(TunnelRecord {
        index: (inner.flow_label & INDEX_MASK) as u16,
        ip_id_low: (outer.identification & 0xFF) as u8,
        ts_low: (ts_value & 0xFF) as u8,
    })
}

//! Packet builder for constructing frames with a fluent API
//!
//! This module provides a high-level builder interface for constructing
//! complete frames: Ethernet, an optional 802.1Q tag, IPv4 or IPv6, an
//! optional GRE tunnel carrying IPv6, and UDP or TCP. EtherTypes, protocol
//! numbers, lengths and checksums are derived from the configured layers.

use crate::ethernet::{EtherType, EthernetFrame};
use crate::gre::GrePacket;
use crate::ip::{IpProtocol, Ipv4Packet};
use crate::ipv6::Ipv6Packet;
use crate::tcp::{TcpFlags, TcpOption, TcpPort, TcpSegment};
use crate::udp::{UdpDatagram, UdpPort};
use crate::vlan::{VlanFrame, VlanTag};
use covertcap_core::{Error, MacAddr, Result};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

const PROTO_TCP: u8 = 6;
const PROTO_UDP: u8 = 17;

#[derive(Debug, Clone, Copy)]
struct Layer2 {
    src: MacAddr,
    dst: MacAddr,
}

#[derive(Debug, Clone, Copy)]
struct Ipv6Params {
    src: Ipv6Addr,
    dst: Ipv6Addr,
    hop_limit: u8,
    flow_label: u32,
}

impl Ipv6Params {
    fn new(src: Ipv6Addr, dst: Ipv6Addr) -> Self {
        Self {
            src,
            dst,
            hop_limit: 64,
            flow_label: 0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Layer3 {
    Ipv4 {
        src: Ipv4Addr,
        dst: Ipv4Addr,
        ttl: u8,
        identification: u16,
    },
    Ipv6(Ipv6Params),
}

#[derive(Debug, Clone)]
enum Layer4 {
    Udp {
        src_port: u16,
        dst_port: u16,
    },
    Tcp {
        src_port: u16,
        dst_port: u16,
        seq: u32,
        ack: u32,
        flags: TcpFlags,
        window: u16,
        options: Vec<TcpOption>,
    },
}

/// Packet builder with fluent API for constructing frames
///
/// # Examples
///
/// ```
/// use std::net::Ipv4Addr;
/// use covertcap_core::MacAddr;
/// use covertcap_packet::PacketBuilder;
///
/// let frame = PacketBuilder::new()
///     .ethernet(MacAddr([0x02, 0, 0, 0, 0, 1]), MacAddr([0x02, 0, 0, 0, 0, 2]))
///     .ipv4(Ipv4Addr::new(10, 0, 5, 42), Ipv4Addr::new(10, 0, 5, 53))
///     .udp(54321, 53)
///     .payload(vec![0x12, 0x34])
///     .build()
///     .unwrap();
/// assert_eq!(frame.len(), 60);
/// ```
#[derive(Debug, Clone, Default)]
pub struct PacketBuilder {
    layer2: Option<Layer2>,
    vlan: Option<u16>,
    layer3: Option<Layer3>,
    tunnel: Option<Ipv6Params>,
    layer4: Option<Layer4>,
    payload: Vec<u8>,
}

impl PacketBuilder {
    /// Create a new packet builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an Ethernet layer
    pub fn ethernet(mut self, src: MacAddr, dst: MacAddr) -> Self {
        self.layer2 = Some(Layer2 { src, dst });
        self
    }

    /// Tag the frame with an 802.1Q VLAN ID (validated at build time)
    pub fn vlan(mut self, vlan_id: u16) -> Self {
        self.vlan = Some(vlan_id);
        self
    }

    /// Add an IPv4 layer
    pub fn ipv4(mut self, src: Ipv4Addr, dst: Ipv4Addr) -> Self {
        self.layer3 = Some(Layer3::Ipv4 {
            src,
            dst,
            ttl: 64,
            identification: 0,
        });
        self
    }

    /// Add an IPv6 layer
    pub fn ipv6(mut self, src: Ipv6Addr, dst: Ipv6Addr) -> Self {
        self.layer3 = Some(Layer3::Ipv6(Ipv6Params::new(src, dst)));
        self
    }

    /// Add an IPv4 or IPv6 layer depending on the address family
    ///
    /// Mixed families are a construction error at build time.
    pub fn ip(mut self, src: IpAddr, dst: IpAddr) -> Self {
        match (src, dst) {
            (IpAddr::V4(s), IpAddr::V4(d)) => self.ipv4(s, d),
            (IpAddr::V6(s), IpAddr::V6(d)) => self.ipv6(s, d),
            _ => {
                self.layer3 = None;
                self
            }
        }
    }

    /// Tunnel an inner IPv6 packet through GRE inside the outer IPv4 layer
    pub fn gre_ipv6(mut self, src: Ipv6Addr, dst: Ipv6Addr) -> Self {
        self.tunnel = Some(Ipv6Params::new(src, dst));
        self
    }

    /// Set the TTL for the outer IPv4 layer
    pub fn ttl(mut self, new_ttl: u8) -> Self {
        if let Some(Layer3::Ipv4 { ref mut ttl, .. }) = self.layer3 {
            *ttl = new_ttl;
        }
        self
    }

    /// Set the identification for the outer IPv4 layer
    pub fn identification(mut self, id: u16) -> Self {
        if let Some(Layer3::Ipv4 {
            ref mut identification,
            ..
        }) = self.layer3
        {
            *identification = id;
        }
        self
    }

    /// Set the flow label of the innermost IPv6 layer
    pub fn flow_label(mut self, label: u32) -> Self {
        if let Some(params) = self.innermost_ipv6() {
            params.flow_label = label;
        }
        self
    }

    /// Set the hop limit of the innermost IPv6 layer
    pub fn hop_limit(mut self, limit: u8) -> Self {
        if let Some(params) = self.innermost_ipv6() {
            params.hop_limit = limit;
        }
        self
    }

    fn innermost_ipv6(&mut self) -> Option<&mut Ipv6Params> {
        match (&mut self.tunnel, &mut self.layer3) {
            (Some(inner), _) => Some(inner),
            (None, Some(Layer3::Ipv6(params))) => Some(params),
            _ => None,
        }
    }

    /// Add a UDP layer
    pub fn udp(mut self, src_port: u16, dst_port: u16) -> Self {
        self.layer4 = Some(Layer4::Udp { src_port, dst_port });
        self
    }

    /// Add a TCP layer with no options and a 64240 window
    pub fn tcp(mut self, src_port: u16, dst_port: u16, seq: u32, ack: u32, flags: TcpFlags) -> Self {
        self.layer4 = Some(Layer4::Tcp {
            src_port,
            dst_port,
            seq,
            ack,
            flags,
            window: 64240,
            options: Vec::new(),
        });
        self
    }

    /// Set the TCP window size
    pub fn window(mut self, new_window: u16) -> Self {
        if let Some(Layer4::Tcp { ref mut window, .. }) = self.layer4 {
            *window = new_window;
        }
        self
    }

    /// Set the TCP options
    pub fn tcp_options(mut self, new_options: Vec<TcpOption>) -> Self {
        if let Some(Layer4::Tcp { ref mut options, .. }) = self.layer4 {
            *options = new_options;
        }
        self
    }

    /// Set the payload data
    pub fn payload(mut self, data: Vec<u8>) -> Self {
        self.payload = data;
        self
    }

    /// Build the complete frame
    ///
    /// # Errors
    ///
    /// Returns an error if the layer configuration is invalid (Layer 4
    /// without Layer 3, a tunnel without outer IPv4, no Layer 2) or a layer
    /// rejects its contents.
    pub fn build(self) -> Result<Vec<u8>> {
        let layer2 = self
            .layer2
            .ok_or_else(|| Error::construction("Layer 2 is required"))?;
        let layer3 = self.layer3.ok_or_else(|| {
            Error::construction("Layer 3 is required (or address families were mixed)")
        })?;

        // Addresses the transport checksum is computed against
        let (net_src, net_dst): (IpAddr, IpAddr) = match (self.tunnel, layer3) {
            (Some(inner), Layer3::Ipv4 { .. }) => (inner.src.into(), inner.dst.into()),
            (Some(_), Layer3::Ipv6(_)) => {
                return Err(Error::construction("GRE tunnel requires an outer IPv4 layer"))
            }
            (None, Layer3::Ipv4 { src, dst, .. }) => (src.into(), dst.into()),
            (None, Layer3::Ipv6(p)) => (p.src.into(), p.dst.into()),
        };

        let (mut packet_data, transport_proto) = match self.layer4 {
            Some(Layer4::Udp { src_port, dst_port }) => {
                let udp = UdpDatagram::new(UdpPort::new(src_port), UdpPort::new(dst_port), self.payload);
                (udp.to_bytes(net_src, net_dst)?, PROTO_UDP)
            }
            Some(Layer4::Tcp {
                src_port,
                dst_port,
                seq,
                ack,
                flags,
                window,
                options,
            }) => {
                let tcp = TcpSegment::new(
                    TcpPort::new(src_port),
                    TcpPort::new(dst_port),
                    seq,
                    ack,
                    flags,
                    window,
                    self.payload,
                )
                .with_options(options);
                (tcp.to_bytes(net_src, net_dst)?, PROTO_TCP)
            }
            None => (self.payload, 0),
        };

        if let Some(inner) = self.tunnel {
            let ipv6 = Ipv6Packet::new(inner.src, inner.dst, transport_proto, packet_data)
                .with_flow_label(inner.flow_label)
                .with_hop_limit(inner.hop_limit);
            packet_data = GrePacket::new(EtherType::IPv6.to_u16(), ipv6.to_bytes()?).to_bytes();
        }

        let ethertype = match layer3 {
            Layer3::Ipv4 {
                src,
                dst,
                ttl,
                identification,
            } => {
                let protocol = if self.tunnel.is_some() {
                    IpProtocol::GRE
                } else {
                    IpProtocol::from_u8(transport_proto)
                };
                packet_data = Ipv4Packet::new(src, dst, protocol, packet_data)
                    .with_ttl(ttl)
                    .with_identification(identification)
                    .to_bytes()?;
                EtherType::IPv4
            }
            Layer3::Ipv6(p) => {
                packet_data = Ipv6Packet::new(p.src, p.dst, transport_proto, packet_data)
                    .with_flow_label(p.flow_label)
                    .with_hop_limit(p.hop_limit)
                    .to_bytes()?;
                EtherType::IPv6
            }
        };

        let frame = match self.vlan {
            Some(vlan_id) => {
                let tagged = VlanFrame::new(VlanTag::new(vlan_id)?, ethertype, packet_data);
                EthernetFrame::new(layer2.dst, layer2.src, EtherType::VLAN, tagged.to_bytes())
            }
            None => EthernetFrame::new(layer2.dst, layer2.src, ethertype, packet_data),
        };

        Ok(frame.to_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SRC_MAC: MacAddr = MacAddr([0x02, 0x42, 0xac, 0x11, 0x00, 0x10]);
    const DST_MAC: MacAddr = MacAddr([0x02, 0x42, 0xac, 0x11, 0x00, 0x11]);

    fn v6(s: &str) -> Ipv6Addr {
        s.parse().unwrap()
    }

    #[test]
    fn test_builder_ethernet_ip_udp() {
        let src_ip = Ipv4Addr::new(10, 0, 5, 42);
        let dst_ip = Ipv4Addr::new(10, 0, 5, 53);

        let packet = PacketBuilder::new()
            .ethernet(SRC_MAC, DST_MAC)
            .ipv4(src_ip, dst_ip)
            .identification(1000)
            .udp(54321, 53)
            .payload(vec![0x01, 0x02, 0x03, 0x04])
            .build()
            .unwrap();

        let frame = EthernetFrame::from_bytes(&packet).unwrap();
        assert_eq!(frame.source, SRC_MAC);
        assert_eq!(frame.ethertype, EtherType::IPv4);

        let ip = Ipv4Packet::from_bytes(&frame.payload).unwrap();
        assert_eq!(ip.source, src_ip);
        assert_eq!(ip.identification, 1000);
        assert_eq!(ip.protocol, IpProtocol::UDP);

        let udp = UdpDatagram::from_bytes(&ip.payload).unwrap();
        assert_eq!(udp.destination_port, UdpPort::DNS);
        assert_eq!(udp.payload, vec![0x01, 0x02, 0x03, 0x04]);
        assert!(udp.verify_checksum(src_ip.into(), dst_ip.into()));
    }

    #[test]
    fn test_builder_ethernet_ip_tcp() {
        let packet = PacketBuilder::new()
            .ethernet(SRC_MAC, DST_MAC)
            .ipv4(Ipv4Addr::new(10, 13, 37, 10), Ipv4Addr::new(10, 13, 37, 80))
            .ttl(128)
            .tcp(51022, 80, 1000, 2000, TcpFlags::SYN)
            .build()
            .unwrap();

        let frame = EthernetFrame::from_bytes(&packet).unwrap();
        let ip = Ipv4Packet::from_bytes(&frame.payload).unwrap();
        assert_eq!(ip.ttl, 128);
        assert_eq!(ip.protocol, IpProtocol::TCP);

        let tcp = TcpSegment::from_bytes(&ip.payload).unwrap();
        assert_eq!(tcp.source_port.0, 51022);
        assert_eq!(tcp.window_size, 64240);
        assert!(tcp.flags.syn);
        assert!(tcp.payload.is_empty());
    }

    #[test]
    fn test_builder_vlan_gre_ipv6_tcp() {
        let packet = PacketBuilder::new()
            .ethernet(SRC_MAC, DST_MAC)
            .vlan(133)
            .ipv4(Ipv4Addr::new(172, 16, 133, 10), Ipv4Addr::new(172, 16, 133, 1))
            .identification(0xBEEF)
            .gre_ipv6(v6("fd00:133::10"), v6("fd00:133::1"))
            .flow_label(0x5_0007)
            .tcp(40133, 443, 1, 0, TcpFlags::PSH_ACK)
            .tcp_options(vec![
                TcpOption::Nop,
                TcpOption::Nop,
                TcpOption::Timestamp { value: 77, echo: 0 },
            ])
            .build()
            .unwrap();

        let frame = EthernetFrame::from_bytes(&packet).unwrap();
        assert_eq!(frame.ethertype, EtherType::VLAN);

        let tagged = VlanFrame::from_bytes(&frame.payload).unwrap();
        assert_eq!(tagged.tag.vlan_id, 133);
        assert_eq!(tagged.ethertype, EtherType::IPv4);

        let outer = Ipv4Packet::from_bytes(&tagged.payload).unwrap();
        assert_eq!(outer.protocol, IpProtocol::GRE);
        assert_eq!(outer.identification, 0xBEEF);

        let gre = GrePacket::from_bytes(&outer.payload).unwrap();
        assert_eq!(gre.protocol_type, 0x86DD);

        let inner = Ipv6Packet::from_bytes(&gre.payload).unwrap();
        assert_eq!(inner.flow_label, 0x5_0007);
        assert_eq!(inner.next_header, 6);

        let tcp = TcpSegment::from_bytes(&inner.payload).unwrap();
        assert_eq!(tcp.timestamp(), Some((77, 0)));
        let expected = tcp
            .calculate_checksum(inner.source.into(), inner.destination.into())
            .unwrap();
        assert_eq!(tcp.checksum, expected);
    }

    #[test]
    fn test_builder_plain_ipv6_udp() {
        let packet = PacketBuilder::new()
            .ethernet(SRC_MAC, DST_MAC)
            .ip(v6("fd00::1").into(), v6("fd00::2").into())
            .flow_label(42)
            .udp(1, 2)
            .payload(vec![1])
            .build()
            .unwrap();

        let frame = EthernetFrame::from_bytes(&packet).unwrap();
        assert_eq!(frame.ethertype, EtherType::IPv6);
        let ip = Ipv6Packet::from_bytes(&frame.payload).unwrap();
        assert_eq!(ip.flow_label, 42);
        assert_eq!(ip.next_header, 17);
    }

    #[test]
    fn test_builder_errors() {
        assert!(PacketBuilder::new().payload(vec![0x01, 0x02]).build().is_err());

        let no_l3 = PacketBuilder::new().ethernet(SRC_MAC, DST_MAC).udp(1, 53).build();
        assert!(matches!(no_l3, Err(Error::PacketConstruction(_))));

        let mixed = PacketBuilder::new()
            .ethernet(SRC_MAC, DST_MAC)
            .ip(Ipv4Addr::LOCALHOST.into(), Ipv6Addr::LOCALHOST.into())
            .udp(1, 2)
            .build();
        assert!(mixed.is_err());

        let bad_vlan = PacketBuilder::new()
            .ethernet(SRC_MAC, DST_MAC)
            .vlan(4095)
            .ipv4(Ipv4Addr::LOCALHOST, Ipv4Addr::LOCALHOST)
            .udp(1, 2)
            .build();
        assert!(matches!(bad_vlan, Err(Error::InvalidParameter { .. })));

        let tunnel_over_v6 = PacketBuilder::new()
            .ethernet(SRC_MAC, DST_MAC)
            .ipv6(v6("::1"), v6("::2"))
            .gre_ipv6(v6("::3"), v6("::4"))
            .udp(1, 2)
            .build();
        assert!(tunnel_over_v6.is_err());
    }
}

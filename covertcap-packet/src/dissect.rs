//! Layered frame dissection
//!
//! Peels a captured frame layer by layer:
//!
//! ```text
//! Ethernet -> [802.1Q] -> IPv4 -> UDP | TCP | GRE -> IPv6 -> UDP | TCP
//!                      -> IPv6 -> UDP | TCP
//! ```
//!
//! Every step returns `None` when the bytes are not the expected protocol,
//! so a mixed capture can be filtered without error handling.

use crate::ethernet::{EtherType, EthernetFrame};
use crate::gre::GrePacket;
use crate::ip::{IpProtocol, Ipv4Packet};
use crate::ipv6::Ipv6Packet;
use crate::tcp::TcpSegment;
use crate::udp::UdpDatagram;
use crate::vlan::VlanFrame;
use covertcap_core::MacAddr;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// IPv4 header fields kept after dissection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4Info {
    pub source: Ipv4Addr,
    pub destination: Ipv4Addr,
    pub identification: u16,
    pub ttl: u8,
    pub protocol: IpProtocol,
}

impl From<&Ipv4Packet> for Ipv4Info {
    fn from(ip: &Ipv4Packet) -> Self {
        Self {
            source: ip.source,
            destination: ip.destination,
            identification: ip.identification,
            ttl: ip.ttl,
            protocol: ip.protocol,
        }
    }
}

/// IPv6 header fields kept after dissection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv6Info {
    pub source: Ipv6Addr,
    pub destination: Ipv6Addr,
    pub flow_label: u32,
    pub next_header: u8,
}

impl From<&Ipv6Packet> for Ipv6Info {
    fn from(ip: &Ipv6Packet) -> Self {
        Self {
            source: ip.source,
            destination: ip.destination,
            flow_label: ip.flow_label,
            next_header: ip.next_header,
        }
    }
}

/// Innermost transport layer
#[derive(Debug, Clone)]
pub enum Transport {
    Udp(UdpDatagram),
    Tcp(TcpSegment),
    /// Any other protocol, with its raw payload
    Other { protocol: u8, payload: Vec<u8> },
}

/// A frame split into its layers
#[derive(Debug, Clone)]
pub struct Dissection {
    pub source_mac: MacAddr,
    pub destination_mac: MacAddr,
    pub vlan_id: Option<u16>,
    /// The IPv4 header, outer when a GRE tunnel is present
    pub outer: Option<Ipv4Info>,
    /// An IPv6 header: the tunnelled one, or the only network layer
    pub inner_ipv6: Option<Ipv6Info>,
    /// True when the IPv6 layer arrived through GRE
    pub tunneled: bool,
    pub transport: Transport,
}

impl Dissection {
    /// Dissect a raw Ethernet frame
    pub fn from_frame(data: &[u8]) -> Option<Self> {
        let eth = EthernetFrame::from_bytes(data)?;

        let (vlan_id, ethertype, payload) = match eth.ethertype {
            EtherType::VLAN => {
                let tagged = VlanFrame::from_bytes(&eth.payload)?;
                (Some(tagged.tag.vlan_id), tagged.ethertype, tagged.payload)
            }
            other => (None, other, eth.payload),
        };

        let mut dissection = Dissection {
            source_mac: eth.source,
            destination_mac: eth.destination,
            vlan_id,
            outer: None,
            inner_ipv6: None,
            tunneled: false,
            transport: Transport::Other {
                protocol: 0,
                payload: Vec::new(),
            },
        };

        match ethertype {
            EtherType::IPv4 => {
                let ip = Ipv4Packet::from_bytes(&payload)?;
                dissection.outer = Some(Ipv4Info::from(&ip));

                if ip.protocol == IpProtocol::GRE {
                    let gre = GrePacket::from_bytes(&ip.payload)?;
                    if gre.protocol_type != EtherType::IPv6.to_u16() {
                        return None;
                    }
                    let inner = Ipv6Packet::from_bytes(&gre.payload)?;
                    dissection.inner_ipv6 = Some(Ipv6Info::from(&inner));
                    dissection.tunneled = true;
                    dissection.transport = transport(inner.next_header, inner.payload)?;
                } else {
                    dissection.transport = transport(ip.protocol.to_u8(), ip.payload)?;
                }
            }
            EtherType::IPv6 => {
                let ip = Ipv6Packet::from_bytes(&payload)?;
                dissection.inner_ipv6 = Some(Ipv6Info::from(&ip));
                dissection.transport = transport(ip.next_header, ip.payload)?;
            }
            _ => return None,
        }

        Some(dissection)
    }

    /// Source and destination of the innermost network layer
    pub fn network(&self) -> Option<(IpAddr, IpAddr)> {
        match (self.inner_ipv6, self.outer) {
            (Some(v6), _) => Some((v6.source.into(), v6.destination.into())),
            (None, Some(v4)) => Some((v4.source.into(), v4.destination.into())),
            (None, None) => None,
        }
    }

    /// Source and destination ports for UDP or TCP
    pub fn ports(&self) -> Option<(u16, u16)> {
        match &self.transport {
            Transport::Udp(udp) => Some((udp.source_port.0, udp.destination_port.0)),
            Transport::Tcp(tcp) => Some((tcp.source_port.0, tcp.destination_port.0)),
            Transport::Other { .. } => None,
        }
    }

    pub fn udp(&self) -> Option<&UdpDatagram> {
        match &self.transport {
            Transport::Udp(udp) => Some(udp),
            _ => None,
        }
    }

    pub fn tcp(&self) -> Option<&TcpSegment> {
        match &self.transport {
            Transport::Tcp(tcp) => Some(tcp),
            _ => None,
        }
    }

    /// Application payload of the innermost transport
    pub fn payload(&self) -> &[u8] {
        match &self.transport {
            Transport::Udp(udp) => &udp.payload,
            Transport::Tcp(tcp) => &tcp.payload,
            Transport::Other { payload, .. } => payload,
        }
    }
}

fn transport(protocol: u8, payload: Vec<u8>) -> Option<Transport> {
    Some(match protocol {
        6 => Transport::Tcp(TcpSegment::from_bytes(&payload)?),
        17 => Transport::Udp(UdpDatagram::from_bytes(&payload)?),
        protocol => Transport::Other { protocol, payload },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::PacketBuilder;
    use crate::tcp::{TcpFlags, TcpOption};

    const A: MacAddr = MacAddr([0x02, 0, 0, 0, 0, 0x0A]);
    const B: MacAddr = MacAddr([0x02, 0, 0, 0, 0, 0x0B]);

    #[test]
    fn test_dissect_udp() {
        let frame = PacketBuilder::new()
            .ethernet(A, B)
            .ipv4(Ipv4Addr::new(10, 0, 5, 42), Ipv4Addr::new(10, 0, 5, 53))
            .udp(54321, 53)
            .payload(b"query".to_vec())
            .build()
            .unwrap();

        let d = Dissection::from_frame(&frame).unwrap();
        assert_eq!(d.source_mac, A);
        assert_eq!(d.vlan_id, None);
        assert_eq!(
            d.network(),
            Some((Ipv4Addr::new(10, 0, 5, 42).into(), Ipv4Addr::new(10, 0, 5, 53).into()))
        );
        assert_eq!(d.ports(), Some((54321, 53)));
        assert!(d.udp().is_some());
        assert_eq!(d.payload(), b"query");
    }

    #[test]
    fn test_dissect_tunnel() {
        let inner_src: Ipv6Addr = "fd00:133::10".parse().unwrap();
        let inner_dst: Ipv6Addr = "fd00:133::1".parse().unwrap();
        let frame = PacketBuilder::new()
            .ethernet(A, B)
            .vlan(133)
            .ipv4(Ipv4Addr::new(172, 16, 133, 10), Ipv4Addr::new(172, 16, 133, 1))
            .identification(0x1234)
            .gre_ipv6(inner_src, inner_dst)
            .flow_label(0xF_F005)
            .tcp(40133, 443, 10, 20, TcpFlags::PSH_ACK)
            .tcp_options(vec![TcpOption::Nop, TcpOption::Nop, TcpOption::Timestamp { value: 5, echo: 6 }])
            .build()
            .unwrap();

        let d = Dissection::from_frame(&frame).unwrap();
        assert_eq!(d.vlan_id, Some(133));
        assert!(d.tunneled);
        assert_eq!(d.outer.unwrap().identification, 0x1234);
        assert_eq!(d.outer.unwrap().protocol, IpProtocol::GRE);
        assert_eq!(d.inner_ipv6.unwrap().flow_label, 0xF_F005);
        assert_eq!(d.network(), Some((inner_src.into(), inner_dst.into())));
        assert_eq!(d.ports(), Some((40133, 443)));
        assert_eq!(d.tcp().unwrap().timestamp(), Some((5, 6)));
    }

    #[test]
    fn test_dissect_not_applicable() {
        assert!(Dissection::from_frame(&[0u8; 10]).is_none());

        // ARP
        let mut arp = vec![0u8; 60];
        arp[12] = 0x08;
        arp[13] = 0x06;
        assert!(Dissection::from_frame(&arp).is_none());

        // IPv4 ethertype with garbage behind it
        let mut junk = vec![0u8; 60];
        junk[12] = 0x08;
        junk[14] = 0x60;
        assert!(Dissection::from_frame(&junk).is_none());
    }

    #[test]
    fn test_dissect_other_protocol() {
        let frame = PacketBuilder::new()
            .ethernet(A, B)
            .ipv4(Ipv4Addr::new(1, 1, 1, 1), Ipv4Addr::new(2, 2, 2, 2))
            .payload(vec![8, 0, 0, 0])
            .build()
            .unwrap();

        let d = Dissection::from_frame(&frame).unwrap();
        assert!(matches!(d.transport, Transport::Other { protocol: 0, .. }));
        assert_eq!(d.ports(), None);
        assert_eq!(d.payload(), &[8, 0, 0, 0]);
    }
}

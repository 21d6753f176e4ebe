//! Example: Building a VLAN-tagged GRE tunnel frame
//!
//! Ethernet -> 802.1Q -> IPv4 -> GRE -> IPv6 -> TCP with a timestamp
//! option, the layering used by the IP-ID/timestamp channel.

use covertcap_core::MacAddr;
use covertcap_packet::{Dissection, PacketBuilder, TcpFlags, TcpOption};
use std::net::{Ipv4Addr, Ipv6Addr};

fn main() {
    let inner_src: Ipv6Addr = "fd00:133::10".parse().expect("valid IPv6");
    let inner_dst: Ipv6Addr = "fd00:133::1".parse().expect("valid IPv6");

    let frame = PacketBuilder::new()
        .ethernet(MacAddr([0x02, 0x42, 0xac, 0x11, 0x00, 0x10]), MacAddr([0x02, 0x42, 0xac, 0x11, 0x00, 0x11]))
        .vlan(133)
        .ipv4(Ipv4Addr::new(172, 16, 133, 10), Ipv4Addr::new(172, 16, 133, 1))
        .identification(0x4C2A)
        .gre_ipv6(inner_src, inner_dst)
        .flow_label(0x3_A000)
        .tcp(40133, 443, 1, 1, TcpFlags::PSH_ACK)
        .tcp_options(vec![
            TcpOption::Nop,
            TcpOption::Nop,
            TcpOption::Timestamp {
                value: 0x0001_0066,
                echo: 0,
            },
        ])
        .build()
        .expect("Failed to build tunnel frame");

    println!("Tunnel frame built: {} bytes", frame.len());

    let d = Dissection::from_frame(&frame).expect("frame dissects");
    println!("VLAN: {:?}", d.vlan_id);
    println!("Outer IPv4: {:?}", d.outer);
    println!("Inner IPv6: {:?}", d.inner_ipv6);
    println!("TCP timestamp: {:?}", d.tcp().and_then(|t| t.timestamp()));
}

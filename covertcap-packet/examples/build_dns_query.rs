//! Example: Building a DNS query frame
//!
//! Builds an Ethernet/IPv4/UDP frame carrying a DNS `A` query and prints
//! the offsets a dissector would read.

use covertcap_core::MacAddr;
use covertcap_packet::{DnsQuery, Dissection, PacketBuilder};
use std::net::Ipv4Addr;

fn main() {
    let src_mac: MacAddr = "02:42:ac:11:00:10".parse().expect("valid MAC");
    let dst_mac: MacAddr = "02:42:ac:11:00:11".parse().expect("valid MAC");

    let query = DnsQuery::new(0x1234, "S0VZOmRlbW.blueprint.example.org")
        .to_bytes()
        .expect("Failed to encode DNS query");

    let frame = PacketBuilder::new()
        .ethernet(src_mac, dst_mac)
        .ipv4(Ipv4Addr::new(10, 0, 5, 42), Ipv4Addr::new(10, 0, 5, 53))
        .identification(1000)
        .udp(54321, 53)
        .payload(query)
        .build()
        .expect("Failed to build DNS frame");

    println!("DNS frame built: {} bytes", frame.len());
    println!("Ethernet header: {:02X?}", &frame[..14]);

    let dissection = Dissection::from_frame(&frame).expect("frame dissects");
    let parsed = DnsQuery::from_bytes(dissection.payload()).expect("DNS parses");
    println!("Ports: {:?}", dissection.ports());
    println!("QNAME: {}", parsed.qname);
    println!("First label: {}", parsed.first_label());
}

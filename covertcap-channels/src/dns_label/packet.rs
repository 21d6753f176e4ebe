//! DNS query frames carrying Base64 chunks in the leftmost label

use crate::chunking::is_base64url;
use covertcap_core::{ChannelDescriptor, Endpoint, Result};
use covertcap_packet::{Dissection, DnsQuery, PacketBuilder};

/// Default exfiltration suffix
pub const DEFAULT_SUFFIX: &str = "blueprint.professor.royalmint.local";

/// Label replacing the first suffix label in the decoy stream
pub const DECOY_LABEL: &str = "backup";

/// Label used by the pseudo-exfil cover queries
pub const DRAFT_LABEL: &str = "draft";

/// Base64 characters per query label
pub const CHUNK_SIZE: usize = 10;

/// IPv4 identification of the first signal query; later queries count up
pub const BASE_IDENT: u16 = 1000;

/// Gap between consecutive signal queries
pub const QUERY_SPACING_US: u64 = 200_000;

/// Random extra delay added to each query's slot
pub const QUERY_JITTER_US: u64 = 100_000;

/// Build one client-to-server DNS query frame
pub fn query_frame(
    client: &Endpoint,
    server: &Endpoint,
    qname: &str,
    transaction_id: u16,
    ident: u16,
    ttl: u8,
) -> Result<Vec<u8>> {
    let query = DnsQuery::new(transaction_id, qname).to_bytes()?;

    PacketBuilder::new()
        .ethernet(client.mac, server.mac)
        .ip(client.ip, server.ip)
        .ttl(ttl)
        .identification(ident)
        .udp(client.port, server.port)
        .payload(query)
        .build()
}

/// The suffix with its first label removed
///
/// `blueprint.professor.royalmint.local` gives `professor.royalmint.local`;
/// a single-label suffix is returned unchanged.
pub fn base_domain(suffix: &str) -> &str {
    suffix.split_once('.').map(|(_, rest)| rest).unwrap_or(suffix)
}

/// The chunk of a `<chunk>.<suffix>` name
///
/// The chunk must be a single label of URL-safe Base64 characters and is
/// returned with its case preserved. The suffix compares case-insensitively.
pub fn chunk_from_qname<'a>(qname: &'a str, suffix: &str) -> Option<&'a str> {
    let (chunk, rest) = qname.split_once('.')?;
    if !rest.eq_ignore_ascii_case(suffix) || !is_base64url(chunk) {
        return None;
    }
    Some(chunk)
}

/// The chunk carried by a frame, if it is a query on the signal flow
pub fn extract_chunk(frame: &[u8], descriptor: &ChannelDescriptor, suffix: &str) -> Option<String> {
    let dissection = Dissection::from_frame(frame)?;
    dissection.udp()?;

    let (src, dst) = dissection.network()?;
    let (sport, dport) = dissection.ports()?;
    if !descriptor.matches_flow(src, dst, sport, dport) {
        return None;
    }

    let query = DnsQuery::from_bytes(dissection.payload())?;
    if query.is_response() {
        return None;
    }

    chunk_from_qname(&query.qname, suffix).map(str::to_string)
}

//! Cover traffic for the DNS label channel
//!
//! Three populations, all sharing the capture window with the signal:
//!
//! - ordinary queries for corporate names between random internal hosts,
//!   30% of them under a random subdomain
//! - pseudo-exfil queries for `<random>.draft.<base domain>` sent to the
//!   signal's resolver from random clients
//! - a keep-alive HTTP beacon flow from the signal client to a web host on
//!   its own subnet

use super::channel::DnsLabelChannel;
use super::packet::{base_domain, query_frame, DRAFT_LABEL};
use crate::flow::TcpConversation;
use crate::hosts::{ephemeral_port, noise_window, random_ipv4, sibling_host};
use covertcap_core::{CovertChannel, EncodeContext, Endpoint, Frame, FrameKind, Result};
use covertcap_packet::HttpRequest;
use tracing::debug;

/// Minimum window cover traffic is spread over
pub const NOISE_WINDOW_US: u64 = 3_000_000;

/// Names queried by ordinary hosts
pub const LEGITIMATE_DOMAINS: &[&str] = &[
    "www.royalmint.local",
    "auth.royalmint.local",
    "cdn.royalmint.local",
    "cctv.royalmint.local",
    "vault.royalmint.local",
    "ops.professor.royalmint.local",
    "telemetry.professor.royalmint.local",
    "updates.tokyo.crew.local",
    "chat.nairobi.crew.local",
];

const SUBDOMAIN_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const DRAFT_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789-_";

const BEACON_HOST: &str = "cctv.royalmint.local";
const BEACON_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36";
const BEACON_RESPONSE: &[u8] = b"HTTP/1.1 204 No Content\r\nContent-Length: 0\r\n\r\n";
const BEACON_CLIENT_PORT: u16 = 49152;
const BEACON_SERVER_OCTET: u8 = 80;

/// Produce exactly `count` cover frames for `channel`
pub fn generate(channel: &DnsLabelChannel, count: usize, ctx: &mut EncodeContext) -> Result<Vec<Frame>> {
    let window = noise_window(ctx, NOISE_WINDOW_US);
    let drafts = count / 5;
    let beacon_budget = count / 10;

    let mut frames = Vec::with_capacity(count);
    frames.extend(beacon_flow(channel, beacon_budget, window, ctx)?);
    for _ in 0..drafts {
        frames.push(draft_query(channel, window, ctx)?);
    }
    while frames.len() < count {
        frames.push(background_query(channel, window, ctx)?);
    }

    debug!(
        channel = channel.shortname(),
        frames = frames.len(),
        drafts,
        "generated DNS cover traffic"
    );
    Ok(frames)
}

/// One ordinary query between two random internal hosts
pub fn background_query(channel: &DnsLabelChannel, window: u64, ctx: &mut EncodeContext) -> Result<Frame> {
    let descriptor = channel.descriptor();
    let mut domain = ctx.pick(LEGITIMATE_DOMAINS).to_string();
    if ctx.chance(0.3) {
        let len = ctx.gen_range(3..=8usize);
        domain = format!("{}.{}", ctx.random_string(SUBDOMAIN_ALPHABET, len), domain);
    }

    let client = Endpoint::new(
        descriptor.client.mac,
        random_ipv4(ctx, 10, 0, 0..10, 1..254),
        ephemeral_port(ctx),
    );
    let server = Endpoint::new(
        descriptor.server.mac,
        random_ipv4(ctx, 10, 0, 0..10, 1..254),
        descriptor.server.port,
    );

    let ttl = *ctx.pick(&[52u8, 64, 127]);
    let data = query_frame(&client, &server, &domain, ctx.gen_range(1..=u16::MAX), ctx.gen_u16(), ttl)?;
    Ok(Frame::noise(ctx.timestamp_in_window(window), data))
}

/// A lookalike exfil query under the `draft` label, sent to the real resolver
pub fn draft_query(channel: &DnsLabelChannel, window: u64, ctx: &mut EncodeContext) -> Result<Frame> {
    let descriptor = channel.descriptor();
    let len = ctx.gen_range(5..=12usize);
    let qname = format!(
        "{}.{}.{}",
        ctx.random_string(DRAFT_ALPHABET, len),
        DRAFT_LABEL,
        base_domain(channel.suffix())
    );

    let client = Endpoint::new(
        descriptor.client.mac,
        random_ipv4(ctx, 10, 0, 0..10, 1..254),
        ephemeral_port(ctx),
    );
    let data = query_frame(
        &client,
        &descriptor.server,
        &qname,
        ctx.gen_range(1..=u16::MAX),
        ctx.gen_u16(),
        64,
    )?;
    Ok(Frame::noise(ctx.timestamp_in_window(window), data))
}

/// Keep-alive beacons from the signal client, at most `budget` frames
///
/// A flow costs three handshake frames plus a request and a response per
/// beacon, so budgets under five frames produce nothing.
pub fn beacon_flow(
    channel: &DnsLabelChannel,
    budget: usize,
    window: u64,
    ctx: &mut EncodeContext,
) -> Result<Vec<Frame>> {
    if budget < 5 {
        return Ok(Vec::new());
    }

    let descriptor = channel.descriptor();
    let client = descriptor.client.with_port(BEACON_CLIENT_PORT);
    let server = Endpoint::new(
        descriptor.server.mac,
        sibling_host(descriptor.client.ip, BEACON_SERVER_OCTET),
        80,
    );

    let beacons = (budget - 3) / 2;
    let mut times: Vec<u64> = (0..beacons)
        .map(|_| ctx.timestamp_in_window(window) + 25_000)
        .collect();
    times.sort_unstable();

    let mut conv = TcpConversation::new(client, server, FrameKind::Noise, ctx);
    conv.handshake(times[0].saturating_sub(25_000), ctx)?;

    for (seq, t) in times.iter().enumerate() {
        let path = format!("/pixel.gif?cam=hall&seq={}&t={}", seq, t);
        let request = HttpRequest::get(path, BEACON_HOST, Some(BEACON_USER_AGENT));
        conv.client_send(*t, request.to_bytes(), ctx)?;
        conv.server_send(*t + 5_000, BEACON_RESPONSE.to_vec(), ctx)?;
    }

    Ok(conv.into_frames())
}

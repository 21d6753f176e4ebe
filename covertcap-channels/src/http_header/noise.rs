//! Cover traffic for the HTTP header channel
//!
//! Keep-alive flows from neighbouring hosts to the same web server take up
//! to half the budget; the rest is single requests between random hosts on
//! the 10.13.0.0/16 network.

use super::channel::HttpHeaderChannel;
use crate::flow::TcpConversation;
use crate::hosts::{ephemeral_port, noise_window, random_ipv4, sibling_host};
use covertcap_core::{CovertChannel, EncodeContext, Endpoint, Frame, FrameKind, Result};
use covertcap_packet::{HttpRequest, PacketBuilder, TcpFlags};
use tracing::debug;

/// Minimum window cover traffic is spread over
pub const NOISE_WINDOW_US: u64 = 2_400_000;

/// User agents of the neighbouring keep-alive clients
pub const NEIGHBOUR_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36",
];

/// User agents of the background requests
pub const BACKGROUND_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36",
];

const BACKGROUND_PATHS: &[&str] = &[
    "/",
    "/index.html",
    "/api/status",
    "/health",
    "/favicon.ico",
    "/static/style.css",
];

const NEIGHBOUR_FIRST_OCTET: u8 = 11;
const NEIGHBOUR_LAST_OCTET: u8 = 30;
const NEIGHBOUR_BASE_PORT: u16 = 51000;

/// Produce exactly `count` cover frames for `channel`
pub fn generate(channel: &HttpHeaderChannel, count: usize, ctx: &mut EncodeContext) -> Result<Vec<Frame>> {
    let window = noise_window(ctx, NOISE_WINDOW_US);
    let mut frames = Vec::with_capacity(count);

    let mut budget = count / 2;
    let mut flows = 0;
    for octet in NEIGHBOUR_FIRST_OCTET..=NEIGHBOUR_LAST_OCTET {
        // Handshake plus at least one exchange
        if budget < 5 {
            break;
        }
        let flow = neighbour_flow(channel, octet, budget, window, ctx)?;
        budget -= flow.len();
        frames.extend(flow);
        flows += 1;
    }

    while frames.len() < count {
        frames.push(background_request(channel, window, ctx)?);
    }

    debug!(
        channel = channel.shortname(),
        frames = frames.len(),
        flows,
        "generated HTTP cover traffic"
    );
    Ok(frames)
}

/// Keep-alive flow from host `octet` of the client subnet, at most `budget` frames
pub fn neighbour_flow(
    channel: &HttpHeaderChannel,
    octet: u8,
    budget: usize,
    window: u64,
    ctx: &mut EncodeContext,
) -> Result<Vec<Frame>> {
    let descriptor = channel.descriptor();
    let client = Endpoint::new(
        descriptor.client.mac,
        sibling_host(descriptor.client.ip, octet),
        NEIGHBOUR_BASE_PORT + octet as u16,
    );

    let wanted = ctx.gen_range(10..=30usize);
    let requests = wanted.min(budget.saturating_sub(3) / 2);
    let host = format!("server{}.internal.corp", ctx.gen_range(1..=4u8));
    let user_agent = *ctx.pick(NEIGHBOUR_USER_AGENTS);

    let mut conv = TcpConversation::new(client, descriptor.server, FrameKind::Noise, ctx);
    let mut t = conv.handshake(ctx.timestamp_in_window(window), ctx)?;
    for _ in 0..requests {
        t += ctx.gen_range(50_000..200_000u64);
        let path = format!("/api/data?id={}", ctx.gen_range(1000..10_000u16));
        let request = HttpRequest::get(path, &host, Some(user_agent));
        conv.client_send(t, request.to_bytes(), ctx)?;
        conv.server_send(t + 5_000, super::packet::ok_response(), ctx)?;
    }

    Ok(conv.into_frames())
}

/// One GET between two random hosts, no marker anywhere
pub fn background_request(
    channel: &HttpHeaderChannel,
    window: u64,
    ctx: &mut EncodeContext,
) -> Result<Frame> {
    let descriptor = channel.descriptor();
    let src = random_ipv4(ctx, 10, 13, 0..50, 2..254);
    let dst = random_ipv4(ctx, 10, 13, 0..50, 2..254);
    let dport = *ctx.pick(&[80u16, 8080, 443]);
    let ttl = *ctx.pick(&[52u8, 64, 127]);

    let host = format!("server{}.internal.corp", ctx.gen_range(1..=9u8));
    let path = *ctx.pick(BACKGROUND_PATHS);
    let user_agent = *ctx.pick(BACKGROUND_USER_AGENTS);
    let request = HttpRequest::get(path, &host, Some(user_agent));

    let sport = ephemeral_port(ctx);
    let data = PacketBuilder::new()
        .ethernet(descriptor.client.mac, descriptor.server.mac)
        .ipv4(src, dst)
        .ttl(ttl)
        .identification(ctx.gen_u16())
        .tcp(sport, dport, ctx.gen_u32(), 0, TcpFlags::PSH_ACK)
        .payload(request.to_bytes())
        .build()?;

    Ok(Frame::noise(ctx.timestamp_in_window(window), data))
}

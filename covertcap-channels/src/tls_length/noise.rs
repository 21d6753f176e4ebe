//! Cover traffic for the TLS length channel
//!
//! Whole TLS sessions from other clients on 10.20.1.0 through 10.20.10.0,
//! with record lengths drawn at random. Any leftover budget too small for a
//! session is spent on stray application-data segments.

use super::channel::TlsLengthChannel;
use super::packet::{filler_record, server_hello};
use crate::flow::TcpConversation;
use crate::hosts::{ephemeral_port, noise_window, random_ipv4};
use covertcap_core::{CovertChannel, EncodeContext, Endpoint, Frame, FrameKind, Result};
use covertcap_packet::{PacketBuilder, TcpFlags, TlsRecord};
use tracing::debug;

/// Minimum window cover traffic is spread over
pub const NOISE_WINDOW_US: u64 = 3_000_000;

// Handshake plus the hello exchange
const SESSION_SETUP_FRAMES: usize = 5;

/// Produce exactly `count` cover frames for `channel`
pub fn generate(channel: &TlsLengthChannel, count: usize, ctx: &mut EncodeContext) -> Result<Vec<Frame>> {
    let window = noise_window(ctx, NOISE_WINDOW_US);
    let mut frames = Vec::with_capacity(count);
    let mut sessions = 0usize;

    while count - frames.len() >= SESSION_SETUP_FRAMES + 2 {
        let remaining = count - frames.len();
        let exchanges = ctx
            .gen_range(1..=8usize)
            .min((remaining - SESSION_SETUP_FRAMES) / 2);
        frames.extend(session(channel, exchanges, window, ctx)?);
        sessions += 1;
    }
    while frames.len() < count {
        frames.push(stray_record(channel, window, ctx)?);
    }

    debug!(
        channel = channel.shortname(),
        frames = frames.len(),
        sessions,
        "generated TLS cover traffic"
    );
    Ok(frames)
}

/// A TLS session from a random client with `exchanges` request/response pairs
pub fn session(
    channel: &TlsLengthChannel,
    exchanges: usize,
    window: u64,
    ctx: &mut EncodeContext,
) -> Result<Vec<Frame>> {
    let descriptor = channel.descriptor();
    let client = Endpoint::new(
        descriptor.client.mac,
        random_ipv4(ctx, 10, 20, 1..11, 2..254),
        ephemeral_port(ctx),
    );

    let mut conv = TcpConversation::new(client, descriptor.server, FrameKind::Noise, ctx);
    let mut t = conv.handshake(ctx.timestamp_in_window(window), ctx)? + 10_000;

    let mut random = [0u8; 32];
    random.copy_from_slice(&ctx.random_bytes(32));
    conv.client_send(t, TlsRecord::client_hello(random).to_bytes()?, ctx)?;
    t += ctx.gen_range(5_000..20_000u64);
    let hello = server_hello(ctx);
    conv.server_send(t, hello.to_bytes()?, ctx)?;

    for _ in 0..exchanges {
        t += ctx.gen_range(30_000..200_000u64);
        let request = filler_record(ctx.gen_range(40..1400usize), ctx);
        conv.client_send(t, request.to_bytes()?, ctx)?;
        t += ctx.gen_range(3_000..15_000u64);
        let response = filler_record(ctx.gen_range(40..1400usize), ctx);
        conv.server_send(t, response.to_bytes()?, ctx)?;
    }

    Ok(conv.into_frames())
}

/// A lone application-data segment between two random hosts
pub fn stray_record(channel: &TlsLengthChannel, window: u64, ctx: &mut EncodeContext) -> Result<Frame> {
    let descriptor = channel.descriptor();
    let src = random_ipv4(ctx, 10, 20, 1..11, 2..254);
    let dst = random_ipv4(ctx, 10, 20, 0..1, 2..254);
    let record = filler_record(ctx.gen_range(40..1400usize), ctx);

    let data = PacketBuilder::new()
        .ethernet(descriptor.client.mac, descriptor.server.mac)
        .ipv4(src, dst)
        .identification(ctx.gen_u16())
        .tcp(ephemeral_port(ctx), 443, ctx.gen_u32(), ctx.gen_u32(), TcpFlags::PSH_ACK)
        .payload(record.to_bytes()?)
        .build()?;

    Ok(Frame::noise(ctx.timestamp_in_window(window), data))
}

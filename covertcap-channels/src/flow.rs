//! TCP conversations over IPv4
//!
//! Used wherever a channel needs an established connection around its
//! payloads: the HTTP and TLS signal flows and the keep-alive cover flows.

use covertcap_core::{EncodeContext, Endpoint, Frame, FrameKind, Result};
use covertcap_packet::{PacketBuilder, TcpFlags};

/// Delay between the three handshake segments
pub const HANDSHAKE_STEP_US: u64 = 5_000;

/// One client/server connection and the frames emitted on it so far
#[derive(Debug)]
pub struct TcpConversation {
    client: Endpoint,
    server: Endpoint,
    client_seq: u32,
    server_seq: u32,
    ttl: u8,
    kind: FrameKind,
    frames: Vec<Frame>,
}

impl TcpConversation {
    /// A conversation with randomised initial sequence numbers
    pub fn new(client: Endpoint, server: Endpoint, kind: FrameKind, ctx: &mut EncodeContext) -> Self {
        Self {
            client,
            server,
            client_seq: 1000 + ctx.gen_range(0..5000u32),
            server_seq: 7000 + ctx.gen_range(0..5000u32),
            ttl: 64,
            kind,
            frames: Vec::new(),
        }
    }

    /// SYN, SYN-ACK and ACK starting at `ts`; returns the time of the ACK
    pub fn handshake(&mut self, ts: u64, ctx: &mut EncodeContext) -> Result<u64> {
        let (c, s) = (self.client_seq, self.server_seq);
        self.push(true, ts, c, 0, TcpFlags::SYN, Vec::new(), ctx)?;
        self.push(false, ts + HANDSHAKE_STEP_US, s, c.wrapping_add(1), TcpFlags::SYN_ACK, Vec::new(), ctx)?;

        self.client_seq = c.wrapping_add(1);
        self.server_seq = s.wrapping_add(1);
        let ack_ts = ts + 2 * HANDSHAKE_STEP_US;
        self.push(true, ack_ts, self.client_seq, self.server_seq, TcpFlags::ACK, Vec::new(), ctx)?;
        Ok(ack_ts)
    }

    /// A PSH/ACK segment from client to server
    pub fn client_send(&mut self, ts: u64, payload: Vec<u8>, ctx: &mut EncodeContext) -> Result<()> {
        let len = payload.len() as u32;
        self.push(true, ts, self.client_seq, self.server_seq, TcpFlags::PSH_ACK, payload, ctx)?;
        self.client_seq = self.client_seq.wrapping_add(len);
        Ok(())
    }

    /// A PSH/ACK segment from server to client
    pub fn server_send(&mut self, ts: u64, payload: Vec<u8>, ctx: &mut EncodeContext) -> Result<()> {
        let len = payload.len() as u32;
        self.push(false, ts, self.server_seq, self.client_seq, TcpFlags::PSH_ACK, payload, ctx)?;
        self.server_seq = self.server_seq.wrapping_add(len);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn into_frames(self) -> Vec<Frame> {
        self.frames
    }

    #[allow(clippy::too_many_arguments)]
    fn push(
        &mut self,
        from_client: bool,
        ts: u64,
        seq: u32,
        ack: u32,
        flags: TcpFlags,
        payload: Vec<u8>,
        ctx: &mut EncodeContext,
    ) -> Result<()> {
        let (src, dst) = if from_client {
            (self.client, self.server)
        } else {
            (self.server, self.client)
        };

        let data = PacketBuilder::new()
            .ethernet(src.mac, dst.mac)
            .ip(src.ip, dst.ip)
            .ttl(self.ttl)
            .identification(ctx.gen_u16())
            .tcp(src.port, dst.port, seq, ack, flags)
            .payload(payload)
            .build()?;

        self.frames.push(Frame::new(ts, data, self.kind));
        Ok(())
    }
}

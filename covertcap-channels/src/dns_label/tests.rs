//! Tests for the DNS label channel

#[cfg(test)]
mod packet_tests {
    use crate::dns_label::packet::*;
    use covertcap_core::{Endpoint, MacAddr};
    use covertcap_packet::{Dissection, DnsQuery};
    use std::net::Ipv4Addr;

    #[test]
    fn test_query_frame_layout() {
        let client = Endpoint::new(MacAddr([2, 0, 0, 0, 0, 1]), Ipv4Addr::new(10, 0, 5, 42), 54321);
        let server = Endpoint::new(MacAddr([2, 0, 0, 0, 0, 2]), Ipv4Addr::new(10, 0, 5, 53), 53);

        let frame = query_frame(&client, &server, "abc.blueprint.example.org", 0xBEEF, 1003, 64).unwrap();
        let d = Dissection::from_frame(&frame).unwrap();
        assert_eq!(d.source_mac, client.mac);
        assert_eq!(d.outer.unwrap().identification, 1003);
        assert_eq!(d.ports(), Some((54321, 53)));
        assert!(d.udp().unwrap().verify_checksum(client.ip, server.ip));

        let query = DnsQuery::from_bytes(d.payload()).unwrap();
        assert_eq!(query.transaction_id, 0xBEEF);
        assert_eq!(query.qname, "abc.blueprint.example.org");
        assert!(!query.is_response());
    }

    #[test]
    fn test_query_frame_rejects_long_label() {
        let ep = Endpoint::new(MacAddr::zero(), Ipv4Addr::LOCALHOST, 53);
        let qname = format!("{}.example.org", "a".repeat(64));
        assert!(query_frame(&ep, &ep, &qname, 1, 1, 64).is_err());
    }
}

#[cfg(test)]
mod channel_tests {
    use crate::dns_label::packet::{BASE_IDENT, DEFAULT_SUFFIX};
    use crate::dns_label::DnsLabelChannel;
    use covertcap_core::{
        ChannelDescriptor, CovertChannel, EncodeContext, Endpoint, Frame, FrameKind, MacAddr,
        Message, SignalPattern, DEFAULT_START_US,
    };
    use covertcap_packet::{Dissection, DnsQuery, PacketBuilder};
    use rand::seq::SliceRandom;
    use std::net::Ipv4Addr;

    fn ctx() -> EncodeContext {
        EncodeContext::seeded(1337, DEFAULT_START_US)
    }

    fn example_channel() -> DnsLabelChannel {
        let mut desc = DnsLabelChannel::default_descriptor();
        desc.pattern = SignalPattern::DomainSuffix("blueprint.example.org".to_string());
        DnsLabelChannel::new(desc).unwrap()
    }

    #[test]
    fn test_defaults() {
        let channel = DnsLabelChannel::default();
        assert_eq!(channel.shortname(), "dns");
        assert_eq!(channel.suffix(), DEFAULT_SUFFIX);
        assert_eq!(channel.chunk_size(), 10);
        assert_eq!(channel.descriptor().client.port, 54321);
        assert_eq!(channel.descriptor().server.port, 53);
    }

    #[test]
    fn test_roundtrip() {
        let channel = example_channel();
        for msg in [
            &b"KEY:demo123\nFLAG:TDHCTF{example}\n"[..],
            &b"x"[..],
            &b"ab"[..],
            &b"KEY:abc\nFLAG:x\n"[..],
            &b"The quick brown fox jumps over the lazy dog 0123456789 !@#$%^&*()"[..],
        ] {
            let frames = channel.encode(msg, &mut ctx()).unwrap();
            assert_eq!(channel.decode(&frames).bytes, msg.to_vec());
        }
    }

    #[test]
    fn test_roundtrip_shuffled() {
        let channel = example_channel();
        let msg = Message::compose("demo123", "TDHCTF{example}");
        let mut frames = channel.encode(&msg, &mut ctx()).unwrap();

        let mut rng = EncodeContext::seeded(99, 0);
        frames.shuffle(rng.rng());

        let recovered = channel.decode(&frames);
        assert_eq!(recovered.bytes, msg);
        assert_eq!(recovered.matched_frames, frames.len());
        assert_eq!(recovered.fields().key.as_deref(), Some("demo123"));
    }

    #[test]
    fn test_signal_frames() {
        let channel = DnsLabelChannel::default();
        let msg = Message::compose("demo123", "TDHCTF{example}");
        let mut ctx = ctx();
        let frames = channel.encode(&msg, &mut ctx).unwrap();

        // 44 Base64 characters in 10-character chunks
        assert_eq!(frames.len(), 5);
        assert!(frames.windows(2).all(|w| w[0].timestamp_us < w[1].timestamp_us));
        assert!(frames.iter().all(|f| f.kind == FrameKind::Signal));
        assert_eq!(ctx.now(), DEFAULT_START_US + 5 * 200_000);

        for (i, frame) in frames.iter().enumerate() {
            let d = Dissection::from_frame(&frame.data).unwrap();
            assert_eq!(d.outer.unwrap().identification, BASE_IDENT + i as u16);
            let q = DnsQuery::from_bytes(d.payload()).unwrap();
            assert!(q.qname.ends_with(".blueprint.professor.royalmint.local"));
            assert!(q.first_label().len() <= 10);
        }

        let first = DnsQuery::from_bytes(Dissection::from_frame(&frames[0].data).unwrap().payload()).unwrap();
        assert_eq!(first.first_label(), "S0VZOmRlbW");
    }

    #[test]
    fn test_decode_ignores_decoy_and_noise() {
        let channel = example_channel();
        let msg = Message::compose("real", "TDHCTF{real}");
        let fake = b"TDHCTF{this_is_a_decoy_flag_do_not_submit}";

        let mut ctx = ctx();
        let mut frames = channel.encode(&msg, &mut ctx).unwrap();
        let decoy = channel.decoy();
        frames.extend(decoy.encode(fake, &mut ctx).unwrap());
        frames.extend(channel.noise(500, &mut ctx).unwrap());
        frames.shuffle(ctx.rng());

        assert_eq!(channel.decode(&frames).bytes, msg);
        assert_eq!(decoy.decode(&frames).bytes, fake.to_vec());
    }

    #[test]
    fn test_decoy_parameters() {
        let channel = DnsLabelChannel::default();
        let decoy = channel.decoy();
        let desc = decoy.descriptor();
        assert_eq!(desc.client.ip, std::net::IpAddr::from(Ipv4Addr::new(10, 0, 5, 99)));
        assert_eq!(desc.client.port, 54322);
        assert_eq!(
            desc.pattern,
            SignalPattern::DomainSuffix("backup.professor.royalmint.local".to_string())
        );
    }

    #[test]
    fn test_noise_has_no_signal() {
        let channel = DnsLabelChannel::default();
        let mut ctx = ctx();
        let noise = channel.noise(400, &mut ctx).unwrap();
        assert_eq!(noise.len(), 400);
        assert!(noise.iter().all(|f| f.kind == FrameKind::Noise));
        assert!(noise.iter().all(|f| Dissection::from_frame(&f.data).is_some()));
        assert!(channel.decode(&noise).is_empty());
        assert_eq!(channel.decode(&noise).matched_frames, 0);
    }

    #[test]
    fn test_small_noise_counts() {
        let channel = DnsLabelChannel::default();
        for n in [0, 1, 4, 9, 50] {
            assert_eq!(channel.noise(n, &mut ctx()).unwrap().len(), n);
        }
    }

    #[test]
    fn test_empty_message() {
        let channel = DnsLabelChannel::default();
        let frames = channel.encode(b"", &mut ctx()).unwrap();
        assert!(frames.is_empty());
        assert!(channel.decode(&frames).is_empty());
    }

    #[test]
    fn test_decode_skips_responses() {
        let channel = example_channel();
        let desc = channel.descriptor().clone();
        let mut response = DnsQuery::new(7, "aGVsbG8.blueprint.example.org");
        response.flags = 0x8180;

        let data = PacketBuilder::new()
            .ethernet(desc.client.mac, desc.server.mac)
            .ip(desc.client.ip, desc.server.ip)
            .udp(desc.client.port, desc.server.port)
            .payload(response.to_bytes().unwrap())
            .build()
            .unwrap();

        let recovered = channel.decode(&[Frame::captured(1, data)]);
        assert!(recovered.is_empty());
    }

    #[test]
    fn test_invalid_configuration() {
        let mut desc = DnsLabelChannel::default_descriptor();
        desc.pattern = SignalPattern::HeaderMarker("x".into());
        assert!(DnsLabelChannel::new(desc).is_err());

        let long = ChannelDescriptor::new(
            Endpoint::new(MacAddr::zero(), Ipv4Addr::new(1, 1, 1, 1), 1),
            Endpoint::new(MacAddr::zero(), Ipv4Addr::new(2, 2, 2, 2), 53),
            SignalPattern::DomainSuffix(format!("{}.org", "a".repeat(64))),
        );
        assert!(DnsLabelChannel::new(long).is_err());

        assert!(DnsLabelChannel::default().with_chunk_size(0).is_err());
        assert!(DnsLabelChannel::default().with_chunk_size(64).is_err());
        assert_eq!(DnsLabelChannel::default().with_chunk_size(32).unwrap().chunk_size(), 32);
    }

    #[test]
    fn test_custom_chunk_size_roundtrip() {
        let channel = example_channel().with_chunk_size(3).unwrap();
        let msg = b"KEY:abc\nFLAG:x\n";
        let frames = channel.encode(msg, &mut ctx()).unwrap();
        assert_eq!(frames.len(), 7);
        assert_eq!(channel.decode(&frames).bytes, msg.to_vec());
    }
}

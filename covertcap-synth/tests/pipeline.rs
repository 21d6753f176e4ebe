//! End-to-end tests: synthesize, write a PCAP, read it back and decode

use covertcap_capture::{read_capture, write_capture, PcapConfig};
use covertcap_channels::{
    ChannelRegistry, DnsLabelChannel, HttpHeaderChannel, IpidTimestampChannel, TlsLengthChannel,
};
use covertcap_core::{
    ChannelDescriptor, CovertChannel, EncodeContext, Error, Frame, FrameKind, Message,
    RecoveredMessage, Result, SignalPattern,
};
use covertcap_packet::Dissection;
use covertcap_synth::{SynthConfig, Synthesizer, TrafficOrdering, Verifier, DECOY_FLAG};
use tempfile::TempDir;

// Low byte of the outer IPv4 identification: Ethernet (14) + VLAN (4) + 5
const IDENT_LOW_OFFSET: usize = 23;

fn message() -> Vec<u8> {
    Message::compose("demo123", "TDHCTF{example}")
}

#[test]
fn test_dns_end_to_end() {
    let mut desc = DnsLabelChannel::default_descriptor();
    desc.pattern = SignalPattern::DomainSuffix("blueprint.example.org".into());
    let channel = DnsLabelChannel::new(desc).unwrap();

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("dns.pcap");
    let synth = Synthesizer::new(SynthConfig::default());
    let written = synth.generate_to_file(&channel, &message(), &path).unwrap();

    let frames = read_capture(&path).unwrap();
    assert_eq!(frames.len() as u64, written.frames);
    assert!(frames.iter().all(|f| f.kind == FrameKind::Captured));

    // Every signal query goes 10.0.5.42 -> 10.0.5.53 under the custom suffix
    let signal_queries = frames
        .iter()
        .filter_map(|f| Dissection::from_frame(&f.data))
        .filter(|d| d.ports() == Some((54321, 53)))
        .count();
    assert!(signal_queries > 0);

    let result = Verifier::verify_file(&path, &channel).unwrap();
    assert!(result.matches(&message()));
    let fields = result.recovered.fields();
    assert_eq!(fields.key.as_deref(), Some("demo123"));
    assert_eq!(fields.flag.as_deref(), Some("TDHCTF{example}"));
}

#[test]
fn test_noise_outnumbers_signal() {
    let registry = ChannelRegistry::with_defaults();
    let synth = Synthesizer::new(SynthConfig::default());

    for name in registry.shortnames() {
        let channel = registry.get(name).unwrap();
        let frames = synth.generate(channel, &message()).unwrap();
        let signal = frames.iter().filter(|f| f.kind == FrameKind::Signal).count();
        let noise = frames.iter().filter(|f| f.kind == FrameKind::Noise).count();
        assert_eq!(noise, 2000, "{}", name);
        assert!(noise >= 10 * signal, "{}: {} noise vs {} signal", name, noise, signal);
    }
}

#[test]
fn test_shuffled_captures_decode() {
    let channels: Vec<Box<dyn CovertChannel>> = vec![
        Box::new(DnsLabelChannel::default()),
        Box::new(HttpHeaderChannel::default()),
        Box::new(IpidTimestampChannel::default()),
        Box::new(TlsLengthChannel::default()),
    ];
    let dir = TempDir::new().unwrap();

    for (seed, channel) in channels.iter().enumerate() {
        let path = dir.path().join(format!("{}.pcap", channel.shortname()));
        let config = SynthConfig::default()
            .with_seed(seed as u64 + 100)
            .with_noise_frames(500)
            .with_ordering(TrafficOrdering::Shuffled);
        Synthesizer::new(config)
            .generate_to_file(channel.as_ref(), &message(), &path)
            .unwrap();

        let result = Verifier::verify_file(&path, channel.as_ref()).unwrap();
        assert!(result.matches(&message()), "{}", channel.shortname());

        let decoy = Verifier::verify_file(&path, channel.decoy().as_ref()).unwrap();
        assert!(decoy.matches(DECOY_FLAG.as_bytes()), "{}", channel.shortname());
    }
}

#[test]
fn test_random_printable_messages_roundtrip() {
    let printable: Vec<u8> = (0x20..=0x7E).collect();
    let registry = ChannelRegistry::with_defaults();
    let mut rng = EncodeContext::seeded(0x5EED, 0);

    for round in 0..60u64 {
        let len = rng.gen_range(0..=150usize);
        let msg = rng.random_string(&printable, len).into_bytes();

        for name in registry.shortnames() {
            let channel = registry.get(name).unwrap();
            for ordering in [TrafficOrdering::Shuffled, TrafficOrdering::Jittered] {
                let config = SynthConfig::default()
                    .with_seed(round)
                    .with_noise_frames(200)
                    .with_ordering(ordering);
                let frames = Synthesizer::new(config).generate(channel, &msg).unwrap();
                let result = Verifier::verify_frames(frames, channel);
                assert!(
                    result.matches(&msg),
                    "{} {} round {}: {:?}",
                    name,
                    ordering,
                    round,
                    String::from_utf8_lossy(&msg)
                );
            }
        }
    }
}

#[test]
fn test_jittered_capture_is_ordered_for_signal() {
    let channel = TlsLengthChannel::default();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tls.pcap");
    let config = SynthConfig::default()
        .with_noise_frames(300)
        .with_ordering(TrafficOrdering::Jittered);
    Synthesizer::new(config)
        .generate_to_file(&channel, &message(), &path)
        .unwrap();

    let result = Verifier::verify_file(&path, &channel).unwrap();
    assert!(result.matches(&message()));
    assert_eq!(result.stats.out_of_order, 0);
}

#[test]
fn test_ipid_tamper_flips_one_byte() {
    let channel = IpidTimestampChannel::default();
    let msg = message();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ipid.pcap");

    // Signal only, in index order
    let config = SynthConfig::default()
        .with_noise_frames(0)
        .with_decoy(false)
        .with_ordering(TrafficOrdering::Jittered);
    Synthesizer::new(config)
        .generate_to_file(&channel, &msg, &path)
        .unwrap();

    let mut frames = read_capture(&path).unwrap();
    assert_eq!(frames.len(), msg.len());
    frames[6].data[IDENT_LOW_OFFSET] ^= 0x01;
    write_capture(&path, &frames, PcapConfig::default()).unwrap();

    let recovered = Verifier::verify_file(&path, &channel).unwrap().recovered;
    assert_eq!(recovered.bytes.len(), msg.len());
    for (i, (got, want)) in recovered.bytes.iter().zip(&msg).enumerate() {
        if i == 6 {
            assert_eq!(*got, want ^ 0x01);
        } else {
            assert_eq!(got, want);
        }
    }
}

#[test]
fn test_capture_without_signal() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("noise.pcap");
    let http = HttpHeaderChannel::default();
    Synthesizer::new(SynthConfig::default().with_noise_frames(200))
        .generate_to_file(&http, &message(), &path)
        .unwrap();

    // An HTTP capture carries nothing for the other codecs
    let result = Verifier::verify_file(&path, &TlsLengthChannel::default()).unwrap();
    assert!(result.recovered.is_empty());
    assert!(result.stats.frames > 200);
}

#[test]
fn test_tls_signal_on_decoy_port() {
    let mut desc = TlsLengthChannel::default_descriptor();
    desc.client.port = 51599;
    let channel = TlsLengthChannel::new(desc).unwrap();
    assert_ne!(channel.decoy().descriptor().client.port, 51599);

    let frames = Synthesizer::new(SynthConfig::default().with_noise_frames(300))
        .generate(&channel, &message())
        .unwrap();
    let result = Verifier::verify_frames(frames.clone(), &channel);
    assert!(result.matches(&message()));
    let decoy = Verifier::verify_frames(frames, channel.decoy().as_ref());
    assert!(decoy.matches(DECOY_FLAG.as_bytes()));
}

#[test]
fn test_ipid_signal_on_decoy_tunnel() {
    let mut desc = IpidTimestampChannel::default_descriptor();
    desc.client.port = 40134;
    desc.server.port = 8443;
    if let SignalPattern::Tunnel { ref mut vlan_id, .. } = desc.pattern {
        *vlan_id = 134;
    }
    let channel = IpidTimestampChannel::new(desc).unwrap();
    assert_ne!(channel.decoy().descriptor().pattern, channel.descriptor().pattern);

    for ordering in [TrafficOrdering::Shuffled, TrafficOrdering::Jittered] {
        let config = SynthConfig::default()
            .with_noise_frames(300)
            .with_ordering(ordering);
        let frames = Synthesizer::new(config).generate(&channel, &message()).unwrap();
        let result = Verifier::verify_frames(frames.clone(), &channel);
        assert!(result.matches(&message()), "{}", ordering);
        let decoy = Verifier::verify_frames(frames, channel.decoy().as_ref());
        assert!(decoy.matches(DECOY_FLAG.as_bytes()), "{}", ordering);
    }
}

// A channel whose decoy reuses its own parameters
struct SelfDecoy(TlsLengthChannel);

impl CovertChannel for SelfDecoy {
    fn name(&self) -> &'static str {
        "self decoy"
    }

    fn shortname(&self) -> &'static str {
        "self"
    }

    fn descriptor(&self) -> &ChannelDescriptor {
        self.0.descriptor()
    }

    fn encode(&self, message: &[u8], ctx: &mut EncodeContext) -> Result<Vec<Frame>> {
        self.0.encode(message, ctx)
    }

    fn decode(&self, frames: &[Frame]) -> RecoveredMessage {
        self.0.decode(frames)
    }

    fn noise(&self, count: usize, ctx: &mut EncodeContext) -> Result<Vec<Frame>> {
        self.0.noise(count, ctx)
    }

    fn decoy(&self) -> Box<dyn CovertChannel> {
        Box::new(SelfDecoy(self.0.clone()))
    }
}

#[test]
fn test_overlapping_decoy_is_rejected() {
    let channel = SelfDecoy(TlsLengthChannel::default());
    let synth = Synthesizer::new(SynthConfig::default().with_noise_frames(10));
    match synth.generate(&channel, &message()) {
        Err(Error::InvalidParameter { name, .. }) => assert_eq!(name, "decoy"),
        other => panic!("expected a decoy error, got {:?}", other.map(|f| f.len())),
    }

    // Without a decoy there is nothing to collide with
    let synth = Synthesizer::new(SynthConfig::default().with_noise_frames(10).with_decoy(false));
    let frames = synth.generate(&channel, &message()).unwrap();
    assert!(Verifier::verify_frames(frames, &channel).matches(&message()));
}

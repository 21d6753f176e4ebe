//! Address helpers for cover traffic

use covertcap_core::{EncodeContext, MacAddr};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::ops::Range;

/// Same network as `ip` with the last octet (or segment) replaced
pub fn sibling_host(ip: IpAddr, last: u8) -> IpAddr {
    match ip {
        IpAddr::V4(v4) => {
            let [a, b, c, _] = v4.octets();
            IpAddr::V4(Ipv4Addr::new(a, b, c, last))
        }
        IpAddr::V6(v6) => {
            let mut segments = v6.segments();
            segments[7] = last as u16;
            IpAddr::V6(Ipv6Addr::from(segments))
        }
    }
}

/// Random `a.b.x.y` with `x` and `y` drawn from the given ranges
pub fn random_ipv4(ctx: &mut EncodeContext, a: u8, b: u8, third: Range<u8>, fourth: Range<u8>) -> Ipv4Addr {
    let c = ctx.gen_range(third);
    let d = ctx.gen_range(fourth);
    Ipv4Addr::new(a, b, c, d)
}

/// Random locally administered unicast MAC
pub fn random_mac(ctx: &mut EncodeContext) -> MacAddr {
    let mut bytes = [0u8; 6];
    bytes.copy_from_slice(&ctx.random_bytes(6));
    bytes[0] = (bytes[0] & 0xFC) | 0x02;
    MacAddr(bytes)
}

/// `preferred`, or a neighbouring value when it equals `taken`
///
/// Keeps decoy parameters apart from whatever the signal uses.
pub fn disjoint_from(preferred: u16, taken: u16, max: u16) -> u16 {
    if preferred != taken {
        preferred
    } else if preferred < max {
        preferred + 1
    } else {
        preferred - 1
    }
}

/// Random ephemeral port
pub fn ephemeral_port(ctx: &mut EncodeContext) -> u16 {
    ctx.gen_range(1024..65535u16)
}

/// Time span cover traffic is spread over: the clock's distance from the
/// capture start, but never less than `minimum`
pub fn noise_window(ctx: &EncodeContext, minimum: u64) -> u64 {
    ctx.now().saturating_sub(ctx.start()).max(minimum)
}

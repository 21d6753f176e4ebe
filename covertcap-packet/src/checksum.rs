//! Checksum calculations for network packets
//!
//! This module provides the Internet Checksum (RFC 1071) used in IPv4, TCP
//! and UDP headers, and the pseudo-header variants for TCP/UDP over IPv4
//! and IPv6.

use std::net::{IpAddr, Ipv6Addr};

/// Calculates the Internet Checksum as defined in RFC 1071.
///
/// The data is treated as a sequence of big-endian 16-bit words (an odd
/// trailing byte is padded with zero), summed with end-around carry, and
/// the ones' complement of the result is returned. The checksum field of
/// the header being summed must be zero.
///
/// # Examples
///
/// ```
/// use covertcap_packet::checksum::checksum16;
///
/// let data = vec![0x45, 0x00, 0x00, 0x3c];
/// let checksum = checksum16(&data);
/// assert_eq!(checksum, !0x453cu16);
/// ```
pub fn checksum16(data: &[u8]) -> u16 {
    !(checksum_accumulate(data) as u16)
}

/// Alias of [`checksum16`] under its RFC name.
pub fn internet_checksum(data: &[u8]) -> u16 {
    checksum16(data)
}

/// Returns the folded ones'-complement sum before complementing.
///
/// A buffer that already contains a correct checksum folds to `0xFFFF`.
pub fn checksum_accumulate(data: &[u8]) -> u32 {
    let mut sum: u32 = 0;

    // Process 16-bit words
    let mut chunks = data.chunks_exact(2);
    for chunk in &mut chunks {
        let word = u16::from_be_bytes([chunk[0], chunk[1]]);
        sum += word as u32;
        sum = (sum & 0xFFFF) + (sum >> 16);
    }

    // Handle odd byte if present
    if let Some(&byte) = chunks.remainder().first() {
        sum += (byte as u32) << 8;
    }

    // Fold 32-bit sum to 16 bits
    while (sum >> 16) != 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }

    sum
}

/// Validates an Internet checksum over data that includes the checksum field.
pub fn validate_checksum(data: &[u8]) -> bool {
    checksum_accumulate(data) == 0xFFFF
}

/// Calculates the checksum for a TCP or UDP segment including the pseudo-header.
///
/// For IPv4 the pseudo-header is source, destination, a zero byte, the
/// protocol number and the 16-bit segment length. For IPv6 it is source,
/// destination, the 32-bit segment length, three zero bytes and the next
/// header value. Mixed address families are summed as IPv6 with the IPv4
/// side mapped into `::ffff:0:0/96`.
///
/// The pseudo-header is only used for the calculation and never emitted.
///
/// # Examples
///
/// ```
/// use std::net::Ipv4Addr;
/// use covertcap_packet::checksum::pseudo_header_checksum;
///
/// let src = Ipv4Addr::new(192, 168, 1, 1).into();
/// let dst = Ipv4Addr::new(192, 168, 1, 2).into();
/// let data = vec![0x00, 0x35, 0x00, 0x35, 0x00, 0x08, 0x00, 0x00];
/// let checksum = pseudo_header_checksum(src, dst, 17, &data);
/// assert_ne!(checksum, 0);
/// ```
pub fn pseudo_header_checksum(src: IpAddr, dst: IpAddr, protocol: u8, data: &[u8]) -> u16 {
    match (src, dst) {
        (IpAddr::V4(src), IpAddr::V4(dst)) => {
            let mut pseudo = Vec::with_capacity(12 + data.len());
            pseudo.extend_from_slice(&src.octets());
            pseudo.extend_from_slice(&dst.octets());
            pseudo.push(0);
            pseudo.push(protocol);
            pseudo.extend_from_slice(&(data.len() as u16).to_be_bytes());
            pseudo.extend_from_slice(data);
            checksum16(&pseudo)
        }
        (src, dst) => {
            let src = to_v6(src);
            let dst = to_v6(dst);
            let mut pseudo = Vec::with_capacity(40 + data.len());
            pseudo.extend_from_slice(&src.octets());
            pseudo.extend_from_slice(&dst.octets());
            pseudo.extend_from_slice(&(data.len() as u32).to_be_bytes());
            pseudo.extend_from_slice(&[0, 0, 0, protocol]);
            pseudo.extend_from_slice(data);
            checksum16(&pseudo)
        }
    }
}

fn to_v6(addr: IpAddr) -> Ipv6Addr {
    match addr {
        IpAddr::V4(v4) => v4.to_ipv6_mapped(),
        IpAddr::V6(v6) => v6,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_checksum_empty() {
        assert_eq!(checksum16(&[]), 0xFFFF);
    }

    #[test]
    fn test_checksum_rfc1071_example() {
        // RFC 1071 section 3: the folded sum of these bytes is 0xddf2
        let data = [0x00, 0x01, 0xf2, 0x03, 0xf4, 0xf5, 0xf6, 0xf7];
        assert_eq!(checksum_accumulate(&data), 0xddf2);
        assert_eq!(checksum16(&data), !0xddf2u16);
    }

    #[test]
    fn test_checksum_odd_length_pads_with_zero() {
        assert_eq!(checksum16(&[0x12, 0x34, 0x56]), checksum16(&[0x12, 0x34, 0x56, 0x00]));
    }

    #[test]
    fn test_checksum_accumulate() {
        let data = vec![0x00, 0x01, 0x00, 0x02];
        assert_eq!(checksum_accumulate(&data), 0x0003);
    }

    #[test]
    fn test_self_verifying_for_even_and_odd_lengths() {
        for len in 2..64usize {
            let mut buf: Vec<u8> = (0..len).map(|i| (i as u8).wrapping_mul(37).wrapping_add(11)).collect();
            buf[0] = 0;
            buf[1] = 0;
            let checksum = checksum16(&buf);
            buf[0..2].copy_from_slice(&checksum.to_be_bytes());
            assert_eq!(checksum_accumulate(&buf), 0xFFFF, "length {}", len);
            assert!(validate_checksum(&buf));
        }
    }

    #[test]
    fn test_all_zero_buffer_verifies() {
        let mut buf = vec![0u8; 20];
        let checksum = checksum16(&buf);
        assert_eq!(checksum, 0xFFFF);
        buf[10..12].copy_from_slice(&checksum.to_be_bytes());
        assert!(validate_checksum(&buf));
    }

    #[test]
    fn test_pseudo_header_checksum_v4_verifies() {
        let src: IpAddr = Ipv4Addr::new(192, 168, 1, 1).into();
        let dst: IpAddr = Ipv4Addr::new(192, 168, 1, 2).into();
        let mut seg = vec![0x00, 0x35, 0x00, 0x35, 0x00, 0x09, 0x00, 0x00, 0xAB];
        let checksum = pseudo_header_checksum(src, dst, 17, &seg);
        seg[6..8].copy_from_slice(&checksum.to_be_bytes());

        let mut pseudo = vec![192, 168, 1, 1, 192, 168, 1, 2, 0, 17, 0, 9];
        pseudo.extend_from_slice(&seg);
        assert!(validate_checksum(&pseudo));
    }

    #[test]
    fn test_pseudo_header_checksum_v6_differs_from_v4() {
        let data = [0u8; 20];
        let v4 = pseudo_header_checksum(
            Ipv4Addr::new(10, 0, 0, 1).into(),
            Ipv4Addr::new(10, 0, 0, 2).into(),
            6,
            &data,
        );
        let v6 = pseudo_header_checksum(
            "fd00::1".parse::<Ipv6Addr>().unwrap().into(),
            "fd00::2".parse::<Ipv6Addr>().unwrap().into(),
            6,
            &data,
        );
        assert_ne!(v4, v6);
    }
}

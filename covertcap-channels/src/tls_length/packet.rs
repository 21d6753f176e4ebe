//! TLS records whose length field encodes a Base32 symbol

use covertcap_core::{ChannelDescriptor, EncodeContext, Error, Result};
use covertcap_packet::tls::{
    parse_records, CONTENT_APPLICATION_DATA, CONTENT_HANDSHAKE, MAX_FRAGMENT_LEN, VERSION_TLS12,
};
use covertcap_packet::{Dissection, TlsRecord};

/// Length of the record carrying symbol value 0
pub const DEFAULT_BASE: u16 = 480;

/// Length increment per symbol value
pub const DEFAULT_STEP: u16 = 7;

/// Symbol values a record can carry
pub const SYMBOL_COUNT: u16 = 32;

/// Client port of the decoy session
pub const DECOY_CLIENT_PORT: u16 = 51599;

/// Probability of an off-series record before each signal record
pub const OFF_SERIES_CHANCE: f64 = 0.3;

/// Lengths off-series records are drawn from
const OFF_SERIES_LENGTHS: std::ops::Range<usize> = 64..1400;

/// Record lengths `base + value * step` for values `0..32`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordSeries {
    pub base: u16,
    pub step: u16,
}

impl RecordSeries {
    pub fn new(base: u16, step: u16) -> Result<Self> {
        if step == 0 {
            return Err(Error::invalid_parameter("step", "must be at least 1"));
        }
        let series = Self { base, step };
        if series.max_length() > MAX_FRAGMENT_LEN {
            return Err(Error::invalid_parameter(
                "base".to_string(),
                format!(
                    "largest record of {} bytes exceeds the {}-byte fragment limit",
                    series.max_length(),
                    MAX_FRAGMENT_LEN
                ),
            ));
        }
        Ok(series)
    }

    /// Length of the record carrying `value`
    pub fn length_for(&self, value: u8) -> usize {
        self.base as usize + value as usize * self.step as usize
    }

    /// The symbol a record length stands for, if it is on the series
    pub fn value_of(&self, length: usize) -> Option<u8> {
        let offset = length.checked_sub(self.base as usize)?;
        let step = self.step as usize;
        if offset % step != 0 || offset / step >= SYMBOL_COUNT as usize {
            return None;
        }
        Some((offset / step) as u8)
    }

    pub fn max_length(&self) -> usize {
        self.length_for((SYMBOL_COUNT - 1) as u8)
    }

    /// Random length that carries no symbol
    pub fn off_series_length(&self, ctx: &mut EncodeContext) -> usize {
        loop {
            let length = ctx.gen_range(OFF_SERIES_LENGTHS);
            if self.value_of(length).is_none() {
                return length;
            }
        }
    }
}

impl Default for RecordSeries {
    fn default() -> Self {
        Self {
            base: DEFAULT_BASE,
            step: DEFAULT_STEP,
        }
    }
}

/// Application-data record of exactly `length` random bytes
pub fn filler_record(length: usize, ctx: &mut EncodeContext) -> TlsRecord {
    TlsRecord::application_data(ctx.random_bytes(length))
}

/// Server handshake flight: a filler handshake record
pub fn server_hello(ctx: &mut EncodeContext) -> TlsRecord {
    let length = ctx.gen_range(80..160usize);
    TlsRecord::new(CONTENT_HANDSHAKE, VERSION_TLS12, ctx.random_bytes(length))
}

/// Concatenate records into one TCP payload
pub fn records_payload(records: &[TlsRecord]) -> Result<Vec<u8>> {
    let mut payload = Vec::new();
    for record in records {
        payload.extend(record.to_bytes()?);
    }
    Ok(payload)
}

/// Symbol values carried by a frame, in payload order
///
/// Empty unless the frame travels client-to-server on the descriptor's
/// flow. Only application-data records on the series count.
pub fn extract_symbols(frame: &[u8], descriptor: &ChannelDescriptor, series: &RecordSeries) -> Vec<u8> {
    let Some(d) = Dissection::from_frame(frame) else {
        return Vec::new();
    };
    if d.tcp().is_none() {
        return Vec::new();
    }
    let flow = d.network().zip(d.ports());
    let Some(((src, dst), (sport, dport))) = flow else {
        return Vec::new();
    };
    if !descriptor.matches_flow(src, dst, sport, dport) {
        return Vec::new();
    }

    parse_records(d.payload())
        .iter()
        .filter(|r| r.content_type == CONTENT_APPLICATION_DATA)
        .filter_map(|r| series.value_of(r.length()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_series_lengths() {
        let series = RecordSeries::default();
        assert_eq!(series.length_for(0), 480);
        assert_eq!(series.length_for(1), 487);
        assert_eq!(series.max_length(), 480 + 31 * 7);

        assert_eq!(series.value_of(480), Some(0));
        assert_eq!(series.value_of(697), Some(31));
        assert_eq!(series.value_of(704), None);
        assert_eq!(series.value_of(481), None);
        assert_eq!(series.value_of(473), None);
        assert_eq!(series.value_of(0), None);
    }

    #[test]
    fn test_series_validation() {
        assert!(RecordSeries::new(480, 0).is_err());
        assert!(RecordSeries::new(18_000, 100).is_err());
        assert_eq!(RecordSeries::new(100, 1).unwrap().max_length(), 131);
    }

    #[test]
    fn test_off_series_length() {
        let series = RecordSeries::new(100, 1).unwrap();
        let mut ctx = EncodeContext::seeded(4, 0);
        for _ in 0..500 {
            let length = series.off_series_length(&mut ctx);
            assert!(series.value_of(length).is_none());
            assert!(OFF_SERIES_LENGTHS.contains(&length));
        }
    }

    #[test]
    fn test_records_payload() {
        let mut ctx = EncodeContext::seeded(4, 0);
        let records = vec![filler_record(10, &mut ctx), filler_record(487, &mut ctx)];
        let payload = records_payload(&records).unwrap();
        assert_eq!(payload.len(), 5 + 10 + 5 + 487);
        assert_eq!(parse_records(&payload), records);
    }
}

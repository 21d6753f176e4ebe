//! PCAP 2.4 capture files
//!
//! Layout: a 24-byte global header followed by one 16-byte record header
//! plus frame bytes per frame. Files are written little-endian with
//! microsecond timestamps; the reader also accepts the byte-swapped magic.

use bytes::{BufMut, BytesMut};
use covertcap_core::{Error, Frame, Result};
use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::Path;
use tracing::{debug, info};

/// Microsecond-resolution magic number
pub const PCAP_MAGIC: u32 = 0xA1B2_C3D4;

/// Nanosecond-resolution magic number (recognised only to reject it clearly)
pub const PCAP_MAGIC_NANOS: u32 = 0xA1B2_3C4D;

pub const VERSION_MAJOR: u16 = 2;
pub const VERSION_MINOR: u16 = 4;

/// LINKTYPE_ETHERNET
pub const LINKTYPE_ETHERNET: u32 = 1;

/// Default snapshot length (maximum bytes per frame)
///
/// Larger than any Ethernet + VLAN frame around a 65535-byte IPv4 packet.
pub const DEFAULT_SNAPLEN: u32 = 262_144;

pub const GLOBAL_HEADER_LEN: usize = 24;
pub const RECORD_HEADER_LEN: usize = 16;

/// Parameters written to the global header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcapConfig {
    /// Maximum bytes per frame; longer frames are rejected, never truncated
    pub snaplen: u32,
    /// Link-layer header type
    pub link_type: u32,
}

impl Default for PcapConfig {
    fn default() -> Self {
        Self {
            snaplen: DEFAULT_SNAPLEN,
            link_type: LINKTYPE_ETHERNET,
        }
    }
}

impl PcapConfig {
    pub fn with_snaplen(mut self, snaplen: u32) -> Self {
        self.snaplen = snaplen;
        self
    }

    fn global_header(&self) -> BytesMut {
        let mut header = BytesMut::with_capacity(GLOBAL_HEADER_LEN);
        header.put_u32_le(PCAP_MAGIC);
        header.put_u16_le(VERSION_MAJOR);
        header.put_u16_le(VERSION_MINOR);
        header.put_i32_le(0); // thiszone
        header.put_u32_le(0); // sigfigs
        header.put_u32_le(self.snaplen);
        header.put_u32_le(self.link_type);
        header
    }
}

/// Streaming capture writer
pub struct PcapWriter<W: Write> {
    writer: W,
    config: PcapConfig,
    frames_written: usize,
}

impl<W: Write> PcapWriter<W> {
    /// Write the global header and return a writer ready for records
    pub fn new(mut writer: W, config: PcapConfig) -> Result<Self> {
        writer.write_all(&config.global_header())?;
        Ok(Self {
            writer,
            config,
            frames_written: 0,
        })
    }

    /// Append one record; captured and original length are both the frame length
    pub fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        let len = frame.len();
        if len as u64 > self.config.snaplen as u64 {
            return Err(Error::CaptureFormat(format!(
                "frame of {} bytes exceeds snaplen {}",
                len, self.config.snaplen
            )));
        }
        if frame.timestamp_us / 1_000_000 > u32::MAX as u64 {
            return Err(Error::CaptureFormat(format!(
                "timestamp {}us does not fit a 32-bit seconds field",
                frame.timestamp_us
            )));
        }

        let (ts_sec, ts_usec) = frame.ts_parts();
        let mut record = BytesMut::with_capacity(RECORD_HEADER_LEN + len);
        record.put_u32_le(ts_sec);
        record.put_u32_le(ts_usec);
        record.put_u32_le(len as u32);
        record.put_u32_le(len as u32);
        record.put_slice(frame.data());

        self.writer.write_all(&record)?;
        self.frames_written += 1;
        Ok(())
    }

    /// Append every frame in order
    pub fn write_all<'a, I>(&mut self, frames: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a Frame>,
    {
        for frame in frames {
            self.write_frame(frame)?;
        }
        Ok(())
    }

    pub fn frames_written(&self) -> usize {
        self.frames_written
    }

    /// Flush and hand back the inner writer
    pub fn finish(mut self) -> Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

/// Streaming capture reader, yielding frames in file order
pub struct PcapReader<R: Read> {
    reader: R,
    swapped: bool,
    snaplen: u32,
    offset: u64,
    done: bool,
}

impl<R: Read> PcapReader<R> {
    /// Read and validate the global header
    pub fn new(mut reader: R) -> Result<Self> {
        let mut header = [0u8; GLOBAL_HEADER_LEN];
        let got = read_full(&mut reader, &mut header)?;
        if got < GLOBAL_HEADER_LEN {
            return Err(Error::CaptureFormat(format!(
                "global header is {} bytes, expected {}",
                got, GLOBAL_HEADER_LEN
            )));
        }

        let magic = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
        let swapped = match magic {
            PCAP_MAGIC => false,
            m if m == PCAP_MAGIC.swap_bytes() => true,
            m if m == PCAP_MAGIC_NANOS || m == PCAP_MAGIC_NANOS.swap_bytes() => {
                return Err(Error::CaptureFormat(
                    "nanosecond-resolution captures are not supported".to_string(),
                ))
            }
            m => return Err(Error::CaptureFormat(format!("bad magic number {:#010x}", m))),
        };

        let u16_at = |i: usize| {
            let v = u16::from_le_bytes([header[i], header[i + 1]]);
            if swapped {
                v.swap_bytes()
            } else {
                v
            }
        };
        let u32_at = |i: usize| {
            let v = u32::from_le_bytes([header[i], header[i + 1], header[i + 2], header[i + 3]]);
            if swapped {
                v.swap_bytes()
            } else {
                v
            }
        };

        let (major, minor) = (u16_at(4), u16_at(6));
        if major != VERSION_MAJOR {
            return Err(Error::CaptureFormat(format!(
                "unsupported version {}.{}",
                major, minor
            )));
        }

        let link_type = u32_at(20);
        if link_type != LINKTYPE_ETHERNET {
            return Err(Error::CaptureFormat(format!(
                "unsupported link type {}",
                link_type
            )));
        }

        let snaplen = u32_at(16);
        debug!(swapped, snaplen, version = %format!("{}.{}", major, minor), "opened capture");

        Ok(Self {
            reader,
            swapped,
            snaplen,
            offset: GLOBAL_HEADER_LEN as u64,
            done: false,
        })
    }

    pub fn snaplen(&self) -> u32 {
        self.snaplen
    }

    /// Whether the file was written with the opposite byte order
    pub fn is_swapped(&self) -> bool {
        self.swapped
    }

    fn field(&self, bytes: &[u8]) -> u32 {
        let v = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        if self.swapped {
            v.swap_bytes()
        } else {
            v
        }
    }

    /// Read the next record; `Ok(None)` at a clean end of file
    pub fn next_frame(&mut self) -> Result<Option<Frame>> {
        let mut header = [0u8; RECORD_HEADER_LEN];
        let got = read_full(&mut self.reader, &mut header)?;
        if got == 0 {
            return Ok(None);
        }
        if got < RECORD_HEADER_LEN {
            return Err(Error::truncated(
                self.offset,
                format!("record header is {} bytes, expected {}", got, RECORD_HEADER_LEN),
            ));
        }

        let ts_sec = self.field(&header[0..4]);
        let ts_usec = self.field(&header[4..8]);
        let incl_len = self.field(&header[8..12]);
        if incl_len > self.snaplen {
            return Err(Error::CaptureFormat(format!(
                "record at byte {} claims {} bytes, snaplen is {}",
                self.offset, incl_len, self.snaplen
            )));
        }

        let mut data = vec![0u8; incl_len as usize];
        let got = read_full(&mut self.reader, &mut data)?;
        if got < data.len() {
            return Err(Error::truncated(
                self.offset,
                format!("record claims {} bytes, only {} remain", incl_len, got),
            ));
        }

        self.offset += (RECORD_HEADER_LEN + data.len()) as u64;
        let timestamp_us = ts_sec as u64 * 1_000_000 + ts_usec as u64;
        Ok(Some(Frame::captured(timestamp_us, data)))
    }
}

impl<R: Read> Iterator for PcapReader<R> {
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_frame() {
            Ok(Some(frame)) => Some(Ok(frame)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Fill `buf` as far as the reader allows, returning the bytes read
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}

/// Write frames to a new capture file in the given order
pub fn write_capture<P: AsRef<Path>>(path: P, frames: &[Frame], config: PcapConfig) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)?;
    let mut writer = PcapWriter::new(BufWriter::new(file), config)?;
    writer.write_all(frames)?;
    writer.finish()?;

    info!(path = %path.display(), frames = frames.len(), "wrote capture");
    Ok(())
}

/// Read a whole capture file into memory, in file order
pub fn read_capture<P: AsRef<Path>>(path: P) -> Result<Vec<Frame>> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let frames = PcapReader::new(BufReader::new(file))?.collect::<Result<Vec<_>>>()?;

    info!(path = %path.display(), frames = frames.len(), "read capture");
    Ok(frames)
}

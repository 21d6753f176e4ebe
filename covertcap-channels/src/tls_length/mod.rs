//! TLS record length channel
//!
//! The message is Base32 encoded (RFC 4648 alphabet, no padding) and each
//! symbol value `v` becomes one application-data record of length
//! `base + v * step` on a single TLS session:
//!
//! ```text
//! 10.20.0.15:51514 -> 10.20.0.53:443   Handshake   ClientHello
//! 10.20.0.53:443 -> 10.20.0.15:51514   Handshake
//! 10.20.0.15:51514 -> 10.20.0.53:443   Application Data  len=543  (v=9)
//! 10.20.0.15:51514 -> 10.20.0.53:443   Application Data  len=1021
//! 10.20.0.15:51514 -> 10.20.0.53:443   Application Data  len=571  (v=13)
//! ```
//!
//! Records off the series are mixed into the same session, sometimes in
//! the same TCP segment as a signal record, and the server answers with
//! records of random length. The decoder keeps client-to-server
//! application-data records whose length is on the series, in capture
//! order.

pub mod channel;
pub mod noise;
pub mod packet;


pub use channel::TlsLengthChannel;
pub use packet::{RecordSeries, DEFAULT_BASE, DEFAULT_STEP};

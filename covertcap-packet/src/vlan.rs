//! 802.1Q VLAN tagging
//!
//! A tagged frame carries TPID `0x8100` in the Ethernet type position,
//! followed by the 2-byte TCI and the inner EtherType:
//!
//! ```text
//! | PCP (3 bits) | DEI (1 bit) | VID (12 bits) | inner EtherType (16 bits) |
//! ```

use crate::ethernet::EtherType;
use bytes::{BufMut, BytesMut};
use covertcap_core::{Error, Result};

/// Minimum valid VLAN ID
pub const VLAN_MIN_ID: u16 = 1;

/// Maximum valid VLAN ID
pub const VLAN_MAX_ID: u16 = 4094;

const VLAN_ID_MASK: u16 = 0x0FFF;
const DEI_MASK: u16 = 0x1000;

/// 802.1Q tag control information
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VlanTag {
    /// VLAN Identifier (1-4094)
    pub vlan_id: u16,
    /// Priority Code Point (0-7)
    pub priority: u8,
    /// Drop Eligible Indicator
    pub dei: bool,
}

impl VlanTag {
    /// Create a tag with priority 0 and DEI clear
    pub fn new(vlan_id: u16) -> Result<Self> {
        Self::with_priority(vlan_id, 0, false)
    }

    /// Create a tag with all fields specified
    pub fn with_priority(vlan_id: u16, priority: u8, dei: bool) -> Result<Self> {
        if !(VLAN_MIN_ID..=VLAN_MAX_ID).contains(&vlan_id) {
            return Err(Error::InvalidParameter {
                name: "vlan_id".to_string(),
                reason: format!(
                    "Invalid VLAN ID: {}. Must be between {} and {}",
                    vlan_id, VLAN_MIN_ID, VLAN_MAX_ID
                ),
            });
        }
        if priority > 7 {
            return Err(Error::InvalidParameter {
                name: "priority".to_string(),
                reason: format!("Invalid priority: {}. Must be between 0 and 7", priority),
            });
        }

        Ok(Self {
            vlan_id,
            priority,
            dei,
        })
    }

    /// Encode as a TCI word
    pub fn to_tci(&self) -> u16 {
        let dei = if self.dei { DEI_MASK } else { 0 };
        ((self.priority as u16) << 13) | dei | self.vlan_id
    }

    /// Decode a TCI word (no range check: VID 0 and 4095 appear on the wire)
    pub fn from_tci(tci: u16) -> Self {
        Self {
            vlan_id: tci & VLAN_ID_MASK,
            priority: (tci >> 13) as u8,
            dei: tci & DEI_MASK != 0,
        }
    }
}

/// The part of a tagged frame after the outer `0x8100`
#[derive(Debug, Clone)]
pub struct VlanFrame {
    pub tag: VlanTag,
    pub ethertype: EtherType,
    pub payload: Vec<u8>,
}

impl VlanFrame {
    /// TCI plus inner EtherType
    pub const HEADER_SIZE: usize = 4;

    pub fn new(tag: VlanTag, ethertype: EtherType, payload: Vec<u8>) -> Self {
        Self {
            tag,
            ethertype,
            payload,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buffer = BytesMut::with_capacity(Self::HEADER_SIZE + self.payload.len());
        buffer.put_u16(self.tag.to_tci());
        buffer.put_u16(self.ethertype.to_u16());
        buffer.put_slice(&self.payload);
        buffer.to_vec()
    }

    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < Self::HEADER_SIZE {
            return None;
        }

        Some(Self {
            tag: VlanTag::from_tci(u16::from_be_bytes([data[0], data[1]])),
            ethertype: EtherType::from_u16(u16::from_be_bytes([data[2], data[3]])),
            payload: data[Self::HEADER_SIZE..].to_vec(),
        })
    }
}

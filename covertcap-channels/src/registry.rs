//! Channel registry for lookup by short name
//!
//! The CLI and the synthesizer pick codecs by the short names registered
//! here (`dns`, `http`, `ipid`, `tls`).

use crate::{DnsLabelChannel, HttpHeaderChannel, IpidTimestampChannel, TlsLengthChannel};
use covertcap_core::{ChannelDescriptor, CovertChannel, Error, Result};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Summary of a registered channel
#[derive(Debug, Clone)]
pub struct ChannelInfo {
    pub shortname: String,
    pub name: String,
    pub descriptor: ChannelDescriptor,
}

/// Registry of available channels, keyed by short name
#[derive(Default)]
pub struct ChannelRegistry {
    channels: HashMap<String, Box<dyn CovertChannel>>,
}

impl ChannelRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the four built-in channels with default parameters
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        let defaults: [Box<dyn CovertChannel>; 4] = [
            Box::new(DnsLabelChannel::default()),
            Box::new(HttpHeaderChannel::default()),
            Box::new(IpidTimestampChannel::default()),
            Box::new(TlsLengthChannel::default()),
        ];
        for channel in defaults {
            // Short names of the built-ins are distinct
            if let Err(e) = registry.register(channel) {
                warn!(error = %e, "skipping built-in channel");
            }
        }
        registry
    }

    /// Register a channel
    ///
    /// Returns an error if a channel with the same short name is already registered.
    pub fn register(&mut self, channel: Box<dyn CovertChannel>) -> Result<()> {
        let shortname = channel.shortname().to_string();
        if self.channels.contains_key(&shortname) {
            warn!(shortname = %shortname, "channel already registered");
            return Err(Error::AlreadyExists(format!(
                "channel '{}' already registered",
                shortname
            )));
        }

        info!(
            shortname = %shortname,
            name = channel.name(),
            descriptor = %channel.descriptor(),
            "registered channel"
        );
        self.channels.insert(shortname, channel);
        Ok(())
    }

    /// Remove a channel by short name, returning it
    pub fn unregister(&mut self, shortname: &str) -> Result<Box<dyn CovertChannel>> {
        debug!(shortname, "unregistering channel");
        self.channels
            .remove(shortname)
            .ok_or_else(|| Error::NotFound(format!("channel '{}' not registered", shortname)))
    }

    /// Look up a channel by short name
    pub fn get(&self, shortname: &str) -> Result<&dyn CovertChannel> {
        match self.channels.get(shortname) {
            Some(channel) => Ok(channel.as_ref()),
            None => Err(Error::NotFound(format!(
                "unknown channel '{}' (available: {})",
                shortname,
                self.shortnames().join(", ")
            ))),
        }
    }

    pub fn contains(&self, shortname: &str) -> bool {
        self.channels.contains_key(shortname)
    }

    /// Registered short names, sorted
    pub fn shortnames(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.channels.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Summaries of every registered channel, sorted by short name
    pub fn list(&self) -> Vec<ChannelInfo> {
        let mut infos: Vec<ChannelInfo> = self
            .channels
            .values()
            .map(|channel| ChannelInfo {
                shortname: channel.shortname().to_string(),
                name: channel.name().to_string(),
                descriptor: channel.descriptor().clone(),
            })
            .collect();
        infos.sort_by(|a, b| a.shortname.cmp(&b.shortname));
        infos
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use covertcap_core::{EncodeContext, Message};

    #[test]
    fn test_registry_defaults() {
        let registry = ChannelRegistry::with_defaults();
        assert_eq!(registry.len(), 4);
        assert_eq!(registry.shortnames(), vec!["dns", "http", "ipid", "tls"]);
        assert!(registry.contains("tls"));
        assert!(!registry.contains("icmp"));
    }

    #[test]
    fn test_registry_duplicate_registration() {
        let mut registry = ChannelRegistry::with_defaults();
        let err = registry.register(Box::new(DnsLabelChannel::default())).unwrap_err();
        assert!(matches!(err, Error::AlreadyExists(_)));
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn test_registry_get() {
        let registry = ChannelRegistry::with_defaults();
        let channel = registry.get("ipid").unwrap();
        assert_eq!(channel.shortname(), "ipid");

        let msg = Message::compose("k", "TDHCTF{f}");
        let frames = channel.encode(&msg, &mut EncodeContext::default()).unwrap();
        assert_eq!(channel.decode(&frames).bytes, msg);

        match registry.get("icmp") {
            Err(Error::NotFound(msg)) => assert!(msg.contains("dns, http, ipid, tls")),
            _ => panic!("expected NotFound"),
        }
    }

    #[test]
    fn test_registry_list_and_unregister() {
        let mut registry = ChannelRegistry::with_defaults();
        let list = registry.list();
        assert_eq!(list.len(), 4);
        assert_eq!(list[0].shortname, "dns");
        assert_eq!(list[0].descriptor, DnsLabelChannel::default_descriptor());

        let removed = registry.unregister("http").unwrap();
        assert_eq!(removed.shortname(), "http");
        assert!(registry.unregister("http").is_err());
        assert_eq!(registry.len(), 3);

        let mut empty = ChannelRegistry::new();
        assert!(empty.is_empty());
        assert!(empty.get("dns").is_err());
        empty.register(removed).unwrap();
        assert_eq!(empty.shortnames(), vec!["http"]);
    }
}

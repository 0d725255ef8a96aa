//! Protocol limits and decoding policy.

use serde::{Deserialize, Serialize};

/// What the decoder does with a tag it has never heard of.
///
/// Tags in the extension range (`0xC0..=0xFF`) always carry a length
/// prefix and are skipped safely no matter what this is set to. The
/// policy only applies to unknown tags below that range, which the
/// protocol defines as zero-width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UnknownTagPolicy {
    /// Decode it as a tag-only notification (forward compatible).
    #[default]
    Notify,
    /// Fail the packet with `ProtocolError::UnknownType`.
    Reject,
}

/// Limits and policy shared by the framer, dispatcher and outbox.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Most messages one batch may declare. Larger outbound groups are
    /// split; larger inbound declarations are rejected before decoding.
    pub max_batch_messages: u32,

    /// Longest string (in bytes) accepted on encode or decode.
    pub max_string_len: usize,

    /// Handling of unknown zero-width tags.
    pub unknown_tags: UnknownTagPolicy,

    /// Send a group holding exactly one message without a batch header.
    pub unbatched_singletons: bool,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            max_batch_messages: 1024,
            max_string_len: 4096,
            unknown_tags: UnknownTagPolicy::default(),
            unbatched_singletons: false,
        }
    }
}

impl ProtocolConfig {
    /// Hard ceiling for `max_batch_messages`.
    pub const MAX_BATCH_MESSAGES: u32 = 65_535;

    /// Hard ceiling for `max_string_len` (1 MiB).
    pub const MAX_STRING_LEN: usize = 1 << 20;

    /// Clamps out-of-range values so the config is safe to use.
    ///
    /// Both limits are forced into `1..=` their ceiling.
    pub fn validated(mut self) -> Self {
        if self.max_batch_messages == 0 || self.max_batch_messages > Self::MAX_BATCH_MESSAGES {
            tracing::warn!(
                value = self.max_batch_messages,
                "max_batch_messages out of range, clamping"
            );
            self.max_batch_messages = self.max_batch_messages.clamp(1, Self::MAX_BATCH_MESSAGES);
        }
        if self.max_string_len == 0 || self.max_string_len > Self::MAX_STRING_LEN {
            tracing::warn!(
                value = self.max_string_len,
                "max_string_len out of range, clamping"
            );
            self.max_string_len = self.max_string_len.clamp(1, Self::MAX_STRING_LEN);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ProtocolConfig::default();
        assert_eq!(config.max_batch_messages, 1024);
        assert_eq!(config.max_string_len, 4096);
        assert_eq!(config.unknown_tags, UnknownTagPolicy::Notify);
        assert!(!config.unbatched_singletons);
    }

    #[test]
    fn test_validated_clamps_limits() {
        let config = ProtocolConfig {
            max_batch_messages: 0,
            max_string_len: usize::MAX,
            ..ProtocolConfig::default()
        }
        .validated();
        assert_eq!(config.max_batch_messages, 1);
        assert_eq!(config.max_string_len, ProtocolConfig::MAX_STRING_LEN);
    }

    #[test]
    fn test_validated_keeps_sane_values() {
        let config = ProtocolConfig {
            max_batch_messages: 8,
            max_string_len: 64,
            ..ProtocolConfig::default()
        }
        .validated();
        assert_eq!(config.max_batch_messages, 8);
        assert_eq!(config.max_string_len, 64);
    }
}

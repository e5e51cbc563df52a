//! Key-value key types and traits.

use std::fmt;
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use parley_core::ConversationAddress;

use crate::Error;

/// Separator between key tokens; also the NATS subject token separator.
const TOKEN_SEPARATOR: char = '.';

/// Leading character of every token. Outside the base64url alphabet, and
/// keeps the token non-empty for an empty identifier.
const TOKEN_PREFIX: char = '=';

/// Marker trait for KV key types.
///
/// This trait defines how keys are formatted for storage in NATS KV.
pub trait KvKey: fmt::Debug + fmt::Display + FromStr + Clone + Send + Sync + 'static {}

/// Key of one conversation message.
///
/// Formatted as `<conversation>.<message>` where each token is `=` followed
/// by the URL-safe base64 (no padding) of the identifier. Any identifier,
/// the empty one included, stays within the NATS key alphabet.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageKey(pub ConversationAddress);

impl KvKey for MessageKey {}

impl MessageKey {
    /// Returns the address this key points to.
    #[inline]
    pub fn address(&self) -> &ConversationAddress {
        &self.0
    }

    /// Returns the watch filter matching every message of a conversation.
    pub fn conversation_filter(conversation_id: &str) -> String {
        format!("{}{TOKEN_SEPARATOR}>", encode_token(conversation_id))
    }
}

impl fmt::Display for MessageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{TOKEN_SEPARATOR}{}",
            encode_token(self.0.conversation_id()),
            encode_token(self.0.message_id())
        )
    }
}

impl FromStr for MessageKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (conversation, message) = s
            .split_once(TOKEN_SEPARATOR)
            .ok_or_else(|| Error::invalid_key(s, "missing token separator"))?;

        Ok(Self(ConversationAddress::new(
            decode_token(s, conversation)?,
            decode_token(s, message)?,
        )))
    }
}

impl From<ConversationAddress> for MessageKey {
    fn from(address: ConversationAddress) -> Self {
        Self(address)
    }
}

impl From<MessageKey> for ConversationAddress {
    fn from(key: MessageKey) -> Self {
        key.0
    }
}

fn encode_token(id: &str) -> String {
    let mut token = String::from(TOKEN_PREFIX);
    URL_SAFE_NO_PAD.encode_string(id.as_bytes(), &mut token);
    token
}

fn decode_token(key: &str, token: &str) -> Result<String, Error> {
    let encoded = token
        .strip_prefix(TOKEN_PREFIX)
        .ok_or_else(|| Error::invalid_key(key, "token is missing its prefix"))?;
    let bytes = URL_SAFE_NO_PAD
        .decode(encoded)
        .map_err(|e| Error::invalid_key(key, e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| Error::invalid_key(key, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_valid_nats_key(key: &str) -> bool {
        !key.is_empty()
            && !key.starts_with('.')
            && !key.ends_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '/' | '_' | '=' | '.'))
    }

    fn key(conversation: &str, message: &str) -> MessageKey {
        MessageKey(ConversationAddress::new(conversation, message))
    }

    #[test]
    fn test_message_key_roundtrip() {
        let original = key("c1", "m1");
        let parsed: MessageKey = original.to_string().parse().unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_arbitrary_ids_produce_valid_keys() {
        let ids = [
            ("conv.with.dots", "msg>*"),
            ("spaces and ünïcödé", "🙂"),
            ("a/b\\c", "0190c8f2-1d7e-7a8b-9c0d-ffffffffffff"),
            ("", "m1"),
            ("c1", ""),
            ("", ""),
        ];

        for (conversation, message) in ids {
            let original = key(conversation, message);
            let encoded = original.to_string();
            assert!(is_valid_nats_key(&encoded), "invalid key: {encoded}");
            assert_eq!(encoded.matches('.').count(), 1);

            let parsed: MessageKey = encoded.parse().unwrap();
            assert_eq!(parsed.address().conversation_id(), conversation);
            assert_eq!(parsed.address().message_id(), message);
        }
    }

    #[test]
    fn test_conversation_filter_matches_keys() {
        let filter = MessageKey::conversation_filter("c1");
        let prefix = filter.trim_end_matches('>');
        assert!(key("c1", "m1").to_string().starts_with(prefix));
        assert!(!key("c2", "m1").to_string().starts_with(prefix));
    }

    #[test]
    fn test_empty_ids_encode_to_prefix_only() {
        assert_eq!(key("", "").to_string(), "=.=");
        assert_eq!(key("c1", "m1").to_string(), "=YzE.=bTE");
    }

    #[test]
    fn test_empty_conversation_filter_is_its_own() {
        let filter = MessageKey::conversation_filter("");
        let prefix = filter.trim_end_matches('>');
        assert!(key("", "m1").to_string().starts_with(prefix));
        assert!(!key("c1", "m1").to_string().starts_with(prefix));
    }

    #[test]
    fn test_invalid_keys_are_rejected() {
        assert!("no-separator".parse::<MessageKey>().is_err());
        assert!(".".parse::<MessageKey>().is_err());
        assert!("=YzE.=!!".parse::<MessageKey>().is_err());
        assert!("YzE.bTE".parse::<MessageKey>().is_err());
    }
}

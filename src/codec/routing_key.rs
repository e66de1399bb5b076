//! Routing key encoding and decoding.
//!
//! Wire format (`:` separated, at most [`MAX_KEY_LEN`] characters):
//!
//! ```text
//! domain:action[:target[:arg1:arg2:...]][:data:<token>]
//! ```
//!
//! An absent target followed by args or data is written as an empty segment.
//! The literal `data` segment, when it is second to last, marks the payload
//! token. Keys are never truncated: a key that does not fit fails to encode.

use std::collections::BTreeMap;
use std::fmt;

use super::PayloadCodec;
use crate::error::{DispatchError, Result};

/// Segment separator.
pub const SEPARATOR: char = ':';

/// Literal segment preceding the payload token.
pub const DATA_MARKER: &str = "data";

/// Maximum encoded length accepted by the platform.
pub const MAX_KEY_LEN: usize = 100;

/// Structured routing information carried by a UI component.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoutingKey {
    pub domain: String,
    pub action: String,
    pub target: Option<String>,
    pub args: Vec<String>,
    pub data: BTreeMap<String, serde_json::Value>,
}

impl RoutingKey {
    /// Start a key for `domain`/`action`.
    pub fn new(domain: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            action: action.into(),
            ..Default::default()
        }
    }

    /// Set the target. An empty target is treated as absent.
    pub fn target(mut self, target: impl Into<String>) -> Self {
        let target = target.into();
        self.target = (!target.is_empty()).then_some(target);
        self
    }

    /// Append one positional argument after the target.
    ///
    /// Arguments are validated on [`encode`](Self::encode), not here.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several positional arguments, keeping their order.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Add a payload entry.
    pub fn data(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    /// Get a positional argument.
    pub fn arg_at(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }

    /// Get a payload entry.
    pub fn data_value(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }

    /// Encode into the wire format.
    ///
    /// # Errors
    ///
    /// - [`DispatchError::MalformedKey`] if domain/action are empty or any
    ///   segment contains the separator or equals the data marker
    /// - [`DispatchError::KeyTooLong`] if the result exceeds [`MAX_KEY_LEN`]
    pub fn encode(&self) -> Result<String> {
        self.validate()?;

        let token = if self.data.is_empty() {
            None
        } else {
            Some(PayloadCodec::encode_token(&self.data)?)
        };

        let mut segments: Vec<&str> = vec![self.domain.as_str(), self.action.as_str()];
        let has_tail = !self.args.is_empty() || !self.data.is_empty();
        match &self.target {
            Some(target) => segments.push(target),
            None if has_tail => segments.push(""),
            None => {}
        }
        segments.extend(self.args.iter().map(String::as_str));

        if let Some(token) = &token {
            segments.push(DATA_MARKER);
            segments.push(token);
        }

        let encoded = segments.join(&SEPARATOR.to_string());
        let len = encoded.chars().count();
        if len > MAX_KEY_LEN {
            return Err(DispatchError::KeyTooLong {
                len,
                max: MAX_KEY_LEN,
            });
        }
        Ok(encoded)
    }

    /// Decode from the wire format.
    ///
    /// # Errors
    ///
    /// [`DispatchError::MalformedKey`] if fewer than two segments are present
    /// or domain/action are empty; payload decoding errors if the token is
    /// corrupt.
    pub fn decode(raw: &str) -> Result<Self> {
        let mut segments: Vec<&str> = raw.split(SEPARATOR).collect();
        if segments.len() < 2 {
            return Err(DispatchError::MalformedKey(format!(
                "expected at least domain and action in {raw:?}"
            )));
        }

        let mut data = BTreeMap::new();
        let n = segments.len();
        if n >= 4 && segments[n - 2] == DATA_MARKER {
            data = PayloadCodec::decode_token(segments[n - 1])?;
            segments.truncate(n - 2);
        }

        let domain = segments[0];
        let action = segments[1];
        if domain.is_empty() || action.is_empty() {
            return Err(DispatchError::MalformedKey(format!(
                "empty domain or action in {raw:?}"
            )));
        }

        let target = segments
            .get(2)
            .filter(|t| !t.is_empty())
            .map(|t| t.to_string());
        let args = segments
            .iter()
            .skip(3)
            .map(|s| s.to_string())
            .collect();

        Ok(Self {
            domain: domain.to_string(),
            action: action.to_string(),
            target,
            args,
            data,
        })
    }

    fn validate(&self) -> Result<()> {
        if self.domain.is_empty() || self.action.is_empty() {
            return Err(DispatchError::MalformedKey(
                "domain and action must be non-empty".to_string(),
            ));
        }
        let segments = [&self.domain, &self.action]
            .into_iter()
            .chain(self.target.iter())
            .chain(self.args.iter());
        for segment in segments {
            if segment.contains(SEPARATOR) {
                return Err(DispatchError::MalformedKey(format!(
                    "segment {segment:?} contains the separator"
                )));
            }
            if segment == DATA_MARKER {
                return Err(DispatchError::MalformedKey(format!(
                    "segment may not be the literal {DATA_MARKER:?}"
                )));
            }
        }
        Ok(())
    }
}

impl fmt::Display for RoutingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{SEPARATOR}{}", self.domain, self.action)?;
        if let Some(target) = &self.target {
            write!(f, "{SEPARATOR}{target}")?;
        }
        Ok(())
    }
}

/// Matches routing keys by domain and action; action `*` matches any action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMatcher {
    domain: String,
    action: String,
}

impl KeyMatcher {
    /// Matcher for `domain` and `action`. Pass `*` as the action to accept
    /// any action in the domain.
    pub fn new(domain: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            action: action.into(),
        }
    }

    /// Matcher for every action in `domain`.
    pub fn domain(domain: impl Into<String>) -> Self {
        Self::new(domain, "*")
    }

    /// True when `key` is in this domain and its action matches. Target,
    /// args and data are not considered.
    pub fn matches(&self, key: &RoutingKey) -> bool {
        key.domain == self.domain && (self.action == "*" || key.action == self.action)
    }

    /// Decode `custom_id` and match it. Undecodable ids never match.
    pub fn matches_custom_id(&self, custom_id: &str) -> bool {
        RoutingKey::decode(custom_id)
            .map(|key| self.matches(&key))
            .unwrap_or(false)
    }
}

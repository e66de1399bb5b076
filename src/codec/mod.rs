//! Codec module - routing keys carried through UI components.
//!
//! - [`RoutingKey`] - domain/action/target/args/data packed into a
//!   colon separated string no longer than [`MAX_KEY_LEN`]
//! - [`PayloadCodec`] - MessagePack + base64url token for the optional
//!   structured `data` payload
//! - [`KeyMatcher`] - coarse `(domain, action)` matcher with `*` wildcard
//!
//! # Example
//!
//! ```
//! use interaction_dispatch::codec::RoutingKey;
//!
//! let key = RoutingKey::new("create", "confirm_race")
//!     .target("char_123")
//!     .arg("human");
//! let encoded = key.encode().unwrap();
//! assert_eq!(encoded, "create:confirm_race:char_123:human");
//!
//! let decoded = RoutingKey::decode(&encoded).unwrap();
//! assert_eq!(decoded.target.as_deref(), Some("char_123"));
//! assert_eq!(decoded.args, vec!["human"]);
//! ```

mod payload;
mod routing_key;

pub use payload::PayloadCodec;
pub use routing_key::{KeyMatcher, RoutingKey, DATA_MARKER, MAX_KEY_LEN, SEPARATOR};

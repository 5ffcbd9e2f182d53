//! Cart token type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`CartToken`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// The input is empty after trimming.
    #[error("cart token cannot be empty")]
    Empty,
    /// The input is too long.
    #[error("cart token must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input contains a character outside visible ASCII.
    #[error("cart token contains an invalid character")]
    InvalidCharacter,
}

/// An opaque cart token supplied by the client.
///
/// The token is a lookup key into the shared token store; it carries no
/// meaning of its own. Clients send it either in a request header, to act as
/// the token's identity for that request, or in a query parameter, to claim
/// the token's carts into their browser session.
///
/// ## Constraints
///
/// - Surrounding whitespace is trimmed
/// - Length: 1-255 characters
/// - Visible ASCII only (`!` through `~`)
///
/// ## Examples
///
/// ```
/// use cartgate_core::CartToken;
///
/// assert!(CartToken::parse("f81d4fae-7dec-11d0-a765-00a0c91e6bf6").is_ok());
/// assert_eq!(CartToken::parse("  abc  ").unwrap().as_str(), "abc");
///
/// assert!(CartToken::parse("").is_err());
/// assert!(CartToken::parse("has space").is_err());
/// ```
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct CartToken(String);

impl CartToken {
    /// Maximum length of a cart token.
    pub const MAX_LENGTH: usize = 255;

    /// Parse a `CartToken` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the trimmed input is empty, longer than 255
    /// characters, or contains anything other than visible ASCII.
    pub fn parse(s: &str) -> Result<Self, TokenError> {
        let s = s.trim();

        if s.is_empty() {
            return Err(TokenError::Empty);
        }

        if s.len() > Self::MAX_LENGTH {
            return Err(TokenError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        if !s.bytes().all(|b| b.is_ascii_graphic()) {
            return Err(TokenError::InvalidCharacter);
        }

        Ok(Self(s.to_owned()))
    }

    /// Returns the token as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Tokens act as bearer credentials for carts; keep them out of logs.
impl fmt::Debug for CartToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix: String = self.0.chars().take(4).collect();
        write!(f, "CartToken({prefix}…)")
    }
}

impl TryFrom<String> for CartToken {
    type Error = TokenError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CartToken> for String {
    fn from(token: CartToken) -> Self {
        token.0
    }
}

impl AsRef<str> for CartToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

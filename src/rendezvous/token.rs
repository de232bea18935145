use std::fmt;

use crate::common::error::{Error, Result};

/// Length of a rendered token: 128 bits as lowercase hex.
pub const TOKEN_LEN: usize = 32;

/// One-shot value proving that a write on the rendezvous channel came from
/// the hook installed for this insertion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    pub fn generate() -> Self {
        Token(format!("{:032x}", rand::random::<u128>()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        if text.len() != TOKEN_LEN {
            return Err(Error::RendezvousIntegrity(format!(
                "token must be {TOKEN_LEN} characters, got {}",
                text.len()
            )));
        }
        if !text.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
            return Err(Error::RendezvousIntegrity("token must be lowercase hex".into()));
        }
        Ok(Token(text.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

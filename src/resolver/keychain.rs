//! Credential storage consulted by encrypted-layer helpers
//!
//! Secrets are keyed by (spec comparable, credential name); the core never
//! interprets them beyond handing the bytes to a transform.

use std::collections::HashMap;

/// A stored secret
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    Bytes(Vec<u8>),
    Str(String),
}

impl Credential {
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Credential::Bytes(bytes) => bytes.clone(),
            Credential::Str(text) => text.as_bytes().to_vec(),
        }
    }
}

#[derive(Debug, Default)]
pub struct KeyChain {
    credentials: HashMap<(String, String), Credential>,
}

impl KeyChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// `spec_key` is the comparable rendering of the spec the credential
    /// belongs to.
    pub fn set(&mut self, spec_key: &str, name: &str, value: Credential) {
        self.credentials
            .insert((spec_key.to_string(), name.to_string()), value);
    }

    pub fn get(&self, spec_key: &str, name: &str) -> Option<&Credential> {
        self.credentials
            .get(&(spec_key.to_string(), name.to_string()))
    }

    pub fn remove(&mut self, spec_key: &str, name: &str) -> Option<Credential> {
        self.credentials
            .remove(&(spec_key.to_string(), name.to_string()))
    }

    pub fn clear(&mut self) {
        self.credentials.clear();
    }
}

//! Probe registry: maps probe kinds to constructors.
//!
//! The orchestrator only sees [`ProbeRegistry::build`]; adding a probe kind is
//! a matter of registering one more constructor.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::config::ProbeSpec;

use super::cloudflared::{CloudflaredTunnelProbe, CLOUDFLARED_TUNNEL_KIND};
use super::Probe;

/// Builds a probe from its spec
pub type ProbeConstructor =
    Arc<dyn Fn(&ProbeSpec) -> Result<Box<dyn Probe>, RegistryError> + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("unknown probe kind: {0}")]
    UnknownKind(String),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Kind-keyed table of probe constructors.
#[derive(Clone)]
pub struct ProbeRegistry {
    constructors: HashMap<String, ProbeConstructor>,
}

impl ProbeRegistry {
    /// A registry with no kinds registered.
    pub fn empty() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// Register (or replace) the constructor for `kind`.
    pub fn register(&mut self, kind: impl Into<String>, constructor: ProbeConstructor) -> &mut Self {
        self.constructors.insert(kind.into(), constructor);
        self
    }

    /// Build a probe for `spec`, failing on kinds nobody registered.
    pub fn build(&self, spec: &ProbeSpec) -> Result<Box<dyn Probe>, RegistryError> {
        let constructor = self
            .constructors
            .get(&spec.kind)
            .ok_or_else(|| RegistryError::UnknownKind(spec.kind.clone()))?;

        constructor(spec)
    }

    /// Registered kinds, sorted
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }
}

impl Default for ProbeRegistry {
    /// The built-in probe kinds.
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(
            CLOUDFLARED_TUNNEL_KIND,
            Arc::new(
                |spec: &ProbeSpec| -> Result<Box<dyn Probe>, RegistryError> {
                    Ok(Box::new(CloudflaredTunnelProbe::new(spec)?))
                },
            ),
        );
        registry
    }
}

impl fmt::Debug for ProbeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProbeRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}

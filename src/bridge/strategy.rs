//! How the bridge hands a context to a mounted pipeline.

use serde::{Deserialize, Serialize};

/// Bridging strategy, chosen once per deployment.
///
/// - `Alias`: the pipeline runs against the caller's context itself, after
///   the prefix rewrite. Nothing is copied. The caller must not reuse the
///   context for anything but reading the outcome.
/// - `Clone`: the pipeline runs against an independent copy. The caller's
///   context keeps its headers, route values and path fields; only the body
///   stream is shared by handle and may be consumed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BridgeStrategy {
    #[default]
    Alias,
    Clone,
}

impl BridgeStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            BridgeStrategy::Alias => "alias",
            BridgeStrategy::Clone => "clone",
        }
    }
}

impl std::fmt::Display for BridgeStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BridgeStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "alias" => Ok(BridgeStrategy::Alias),
            "clone" => Ok(BridgeStrategy::Clone),
            other => Err(format!("unknown bridge strategy `{}` (expected alias or clone)", other)),
        }
    }
}

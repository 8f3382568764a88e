use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

const MASK: &str = "********";

/// Secret authorizing calls to the inference backend.
///
/// Formatting and default serialization both render a fixed mask. The raw
/// value is only reachable through [`Credential::reveal`] or the explicit
/// [`reveal_credential`] serializer used when building a transport payload.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
  pub fn new(secret: impl Into<String>) -> Self {
    Self(secret.into())
  }

  /// Expose the secret. Call this only at the backend handoff.
  pub fn reveal(&self) -> &str {
    &self.0
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }
}

impl fmt::Debug for Credential {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Credential({MASK})")
  }
}

impl fmt::Display for Credential {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(MASK)
  }
}

impl Serialize for Credential {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(MASK)
  }
}

impl<'de> Deserialize<'de> for Credential {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    String::deserialize(deserializer).map(Credential)
  }
}

/// `serialize_with` hook that writes the real secret.
pub fn reveal_credential<S: Serializer>(
  credential: &Credential,
  serializer: S,
) -> Result<S::Ok, S::Error> {
  serializer.serialize_str(credential.reveal())
}

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ProviderId;

/// Well-known envelope field names shared by all adapters.
pub mod fields {
    pub const POSTAL_CODE: &str = "postal_code";
    pub const CITY: &str = "city";
    pub const REGION: &str = "region";
    pub const STREET: &str = "street";
    pub const NEIGHBORHOOD: &str = "neighborhood";
}

/// Normalized, provider-tagged answer to a query.
///
/// Adapters map their upstream schema onto named string fields so the coordinator
/// and the caller never see provider-specific shapes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultEnvelope {
    provider: ProviderId,
    fields: BTreeMap<String, String>,
}

impl ResultEnvelope {
    #[must_use]
    pub fn new(provider: ProviderId) -> Self {
        Self {
            provider,
            fields: BTreeMap::new(),
        }
    }

    /// Adds a field. Blank values are dropped so a missing upstream attribute and an
    /// empty one look the same to the caller.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl AsRef<str>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl AsRef<str>) {
        let value = value.as_ref().trim();
        if !value.is_empty() {
            self.fields.insert(name.into(), value.to_owned());
        }
    }

    #[must_use]
    pub fn provider(&self) -> &ProviderId {
        &self.provider
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    #[must_use]
    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

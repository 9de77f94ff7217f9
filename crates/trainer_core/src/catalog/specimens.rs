use serde::{Deserialize, Serialize};

use crate::procedure::{DEFAULT_HELPER_PREFIX, DEFAULT_PIN_PICKUP};
use crate::registry::TargetId;

const BUILTIN_CATALOG: &str = include_str!("../../../../assets/specimens/insects.json");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InsectInfo {
    pub key: String,
    pub common_name: String,
    pub scientific_name: String,
    pub pinning_method: String,
    pub order: String,
    pub helpers: Vec<TargetId>,
}

impl InsectInfo {
    /// Multi-line card shown in the insect viewer.
    pub fn describe(&self) -> String {
        format!(
            "Common Name: {}\nScientific Name: {}\nPinning Method: {}\nOrder: {}\nPins required: {}",
            self.common_name,
            self.scientific_name,
            self.pinning_method,
            self.order,
            self.helpers.len()
        )
    }
}

fn default_helper_prefix() -> String {
    DEFAULT_HELPER_PREFIX.to_string()
}

fn default_pin_pickup() -> String {
    DEFAULT_PIN_PICKUP.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpecimenCatalog {
    #[serde(default = "default_helper_prefix")]
    pub helper_prefix: String,
    #[serde(default = "default_pin_pickup")]
    pub pin_pickup: String,
    pub insects: Vec<InsectInfo>,
}

impl SpecimenCatalog {
    pub fn builtin() -> Self {
        serde_json::from_str(BUILTIN_CATALOG).expect("built-in specimen catalog should parse")
    }

    pub fn find(&self, key: &str) -> Option<&InsectInfo> {
        self.insects.iter().find(|insect| insect.key == key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.insects.iter().map(|insect| insect.key.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.insects.is_empty()
    }
}

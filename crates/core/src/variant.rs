//! Processing variants ("model choice").
//!
//! A variant selects which executor processes a job. The set is fixed;
//! anything outside it is rejected before a job is created.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Caller-selected processing strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    Model1,
    Model2,
    Model3,
}

impl Variant {
    /// Every variant, in declaration order.
    pub const ALL: [Variant; 3] = [Variant::Model1, Variant::Model2, Variant::Model3];

    /// Wire name (`model1`, `model2`, `model3`).
    pub fn name(self) -> &'static str {
        match self {
            Self::Model1 => "model1",
            Self::Model2 => "model2",
            Self::Model3 => "model3",
        }
    }

    /// Parse from the wire name.
    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        Self::ALL
            .into_iter()
            .find(|v| v.name() == name)
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "Invalid model_choice '{name}'. Must be one of: model1, model2, model3"
                ))
            })
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Variant {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parses_every_wire_name() {
        for variant in Variant::ALL {
            assert_eq!(Variant::from_name(variant.name()).unwrap(), variant);
        }
    }

    #[test]
    fn rejects_unknown_name() {
        assert_matches!(Variant::from_name("model4"), Err(CoreError::Validation(_)));
        assert_matches!("".parse::<Variant>(), Err(CoreError::Validation(_)));
    }

    #[test]
    fn names_are_case_sensitive() {
        assert!(Variant::from_name("MODEL1").is_err());
    }

    #[test]
    fn serializes_as_lowercase_name() {
        let json = serde_json::to_string(&Variant::Model2).unwrap();
        assert_eq!(json, "\"model2\"");
    }
}

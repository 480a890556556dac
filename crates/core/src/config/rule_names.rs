//! Rule-name whitelist.
//!
//! Templates may only declare rules whose names appear in the whitelist for
//! their type. Templates without a type use the flat `default` list.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::Error;

const GENERAL_NAMES: &[&str] = &["publish_datetime"];

const PRODUCT_NAMES: &[&str] = &[
    "title",
    "description",
    "price",
    "low_price",
    "currency",
    "availability",
    "brand",
    "image_urls",
    "color",
    "size",
    "material",
    "fit",
    "gender",
    "category",
];

/// Allowed rule names, optionally partitioned by template type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleNames {
    /// Names allowed for templates that declare no type.
    #[serde(default = "default_names")]
    pub default: Vec<String>,

    /// Names allowed per template type (e.g. `general`, `product`).
    #[serde(default = "default_by_type")]
    pub by_type: BTreeMap<String, Vec<String>>,
}

fn to_owned(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

/// Untyped templates may use any built-in name.
fn default_names() -> Vec<String> {
    let mut names = to_owned(GENERAL_NAMES);
    names.extend(to_owned(PRODUCT_NAMES));
    names
}

fn default_by_type() -> BTreeMap<String, Vec<String>> {
    BTreeMap::from([
        ("general".to_string(), to_owned(GENERAL_NAMES)),
        ("product".to_string(), to_owned(PRODUCT_NAMES)),
    ])
}

impl Default for RuleNames {
    fn default() -> Self {
        Self { default: default_names(), by_type: default_by_type() }
    }
}

impl RuleNames {
    /// A single flat whitelist with no type partitioning.
    pub fn flat<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { default: names.into_iter().map(Into::into).collect(), by_type: BTreeMap::new() }
    }

    /// Names allowed for a template of the given type.
    ///
    /// Type lookup is case-insensitive. An unknown type is a validation error.
    pub fn allowed(&self, kind: Option<&str>) -> Result<&[String], Error> {
        let Some(kind) = kind else {
            return Ok(&self.default);
        };

        self.by_type
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(kind))
            .map(|(_, names)| names.as_slice())
            .ok_or_else(|| Error::InvalidTemplate(format!("unknown template type: {kind}")))
    }

    /// Whether `name` is allowed for a template of the given type.
    pub fn contains(&self, kind: Option<&str>, name: &str) -> Result<bool, Error> {
        Ok(self.allowed(kind)?.iter().any(|n| n.eq_ignore_ascii_case(name)))
    }
}

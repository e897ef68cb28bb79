//! Per-tag-name policy flags.
//!
//! The [`TagRegistry`] is consulted by the parser (implicit close, raw body,
//! attribute syntax) and by text filters (line-break normalization). Names
//! without an explicit entry resolve to the registry's default policy; a
//! registry built with [`TagRegistry::closed`] has no default, so unregistered
//! names are unknown tags.
//!
//! # Configuration
//!
//! Registries can be loaded from YAML:
//!
//! ```rust
//! use bbtransform::TagRegistry;
//!
//! let registry = TagRegistry::from_yaml(r#"
//! tags:
//!   code: { raw_body: true }
//!   "*": { implicit_close: true }
//! "#).unwrap();
//!
//! assert!(registry.resolve("code").unwrap().raw_body);
//! assert!(registry.resolve("*").unwrap().implicit_close);
//! assert!(registry.resolve("b").unwrap().attributes);
//! ```

use serde::Deserialize;
use std::collections::HashMap;

use crate::error::ConfigError;

/// Independent policy flags for one tag name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TagPolicy {
    /// Closed by a same-name sibling, the enclosing tag's close, or end of input.
    pub implicit_close: bool,
    /// Body is captured verbatim up to the matching closing marker.
    pub raw_body: bool,
    /// `name=value` syntax is recognized inside the opening marker.
    pub attributes: bool,
    /// Render-time hint: convert newlines in the body to explicit breaks.
    pub normalize_line_breaks: bool,
}

impl Default for TagPolicy {
    fn default() -> Self {
        Self {
            implicit_close: false,
            raw_body: false,
            attributes: true,
            normalize_line_breaks: true,
        }
    }
}

impl TagPolicy {
    /// Policy for list-item style tags such as `[*]`.
    pub fn implicit() -> Self {
        Self {
            implicit_close: true,
            ..Self::default()
        }
    }

    /// Policy for literal blocks such as `[code]` or `[noparse]`.
    pub fn raw() -> Self {
        Self {
            raw_body: true,
            ..Self::default()
        }
    }

    /// All flags off.
    pub fn plain() -> Self {
        Self {
            implicit_close: false,
            raw_body: false,
            attributes: false,
            normalize_line_breaks: false,
        }
    }

    pub fn implicit_close(mut self, value: bool) -> Self {
        self.implicit_close = value;
        self
    }

    pub fn raw_body(mut self, value: bool) -> Self {
        self.raw_body = value;
        self
    }

    pub fn attributes(mut self, value: bool) -> Self {
        self.attributes = value;
        self
    }

    pub fn normalize_line_breaks(mut self, value: bool) -> Self {
        self.normalize_line_breaks = value;
        self
    }
}

/// Map from tag name to [`TagPolicy`], plus an optional default policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRegistry {
    tags: HashMap<String, TagPolicy>,
    default: Option<TagPolicy>,
}

impl Default for TagRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RegistryFile {
    #[serde(default = "default_policy")]
    default: Option<TagPolicy>,
    #[serde(default)]
    tags: HashMap<String, TagPolicy>,
}

fn default_policy() -> Option<TagPolicy> {
    Some(TagPolicy::default())
}

impl TagRegistry {
    /// Creates a registry where every unregistered name gets [`TagPolicy::default`].
    pub fn new() -> Self {
        Self {
            tags: HashMap::new(),
            default: Some(TagPolicy::default()),
        }
    }

    /// Creates a registry that only knows explicitly registered names.
    pub fn closed() -> Self {
        Self {
            tags: HashMap::new(),
            default: None,
        }
    }

    /// Loads a registry from YAML with optional `default` and `tags` keys.
    ///
    /// An explicit `default: ~` produces a closed registry.
    pub fn from_yaml(source: &str) -> Result<Self, ConfigError> {
        let file: RegistryFile = serde_yaml::from_str(source)?;
        Ok(Self {
            tags: file.tags,
            default: file.default,
        })
    }

    /// Registers `policy` for `name`, replacing any previous entry.
    pub fn tag(mut self, name: impl Into<String>, policy: TagPolicy) -> Self {
        self.insert(name, policy);
        self
    }

    /// Replaces the default policy. `None` closes the registry.
    pub fn default_policy(mut self, policy: Option<TagPolicy>) -> Self {
        self.default = policy;
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, policy: TagPolicy) {
        self.tags.insert(name.into(), policy);
    }

    /// Returns the policy for `name`, falling back to the default policy.
    pub fn resolve(&self, name: &str) -> Option<&TagPolicy> {
        self.tags.get(name).or(self.default.as_ref())
    }

    /// Policy applied to text outside any tag.
    pub fn root_policy(&self) -> TagPolicy {
        self.default.unwrap_or_default()
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.tags.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unregistered_names_use_default() {
        let registry = TagRegistry::new().tag("code", TagPolicy::raw());
        assert_eq!(registry.resolve("b"), Some(&TagPolicy::default()));
        assert!(registry.resolve("code").unwrap().raw_body);
        assert!(!registry.is_registered("b"));
    }

    #[test]
    fn closed_registry_rejects_unknown_names() {
        let registry = TagRegistry::closed().tag("b", TagPolicy::default());
        assert!(registry.resolve("b").is_some());
        assert!(registry.resolve("i").is_none());
        assert_eq!(registry.root_policy(), TagPolicy::default());
    }

    #[test]
    fn star_is_an_ordinary_name() {
        let registry = TagRegistry::new().tag("*", TagPolicy::implicit());
        assert!(registry.resolve("*").unwrap().implicit_close);
        assert!(!registry.resolve("list").unwrap().implicit_close);
    }

    #[test]
    fn policy_builders() {
        let policy = TagPolicy::plain().attributes(true).normalize_line_breaks(true);
        assert_eq!(policy, TagPolicy::default());
        assert!(TagPolicy::implicit().attributes);
        assert!(TagPolicy::raw().implicit_close(true).implicit_close);
        assert!(TagPolicy::raw().raw_body(false) == TagPolicy::default());
    }

    #[test]
    fn yaml_fills_missing_flags() {
        let registry = TagRegistry::from_yaml(
            r#"
default:
  normalize_line_breaks: false
tags:
  list: { attributes: false }
"#,
        )
        .unwrap();

        let list = registry.resolve("list").unwrap();
        assert!(!list.attributes);
        assert!(list.normalize_line_breaks);
        assert!(!registry.root_policy().normalize_line_breaks);
    }

    #[test]
    fn yaml_null_default_closes_registry() {
        let registry = TagRegistry::from_yaml("default: ~\ntags:\n  b: {}\n").unwrap();
        assert!(registry.resolve("b").is_some());
        assert!(registry.resolve("i").is_none());
    }

    #[test]
    fn yaml_empty_document_is_open_registry() {
        let registry = TagRegistry::from_yaml("{}").unwrap();
        assert_eq!(registry, TagRegistry::new());
    }

    #[test]
    fn yaml_unknown_flag_is_error() {
        let err = TagRegistry::from_yaml("tags:\n  b: { bogus: true }\n").unwrap_err();
        assert!(err.to_string().starts_with("invalid tag registry"));
    }
}

//! API-name namespace algebra.
//!
//! A custom artifact's API name is two or three segments joined by `__`:
//!
//! ```text
//! Foo__c          -> (none, Foo, c)
//! ns__Foo__c      -> (ns,   Foo, c)
//! ns__Bar__mdt    -> (ns,   Bar, mdt)
//! ```
//!
//! Only suffixes from the caller's allow-set are recognised; anything else is
//! "no match" rather than an error.

use std::fmt;

use crate::types::Namespace;

/// Segment separator inside an API name.
pub const SEPARATOR: &str = "__";

/// Recognised artifact suffixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeSuffix {
    CustomObject,
    CustomMetadataType,
    PlatformEvent,
    BigObject,
    CustomField,
}

impl TypeSuffix {
    /// The suffix as it appears in an API name.
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeSuffix::CustomObject => "c",
            TypeSuffix::CustomMetadataType => "mdt",
            TypeSuffix::PlatformEvent => "e",
            TypeSuffix::BigObject => "b",
            TypeSuffix::CustomField => "c",
        }
    }
}

/// Suffixes accepted for object-level artifacts.
pub const OBJECT_SUFFIXES: &[TypeSuffix] = &[
    TypeSuffix::CustomObject,
    TypeSuffix::CustomMetadataType,
    TypeSuffix::PlatformEvent,
    TypeSuffix::BigObject,
];

/// Suffixes accepted for fields.
pub const FIELD_SUFFIXES: &[TypeSuffix] = &[TypeSuffix::CustomField];

/// A parsed artifact API name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityName {
    pub namespace: Option<Namespace>,
    pub local_name: String,
    pub suffix: TypeSuffix,
}

impl EntityName {
    /// Parse `name` against `allowed`. Returns `None` when the segment count is
    /// not 2 or 3, a segment is empty, or the suffix is not allowed.
    pub fn parse(name: &str, allowed: &[TypeSuffix]) -> Option<EntityName> {
        let parts: Vec<&str> = name.split(SEPARATOR).collect();
        if !(2..=3).contains(&parts.len()) || parts.iter().any(|p| p.is_empty()) {
            return None;
        }
        let last = parts[parts.len() - 1];
        let suffix = allowed.iter().copied().find(|s| s.as_str() == last)?;
        let (namespace, local_name) = match parts.as_slice() {
            [local, _] => (None, *local),
            [ns, local, _] => (Some(Namespace::from(*ns)), *local),
            _ => return None,
        };
        Some(EntityName {
            namespace,
            local_name: local_name.to_string(),
            suffix,
        })
    }

    /// Parse an object API name (`__c`, `__mdt`, `__e`, `__b`).
    pub fn parse_object(name: &str) -> Option<EntityName> {
        Self::parse(name, OBJECT_SUFFIXES)
    }

    /// Parse a custom field API name (`__c` only).
    pub fn parse_field(name: &str) -> Option<EntityName> {
        Self::parse(name, FIELD_SUFFIXES)
    }

    /// `[ns__]name__suffix`
    pub fn full_name(&self) -> String {
        format!("{}{SEPARATOR}{}", self.developer_name(), self.suffix.as_str())
    }

    /// `[ns__]name`
    pub fn developer_name(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{ns}{SEPARATOR}{}", self.local_name),
            None => self.local_name.clone(),
        }
    }

    /// Attribute an unprefixed custom field to `namespace`.
    ///
    /// The remote API reports fields of the org's home namespace without a
    /// prefix; every other name (and every non-field) is returned unchanged.
    pub fn with_default_namespace(&self, namespace: Option<&Namespace>) -> EntityName {
        match (&self.namespace, self.suffix, namespace) {
            (None, TypeSuffix::CustomField, Some(ns)) => EntityName {
                namespace: Some(ns.clone()),
                ..self.clone()
            },
            _ => self.clone(),
        }
    }
}

impl fmt::Display for EntityName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("Foo__c", None, "Foo", TypeSuffix::CustomObject)]
    #[case("ns__Foo__c", Some("ns"), "Foo", TypeSuffix::CustomObject)]
    #[case("ns__Bar__mdt", Some("ns"), "Bar", TypeSuffix::CustomMetadataType)]
    #[case("Evt__e", None, "Evt", TypeSuffix::PlatformEvent)]
    #[case("ns__Big__b", Some("ns"), "Big", TypeSuffix::BigObject)]
    fn object_names_partition_by_namespace(
        #[case] name: &str,
        #[case] ns: Option<&str>,
        #[case] local: &str,
        #[case] suffix: TypeSuffix,
    ) {
        let parsed = EntityName::parse_object(name).expect("parse");
        assert_eq!(parsed.namespace, ns.map(Namespace::from));
        assert_eq!(parsed.local_name, local);
        assert_eq!(parsed.suffix, suffix);
        assert_eq!(parsed.full_name(), name);
    }

    #[rstest]
    #[case("ns__Baz__xyz")]
    #[case("Account")]
    #[case("a__b__c__c")]
    #[case("__c")]
    #[case("ns____c")]
    fn unrecognised_names_do_not_match(#[case] name: &str) {
        assert!(EntityName::parse_object(name).is_none());
    }

    #[test]
    fn field_allow_set_rejects_object_only_suffixes() {
        assert!(EntityName::parse_field("Bar__mdt").is_none());
        assert!(EntityName::parse_field("ns__Bar__c").is_some());
    }

    #[test]
    fn developer_name_omits_suffix() {
        let name = EntityName::parse_object("ns__Foo__c").unwrap();
        assert_eq!(name.developer_name(), "ns__Foo");
        let name = EntityName::parse_object("Foo__c").unwrap();
        assert_eq!(name.developer_name(), "Foo");
    }

    #[test]
    fn default_namespace_fills_unprefixed_fields_only() {
        let home = Namespace::from("H");
        let field = EntityName::parse_field("Bar__c").unwrap();
        assert_eq!(
            field.with_default_namespace(Some(&home)).namespace,
            Some(home.clone())
        );

        let prefixed = EntityName::parse_field("pkg__Bar__c").unwrap();
        assert_eq!(
            prefixed.with_default_namespace(Some(&home)).namespace,
            Some(Namespace::from("pkg"))
        );

        let object = EntityName::parse_object("Foo__c").unwrap();
        assert!(object.with_default_namespace(Some(&home)).namespace.is_none());

        assert!(field.with_default_namespace(None).namespace.is_none());
    }
}

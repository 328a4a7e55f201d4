//! Cache key construction.
//!
//! Every key has four colon-separated parts:
//!
//! ```text
//! <kind>:<shape>:<discriminator>:<environment>
//! dog:single:42:production
//! dog:page:1:10:id_asc:production
//! dog:filtered:9f86d08…:1:10:id_asc:production
//! ```
//!
//! The shape sits right after the entity kind, so `dog:page:*:production`
//! selects every cached page of dogs without touching single-entity keys.
//! Identifiers are percent-escaped so they can never introduce a separator
//! or a glob metacharacter. Filter parameters are reduced to a SHA-256 of
//! their canonical JSON.

use std::fmt::{self, Write as _};

use kennel_domain::{Entity, EntityKind, PageRequest};
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::{CacheError, CacheResult};

/// Structural kind of a cached value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    /// One entity by id
    Single,
    /// One page of the unfiltered listing
    Page,
    /// One page of a filtered listing
    Filtered,
}

impl Shape {
    pub const ALL: [Self; 3] = [Self::Single, Self::Page, Self::Filtered];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Page => "page",
            Self::Filtered => "filtered",
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully rendered cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    kind: EntityKind,
    shape: Shape,
    rendered: String,
}

impl CacheKey {
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn as_str(&self) -> &str {
        &self.rendered
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.rendered)
    }
}

/// Builds keys and invalidation patterns for one deployment environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBuilder {
    environment: String,
}

impl KeyBuilder {
    /// # Errors
    ///
    /// Rejects an empty environment tag or one containing `:` or glob
    /// metacharacters, since either would break pattern selection.
    pub fn new(environment: impl Into<String>) -> CacheResult<Self> {
        let environment = environment.into();
        if environment.is_empty() || environment.chars().any(is_reserved) {
            return Err(CacheError::InvalidKey(format!(
                "environment tag {environment:?} must be non-empty and free of ':*?[]\\%'"
            )));
        }
        Ok(Self { environment })
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Key for one entity by id.
    pub fn single<E: Entity>(&self, id: &E::Id) -> CacheKey {
        self.render(E::KIND, Shape::Single, &escape_segment(&id.to_string()))
    }

    /// Key for one page of the unfiltered listing.
    pub fn page<E: Entity>(&self, request: &PageRequest) -> CacheKey {
        self.render(E::KIND, Shape::Page, &page_segment(request))
    }

    /// Key for one page of a filtered listing.
    ///
    /// # Errors
    ///
    /// Fails only if the filter cannot be represented as JSON.
    pub fn filtered<E: Entity, F: Serialize>(
        &self,
        filter: &F,
        request: &PageRequest,
    ) -> CacheResult<CacheKey> {
        let fingerprint = filter_fingerprint(filter)?;
        let discriminator = format!("{fingerprint}:{}", page_segment(request));
        Ok(self.render(E::KIND, Shape::Filtered, &discriminator))
    }

    /// Glob selecting every key of `shape` for `kind` in this environment.
    pub fn shape_pattern(&self, kind: EntityKind, shape: Shape) -> String {
        format!("{kind}:{shape}:*:{}", self.environment)
    }

    /// Glob selecting every key for `kind` in this environment.
    pub fn kind_pattern(&self, kind: EntityKind) -> String {
        format!("{kind}:*:{}", self.environment)
    }

    fn render(&self, kind: EntityKind, shape: Shape, discriminator: &str) -> CacheKey {
        CacheKey {
            kind,
            shape,
            rendered: format!("{kind}:{shape}:{discriminator}:{}", self.environment),
        }
    }
}

fn page_segment(request: &PageRequest) -> String {
    format!(
        "{}:{}:{}",
        request.page,
        request.page_size,
        request.sort.as_str()
    )
}

fn is_reserved(c: char) -> bool {
    matches!(c, '%' | ':' | '*' | '?' | '[' | ']' | '\\') || c.is_whitespace()
}

/// Percent-escape separators and glob metacharacters.
fn escape_segment(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if is_reserved(c) {
            let mut buf = [0u8; 4];
            for byte in c.encode_utf8(&mut buf).bytes() {
                let _ = write!(out, "%{byte:02X}");
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// SHA-256 of the canonical JSON form of `filter`, hex encoded.
///
/// # Errors
///
/// Returns [`CacheError::Serialization`] if `filter` has no JSON form.
pub fn filter_fingerprint<F: Serialize>(filter: &F) -> CacheResult<String> {
    let value =
        serde_json::to_value(filter).map_err(|e| CacheError::Serialization(e.to_string()))?;
    let mut canonical = String::new();
    write_canonical(&value, &mut canonical);
    Ok(hex::encode(Sha256::digest(canonical.as_bytes())))
}

/// JSON with object keys sorted, independent of map ordering features.
fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (key, val)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(val, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kennel_domain::{Dog, DogFilter, Gender, Page, SortOrder, StatusFilter};
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    fn keys() -> KeyBuilder {
        KeyBuilder::new("test").unwrap()
    }

    #[test]
    fn test_key_layout() {
        let keys = keys();
        assert_eq!(keys.single::<Dog>(&42).as_str(), "dog:single:42:test");
        assert_eq!(
            keys.page::<Dog>(&PageRequest::new(1, 10)).as_str(),
            "dog:page:1:10:id_asc:test"
        );
        assert_eq!(keys.shape_pattern(EntityKind::Dog, Shape::Page), "dog:page:*:test");
        assert_eq!(keys.kind_pattern(EntityKind::Page), "page:*:test");
    }

    #[test]
    fn test_rejects_bad_environment() {
        assert!(KeyBuilder::new("").is_err());
        assert!(KeyBuilder::new("prod:eu").is_err());
        assert!(KeyBuilder::new("prod*").is_err());
        assert!(KeyBuilder::new("staging").is_ok());
    }

    #[test]
    fn test_page_pattern_excludes_other_shapes() {
        let keys = keys();
        let pattern = keys.shape_pattern(EntityKind::Dog, Shape::Page);
        let page = keys.page::<Dog>(&PageRequest::new(2, 5));
        let single = keys.single::<Dog>(&7);
        let filtered = keys
            .filtered::<Dog, _>(&DogFilter::gender(Gender::Male), &PageRequest::new(2, 5))
            .unwrap();

        assert!(crate::cache::memory::glob_match(&pattern, page.as_str()));
        assert!(!crate::cache::memory::glob_match(&pattern, single.as_str()));
        assert!(!crate::cache::memory::glob_match(&pattern, filtered.as_str()));
    }

    #[test]
    fn test_equivalent_filters_share_a_key() {
        let keys = keys();
        let request = PageRequest::new(1, 10);
        let a = DogFilter::default()
            .with_status(StatusFilter::Active)
            .with_status(StatusFilter::Stud);
        let b = DogFilter::default()
            .with_status(StatusFilter::Stud)
            .with_status(StatusFilter::Active);
        let c = DogFilter::default().with_status(StatusFilter::Stud);

        let ka = keys.filtered::<Dog, _>(&a, &request).unwrap();
        assert_eq!(ka, keys.filtered::<Dog, _>(&b, &request).unwrap());
        assert_ne!(ka, keys.filtered::<Dog, _>(&c, &request).unwrap());
    }

    #[test]
    fn test_fingerprint_ignores_map_order() {
        let mut a = BTreeMap::new();
        a.insert("b", 1);
        a.insert("a", 2);
        let b = serde_json::json!({"a": 2, "b": 1});
        assert_eq!(filter_fingerprint(&a).unwrap(), filter_fingerprint(&b).unwrap());
    }

    #[test]
    fn test_ids_cannot_forge_segments() {
        let keys = keys();
        let forged = keys.single::<Page>(&uuid::Uuid::nil());
        assert!(!forged.as_str().contains('%'));

        assert_eq!(escape_segment("1:test"), "1%3Atest");
        assert_eq!(escape_segment("a*b"), "a%2Ab");
        assert_eq!(escape_segment("50%"), "50%25");
    }

    #[test]
    fn test_sort_order_is_part_of_page_key() {
        let keys = keys();
        let by_id = keys.page::<Dog>(&PageRequest::new(1, 10));
        let by_name = keys.page::<Dog>(&PageRequest::new(1, 10).sorted(SortOrder::NameAsc));
        assert_ne!(by_id, by_name);
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum KeyInput {
        Single(String),
        Page(u32, u32),
        Filtered(Option<bool>, Option<i64>, u32, u32),
    }

    fn key_input() -> impl Strategy<Value = KeyInput> {
        prop_oneof![
            ".{0,12}".prop_map(KeyInput::Single),
            (0u32..50, 0u32..50).prop_map(|(p, s)| KeyInput::Page(p, s)),
            (
                proptest::option::of(any::<bool>()),
                proptest::option::of(-5i64..5),
                0u32..5,
                0u32..5
            )
                .prop_map(|(owned, sire, p, s)| KeyInput::Filtered(owned, sire, p, s)),
        ]
    }

    fn render(keys: &KeyBuilder, input: &KeyInput) -> String {
        match input {
            KeyInput::Single(id) => keys
                .render(EntityKind::Dog, Shape::Single, &escape_segment(id))
                .rendered,
            KeyInput::Page(p, s) => keys.page::<Dog>(&PageRequest::new(*p, *s)).rendered,
            KeyInput::Filtered(owned, sire, p, s) => {
                let filter = DogFilter {
                    owned: *owned,
                    sire: *sire,
                    ..DogFilter::default()
                };
                keys.filtered::<Dog, _>(&filter, &PageRequest::new(*p, *s))
                    .unwrap()
                    .rendered
            }
        }
    }

    proptest! {
        #[test]
        fn prop_keys_are_injective(a in key_input(), b in key_input()) {
            let keys = keys();
            let (ka, kb) = (render(&keys, &a), render(&keys, &b));
            prop_assert_eq!(a == b, ka == kb);
        }
    }
}

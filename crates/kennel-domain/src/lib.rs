//! # Kennel Catalog - Domain Model
//!
//! Entity DTOs, value objects, and query types for the kennel catalog.
//! These are the fully hydrated shapes that the persistence layer caches:
//! a `Dog` carries its photos, health records, productions and children,
//! a `Litter` carries its puppies. Every layer (persistence, admin, tests)
//! shares these definitions.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// ENTITY IDENTITY
// =============================================================================

/// Cached entity types.
///
/// The string form is used as the first segment of every cache key, so it
/// must stay stable across deployments and never contain `:`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Dog,
    Litter,
    Breeding,
    Production,
    Page,
    Service,
    NavLink,
}

impl EntityKind {
    pub const ALL: [Self; 7] = [
        Self::Dog,
        Self::Litter,
        Self::Breeding,
        Self::Production,
        Self::Page,
        Self::Service,
        Self::NavLink,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dog => "dog",
            Self::Litter => "litter",
            Self::Breeding => "breeding",
            Self::Production => "production",
            Self::Page => "page",
            Self::Service => "service",
            Self::NavLink => "nav_link",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A place where copies of one entity type are embedded inside cached DTOs
/// of another (or the same) type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Embedding {
    /// Entity type whose DTOs hold the copies
    pub holder: EntityKind,
    /// Field of the holder listing the copies; every copy carries an `id`
    pub field: &'static str,
    /// Fields of the embedded entity naming the holder ids it is listed under
    pub back_refs: &'static [&'static str],
}

/// An identifiable, cacheable catalog entity.
pub trait Entity: Clone + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Primary key type.
    type Id: Clone
        + PartialEq
        + fmt::Debug
        + fmt::Display
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static;

    /// Entity type this DTO belongs to.
    const KIND: EntityKind;

    /// Holders that embed copies of this entity.
    const EMBEDDED_IN: &'static [Embedding] = &[];

    /// Primary key of this instance.
    fn id(&self) -> &Self::Id;
}

// =============================================================================
// ENUMS
// =============================================================================

/// Dog gender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

/// Dog listing status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DogStatus {
    Available,
    Sold,
    #[serde(rename = "Available For Stud")]
    Stud,
    Retired,
}

impl DogStatus {
    /// Whether the dog still counts as part of the active program.
    #[must_use]
    pub fn is_active(status: Option<Self>) -> bool {
        !matches!(status, Some(Self::Retired | Self::Sold))
    }
}

/// Status criterion accepted by dog filters.
///
/// `Active` is a pseudo-status: dogs without a status, or with any status
/// other than retired and sold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
    Active,
    Available,
    Sold,
    Stud,
    Retired,
}

impl StatusFilter {
    #[must_use]
    pub fn matches(self, status: Option<DogStatus>) -> bool {
        match self {
            Self::Active => DogStatus::is_active(status),
            Self::Available => status == Some(DogStatus::Available),
            Self::Sold => status == Some(DogStatus::Sold),
            Self::Stud => status == Some(DogStatus::Stud),
            Self::Retired => status == Some(DogStatus::Retired),
        }
    }
}

// =============================================================================
// NESTED VALUE OBJECTS
// =============================================================================

/// Gallery photo attached to a dog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Photo {
    pub id: i64,
    pub dog_id: i64,
    pub photo_url: String,
    pub alt: String,
}

/// Health screening record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthInfo {
    pub id: i64,
    pub dog_id: i64,
    pub dna: Option<String>,
    pub carrier_status: Option<String>,
    pub extra_info: Option<String>,
}

/// Production (offspring record) linked to a dog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Production {
    pub id: i64,
    pub name: String,
    pub dob: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub owner: Option<String>,
    pub description: Option<String>,
    pub profile_photo: Option<String>,
    pub sire_id: Option<i64>,
    pub dam_id: Option<i64>,
}

/// Condensed child reference embedded in a parent dog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DogChild {
    pub id: i64,
    pub name: String,
    pub dob: Option<NaiveDate>,
    pub gender: Gender,
    pub profile_photo: Option<String>,
}

// =============================================================================
// ENTITY TYPES
// =============================================================================

/// Dog entity - fully hydrated with its eagerly loaded relations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dog {
    pub id: i64,
    pub name: String,
    pub dob: Option<NaiveDate>,
    pub gender: Gender,
    pub color: Option<String>,
    pub status: Option<DogStatus>,
    pub profile_photo: Option<String>,
    pub stud_fee: Option<i32>,
    pub sale_fee: Option<i32>,
    pub description: Option<String>,

    // Lineage
    pub parent_male_id: Option<i64>,
    pub parent_female_id: Option<i64>,

    // Program flags
    pub is_production: bool,
    pub is_retired: bool,
    pub kennel_own: bool,

    // Relations
    pub health_infos: Vec<HealthInfo>,
    pub photos: Vec<Photo>,
    pub productions: Vec<Production>,
    pub children: Vec<DogChild>,

    // Metadata
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Dog {
    type Id = i64;
    const KIND: EntityKind = EntityKind::Dog;
    const EMBEDDED_IN: &'static [Embedding] = &[
        Embedding {
            holder: EntityKind::Litter,
            field: "puppies",
            back_refs: &[],
        },
        Embedding {
            holder: EntityKind::Dog,
            field: "children",
            back_refs: &["parent_male_id", "parent_female_id"],
        },
    ];

    fn id(&self) -> &i64 {
        &self.id
    }
}

/// Litter entity - a whelping with its puppies embedded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Litter {
    pub id: i64,
    pub breeding_id: Option<i64>,
    pub birth_date: NaiveDate,
    pub number_of_puppies: u32,
    pub pedigree_url: Option<String>,
    pub puppies: Vec<Dog>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Litter {
    type Id = i64;
    const KIND: EntityKind = EntityKind::Litter;

    fn id(&self) -> &i64 {
        &self.id
    }
}

/// Content page entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub content: String,
    pub meta_description: Option<String>,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Page {
    type Id = Uuid;
    const KIND: EntityKind = EntityKind::Page;

    fn id(&self) -> &Uuid {
        &self.id
    }
}

// =============================================================================
// DRAFTS & PATCHES
// =============================================================================

/// Input for creating a dog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DogDraft {
    pub name: String,
    pub dob: Option<NaiveDate>,
    pub gender: Gender,
    pub color: Option<String>,
    pub status: Option<DogStatus>,
    pub profile_photo: Option<String>,
    pub parent_male_id: Option<i64>,
    pub parent_female_id: Option<i64>,
    pub is_production: bool,
    pub kennel_own: bool,
}

impl DogDraft {
    /// Minimal draft with program defaults (owned, no lineage).
    pub fn new(name: impl Into<String>, gender: Gender) -> Self {
        Self {
            name: name.into(),
            dob: None,
            gender,
            color: None,
            status: None,
            profile_photo: None,
            parent_male_id: None,
            parent_female_id: None,
            is_production: false,
            kennel_own: true,
        }
    }

    /// Materialize the committed row.
    #[must_use]
    pub fn into_dog(self, id: i64, now: DateTime<Utc>) -> Dog {
        Dog {
            id,
            name: self.name,
            dob: self.dob,
            gender: self.gender,
            color: self.color,
            is_retired: self.status == Some(DogStatus::Retired),
            status: self.status,
            profile_photo: self.profile_photo,
            stud_fee: None,
            sale_fee: None,
            description: None,
            parent_male_id: self.parent_male_id,
            parent_female_id: self.parent_female_id,
            is_production: self.is_production,
            kennel_own: self.kennel_own,
            health_infos: Vec::new(),
            photos: Vec::new(),
            productions: Vec::new(),
            children: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update for a dog; `None` leaves a field unchanged
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DogPatch {
    pub name: Option<String>,
    pub dob: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub color: Option<String>,
    pub status: Option<DogStatus>,
    pub profile_photo: Option<String>,
    pub stud_fee: Option<i32>,
    pub sale_fee: Option<i32>,
    pub description: Option<String>,
    pub parent_male_id: Option<i64>,
    pub parent_female_id: Option<i64>,
    pub is_production: Option<bool>,
    pub kennel_own: Option<bool>,
}

impl DogPatch {
    pub fn name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn apply(self, dog: &mut Dog, now: DateTime<Utc>) {
        if let Some(name) = self.name {
            dog.name = name;
        }
        if let Some(dob) = self.dob {
            dog.dob = Some(dob);
        }
        if let Some(gender) = self.gender {
            dog.gender = gender;
        }
        if let Some(color) = self.color {
            dog.color = Some(color);
        }
        if let Some(status) = self.status {
            dog.status = Some(status);
            dog.is_retired = status == DogStatus::Retired;
        }
        if let Some(photo) = self.profile_photo {
            dog.profile_photo = Some(photo);
        }
        if let Some(fee) = self.stud_fee {
            dog.stud_fee = Some(fee);
        }
        if let Some(fee) = self.sale_fee {
            dog.sale_fee = Some(fee);
        }
        if let Some(description) = self.description {
            dog.description = Some(description);
        }
        if let Some(sire) = self.parent_male_id {
            dog.parent_male_id = Some(sire);
        }
        if let Some(dam) = self.parent_female_id {
            dog.parent_female_id = Some(dam);
        }
        if let Some(flag) = self.is_production {
            dog.is_production = flag;
        }
        if let Some(flag) = self.kennel_own {
            dog.kennel_own = flag;
        }
        dog.updated_at = now;
    }
}

/// Input for creating a litter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LitterDraft {
    pub breeding_id: Option<i64>,
    pub birth_date: NaiveDate,
    pub number_of_puppies: u32,
    pub pedigree_url: Option<String>,
}

impl LitterDraft {
    #[must_use]
    pub fn into_litter(self, id: i64, now: DateTime<Utc>) -> Litter {
        Litter {
            id,
            breeding_id: self.breeding_id,
            birth_date: self.birth_date,
            number_of_puppies: self.number_of_puppies,
            pedigree_url: self.pedigree_url,
            puppies: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update for a litter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LitterPatch {
    pub breeding_id: Option<i64>,
    pub birth_date: Option<NaiveDate>,
    pub number_of_puppies: Option<u32>,
    pub pedigree_url: Option<String>,
    pub puppies: Option<Vec<Dog>>,
}

impl LitterPatch {
    pub fn apply(self, litter: &mut Litter, now: DateTime<Utc>) {
        if let Some(breeding) = self.breeding_id {
            litter.breeding_id = Some(breeding);
        }
        if let Some(date) = self.birth_date {
            litter.birth_date = date;
        }
        if let Some(count) = self.number_of_puppies {
            litter.number_of_puppies = count;
        }
        if let Some(url) = self.pedigree_url {
            litter.pedigree_url = Some(url);
        }
        if let Some(puppies) = self.puppies {
            litter.puppies = puppies;
        }
        litter.updated_at = now;
    }
}

/// Input for creating a content page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageDraft {
    pub name: String,
    pub slug: String,
    pub content: String,
    pub meta_description: Option<String>,
    pub is_published: bool,
}

impl PageDraft {
    #[must_use]
    pub fn into_page(self, id: Uuid, now: DateTime<Utc>) -> Page {
        Page {
            id,
            name: self.name,
            slug: self.slug,
            content: self.content,
            meta_description: self.meta_description,
            is_published: self.is_published,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update for a content page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagePatch {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub content: Option<String>,
    pub meta_description: Option<String>,
    pub is_published: Option<bool>,
}

impl PagePatch {
    pub fn apply(self, page: &mut Page, now: DateTime<Utc>) {
        if let Some(name) = self.name {
            page.name = name;
        }
        if let Some(slug) = self.slug {
            page.slug = slug;
        }
        if let Some(content) = self.content {
            page.content = content;
        }
        if let Some(meta) = self.meta_description {
            page.meta_description = Some(meta);
        }
        if let Some(published) = self.is_published {
            page.is_published = published;
        }
        page.updated_at = now;
    }
}

// =============================================================================
// QUERY/FILTER TYPES
// =============================================================================

/// Sort order for paginated listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    IdAsc,
    NameAsc,
    NewestFirst,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IdAsc => "id_asc",
            Self::NameAsc => "name_asc",
            Self::NewestFirst => "newest_first",
        }
    }
}

/// Pagination parameters (1-based page numbers)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
    #[serde(default)]
    pub sort: SortOrder,
}

impl PageRequest {
    #[must_use]
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page,
            page_size,
            sort: SortOrder::default(),
        }
    }

    #[must_use]
    pub fn sorted(mut self, sort: SortOrder) -> Self {
        self.sort = sort;
        self
    }

    /// Row offset of the first item, `None` for a zero page number.
    #[must_use]
    pub fn offset(&self) -> Option<usize> {
        let page = self.page.checked_sub(1)?;
        Some(page as usize * self.page_size as usize)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, 10)
    }
}

/// Dog listing filter.
///
/// Serializes canonically: unset criteria are omitted and statuses are an
/// ordered set, so equivalent filters produce identical JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DogFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub statuses: BTreeSet<StatusFilter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owned: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sire: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dam: Option<i64>,
}

impl DogFilter {
    #[must_use]
    pub fn gender(gender: Gender) -> Self {
        Self {
            gender: Some(gender),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: StatusFilter) -> Self {
        self.statuses.insert(status);
        self
    }

    #[must_use]
    pub fn matches(&self, dog: &Dog) -> bool {
        self.gender.is_none_or(|g| g == dog.gender)
            && (self.statuses.is_empty() || self.statuses.iter().any(|s| s.matches(dog.status)))
            && self.owned.is_none_or(|owned| owned == dog.kennel_own)
            && self.sire.is_none_or(|sire| dog.parent_male_id == Some(sire))
            && self.dam.is_none_or(|dam| dog.parent_female_id == Some(dam))
    }
}

/// Litter listing filter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LitterFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breeding_id: Option<i64>,
}

impl LitterFilter {
    #[must_use]
    pub fn matches(&self, litter: &Litter) -> bool {
        self.breeding_id.is_none_or(|id| litter.breeding_id == Some(id))
    }
}

/// Content page listing filter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
}

impl PageFilter {
    #[must_use]
    pub fn matches(&self, page: &Page) -> bool {
        self.published.is_none_or(|p| p == page.is_published)
            && self.slug.as_deref().is_none_or(|slug| slug == page.slug)
    }
}

// =============================================================================
// ERRORS
// =============================================================================

/// Domain-level errors
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: EntityKind, id: String },

    #[error("Invalid page request: page={page}, page_size={page_size}")]
    InvalidPageRequest { page: u32, page_size: u32 },
}

impl PageRequest {
    /// Reject zero page numbers and empty pages.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidPageRequest`] when either bound is zero.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.page == 0 || self.page_size == 0 {
            return Err(DomainError::InvalidPageRequest {
                page: self.page,
                page_size: self.page_size,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dog(status: Option<DogStatus>) -> Dog {
        let mut draft = DogDraft::new("Rex", Gender::Male);
        draft.status = status;
        draft.into_dog(1, Utc::now())
    }

    #[test]
    fn test_active_status_filter() {
        let active = DogFilter::default().with_status(StatusFilter::Active);
        assert!(active.matches(&dog(None)));
        assert!(active.matches(&dog(Some(DogStatus::Stud))));
        assert!(!active.matches(&dog(Some(DogStatus::Retired))));
        assert!(!active.matches(&dog(Some(DogStatus::Sold))));
    }

    #[test]
    fn test_filter_serialization_is_canonical() {
        let a = DogFilter::gender(Gender::Male)
            .with_status(StatusFilter::Sold)
            .with_status(StatusFilter::Active);
        let b = DogFilter::gender(Gender::Male)
            .with_status(StatusFilter::Active)
            .with_status(StatusFilter::Sold)
            .with_status(StatusFilter::Active);

        let a_json = serde_json::to_string(&a).unwrap();
        assert_eq!(a_json, serde_json::to_string(&b).unwrap());
        assert!(!a_json.contains("owned"));
    }

    #[test]
    fn test_patch_bumps_updated_at() {
        let mut d = dog(None);
        let later = d.updated_at + chrono::Duration::seconds(5);
        DogPatch::name("Max").apply(&mut d, later);
        assert_eq!(d.name, "Max");
        assert_eq!(d.updated_at, later);
        assert_eq!(d.gender, Gender::Male);
    }

    #[test]
    fn test_page_request_offset() {
        assert_eq!(PageRequest::new(1, 10).offset(), Some(0));
        assert_eq!(PageRequest::new(3, 25).offset(), Some(50));
        assert_eq!(PageRequest::new(0, 10).offset(), None);
        assert!(PageRequest::new(1, 0).validate().is_err());
    }

    #[test]
    fn test_lineage_filters() {
        use fake::Fake;
        use fake::faker::name::en::FirstName;

        for _ in 0..20 {
            let name: String = FirstName().fake();
            let sire: i64 = (1_i64..1000).fake();
            let mut draft = DogDraft::new(name, Gender::Female);
            draft.parent_male_id = Some(sire);
            let pup = draft.into_dog(1, Utc::now());

            let by_sire = DogFilter {
                sire: Some(sire),
                ..DogFilter::default()
            };
            let by_other = DogFilter {
                sire: Some(sire + 1),
                ..DogFilter::default()
            };
            assert!(by_sire.matches(&pup));
            assert!(!by_other.matches(&pup));
            assert!(!DogFilter::gender(Gender::Male).matches(&pup));
        }
    }

    #[test]
    fn test_status_serializes_like_catalog() {
        let json = serde_json::to_string(&DogStatus::Stud).unwrap();
        assert_eq!(json, "\"Available For Stud\"");
    }
}

//! Catalogue entries: research categories and the labelled resources they own.
//!
//! Every catalogue resource shares one shape (id, optional owning research
//! category, one unique label, timestamps). A zero-sized [`CatalogueKind`]
//! marker supplies the per-resource rules: display name, label column and
//! bounds, and whether a parent category is required.

use std::fmt::Debug;
use std::marker::PhantomData;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::Error;
use super::entity::{
    Criteria, Entity, EntityField, FieldErrors, FieldMap, FieldValue, bounded_text,
};

/// Columns of a catalogue entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CatalogueField {
    /// Primary key.
    Id,
    /// Owning research category.
    ResearchCategoryId,
    /// Label column for titled resources.
    Title,
    /// Label column for free-text resources (testimonies).
    Content,
    /// Creation time.
    CreatedAt,
    /// Last modification time.
    UpdatedAt,
}

impl EntityField for CatalogueField {
    fn name(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::ResearchCategoryId => "researchCategoryId",
            Self::Title => "title",
            Self::Content => "content",
            Self::CreatedAt => "createdAt",
            Self::UpdatedAt => "updatedAt",
        }
    }
}

/// Rules distinguishing one catalogue resource from another.
pub trait CatalogueKind: Copy + Debug + Default + Send + Sync + 'static {
    /// Display name used in messages.
    const NAME: &'static str;
    /// Storage discriminator.
    const KIND: &'static str;
    /// Label column.
    const LABEL: CatalogueField;
    /// Inclusive label length bounds in characters.
    const LABEL_LENGTH: (usize, usize);
    /// Whether entries belong to a research category.
    const PARENTED: bool;
    /// Persisted columns in presentation order.
    const FIELDS: &'static [CatalogueField];
    /// Caller-assignable columns.
    const FILLABLE: &'static [CatalogueField];
}

macro_rules! catalogue_kind {
    (
        $(#[$meta:meta])*
        $name:ident {
            name: $display:literal,
            kind: $kind:literal,
            label: $label:ident,
            length: ($min:literal, $max:literal),
            parented: true $(,)?
        }
    ) => {
        catalogue_kind!(@define $(#[$meta])* $name, $display, $kind, $label, $min, $max, true,
            [Id, ResearchCategoryId, $label, CreatedAt, UpdatedAt],
            [ResearchCategoryId, $label]);
    };
    (
        $(#[$meta:meta])*
        $name:ident {
            name: $display:literal,
            kind: $kind:literal,
            label: $label:ident,
            length: ($min:literal, $max:literal),
            parented: false $(,)?
        }
    ) => {
        catalogue_kind!(@define $(#[$meta])* $name, $display, $kind, $label, $min, $max, false,
            [Id, $label, CreatedAt, UpdatedAt],
            [$label]);
    };
    (@define $(#[$meta:meta])* $name:ident, $display:literal, $kind:literal, $label:ident,
        $min:literal, $max:literal, $parented:literal,
        [$($field:ident),*], [$($fillable:ident),*]) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
        pub struct $name;

        impl CatalogueKind for $name {
            const NAME: &'static str = $display;
            const KIND: &'static str = $kind;
            const LABEL: CatalogueField = CatalogueField::$label;
            const LABEL_LENGTH: (usize, usize) = ($min, $max);
            const PARENTED: bool = $parented;
            const FIELDS: &'static [CatalogueField] = &[$(CatalogueField::$field),*];
            const FILLABLE: &'static [CatalogueField] = &[$(CatalogueField::$fillable),*];
        }
    };
}

catalogue_kind! {
    /// Aggregate root owning the parented kinds.
    ResearchCategory { name: "Research category", kind: "research_category", label: Title, length: (3, 50), parented: false }
}
catalogue_kind! {
    /// Academic discipline within a research category.
    Discipline { name: "Discipline", kind: "discipline", label: Title, length: (3, 50), parented: true }
}
catalogue_kind! {
    /// Kind of paper accepted within a research category.
    PaperType { name: "Paper type", kind: "paper_type", label: Title, length: (3, 50), parented: true }
}
catalogue_kind! {
    /// Media format within a research category.
    MediaType { name: "Media type", kind: "media_type", label: Title, length: (3, 50), parented: true }
}
catalogue_kind! {
    /// Trending media topic within a research category.
    MediaTrend { name: "Media trend", kind: "media_trend", label: Title, length: (3, 50), parented: true }
}
catalogue_kind! {
    /// Subject domain within a research category.
    Domain { name: "Domain", kind: "domain", label: Title, length: (3, 50), parented: true }
}
catalogue_kind! {
    /// Order classification.
    OrderType { name: "Order type", kind: "order_type", label: Title, length: (3, 50), parented: false }
}
catalogue_kind! {
    /// Customer testimony.
    Testimony { name: "Testimony", kind: "testimony", label: Content, length: (5, 200), parented: false }
}

/// One catalogue resource of kind `K`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogueEntry<K> {
    id: Uuid,
    research_category_id: Option<Uuid>,
    label: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    kind: PhantomData<K>,
}

impl<K: CatalogueKind> CatalogueEntry<K> {
    /// Entry identifier.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Owning research category.
    pub fn research_category_id(&self) -> Option<Uuid> {
        self.research_category_id
    }

    /// Unique label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Creation time.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Last modification time.
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Rebuild an entry from storage without re-validating.
    pub(crate) fn from_storage(
        id: Uuid,
        research_category_id: Option<Uuid>,
        label: String,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            research_category_id,
            label,
            created_at,
            updated_at,
            kind: PhantomData,
        }
    }

    /// Criteria identifying entries with the same label in the same scope.
    pub fn uniqueness_scope(
        label: &str,
        research_category_id: Option<Uuid>,
    ) -> Criteria<CatalogueField> {
        let criteria = Criteria::by(K::LABEL, label.trim());
        if K::PARENTED {
            criteria.and(CatalogueField::ResearchCategoryId, research_category_id)
        } else {
            criteria
        }
    }

    fn apply(mut self, fields: &FieldMap<CatalogueField>, errors: &mut FieldErrors) -> Self {
        if fields.contains_key(&K::LABEL) {
            self.label = bounded_text(fields, K::LABEL, K::LABEL_LENGTH, errors);
        }
        if K::PARENTED {
            if let Some(value) = fields.get(&CatalogueField::ResearchCategoryId) {
                match value.as_uuid() {
                    Some(parent) => self.research_category_id = Some(parent),
                    None => errors.add(
                        CatalogueField::ResearchCategoryId,
                        "researchCategoryId must be a valid identifier",
                    ),
                }
            }
        }
        self
    }
}

impl<K: CatalogueKind> Entity for CatalogueEntry<K> {
    type Field = CatalogueField;

    const NAME: &'static str = K::NAME;
    const ID_FIELD: CatalogueField = CatalogueField::Id;
    const FIELDS: &'static [CatalogueField] = K::FIELDS;
    const FILLABLE: &'static [CatalogueField] = K::FILLABLE;
    const HIDDEN: &'static [CatalogueField] = &[];

    fn id(&self) -> Uuid {
        self.id
    }

    fn value(&self, field: CatalogueField) -> FieldValue {
        match field {
            CatalogueField::Id => self.id.into(),
            CatalogueField::ResearchCategoryId => self.research_category_id.into(),
            CatalogueField::Title | CatalogueField::Content if field == K::LABEL => {
                self.label.clone().into()
            }
            CatalogueField::Title | CatalogueField::Content => FieldValue::Null,
            CatalogueField::CreatedAt => self.created_at.into(),
            CatalogueField::UpdatedAt => self.updated_at.into(),
        }
    }

    fn hydrate(
        id: Uuid,
        fields: &FieldMap<CatalogueField>,
        now: DateTime<Utc>,
    ) -> Result<Self, Error> {
        let mut errors = FieldErrors::default();
        if !fields.contains_key(&K::LABEL) {
            errors.add(K::LABEL, format!("{} is required", K::LABEL.name()));
        }
        if K::PARENTED
            && fields
                .get(&CatalogueField::ResearchCategoryId)
                .is_none_or(FieldValue::is_null)
        {
            errors.add(
                CatalogueField::ResearchCategoryId,
                "researchCategoryId is required",
            );
        }
        let entry = Self::from_storage(id, None, String::new(), now, now).apply(fields, &mut errors);
        errors.into_result(entry)
    }

    fn merge(&self, patch: &FieldMap<CatalogueField>, now: DateTime<Utc>) -> Result<Self, Error> {
        let mut errors = FieldErrors::default();
        let mut merged = self.clone().apply(patch, &mut errors);
        merged.updated_at = now;
        errors.into_result(merged)
    }
}

//! Typed field metadata shared by every persisted entity.
//!
//! Entities describe their columns with a per-entity field enum. Mass
//! assignment allow-lists (`FILLABLE`) and response deny-lists (`HIDDEN`) are
//! slices of that enum, so a misspelt field cannot compile and
//! [`validate_field_lists`] can check the lists once at startup.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Debug;
use std::hash::Hash;

use chrono::{DateTime, Utc};
use pagination::{PageRequest, PageWindow, SortDirection};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::Error;

/// Column identifier of an entity.
pub trait EntityField: Copy + Ord + Hash + Debug + Send + Sync + 'static {
    /// Externally visible (camelCase) field name.
    fn name(self) -> &'static str;
}

/// Dynamically typed column value used by criteria, patches and hooks.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FieldValue {
    /// SQL `NULL` / absent optional value.
    Null,
    /// Boolean flag.
    Bool(bool),
    /// Signed integer.
    Integer(i64),
    /// Free text.
    Text(String),
    /// Identifier.
    Uuid(Uuid),
    /// Point in time.
    Timestamp(DateTime<Utc>),
}

impl FieldValue {
    /// Text value, if this is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Boolean value, if this is a flag.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(flag) => Some(*flag),
            _ => None,
        }
    }

    /// Integer value, if this is an integer.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            _ => None,
        }
    }

    /// Identifier value; UUID-shaped text is accepted too.
    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            Self::Uuid(id) => Some(*id),
            Self::Text(text) => Uuid::parse_str(text.trim()).ok(),
            _ => None,
        }
    }

    /// Timestamp value, if this is a timestamp.
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Timestamp(at) => Some(*at),
            _ => None,
        }
    }

    /// Whether the value is `Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// JSON rendering used by public representations.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(flag) => Value::Bool(*flag),
            Self::Integer(value) => Value::from(*value),
            Self::Text(text) => Value::String(text.clone()),
            Self::Uuid(id) => Value::String(id.to_string()),
            Self::Timestamp(at) => Value::String(at.to_rfc3339()),
        }
    }

    /// Interpret a JSON scalar. Arrays, objects and fractional numbers are
    /// rejected.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(Self::Null),
            Value::Bool(flag) => Some(Self::Bool(*flag)),
            Value::Number(number) => number.as_i64().map(Self::Integer),
            Value::String(text) => Some(Self::Text(text.clone())),
            Value::Array(_) | Value::Object(_) => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<Uuid> for FieldValue {
    fn from(value: Uuid) -> Self {
        Self::Uuid(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Timestamp(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Field → value map used for creates and patches.
pub type FieldMap<F> = BTreeMap<F, FieldValue>;

/// Conjunction of equality conditions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Criteria<F> {
    conditions: Vec<(F, FieldValue)>,
}

impl<F> Default for Criteria<F> {
    fn default() -> Self {
        Self {
            conditions: Vec::new(),
        }
    }
}

impl<F: EntityField> Criteria<F> {
    /// Criteria matching every row.
    pub fn any() -> Self {
        Self::default()
    }

    /// Criteria with a single `field == value` condition.
    ///
    /// # Examples
    /// ```
    /// use research_backend::domain::{Criteria, UserField};
    ///
    /// let criteria = Criteria::by(UserField::Email, "ada@example.com")
    ///     .and(UserField::IsVerified, true);
    /// assert_eq!(criteria.conditions().len(), 2);
    /// ```
    pub fn by(field: F, value: impl Into<FieldValue>) -> Self {
        Self::any().and(field, value)
    }

    /// Add a `field == value` condition.
    #[must_use]
    pub fn and(mut self, field: F, value: impl Into<FieldValue>) -> Self {
        self.conditions.push((field, value.into()));
        self
    }

    /// Conditions in insertion order.
    pub fn conditions(&self) -> &[(F, FieldValue)] {
        &self.conditions
    }

    /// Whether no condition applies.
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Evaluate the criteria against a loaded entity.
    pub fn matches<E>(&self, entity: &E) -> bool
    where
        E: Entity<Field = F>,
    {
        self.conditions
            .iter()
            .all(|(field, expected)| entity.value(*field) == *expected)
    }
}

/// Window, filter and order for a paginated read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FindQuery<F> {
    /// Offset/limit to apply.
    pub window: PageWindow,
    /// Equality filter.
    pub criteria: Criteria<F>,
    /// Optional ordering; insertion order when absent.
    pub sort: Option<(F, SortDirection)>,
}

impl<F: EntityField> FindQuery<F> {
    /// Query over every row within `window`, in insertion order.
    pub fn new(window: PageWindow) -> Self {
        Self {
            window,
            criteria: Criteria::any(),
            sort: None,
        }
    }

    /// Replace the filter.
    #[must_use]
    pub fn with_criteria(mut self, criteria: Criteria<F>) -> Self {
        self.criteria = criteria;
        self
    }

    /// Replace the ordering.
    #[must_use]
    pub fn with_sort(mut self, field: F, direction: SortDirection) -> Self {
        self.sort = Some((field, direction));
        self
    }

    /// Resolve a validated page request against `E`'s visible fields.
    ///
    /// Sorting by a hidden or unknown field is reported as an invalid `sort`
    /// parameter.
    pub fn from_request<E>(request: &PageRequest, criteria: Criteria<F>) -> Result<Self, Error>
    where
        E: Entity<Field = F>,
    {
        let mut query = Self::new(*request.window()).with_criteria(criteria);
        if let Some(spec) = request.sort() {
            let (field, direction) = spec
                .resolve_field(E::visible_field_named)
                .map_err(|err| Error::invalid_field("sort", err.to_string()))?;
            query = query.with_sort(field, direction);
        }
        Ok(query)
    }
}

/// Persisted record addressable through the generic repository.
pub trait Entity: Clone + Debug + Send + Sync + 'static {
    /// Column identifier enum.
    type Field: EntityField;

    /// Human-readable entity name used in messages.
    const NAME: &'static str;
    /// Primary key column.
    const ID_FIELD: Self::Field;
    /// Every persisted column, in presentation order.
    const FIELDS: &'static [Self::Field];
    /// Columns a caller may assign on create.
    const FILLABLE: &'static [Self::Field];
    /// Columns never exposed outside the process.
    const HIDDEN: &'static [Self::Field];

    /// Primary key.
    fn id(&self) -> Uuid;

    /// Current value of `field`.
    fn value(&self, field: Self::Field) -> FieldValue;

    /// Build a new entity from already filtered fields.
    fn hydrate(id: Uuid, fields: &FieldMap<Self::Field>, now: DateTime<Utc>) -> Result<Self, Error>;

    /// Apply `patch` to a copy of `self`, refreshing `updatedAt`.
    fn merge(&self, patch: &FieldMap<Self::Field>, now: DateTime<Utc>) -> Result<Self, Error>;

    /// Default "not found" copy.
    fn not_found_message() -> String {
        format!("{} not found", Self::NAME)
    }

    /// Look up a non-hidden field by its external name.
    fn visible_field_named(name: &str) -> Option<Self::Field> {
        Self::FIELDS
            .iter()
            .copied()
            .filter(|field| !Self::HIDDEN.contains(field))
            .find(|field| field.name() == name)
    }

    /// Externally observable representation; hidden fields are omitted.
    fn to_public(&self) -> Map<String, Value> {
        Self::FIELDS
            .iter()
            .copied()
            .filter(|field| !Self::HIDDEN.contains(field))
            .map(|field| (field.name().to_owned(), self.value(field).to_json()))
            .collect()
    }

    /// Whether `patch` would leave every field unchanged.
    fn is_unchanged_by(&self, patch: &FieldMap<Self::Field>) -> bool {
        patch
            .iter()
            .all(|(field, value)| self.value(*field) == *value)
    }
}

/// Keep only the fields `E` allows callers to assign.
pub fn retain_fillable<E: Entity>(mut fields: FieldMap<E::Field>) -> FieldMap<E::Field> {
    fields.retain(|field, _| E::FILLABLE.contains(field));
    fields
}

/// Convert a JSON object into a field map, ignoring unknown keys.
///
/// # Examples
/// ```
/// use research_backend::domain::{User, UserField, field_map_from_json};
/// use serde_json::json;
///
/// let payload = json!({"firstName": "Ada", "isAdmin": true, "shoeSize": 9});
/// let fields = field_map_from_json::<User>(payload.as_object().expect("object"))
///     .expect("scalars convert");
/// assert_eq!(fields.len(), 2);
/// assert!(fields.contains_key(&UserField::FirstName));
/// ```
pub fn field_map_from_json<E: Entity>(
    payload: &Map<String, Value>,
) -> Result<FieldMap<E::Field>, Error> {
    let mut errors = FieldErrors::default();
    let mut fields = FieldMap::new();
    for field in E::FIELDS.iter().copied() {
        let Some(raw) = payload.get(field.name()) else {
            continue;
        };
        match FieldValue::from_json(raw) {
            Some(value) => {
                fields.insert(field, value);
            }
            None => errors.add(field, format!("{} must be a scalar value", field.name())),
        }
    }
    errors.into_result(fields)
}

/// Problems found while validating an entity's field lists.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldListError {
    /// A field name is declared twice.
    #[error("{entity}: field name {field:?} is declared more than once")]
    DuplicateName {
        /// Entity name.
        entity: &'static str,
        /// Offending field name.
        field: &'static str,
    },
    /// The primary key is missing from `FIELDS`.
    #[error("{entity}: primary key is not a declared field")]
    MissingId {
        /// Entity name.
        entity: &'static str,
    },
    /// A list names a field that is not persisted.
    #[error("{entity}: {list} names undeclared field {field:?}")]
    Undeclared {
        /// Entity name.
        entity: &'static str,
        /// `FILLABLE` or `HIDDEN`.
        list: &'static str,
        /// Offending field name.
        field: &'static str,
    },
    /// The primary key is mass-assignable.
    #[error("{entity}: primary key must not be fillable")]
    FillableId {
        /// Entity name.
        entity: &'static str,
    },
}

/// Check `E`'s field lists for consistency.
pub fn validate_field_lists<E: Entity>() -> Result<(), FieldListError> {
    let mut names = BTreeSet::new();
    for field in E::FIELDS {
        if !names.insert(field.name()) {
            return Err(FieldListError::DuplicateName {
                entity: E::NAME,
                field: field.name(),
            });
        }
    }
    if !E::FIELDS.contains(&E::ID_FIELD) {
        return Err(FieldListError::MissingId { entity: E::NAME });
    }
    for (list, fields) in [("FILLABLE", E::FILLABLE), ("HIDDEN", E::HIDDEN)] {
        if let Some(field) = fields.iter().find(|field| !E::FIELDS.contains(field)) {
            return Err(FieldListError::Undeclared {
                entity: E::NAME,
                list,
                field: field.name(),
            });
        }
    }
    if E::FILLABLE.contains(&E::ID_FIELD) {
        return Err(FieldListError::FillableId { entity: E::NAME });
    }
    Ok(())
}

/// Accumulates per-field validation messages.
#[derive(Debug, Default)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    /// Record a message for `field`, keeping the first one reported.
    pub fn add<F: EntityField>(&mut self, field: F, message: impl Into<String>) {
        self.add_named(field.name(), message);
    }

    /// Record a message under a raw parameter name.
    pub fn add_named(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_owned()).or_insert_with(|| message.into());
    }

    /// Whether nothing was reported.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `Ok(value)` when clean, otherwise a validation [`Error`].
    pub fn into_result<T>(self, value: T) -> Result<T, Error> {
        if self.0.is_empty() {
            Ok(value)
        } else {
            Err(Error::validation("Validation failed", self.0))
        }
    }
}

/// Read a text field, recording a type error when it is not text.
pub(crate) fn text_field<F: EntityField>(
    fields: &FieldMap<F>,
    field: F,
    errors: &mut FieldErrors,
) -> Option<String> {
    match fields.get(&field)? {
        FieldValue::Null => None,
        FieldValue::Text(text) => Some(text.trim().to_owned()),
        _ => {
            errors.add(field, format!("{} must be text", field.name()));
            None
        }
    }
}

/// Read a required, length-bounded text field.
pub(crate) fn bounded_text<F: EntityField>(
    fields: &FieldMap<F>,
    field: F,
    bounds: (usize, usize),
    errors: &mut FieldErrors,
) -> String {
    let (min, max) = bounds;
    let Some(text) = text_field(fields, field, errors) else {
        errors.add(field, format!("{} is required", field.name()));
        return String::new();
    };
    let length = text.chars().count();
    if length < min || length > max {
        errors.add(
            field,
            format!("{} must be between {min} and {max} characters", field.name()),
        );
    }
    text
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::{User, UserField};
    use pagination::{PageParams, PaginationLimits};
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    fn user_field_lists_are_consistent() {
        assert_eq!(validate_field_lists::<User>(), Ok(()));
    }

    #[rstest]
    fn retain_fillable_drops_privileged_fields() {
        let fields = FieldMap::from([
            (UserField::FirstName, FieldValue::from("Ada")),
            (UserField::IsAdmin, FieldValue::from(true)),
            (UserField::ResetStamp, FieldValue::from(5_i64)),
        ]);

        let kept = retain_fillable::<User>(fields);
        assert_eq!(kept.len(), 1);
        assert!(kept.contains_key(&UserField::FirstName));
    }

    #[rstest]
    fn non_scalar_payload_values_are_rejected() {
        let payload = json!({"firstName": ["Ada"]});
        let err = field_map_from_json::<User>(payload.as_object().expect("object"))
            .expect_err("arrays are not scalars");
        assert!(err.field_errors().is_some_and(|map| map.contains_key("firstName")));
    }

    #[rstest]
    #[case("password")]
    #[case("resetStamp")]
    #[case("shoeSize")]
    fn sorting_by_hidden_or_unknown_fields_is_invalid(#[case] field: &str) {
        let request = PageParams::new(None, None, Some(field))
            .resolve(&PaginationLimits::default())
            .expect("syntactically valid");
        let err = FindQuery::<UserField>::from_request::<User>(&request, Criteria::any())
            .expect_err("field is not sortable");
        assert!(err.field_errors().is_some_and(|map| map.contains_key("sort")));
    }

    #[rstest]
    fn sorting_by_visible_field_resolves_enum() {
        let request = PageParams::new(None, None, Some("lastName:desc"))
            .resolve(&PaginationLimits::default())
            .expect("valid request");
        let query = FindQuery::<UserField>::from_request::<User>(&request, Criteria::any())
            .expect("lastName is sortable");
        assert_eq!(query.sort, Some((UserField::LastName, SortDirection::Desc)));
    }

    #[rstest]
    fn uuid_text_is_accepted_as_identifier() {
        let id = Uuid::new_v4();
        assert_eq!(FieldValue::from(id.to_string()).as_uuid(), Some(id));
        assert_eq!(FieldValue::from("not-a-uuid").as_uuid(), None);
    }
}

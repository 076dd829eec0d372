//! Filter predicates and their canonical cache signatures.
//!
//! A [`FilterPredicate`] holds one optional requirement per recognized
//! attribute. Categorical attributes match by exact string equality, boolean
//! attributes by truthiness. Attribute names the predicate does not know are
//! dropped when a predicate is built from loose key/value pairs, so they never
//! influence matching or the signature.

use geocluster_types::point::{AttributeValue, GeoPoint};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// How an attribute is compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeKind {
    /// Exact string match
    Categorical,
    /// Truthy/falsy, normalized to 1/0
    Boolean,
}

/// The filterable attributes of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Attribute {
    Country,
    Gender,
    HasVideo,
    IsEmployed,
    IsEntrepreneur,
    IsFeatured,
    IsGraduate,
}

impl Attribute {
    pub const ALL: [Attribute; 7] = [
        Attribute::Country,
        Attribute::Gender,
        Attribute::HasVideo,
        Attribute::IsEmployed,
        Attribute::IsEntrepreneur,
        Attribute::IsFeatured,
        Attribute::IsGraduate,
    ];

    /// Record attribute name, also used in signatures.
    pub fn name(self) -> &'static str {
        match self {
            Attribute::Country => "country",
            Attribute::Gender => "gender",
            Attribute::HasVideo => "has_video",
            Attribute::IsEmployed => "is_employed",
            Attribute::IsEntrepreneur => "is_entrepreneur",
            Attribute::IsFeatured => "is_featured",
            Attribute::IsGraduate => "is_graduate",
        }
    }

    pub fn kind(self) -> AttributeKind {
        match self {
            Attribute::Country | Attribute::Gender => AttributeKind::Categorical,
            _ => AttributeKind::Boolean,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|attribute| attribute.name() == name)
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A required value for one attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FilterValue {
    Text(String),
    Flag(bool),
}

impl FilterValue {
    /// Render the value the way it appears in a signature.
    fn render(&self) -> String {
        match self {
            FilterValue::Flag(flag) => u8::from(*flag).to_string(),
            FilterValue::Text(text) => escape_signature_value(text),
        }
    }
}

/// Canonical cache key of a predicate.
///
/// `"all"` for the empty predicate, otherwise `name=value` pairs sorted by
/// attribute name and joined with `_`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterSignature(String);

impl FilterSignature {
    pub const ALL: &'static str = "all";

    /// Signature of the unfiltered dataset.
    pub fn all() -> Self {
        Self(Self::ALL.to_string())
    }

    pub fn is_all(&self) -> bool {
        self.0 == Self::ALL
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FilterSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FilterSignature {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Required attribute values; every set field must match (logical AND).
///
/// # Examples
///
/// ```
/// use geocluster::{Attribute, FilterPredicate};
///
/// let predicate = FilterPredicate::new()
///     .with_gender("female")
///     .with_flag(Attribute::IsGraduate, true);
/// assert_eq!(predicate.signature().as_str(), "gender=female_is_graduate=1");
/// assert_eq!(FilterPredicate::new().signature().as_str(), "all");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterPredicate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_flag"
    )]
    pub is_graduate: Option<bool>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_flag"
    )]
    pub is_employed: Option<bool>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_flag"
    )]
    pub is_entrepreneur: Option<bool>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_flag"
    )]
    pub is_featured: Option<bool>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_flag"
    )]
    pub has_video: Option<bool>,
}

impl FilterPredicate {
    /// The empty predicate; matches every record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from loose key/value pairs, ignoring unknown attribute names.
    ///
    /// Later pairs overwrite earlier ones for the same attribute.
    pub fn from_pairs<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, AttributeValue)>,
        K: AsRef<str>,
    {
        let mut predicate = Self::new();
        for (key, value) in pairs {
            match Attribute::from_name(key.as_ref()) {
                Some(attribute) => predicate.set(attribute, &value),
                None => log::debug!("Ignoring unknown filter attribute '{}'", key.as_ref()),
            }
        }
        predicate
    }

    pub fn with_gender(mut self, gender: impl Into<String>) -> Self {
        self.gender = Some(gender.into());
        self
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    /// Require a boolean attribute. Categorical attributes are left untouched.
    pub fn with_flag(mut self, attribute: Attribute, value: bool) -> Self {
        if let Some(slot) = self.flag_slot(attribute) {
            *slot = Some(value);
        }
        self
    }

    /// Set the requirement for `attribute`, coercing `value` to its kind.
    pub fn set(&mut self, attribute: Attribute, value: &AttributeValue) {
        match attribute {
            Attribute::Gender => self.gender = Some(value.to_string()),
            Attribute::Country => self.country = Some(value.to_string()),
            _ => {
                if let Some(slot) = self.flag_slot(attribute) {
                    *slot = Some(value.truthy());
                }
            }
        }
    }

    pub fn get(&self, attribute: Attribute) -> Option<FilterValue> {
        match attribute {
            Attribute::Gender => self.gender.clone().map(FilterValue::Text),
            Attribute::Country => self.country.clone().map(FilterValue::Text),
            Attribute::IsGraduate => self.is_graduate.map(FilterValue::Flag),
            Attribute::IsEmployed => self.is_employed.map(FilterValue::Flag),
            Attribute::IsEntrepreneur => self.is_entrepreneur.map(FilterValue::Flag),
            Attribute::IsFeatured => self.is_featured.map(FilterValue::Flag),
            Attribute::HasVideo => self.has_video.map(FilterValue::Flag),
        }
    }

    /// Set requirements ordered by attribute name.
    pub fn entries(&self) -> Vec<(Attribute, FilterValue)> {
        let mut entries: Vec<_> = Attribute::ALL
            .into_iter()
            .filter_map(|attribute| self.get(attribute).map(|value| (attribute, value)))
            .collect();
        entries.sort_by_key(|(attribute, _)| attribute.name());
        entries
    }

    pub fn is_empty(&self) -> bool {
        Attribute::ALL
            .into_iter()
            .all(|attribute| self.get(attribute).is_none())
    }

    pub fn signature(&self) -> FilterSignature {
        canonicalize(self)
    }

    pub fn matches(&self, point: &GeoPoint) -> bool {
        matches(point, self)
    }

    fn flag_slot(&mut self, attribute: Attribute) -> Option<&mut Option<bool>> {
        match attribute {
            Attribute::IsGraduate => Some(&mut self.is_graduate),
            Attribute::IsEmployed => Some(&mut self.is_employed),
            Attribute::IsEntrepreneur => Some(&mut self.is_entrepreneur),
            Attribute::IsFeatured => Some(&mut self.is_featured),
            Attribute::HasVideo => Some(&mut self.has_video),
            Attribute::Country | Attribute::Gender => None,
        }
    }
}

/// Derive the canonical signature of a predicate.
pub fn canonicalize(predicate: &FilterPredicate) -> FilterSignature {
    let entries = predicate.entries();
    if entries.is_empty() {
        return FilterSignature::all();
    }

    let parts: Vec<String> = entries
        .iter()
        .map(|(attribute, value)| format!("{}={}", attribute.name(), value.render()))
        .collect();
    FilterSignature(parts.join("_"))
}

/// Whether `point` satisfies every requirement of `predicate`.
///
/// A record missing a categorical attribute never matches it; a record missing
/// a boolean attribute counts as false.
pub fn matches(point: &GeoPoint, predicate: &FilterPredicate) -> bool {
    matches_attributes(&point.attributes, predicate)
}

/// [`matches`] over a bare attribute map, for records not yet converted.
pub fn matches_attributes(
    attributes: &BTreeMap<String, AttributeValue>,
    predicate: &FilterPredicate,
) -> bool {
    predicate
        .entries()
        .iter()
        .all(|(attribute, required)| match required {
            FilterValue::Text(text) => attributes
                .get(attribute.name())
                .and_then(AttributeValue::as_text)
                .is_some_and(|actual| actual == text.as_str()),
            FilterValue::Flag(flag) => {
                attributes
                    .get(attribute.name())
                    .is_some_and(AttributeValue::truthy)
                    == *flag
            }
        })
}

/// Percent-encode the separator characters so distinct predicates never share
/// a signature.
fn escape_signature_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '%' => escaped.push_str("%25"),
            '_' => escaped.push_str("%5F"),
            '=' => escaped.push_str("%3D"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

fn deserialize_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Option::<AttributeValue>::deserialize(deserializer)? {
        None => Ok(None),
        Some(AttributeValue::Flag(flag)) => Ok(Some(flag)),
        Some(AttributeValue::Integer(value)) => Ok(Some(value != 0)),
        Some(AttributeValue::Text(text)) => match text.to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(Some(true)),
            "false" | "0" => Ok(Some(false)),
            other => Err(D::Error::custom(format!("expected a boolean, got '{}'", other))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn learner(gender: &str, graduate: i64) -> GeoPoint {
        GeoPoint::new("id", 0.0, 0.0)
            .with_attribute("gender", gender.into())
            .with_attribute("is_graduate", AttributeValue::Integer(graduate))
    }

    #[test]
    fn test_empty_predicate_is_all() {
        assert_eq!(canonicalize(&FilterPredicate::new()), FilterSignature::all());
        assert!(FilterPredicate::new().signature().is_all());
    }

    #[test]
    fn test_signature_ignores_insertion_order() {
        let a = FilterPredicate::from_pairs([
            ("is_featured", AttributeValue::Flag(true)),
            ("country", AttributeValue::from("Kenya")),
            ("gender", AttributeValue::from("female")),
        ]);
        let b = FilterPredicate::from_pairs([
            ("gender", AttributeValue::from("female")),
            ("is_featured", AttributeValue::Integer(1)),
            ("country", AttributeValue::from("Kenya")),
        ]);
        assert_eq!(a.signature(), b.signature());
        assert_eq!(
            a.signature().as_str(),
            "country=Kenya_gender=female_is_featured=1"
        );
    }

    #[test]
    fn test_booleans_render_as_digits() {
        let predicate = FilterPredicate::new()
            .with_flag(Attribute::HasVideo, false)
            .with_flag(Attribute::IsEmployed, true);
        assert_eq!(predicate.signature().as_str(), "has_video=0_is_employed=1");
    }

    #[test]
    fn test_separator_characters_cannot_collide() {
        let smuggled = FilterPredicate::new().with_gender("x_is_graduate=1");
        let honest = FilterPredicate::new()
            .with_gender("x")
            .with_flag(Attribute::IsGraduate, true);
        assert_ne!(smuggled.signature(), honest.signature());
        assert_eq!(smuggled.signature().as_str(), "gender=x%5Fis%5Fgraduate%3D1");
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let predicate = FilterPredicate::from_pairs([
            ("favourite_colour", AttributeValue::from("blue")),
            ("gender", AttributeValue::from("male")),
        ]);
        assert_eq!(predicate, FilterPredicate::new().with_gender("male"));

        let only_unknown = FilterPredicate::from_pairs([("shoe_size", AttributeValue::Integer(9))]);
        assert!(only_unknown.is_empty());
        assert!(only_unknown.matches(&learner("male", 0)));
    }

    #[test]
    fn test_unknown_keys_ignored_when_deserializing() {
        let predicate: FilterPredicate =
            serde_json::from_str(r#"{"gender": "female", "planet": "mars", "is_featured": 1}"#)
                .unwrap();
        assert_eq!(predicate.gender.as_deref(), Some("female"));
        assert_eq!(predicate.is_featured, Some(true));
    }

    #[test]
    fn test_string_flags_deserialize() {
        let predicate: FilterPredicate =
            serde_json::from_str(r#"{"has_video": "false", "is_graduate": "TRUE"}"#).unwrap();
        assert_eq!(predicate.has_video, Some(false));
        assert_eq!(predicate.is_graduate, Some(true));

        assert!(serde_json::from_str::<FilterPredicate>(r#"{"has_video": "maybe"}"#).is_err());
    }

    #[test]
    fn test_matches_categorical_and_boolean() {
        let predicate = FilterPredicate::new()
            .with_gender("female")
            .with_flag(Attribute::IsGraduate, true);

        assert!(predicate.matches(&learner("female", 1)));
        assert!(!predicate.matches(&learner("female", 0)));
        assert!(!predicate.matches(&learner("male", 1)));
    }

    #[test]
    fn test_missing_attributes() {
        let bare = GeoPoint::new("bare", 0.0, 0.0);
        assert!(FilterPredicate::new()
            .with_flag(Attribute::IsFeatured, false)
            .matches(&bare));
        assert!(!FilterPredicate::new()
            .with_flag(Attribute::IsFeatured, true)
            .matches(&bare));
        assert!(!FilterPredicate::new().with_country("Ghana").matches(&bare));
    }

    #[test]
    fn test_with_flag_ignores_categorical() {
        let predicate = FilterPredicate::new().with_flag(Attribute::Gender, true);
        assert!(predicate.is_empty());
    }

    #[test]
    fn test_attribute_kinds() {
        assert_eq!(Attribute::Gender.kind(), AttributeKind::Categorical);
        assert_eq!(Attribute::Country.kind(), AttributeKind::Categorical);
        assert_eq!(Attribute::HasVideo.kind(), AttributeKind::Boolean);
        assert_eq!(Attribute::from_name("is_entrepreneur"), Some(Attribute::IsEntrepreneur));
        assert_eq!(Attribute::from_name("is_running_a_venture"), None);
    }
}

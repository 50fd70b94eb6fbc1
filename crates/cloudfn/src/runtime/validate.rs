//! Required-field validation over an explicit list of field descriptors.
//!
//! A payload type lists its required fields once, in [`RequiredFields::required_fields`],
//! either by hand or with `#[derive(RequiredFields)]`. Each descriptor pairs the
//! field's wire name with a function that tells whether the field still holds
//! its zero value.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;

/// Types with a recognizable "unset" value.
///
/// Zero means: empty string, `None`, zero number, `false`, or an empty
/// collection. `Some(_)` is never zero, even when the inner value is.
pub trait IsZero {
    /// Whether `self` is the zero value of its type.
    fn is_zero(&self) -> bool;
}

impl IsZero for str {
    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl IsZero for String {
    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl<T: IsZero + ?Sized> IsZero for &T {
    fn is_zero(&self) -> bool {
        (**self).is_zero()
    }
}

impl<T> IsZero for Option<T> {
    fn is_zero(&self) -> bool {
        self.is_none()
    }
}

impl<T> IsZero for Vec<T> {
    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl<T> IsZero for [T] {
    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl<K, V, S> IsZero for HashMap<K, V, S> {
    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl<K, V> IsZero for BTreeMap<K, V> {
    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl<T, S> IsZero for HashSet<T, S> {
    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl<T> IsZero for BTreeSet<T> {
    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl IsZero for bool {
    fn is_zero(&self) -> bool {
        !*self
    }
}

impl IsZero for char {
    fn is_zero(&self) -> bool {
        *self == '\0'
    }
}

macro_rules! impl_is_zero_int {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IsZero for $ty {
                fn is_zero(&self) -> bool {
                    *self == 0
                }
            }
        )*
    };
}

impl_is_zero_int!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

macro_rules! impl_is_zero_float {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IsZero for $ty {
                #[allow(clippy::float_cmp)]
                fn is_zero(&self) -> bool {
                    *self == 0.0
                }
            }
        )*
    };
}

impl_is_zero_float!(f32, f64);

impl IsZero for serde_json::Value {
    fn is_zero(&self) -> bool {
        match self {
            Self::Null => true,
            Self::String(s) => s.is_empty(),
            Self::Array(items) => items.is_empty(),
            Self::Object(map) => map.is_empty(),
            Self::Bool(_) | Self::Number(_) => false,
        }
    }
}

/// One required field of `T`: its wire name and a zero-value check.
pub struct RequiredField<T> {
    name: &'static str,
    is_missing: fn(&T) -> bool,
}

impl<T> RequiredField<T> {
    /// Describe a required field.
    ///
    /// `name` should be the field's serialized name (its JSON key), since
    /// that is what the client sent.
    ///
    /// ```
    /// use cloudfn::{IsZero, RequiredField};
    ///
    /// struct Req {
    ///     campaign: Option<String>,
    /// }
    ///
    /// let field = RequiredField::new("campaign", |r: &Req| r.campaign.is_zero());
    /// assert!(field.is_missing(&Req { campaign: None }));
    /// ```
    #[must_use]
    pub const fn new(name: &'static str, is_missing: fn(&T) -> bool) -> Self {
        Self { name, is_missing }
    }

    /// Serialized name of the field.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Whether the field of `value` is at its zero value.
    #[must_use]
    pub fn is_missing(&self, value: &T) -> bool {
        (self.is_missing)(value)
    }
}

impl<T> Clone for RequiredField<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for RequiredField<T> {}

impl<T> fmt::Debug for RequiredField<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequiredField")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// A required field was left at its zero value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("missing required field: {name:?}")]
pub struct MissingField {
    /// Serialized name of the missing field.
    pub name: &'static str,
}

/// Payload types that declare which of their fields must be populated.
///
/// # Examples
///
/// ```
/// use cloudfn::{IsZero, RequiredField, RequiredFields};
///
/// struct CreateCampaignReq {
///     campaign: Option<String>,
///     note: String,
/// }
///
/// impl RequiredFields for CreateCampaignReq {
///     fn required_fields() -> Vec<RequiredField<Self>> {
///         vec![RequiredField::new("campaign", |r: &Self| r.campaign.is_zero())]
///     }
/// }
///
/// let req = CreateCampaignReq { campaign: None, note: String::new() };
/// assert_eq!(
///     req.check_required().unwrap_err().to_string(),
///     r#"missing required field: "campaign""#,
/// );
/// ```
pub trait RequiredFields: Sized {
    /// Required fields in declaration order.
    fn required_fields() -> Vec<RequiredField<Self>>;

    /// Fail on the first required field still at its zero value.
    ///
    /// # Errors
    ///
    /// Returns [`MissingField`] naming that field.
    fn check_required(&self) -> Result<(), MissingField> {
        check_required(self)
    }
}

impl RequiredFields for serde_json::Value {
    fn required_fields() -> Vec<RequiredField<Self>> {
        Vec::new()
    }
}

/// Check that every required field of `value` is populated.
///
/// Only the top-level fields are inspected; nested payloads are not
/// validated recursively.
///
/// # Errors
///
/// Returns [`MissingField`] for the first required field, in declaration
/// order, that is at its zero value.
pub fn check_required<T: RequiredFields>(value: &T) -> Result<(), MissingField> {
    match T::required_fields()
        .into_iter()
        .find(|field| field.is_missing(value))
    {
        Some(field) => Err(MissingField { name: field.name }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Foo;

    struct TestReq {
        foo: Option<Foo>,
        name: String,
        count: u32,
        tags: Vec<String>,
        optional: String,
    }

    impl RequiredFields for TestReq {
        fn required_fields() -> Vec<RequiredField<Self>> {
            vec![
                RequiredField::new("foo", |r: &Self| r.foo.is_zero()),
                RequiredField::new("name", |r: &Self| r.name.is_zero()),
                RequiredField::new("count", |r: &Self| r.count.is_zero()),
                RequiredField::new("tags", |r: &Self| r.tags.is_zero()),
            ]
        }
    }

    fn populated() -> TestReq {
        TestReq {
            foo: Some(Foo),
            name: "spring".into(),
            count: 3,
            tags: vec!["a".into()],
            optional: String::new(),
        }
    }

    #[test]
    fn all_populated_passes() {
        assert_eq!(check_required(&populated()), Ok(()));
    }

    #[test]
    fn unmarked_fields_may_be_zero() {
        let req = populated();
        assert!(req.optional.is_zero());
        assert!(req.check_required().is_ok());
    }

    #[test]
    fn each_missing_field_is_named() {
        let mut req = populated();
        req.foo = None;
        assert_eq!(check_required(&req), Err(MissingField { name: "foo" }));

        let mut req = populated();
        req.name.clear();
        assert_eq!(check_required(&req), Err(MissingField { name: "name" }));

        let mut req = populated();
        req.count = 0;
        assert_eq!(check_required(&req), Err(MissingField { name: "count" }));

        let mut req = populated();
        req.tags.clear();
        assert_eq!(check_required(&req), Err(MissingField { name: "tags" }));
    }

    #[test]
    fn first_missing_field_wins() {
        let mut req = populated();
        req.name.clear();
        req.count = 0;
        assert_eq!(check_required(&req), Err(MissingField { name: "name" }));
    }

    #[test]
    fn some_of_empty_struct_is_not_zero() {
        let req = TestReq {
            foo: Some(Foo),
            ..populated()
        };
        assert!(!req.foo.is_zero());
    }

    #[test]
    fn missing_field_display_quotes_name() {
        let err = MissingField { name: "campaign" };
        assert_eq!(err.to_string(), r#"missing required field: "campaign""#);
    }

    #[test]
    fn zero_values() {
        assert!("".is_zero());
        assert!(0i64.is_zero());
        assert!(0.0f64.is_zero());
        assert!(!1.5f32.is_zero());
        assert!(false.is_zero());
        assert!(HashMap::<String, u8>::new().is_zero());
        assert!(BTreeSet::<u8>::new().is_zero());
        assert!(serde_json::Value::Null.is_zero());
        assert!(serde_json::json!({}).is_zero());
        assert!(!serde_json::json!(0).is_zero());
        assert!(!serde_json::json!({"a": 1}).is_zero());
    }

    #[test]
    fn json_value_has_no_required_fields() {
        assert!(serde_json::Value::Null.check_required().is_ok());
    }

    #[test]
    fn debug_shows_name() {
        let field = RequiredField::new("name", |r: &TestReq| r.name.is_zero());
        let debug = format!("{field:?}");
        assert!(debug.contains("name"), "{debug}");
    }
}

//! Match conditions: field-equality predicates reduced with logical OR.
//!
//! Building a condition is split into pure steps so each can be tested
//! without a store:
//!
//! 1. [`build_predicates`] produces one equality predicate per identity field.
//! 2. [`Condition::any_of`] reduces them into a single disjunction.
//! 3. A `RecordStore` executes a bounded query filtered by the disjunction.

use serde::{Deserialize, Serialize};

use crate::handle::Handle;

/// Name of a record field eligible to match a handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldName(String);

impl FieldName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for FieldName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FieldName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for FieldName {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A single field-equality predicate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Predicate {
    Eq { field: FieldName, value: Handle },
}

impl Predicate {
    pub fn eq(field: impl Into<FieldName>, value: impl Into<Handle>) -> Self {
        Predicate::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn field(&self) -> &FieldName {
        match self {
            Predicate::Eq { field, .. } => field,
        }
    }

    pub fn matches<S: FieldSource + ?Sized>(&self, source: &S) -> bool {
        match self {
            Predicate::Eq { field, value } => source
                .field_value(field)
                .is_some_and(|stored| stored.loosely_eq(value)),
        }
    }
}

/// Read access to a record's field values, for evaluating conditions in memory.
pub trait FieldSource {
    fn field_value(&self, field: &FieldName) -> Option<&Handle>;
}

/// Disjunction of predicates: matches a record if **any** predicate does.
///
/// An empty disjunction matches nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Condition {
    any: Vec<Predicate>,
}

impl Condition {
    /// The condition that matches no record.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn any_of(predicates: impl IntoIterator<Item = Predicate>) -> Self {
        Self {
            any: predicates.into_iter().collect(),
        }
    }

    /// Condition for "`handle` equals this value in any of `fields`".
    pub fn for_handle(fields: &[FieldName], handle: Option<&Handle>) -> Self {
        match handle {
            Some(handle) => Self::any_of(build_predicates(fields, handle)),
            None => Self::none(),
        }
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.any
    }

    /// `true` when no record can ever satisfy the condition.
    pub fn is_unsatisfiable(&self) -> bool {
        self.any.is_empty()
    }

    pub fn matches<S: FieldSource + ?Sized>(&self, source: &S) -> bool {
        self.any.iter().any(|p| p.matches(source))
    }
}

/// One equality predicate per identity field, in configuration order.
pub fn build_predicates(fields: &[FieldName], handle: &Handle) -> Vec<Predicate> {
    fields
        .iter()
        .map(|field| Predicate::Eq {
            field: field.clone(),
            value: handle.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct Fields(HashMap<FieldName, Handle>);

    impl FieldSource for Fields {
        fn field_value(&self, field: &FieldName) -> Option<&Handle> {
            self.0.get(field)
        }
    }

    fn record(pairs: &[(&str, Handle)]) -> Fields {
        Fields(
            pairs
                .iter()
                .map(|(k, v)| (FieldName::from(*k), v.clone()))
                .collect(),
        )
    }

    fn fields(names: &[&str]) -> Vec<FieldName> {
        names.iter().map(|n| FieldName::from(*n)).collect()
    }

    #[test]
    fn predicates_follow_field_order() {
        let preds = build_predicates(&fields(&["id", "external_ref"]), &Handle::from("X123"));

        assert_eq!(
            preds,
            vec![
                Predicate::eq("id", "X123"),
                Predicate::eq("external_ref", "X123"),
            ]
        );
    }

    #[test]
    fn disjunction_matches_any_field() {
        let cond = Condition::for_handle(&fields(&["id", "external_ref"]), Some(&Handle::from("X123")));

        let by_ref = record(&[("id", Handle::from(77i64)), ("external_ref", Handle::from("X123"))]);
        let by_id = record(&[("id", Handle::from("X123"))]);
        let neither = record(&[("id", Handle::from(1i64)), ("external_ref", Handle::from("Y"))]);

        assert!(cond.matches(&by_ref));
        assert!(cond.matches(&by_id));
        assert!(!cond.matches(&neither));
    }

    #[test]
    fn empty_field_list_matches_nothing() {
        let cond = Condition::for_handle(&[], Some(&Handle::from("X123")));
        assert!(cond.is_unsatisfiable());

        // Even a record whose fields would otherwise match anything.
        let any = record(&[("id", Handle::from("X123"))]);
        assert!(!cond.matches(&any));
    }

    #[test]
    fn absent_handle_matches_nothing() {
        let cond = Condition::for_handle(&fields(&["id"]), None);
        assert!(cond.is_unsatisfiable());
    }

    #[test]
    fn missing_field_does_not_match() {
        let cond = Condition::for_handle(&fields(&["external_ref"]), Some(&Handle::from("X123")));
        assert!(!cond.matches(&record(&[("id", Handle::from("X123"))])));
    }
}

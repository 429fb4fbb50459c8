//! Predicate combinator for dynamic filter building.
//!
//! A [`Predicate`] is a tree of typed clauses over an entity's field enum.
//! Callers compose optional clauses with [`Predicate::all`] and hand the
//! result to a repository, which lowers it into a store-neutral
//! [`Condition`] and lets the store evaluate it. Rows are never pulled into
//! memory to be filtered after the fact.

use std::cmp::Ordering;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::result::AppResult;
use crate::traits::entity::Field;
use crate::types::query::Condition;
use crate::types::value::{Value, ValueKind};

/// Filter comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    /// Exact equality.
    Eq,
    /// Not equal.
    Ne,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal.
    Lte,
}

impl FilterOp {
    /// Return the SQL operator.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
        }
    }

    /// Whether `left <op> right` holds given `left.cmp(right)`.
    pub fn holds(&self, ordering: Ordering) -> bool {
        match self {
            Self::Eq => ordering == Ordering::Equal,
            Self::Ne => ordering != Ordering::Equal,
            Self::Gt => ordering == Ordering::Greater,
            Self::Gte => ordering != Ordering::Less,
            Self::Lt => ordering == Ordering::Less,
            Self::Lte => ordering != Ordering::Greater,
        }
    }
}

/// A boolean condition over the fields `F` of one entity kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate<F> {
    /// Matches every row.
    True,
    /// Compare a field against a value.
    Compare {
        /// The field to compare.
        field: F,
        /// The comparison operator.
        op: FilterOp,
        /// The value to compare against.
        value: Value,
    },
    /// Compare the calendar date (UTC) of a temporal field.
    OnDate {
        /// The temporal field.
        field: F,
        /// The comparison operator.
        op: FilterOp,
        /// The date to compare against.
        date: NaiveDate,
    },
    /// Substring search over a text field.
    Contains {
        /// The text field.
        field: F,
        /// The substring to look for, matched literally.
        needle: String,
    },
    /// Field value is one of the listed values. An empty list matches nothing.
    In {
        /// The field to test.
        field: F,
        /// Accepted values.
        values: Vec<Value>,
    },
    /// Field is `NULL`.
    IsNull(F),
    /// All children hold.
    And(Vec<Predicate<F>>),
    /// At least one child holds.
    Or(Vec<Predicate<F>>),
    /// The child does not hold.
    Not(Box<Predicate<F>>),
}

impl<F: Field> Predicate<F> {
    /// AND together every present clause, in encounter order.
    ///
    /// Absent clauses contribute nothing; with no present clauses the
    /// result is [`Predicate::True`].
    pub fn all<I>(clauses: I) -> Self
    where
        I: IntoIterator<Item = Option<Predicate<F>>>,
    {
        clauses
            .into_iter()
            .flatten()
            .fold(Self::True, |acc, clause| acc.and(clause))
    }

    /// Logical AND, flattening nested conjunctions. `True` is the identity.
    pub fn and(self, other: Self) -> Self {
        match (self, other) {
            (Self::True, p) | (p, Self::True) => p,
            (Self::And(mut left), Self::And(right)) => {
                left.extend(right);
                Self::And(left)
            }
            (Self::And(mut left), p) => {
                left.push(p);
                Self::And(left)
            }
            (p, Self::And(mut right)) => {
                right.insert(0, p);
                Self::And(right)
            }
            (left, right) => Self::And(vec![left, right]),
        }
    }

    /// Logical OR, flattening nested disjunctions. `True` absorbs.
    pub fn or(self, other: Self) -> Self {
        match (self, other) {
            (Self::True, _) | (_, Self::True) => Self::True,
            (Self::Or(mut left), Self::Or(right)) => {
                left.extend(right);
                Self::Or(left)
            }
            (Self::Or(mut left), p) => {
                left.push(p);
                Self::Or(left)
            }
            (p, Self::Or(mut right)) => {
                right.insert(0, p);
                Self::Or(right)
            }
            (left, right) => Self::Or(vec![left, right]),
        }
    }

    /// Whether this predicate is the unconstrained match-all.
    pub fn is_match_all(&self) -> bool {
        matches!(self, Self::True)
    }

    /// `field = value`
    pub fn eq(field: F, value: impl Into<Value>) -> Self {
        Self::compare(field, FilterOp::Eq, value)
    }

    /// `field <> value`
    pub fn ne(field: F, value: impl Into<Value>) -> Self {
        Self::compare(field, FilterOp::Ne, value)
    }

    /// `field > value`
    pub fn gt(field: F, value: impl Into<Value>) -> Self {
        Self::compare(field, FilterOp::Gt, value)
    }

    /// `field >= value`
    pub fn gte(field: F, value: impl Into<Value>) -> Self {
        Self::compare(field, FilterOp::Gte, value)
    }

    /// `field < value`
    pub fn lt(field: F, value: impl Into<Value>) -> Self {
        Self::compare(field, FilterOp::Lt, value)
    }

    /// `field <= value`
    pub fn lte(field: F, value: impl Into<Value>) -> Self {
        Self::compare(field, FilterOp::Lte, value)
    }

    /// Generic comparison.
    pub fn compare(field: F, op: FilterOp, value: impl Into<Value>) -> Self {
        Self::Compare {
            field,
            op,
            value: value.into(),
        }
    }

    /// Calendar date of `field` is on or after `date`.
    pub fn on_or_after(field: F, date: NaiveDate) -> Self {
        Self::OnDate {
            field,
            op: FilterOp::Gte,
            date,
        }
    }

    /// Calendar date of `field` is on or before `date`.
    pub fn on_or_before(field: F, date: NaiveDate) -> Self {
        Self::OnDate {
            field,
            op: FilterOp::Lte,
            date,
        }
    }

    /// Text `field` contains `needle`.
    pub fn contains(field: F, needle: impl Into<String>) -> Self {
        Self::Contains {
            field,
            needle: needle.into(),
        }
    }

    /// `field IN (values...)`
    pub fn is_in<V, I>(field: F, values: I) -> Self
    where
        V: Into<Value>,
        I: IntoIterator<Item = V>,
    {
        Self::In {
            field,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Lower into a store-neutral [`Condition`], checking every clause
    /// against the declared kind of its field.
    pub fn lower(&self) -> AppResult<Condition> {
        match self {
            Self::True => Ok(Condition::True),
            Self::Compare { field, op, value } => {
                check_value(*field, value)?;
                Ok(Condition::Compare {
                    column: field.column(),
                    kind: field.kind(),
                    op: *op,
                    value: value.clone(),
                })
            }
            Self::OnDate { field, op, date } => {
                if !matches!(field.kind(), ValueKind::Timestamp | ValueKind::Date) {
                    return Err(AppError::translation(format!(
                        "Date comparison on {} column '{}'",
                        field.kind(),
                        field.column()
                    )));
                }
                Ok(Condition::OnDate {
                    column: field.column(),
                    kind: field.kind(),
                    op: *op,
                    date: *date,
                })
            }
            Self::Contains { field, needle } => {
                if field.kind() != ValueKind::Text {
                    return Err(AppError::translation(format!(
                        "Substring search on {} column '{}'",
                        field.kind(),
                        field.column()
                    )));
                }
                Ok(Condition::Contains {
                    column: field.column(),
                    needle: needle.clone(),
                })
            }
            Self::In { field, values } => {
                for value in values {
                    check_value(*field, value)?;
                }
                if values.is_empty() {
                    return Ok(Condition::False);
                }
                Ok(Condition::In {
                    column: field.column(),
                    kind: field.kind(),
                    values: values.clone(),
                })
            }
            Self::IsNull(field) => Ok(Condition::IsNull {
                column: field.column(),
            }),
            Self::And(children) => Ok(Condition::And(
                children.iter().map(Self::lower).collect::<AppResult<_>>()?,
            )),
            Self::Or(children) => Ok(Condition::Or(
                children.iter().map(Self::lower).collect::<AppResult<_>>()?,
            )),
            Self::Not(child) => Ok(Condition::Not(Box::new(child.lower()?))),
        }
    }
}

impl<F> std::ops::Not for Predicate<F> {
    type Output = Self;

    fn not(self) -> Self {
        match self {
            Self::Not(inner) => *inner,
            other => Self::Not(Box::new(other)),
        }
    }
}

impl<F> Default for Predicate<F> {
    fn default() -> Self {
        Self::True
    }
}

fn check_value<F: Field>(field: F, value: &Value) -> AppResult<()> {
    match value.kind() {
        Some(kind) if kind == field.kind() => Ok(()),
        None if value.is_null() => Err(AppError::translation(format!(
            "Comparison with null on column '{}'; use an is-null clause",
            field.column()
        ))),
        _ => Err(AppError::translation(format!(
            "Column '{}' is {}, cannot compare with {}",
            field.column(),
            field.kind(),
            value.type_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Col {
        Id,
        Name,
        Created,
    }

    impl Field for Col {
        fn column(&self) -> &'static str {
            match self {
                Self::Id => "id",
                Self::Name => "name",
                Self::Created => "created_date",
            }
        }

        fn kind(&self) -> ValueKind {
            match self {
                Self::Id => ValueKind::Integer,
                Self::Name => ValueKind::Text,
                Self::Created => ValueKind::Timestamp,
            }
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn test_all_with_no_clauses_matches_everything() {
        let p: Predicate<Col> = Predicate::all([None, None, None]);
        assert!(p.is_match_all());
        assert_eq!(p.lower().expect("lower"), Condition::True);
    }

    #[test]
    fn test_all_skips_absent_clauses_and_keeps_order() {
        let p = Predicate::all([
            Some(Predicate::on_or_after(Col::Created, date(2024, 1, 1))),
            None,
            Some(Predicate::contains(Col::Name, "elect")),
        ]);
        assert_eq!(
            p,
            Predicate::And(vec![
                Predicate::on_or_after(Col::Created, date(2024, 1, 1)),
                Predicate::contains(Col::Name, "elect"),
            ])
        );
    }

    #[test]
    fn test_single_clause_is_not_wrapped() {
        let p = Predicate::all([None, Some(Predicate::eq(Col::Id, 3_i64))]);
        assert_eq!(p, Predicate::eq(Col::Id, 3_i64));
    }

    #[test]
    fn test_and_flattens_nested_conjunctions() {
        let left = Predicate::eq(Col::Id, 1_i64).and(Predicate::contains(Col::Name, "a"));
        let right = Predicate::contains(Col::Name, "b").and(Predicate::gt(Col::Id, 0_i64));
        match left.and(right) {
            Predicate::And(children) => assert_eq!(children.len(), 4),
            other => panic!("expected conjunction, got {other:?}"),
        }
    }

    #[test]
    fn test_or_with_true_is_true() {
        let p = Predicate::eq(Col::Id, 1_i64).or(Predicate::True);
        assert!(p.is_match_all());
    }

    #[test]
    fn test_or_flattens_disjunction_on_either_side() {
        let right = Predicate::eq(Col::Id, 2_i64).or(Predicate::eq(Col::Id, 3_i64));
        let p = Predicate::eq(Col::Id, 1_i64).or(right);
        assert_eq!(
            p,
            Predicate::Or(vec![
                Predicate::eq(Col::Id, 1_i64),
                Predicate::eq(Col::Id, 2_i64),
                Predicate::eq(Col::Id, 3_i64),
            ])
        );
    }

    #[test]
    fn test_double_negation_cancels() {
        let p = Predicate::eq(Col::Id, 1_i64);
        assert_eq!(!!p.clone(), p);
    }

    #[test]
    fn test_lower_rejects_kind_mismatch() {
        let err = Predicate::eq(Col::Id, "seven").lower().unwrap_err();
        assert_eq!(err.kind, ErrorKind::Translation);

        let err = Predicate::contains(Col::Id, "1").lower().unwrap_err();
        assert_eq!(err.kind, ErrorKind::Translation);

        let err = Predicate::on_or_after(Col::Name, date(2024, 1, 1))
            .lower()
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Translation);
    }

    #[test]
    fn test_lower_rejects_null_comparison() {
        let err = Predicate::eq(Col::Name, Value::Null).lower().unwrap_err();
        assert!(err.message.contains("is-null"));
    }

    #[test]
    fn test_empty_in_lowers_to_false() {
        let p: Predicate<Col> = Predicate::is_in(Col::Id, Vec::<i64>::new());
        assert_eq!(p.lower().expect("lower"), Condition::False);
    }

    #[test]
    fn test_filter_op_holds() {
        assert!(FilterOp::Gte.holds(Ordering::Equal));
        assert!(FilterOp::Gte.holds(Ordering::Greater));
        assert!(!FilterOp::Gte.holds(Ordering::Less));
        assert!(FilterOp::Ne.holds(Ordering::Less));
        assert!(!FilterOp::Lt.holds(Ordering::Equal));
    }
}

use crate::{
    error::{ColumnError, ScanError},
    value::{FromValue, Value},
};
use derive_more::{Deref, IntoIterator};
use serde::Deserialize;
use std::{borrow::Cow, fmt, rc::Rc, sync::Arc};

///
/// Row
///
/// One fetched result row: column values in select-list order.
///

#[derive(Clone, Debug, Default, Deref, IntoIterator, PartialEq)]
pub struct Row(Vec<Value>);

impl Row {
    #[must_use]
    pub const fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    /// Read column `index` as `T`.
    pub fn get<T: FromValue>(&self, index: usize) -> Result<T, ScanError> {
        let value = self.0.get(index).ok_or(ScanError::Missing { index })?;

        T::from_value(value).ok_or_else(|| ScanError::Type {
            index,
            expected: std::any::type_name::<T>(),
            found: value.kind_label(),
        })
    }

    /// Fail unless the row carries exactly `expected` columns.
    pub fn expect_arity(&self, expected: usize) -> Result<(), ScanError> {
        let found = self.0.len();
        if found == expected {
            Ok(())
        } else {
            Err(ScanError::Arity { expected, found })
        }
    }
}

impl From<Vec<Value>> for Row {
    fn from(values: Vec<Value>) -> Self {
        Self(values)
    }
}

impl FromIterator<Value> for Row {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

///
/// Scan
///
/// Binds an entity to the select list: `COLUMNS` names the columns in
/// position order and `scan` builds one entity from a row in that order.
///

pub trait Scan: Sized {
    const COLUMNS: &'static [&'static str];

    fn scan(row: &Row) -> Result<Self, ScanError>;

    /// Comma-separated select list for `COLUMNS`.
    #[must_use]
    fn select_list() -> String {
        Self::COLUMNS.join(", ")
    }
}

impl<T: Scan> Scan for Rc<T> {
    const COLUMNS: &'static [&'static str] = T::COLUMNS;

    fn scan(row: &Row) -> Result<Self, ScanError> {
        T::scan(row).map(Self::new)
    }
}

impl<T: Scan> Scan for Arc<T> {
    const COLUMNS: &'static [&'static str] = T::COLUMNS;

    fn scan(row: &Row) -> Result<Self, ScanError> {
        T::scan(row).map(Self::new)
    }
}

///
/// Column
///
/// Column name usable directly inside a predicate clause: a non-empty run
/// of ASCII alphanumerics, `_` and `.` (for qualified names), not starting
/// with a digit. Names parsed at runtime are checked on construction;
/// `Column::new` literals are checked by the loader before use.
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq)]
#[serde(try_from = "String")]
pub struct Column(Cow<'static, str>);

impl Column {
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// Checked constructor for names that are not compile-time literals.
    pub fn parse(name: impl Into<String>) -> Result<Self, ColumnError> {
        let column = Self(Cow::Owned(name.into()));
        column.validate()?;

        Ok(column)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        let mut chars = self.0.chars();
        chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
    }

    pub fn validate(&self) -> Result<(), ColumnError> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(ColumnError {
                name: self.0.to_string(),
            })
        }
    }
}

impl TryFrom<String> for Column {
    type Error = ColumnError;

    fn try_from(name: String) -> Result<Self, Self::Error> {
        Self::parse(name)
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

///
/// TESTS
///

use crate::error::StatementError;
use std::{collections::HashMap, sync::OnceLock};

static GLOBAL: OnceLock<RawStatementStore> = OnceLock::new();

///
/// RawStatementStore
///
/// Registry of named raw statements (for example relation select bases),
/// keyed by a dotted name such as `posts.by_author`.
///
/// Built mutably during setup, then either owned by the caller or installed
/// once as the process-wide store and only read afterwards.
///

#[derive(Clone, Debug, Default)]
pub struct RawStatementStore {
    statements: HashMap<String, String>,
}

impl RawStatementStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `statement` under `key`, returning the statement it replaced.
    pub fn set(&mut self, key: impl Into<String>, statement: impl Into<String>) -> Option<String> {
        self.statements.insert(key.into(), statement.into())
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.statements.get(key).map(String::as_str)
    }

    /// Like [`RawStatementStore::get`], failing with the missing key.
    pub fn require(&self, key: &str) -> Result<&str, StatementError> {
        self.get(key).ok_or_else(|| StatementError::NotFound {
            key: key.to_string(),
        })
    }

    #[must_use]
    pub const fn get_all(&self) -> &HashMap<String, String> {
        &self.statements
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.statements.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Install this store as the process-wide store. Only the first call
    /// succeeds.
    pub fn install_global(self) -> Result<(), StatementError> {
        GLOBAL
            .set(self)
            .map_err(|_| StatementError::AlreadyInstalled)
    }

    /// The process-wide store, if one has been installed.
    #[must_use]
    pub fn global() -> Option<&'static Self> {
        GLOBAL.get()
    }
}

impl<K, V> FromIterator<(K, V)> for RawStatementStore
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut store = Self::new();
        for (key, statement) in iter {
            store.set(key, statement);
        }

        store
    }
}

///
/// TESTS
///

//! Filter selection and its canonical remote query.
//!
//! A selection is a set of chosen value ids per field plus an optional
//! free-text token. Empty fields impose no constraint; fields combine with
//! AND on the server, values inside a field with OR.
//!
//! The query is built from sorted collections only, so the same selection
//! always produces the same string no matter in which order the user
//! clicked things.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Query key carrying the free-text token.
pub const SEARCH_KEY: &str = "search";

/// Active filter state as driven by the filter UI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSelection {
    fields: BTreeMap<String, BTreeSet<String>>,
    search: Option<String>,
}

impl FilterSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `value` to the selected set of `field`.
    ///
    /// Fails for the field name [`SEARCH_KEY`], which the query reserves for
    /// the free-text token.
    pub fn select(&mut self, field: impl Into<String>, value: impl Into<String>) -> Result<&mut Self> {
        let field = field.into();
        if field == SEARCH_KEY {
            return Err(CoreError::ReservedField(field));
        }
        self.fields.entry(field).or_default().insert(value.into());
        Ok(self)
    }

    /// Remove `value` from `field`. Returns whether it was selected.
    pub fn deselect(&mut self, field: &str, value: &str) -> bool {
        let Some(values) = self.fields.get_mut(field) else {
            return false;
        };
        let removed = values.remove(value);
        if values.is_empty() {
            self.fields.remove(field);
        }
        removed
    }

    /// Flip a checkbox. Returns `true` when the value ends up selected.
    pub fn toggle(&mut self, field: &str, value: &str) -> Result<bool> {
        if self.deselect(field, value) {
            Ok(false)
        } else {
            self.select(field, value)?;
            Ok(true)
        }
    }

    pub fn clear_field(&mut self, field: &str) {
        self.fields.remove(field);
    }

    pub fn set_search(&mut self, text: Option<String>) -> &mut Self {
        self.search = text;
        self
    }

    pub fn clear(&mut self) {
        self.fields.clear();
        self.search = None;
    }

    pub fn selected(&self, field: &str) -> impl Iterator<Item = &str> {
        self.fields
            .get(field)
            .into_iter()
            .flat_map(|values| values.iter().map(String::as_str))
    }

    pub fn search(&self) -> Option<&str> {
        self.search.as_deref()
    }

    /// Normalized search token: trimmed and lower-cased, `None` when blank.
    pub fn normalized_search(&self) -> Option<String> {
        let token = self.search.as_deref()?.trim();
        if token.is_empty() {
            None
        } else {
            Some(token.to_lowercase())
        }
    }

    /// True when the selection constrains nothing.
    pub fn is_empty(&self) -> bool {
        self.fields.values().all(BTreeSet::is_empty) && self.normalized_search().is_none()
    }
}

/// Canonical remote query derived from a [`FilterSelection`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FilterQuery {
    pairs: Vec<(String, String)>,
}

impl FilterQuery {
    /// Ordered, already-encoded `(key, value)` pairs.
    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// The query string without a leading `?`.
    pub fn as_query_string(&self) -> String {
        self.pairs
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Append this query to an endpoint URL.
    pub fn apply_to(&self, endpoint: &str) -> String {
        if self.pairs.is_empty() {
            return endpoint.to_string();
        }
        let separator = if endpoint.contains('?') { '&' } else { '?' };
        format!("{}{}{}", endpoint, separator, self.as_query_string())
    }
}

impl fmt::Display for FilterQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_query_string())
    }
}

/// Build the canonical query for a selection. Pure; no I/O.
pub fn build_query(selection: &FilterSelection) -> FilterQuery {
    let mut pairs = Vec::with_capacity(selection.fields.len() + 1);

    // BTreeMap / BTreeSet iterate in sorted order
    for (field, values) in &selection.fields {
        if values.is_empty() {
            continue;
        }
        let joined = values
            .iter()
            .map(|v| urlencoding::encode(v).into_owned())
            .collect::<Vec<_>>()
            .join(",");
        pairs.push((urlencoding::encode(field).into_owned(), joined));
    }

    if let Some(token) = selection.normalized_search() {
        pairs.push((SEARCH_KEY.to_string(), urlencoding::encode(&token).into_owned()));
    }

    FilterQuery { pairs }
}

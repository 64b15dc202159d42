// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Environment variable values.
//!
//! Profiles record their environment as ordered lists of `KEY=VALUE` strings,
//! while merging operates on a keyed mapping. This module bridges the two
//! representations and provides the token helpers used for path-like and
//! flag-like variables.

use std::{
    collections::BTreeMap,
    fmt::{Display, Formatter, Result as FmtResult},
};

/// Separator for path-like variables, e.g., `PATH`.
pub const PATH_SEPARATOR: &str = ":";

/// Separator for flag-like variables, e.g., `CFLAGS`.
pub const FLAG_SEPARATOR: &str = " ";

/// Ordered mapping of environment variable names to values.
///
/// Keys are kept in lexicographic order so that every view of the mapping is
/// deterministic.
#[derive(Default, Debug, PartialEq, Eq, Clone)]
pub struct EnvVars {
    vars: BTreeMap<String, String>,
}

impl EnvVars {
    /// Construct new empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct mapping from current process environment.
    ///
    /// Variables that are not valid unicode are skipped.
    pub fn from_process() -> Self {
        Self {
            vars: std::env::vars_os()
                .filter_map(|(key, value)| {
                    Some((key.into_string().ok()?, value.into_string().ok()?))
                })
                .collect(),
        }
    }

    /// Construct mapping from listing of `KEY=VALUE` strings.
    ///
    /// Later entries for the same key overwrite earlier ones.
    pub fn from_vars(vars: impl IntoIterator<Item = impl AsRef<str>>) -> Self {
        let mut env = Self::new();
        for var in vars {
            let (key, value) = split_key_value(var.as_ref());
            env.set(key, value);
        }

        env
    }

    /// Get value of variable.
    pub fn get(&self, key: impl AsRef<str>) -> Option<&str> {
        self.vars.get(key.as_ref()).map(String::as_str)
    }

    /// Set value of variable, replacing any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(key.into(), value.into());
    }

    /// Remove variable, returning its previous value.
    pub fn delete(&mut self, key: impl AsRef<str>) -> Option<String> {
        self.vars.remove(key.as_ref())
    }

    /// Check if variable is present.
    pub fn contains(&self, key: impl AsRef<str>) -> bool {
        self.vars.contains_key(key.as_ref())
    }

    /// List variable names in order.
    pub fn names(&self) -> Vec<String> {
        self.vars.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Split value of variable into non-empty tokens.
    ///
    /// Missing variables produce no tokens.
    pub fn tokens(&self, key: impl AsRef<str>, separator: &str) -> Vec<String> {
        self.get(key)
            .map(|value| split_tokens(value, separator))
            .unwrap_or_default()
    }

    /// Set value of variable by joining tokens on separator.
    pub fn set_tokens(
        &mut self,
        key: impl Into<String>,
        tokens: impl IntoIterator<Item = impl AsRef<str>>,
        separator: &str,
    ) {
        self.set(key, join_tokens(tokens, separator));
    }

    /// Iterate through name and value pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Convert mapping into ordered listing of `KEY=VALUE` strings.
    pub fn to_vars(&self) -> Vec<String> {
        self.iter()
            .map(|(key, value)| join_key_value(key, value))
            .collect()
    }
}

impl Display for EnvVars {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        for (key, value) in self.iter() {
            writeln!(fmt, "{key}={value}")?;
        }

        Ok(())
    }
}

impl<K, V> FromIterator<(K, V)> for EnvVars
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

/// Split `KEY=VALUE` string on its first `=`.
///
/// A string without `=` is treated as a key with an empty value.
pub fn split_key_value(var: &str) -> (&str, &str) {
    var.split_once('=').unwrap_or((var, ""))
}

/// Join key and value into `KEY=VALUE` string.
pub fn join_key_value(key: &str, value: &str) -> String {
    format!("{key}={value}")
}

/// Split value into tokens, dropping empty tokens.
pub fn split_tokens(value: &str, separator: &str) -> Vec<String> {
    value
        .split(separator)
        .filter(|token| !token.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Join tokens on separator.
pub fn join_tokens(tokens: impl IntoIterator<Item = impl AsRef<str>>, separator: &str) -> String {
    tokens
        .into_iter()
        .map(|token| token.as_ref().to_owned())
        .collect::<Vec<_>>()
        .join(separator)
}

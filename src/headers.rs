//! Pattern-based upload headers.

use std::collections::HashMap;

use regex::Regex;

use crate::config::HeaderRule;
use crate::error::StorageError;

/// Ordered pattern -> header-set table, compiled once from configuration.
#[derive(Debug)]
pub struct HeaderRules {
    rules: Vec<(Regex, HashMap<String, String>)>,
}

impl HeaderRules {
    /// An invalid pattern is a configuration error, caught at client
    /// construction rather than on the first matching save.
    pub fn new(rules: &[HeaderRule]) -> Result<Self, StorageError> {
        let mut compiled = Vec::with_capacity(rules.len());
        for rule in rules {
            let pattern = Regex::new(&rule.pattern).map_err(|err| {
                StorageError::Configuration(format!(
                    "bad header pattern {:?}: {}",
                    rule.pattern, err
                ))
            })?;
            compiled.push((pattern, rule.headers.clone()));
        }
        Ok(Self { rules: compiled })
    }

    /// Headers for `name`: every rule whose pattern matches at the start of
    /// the name contributes, in order, later rules overwriting earlier keys.
    pub fn headers_for(&self, name: &str) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        for (pattern, extra) in &self.rules {
            if pattern.find(name).is_some_and(|m| m.start() == 0) {
                headers.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
        }
        headers
    }
}

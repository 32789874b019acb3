//! Application preferences over block transaction sets.
//!
//! A preference is an application-defined rule identified by a stable
//! string ID, with a validation function over a whole block's transactions.
//! The proposer advertises its preference IDs in bid requests; builders
//! echo them back; commitment validation re-runs every referenced
//! preference over the assembled block.

use std::collections::HashMap;

/// Validation function for one preference, over the block's raw txs.
pub type PreferenceValidateFn = Box<dyn Fn(&[Vec<u8>]) -> Result<(), String> + Send + Sync>;

/// An application-defined rule on block contents.
pub struct Preference {
    /// Stable, unique identifier, e.g. `"no-frontruns"`.
    pub id: String,
    /// Checks the rule over a block's transactions.
    pub validate: PreferenceValidateFn,
}

impl Preference {
    pub fn new(
        id: impl Into<String>,
        validate: impl Fn(&[Vec<u8>]) -> Result<(), String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            validate: Box::new(validate),
        }
    }
}

/// Ordered registry of preferences with by-ID lookup.
#[derive(Default)]
pub struct Preferences {
    slice: Vec<Preference>,
    index: HashMap<String, usize>,
}

impl Preferences {
    pub fn new(prefs: Vec<Preference>) -> Self {
        let index = prefs
            .iter()
            .enumerate()
            .map(|(i, p)| (p.id.clone(), i))
            .collect();
        Self {
            slice: prefs,
            index,
        }
    }

    /// Preference IDs in registration order, as advertised to builders.
    pub fn ids(&self) -> Vec<String> {
        self.slice.iter().map(|p| p.id.clone()).collect()
    }

    /// Looks up a preference by ID.
    pub fn get(&self, id: &str) -> Option<&Preference> {
        self.index.get(id).map(|&i| &self.slice[i])
    }
}

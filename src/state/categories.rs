use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Static catalog entry describing a category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryEntry {
    /// Unique label, also the key used by the authority.
    pub label: String,
    /// Icon identifier.
    pub icon: String,
    /// Short description.
    pub description: String,
}

/// A catalog category together with who reserved it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    /// Unique label.
    pub label: String,
    /// Icon identifier.
    pub icon: String,
    /// Short description.
    pub description: String,
    /// Participant that reserved the category, if any.
    pub claimant: Option<String>,
}

/// Claim broadcast by the authority (`categorySelected` or a join snapshot entry).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryClaim {
    /// Category label.
    pub category: String,
    /// Claimant display name; an empty name clears the claim.
    pub player_name: String,
}

impl CategoryClaim {
    fn claimant(&self) -> Option<String> {
        (!self.player_name.is_empty()).then(|| self.player_name.clone())
    }
}

/// Catalog of categories keyed by label, in catalog order.
#[derive(Debug, Clone, Default)]
pub struct CategoryBoard {
    categories: IndexMap<String, Category>,
}

impl CategoryBoard {
    /// Build an unclaimed board from the static catalog.
    pub fn from_catalog(catalog: &[CategoryEntry]) -> Self {
        let categories = catalog
            .iter()
            .map(|entry| {
                (
                    entry.label.clone(),
                    Category {
                        label: entry.label.clone(),
                        icon: entry.icon.clone(),
                        description: entry.description.clone(),
                        claimant: None,
                    },
                )
            })
            .collect();

        Self { categories }
    }

    /// Replace every claimant with the authority snapshot.
    ///
    /// Labels missing from the snapshot end up unclaimed; snapshot labels that
    /// are not in the catalog are skipped. Returns how many claims matched.
    pub fn merge_snapshot(&mut self, claims: &[CategoryClaim]) -> usize {
        for category in self.categories.values_mut() {
            category.claimant = None;
        }

        claims.iter().filter(|claim| self.assign(claim)).count()
    }

    /// Apply one authority claim, last write wins. Returns whether the label is known.
    pub fn record_claim(&mut self, claim: &CategoryClaim) -> bool {
        self.assign(claim)
    }

    fn assign(&mut self, claim: &CategoryClaim) -> bool {
        match self.categories.get_mut(&claim.category) {
            Some(category) => {
                category.claimant = claim.claimant();
                true
            }
            None => {
                debug!(category = %claim.category, "claim for a category outside the catalog");
                false
            }
        }
    }

    /// Look a category up by label.
    pub fn get(&self, label: &str) -> Option<&Category> {
        self.categories.get(label)
    }

    /// First category reserved by `name`.
    pub fn claimed_by(&self, name: &str) -> Option<&Category> {
        self.categories
            .values()
            .find(|category| category.claimant.as_deref() == Some(name))
    }

    /// Categories in catalog order.
    pub fn to_vec(&self) -> Vec<Category> {
        self.categories.values().cloned().collect()
    }
}

//! The model module holds the dataset types written for the front-end.
//!
//! Field names are serialized in camelCase, matching the JSON shape the
//! front-end reads.

use serde::{Deserialize, Serialize};

/// One brand/generic drug record.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DrugItem {
    pub brand_name: String,
    pub generic_name: String,
    pub manufacturer_short: String,
    pub manufacturer_full: String,
    /// Remote image URL or an embedded `data:` image. Empty until enrichment.
    pub image: String,
}

/// A named group of drug items, one per `## ` section of the source document.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrugCategory {
    pub name: String,
    pub slug: String,
    pub count: usize,
    pub items: Vec<DrugItem>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrugSummary {
    pub total: String,
    pub last_updated: String,
    pub source: String,
}

/// Root of the generated dataset file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrugDataset {
    pub title: String,
    pub summary: DrugSummary,
    pub categories: Vec<DrugCategory>,
    pub total_categories: usize,
    pub generated_at: String,
    pub source_url: String,
}

impl DrugDataset {
    /// Iterates over every item of every category, in document order.
    pub fn items(&self) -> impl Iterator<Item = &DrugItem> {
        self.categories
            .iter()
            .flat_map(|category| category.items.iter())
    }
}

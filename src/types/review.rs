use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::utils;

/// One parsed employee review
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ReviewRecord {
    /// `{company}_{index}`, 1-based over accepted reviews
    pub review_id: String,
    /// Listing URL the review was discovered under
    #[serde(alias = "kn_url")]
    pub source_url: String,
    pub overall_score: Option<f64>,
    pub title: Option<String>,
    pub year: Option<i32>,
    pub month: Option<u32>,
    /// e.g. "Current Employee"
    pub employee_type: Option<String>,
    pub position: Option<String>,
    /// Labeled factor texts in page order; labels may repeat
    #[serde(default)]
    pub subcategories: Vec<Subcategory>,
}

/// One `{label: text}` entry of a review's factor list
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(
    into = "BTreeMap<String, String>",
    try_from = "BTreeMap<String, String>"
)]
pub struct Subcategory {
    pub label: String,
    pub text: String,
}

impl Subcategory {
    pub fn new(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            text: text.into(),
        }
    }
}

impl From<Subcategory> for BTreeMap<String, String> {
    fn from(value: Subcategory) -> Self {
        BTreeMap::from([(value.label, value.text)])
    }
}

impl TryFrom<BTreeMap<String, String>> for Subcategory {
    type Error = String;

    fn try_from(map: BTreeMap<String, String>) -> Result<Self, Self::Error> {
        if map.len() != 1 {
            return Err(format!(
                "subcategory must have exactly one label, found {}",
                map.len()
            ));
        }
        let (label, text) = map
            .into_iter()
            .next()
            .ok_or_else(|| "empty subcategory".to_string())?;
        Ok(Self { label, text })
    }
}

/// Reviews collected from one listing URL.
///
/// Persisted as `{listing_url: [review, ...]}` with the URL as the only key.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(
    into = "BTreeMap<String, Vec<ReviewRecord>>",
    try_from = "BTreeMap<String, Vec<ReviewRecord>>"
)]
pub struct ReviewCollection {
    pub source_url: String,
    pub reviews: Vec<ReviewRecord>,
}

impl ReviewCollection {
    pub fn new(source_url: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            reviews: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.reviews.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reviews.is_empty()
    }

    pub fn push(&mut self, review: ReviewRecord) {
        self.reviews.push(review);
    }

    /// Load a collection file
    pub async fn load(path: &Path) -> Result<Self> {
        utils::read_json(path).await
    }

    /// Write the collection as a whole file
    pub async fn save(&self, path: &Path) -> Result<()> {
        utils::write_json_pretty(path, self).await
    }
}

impl From<ReviewCollection> for BTreeMap<String, Vec<ReviewRecord>> {
    fn from(value: ReviewCollection) -> Self {
        BTreeMap::from([(value.source_url, value.reviews)])
    }
}

impl TryFrom<BTreeMap<String, Vec<ReviewRecord>>> for ReviewCollection {
    type Error = String;

    fn try_from(map: BTreeMap<String, Vec<ReviewRecord>>) -> Result<Self, Self::Error> {
        if map.len() != 1 {
            return Err(format!(
                "review collection must have exactly one listing URL, found {}",
                map.len()
            ));
        }
        let (source_url, reviews) = map
            .into_iter()
            .next()
            .ok_or_else(|| "empty review collection".to_string())?;
        Ok(Self {
            source_url,
            reviews,
        })
    }
}

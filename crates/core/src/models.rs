use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Record {
    pub text: String,
    pub category: String,
}

impl Record {
    pub fn new(text: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            category: category.into(),
        }
    }

    /// Both fields must carry something other than whitespace.
    pub fn is_valid(&self) -> bool {
        !self.text.trim().is_empty() && !self.category.trim().is_empty()
    }

    /// Identity used by import dedupe.
    pub fn natural_key(&self) -> (&str, &str) {
        (&self.text, &self.category)
    }
}

impl From<providers::RemoteRecord> for Record {
    fn from(remote: providers::RemoteRecord) -> Self {
        Self {
            text: remote.text,
            category: remote.category,
        }
    }
}

impl From<&Record> for providers::RemoteRecord {
    fn from(record: &Record) -> Self {
        Self {
            text: record.text.clone(),
            category: record.category.clone(),
        }
    }
}

/// Ordered list of records. Order is iteration order only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordSet(Vec<Record>);

impl RecordSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.0.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Record> {
        self.0.get(index)
    }

    pub fn as_slice(&self) -> &[Record] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<Record> {
        self.0
    }

    pub(crate) fn push(&mut self, record: Record) {
        self.0.push(record);
    }

    pub(crate) fn records_mut(&mut self) -> &mut Vec<Record> {
        &mut self.0
    }

    pub(crate) fn position_by_text(&self, text: &str) -> Option<usize> {
        self.0.iter().position(|r| r.text == text)
    }

    pub fn contains(&self, record: &Record) -> bool {
        self.0.iter().any(|r| r == record)
    }

    /// Distinct categories in order of first appearance.
    pub fn categories(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for record in &self.0 {
            if !seen.contains(&record.category) {
                seen.push(record.category.clone());
            }
        }
        seen
    }

    pub fn filtered(&self, filter: &CategoryFilter) -> Vec<&Record> {
        self.0.iter().filter(|r| filter.matches(r)).collect()
    }
}

impl From<Vec<Record>> for RecordSet {
    fn from(records: Vec<Record>) -> Self {
        Self(records)
    }
}

impl FromIterator<Record> for RecordSet {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a RecordSet {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl IntoIterator for RecordSet {
    type Item = Record;
    type IntoIter = std::vec::IntoIter<Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

pub const ALL_CATEGORIES: &str = "all";

/// Category selection; `all` is the sentinel for no filtering.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Category(String),
}

impl CategoryFilter {
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() || value == ALL_CATEGORIES {
            CategoryFilter::All
        } else {
            CategoryFilter::Category(value.to_string())
        }
    }

    pub fn matches(&self, record: &Record) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Category(c) => &record.category == c,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            CategoryFilter::All => ALL_CATEGORIES,
            CategoryFilter::Category(c) => c,
        }
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Seed set used on first run.
pub fn default_records() -> RecordSet {
    [
        ("Knowledge speaks, but wisdom listens.", "Wisdom"),
        ("Stay hungry, stay foolish.", "Motivation"),
        ("Action is the foundational key to all success.", "Success"),
        (
            "Discipline is the bridge between goals and achievement.",
            "Discipline",
        ),
        (
            "The future belongs to those who prepare for it today.",
            "Preparation",
        ),
        (
            "Courage is not the absence of fear, but the triumph over it.",
            "Courage",
        ),
        ("Small daily improvements lead to lasting results.", "Growth"),
        (
            "Success is not in what you have, but who you become.",
            "Character",
        ),
        (
            "The only limit to your impact is your imagination and commitment.",
            "Leadership",
        ),
        ("Learning never exhausts the mind.", "Knowledge"),
    ]
    .into_iter()
    .map(|(text, category)| Record::new(text, category))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_keep_first_appearance_order() {
        let set = RecordSet::from(vec![
            Record::new("a", "X"),
            Record::new("b", "Y"),
            Record::new("c", "X"),
        ]);
        assert_eq!(set.categories(), vec!["X".to_string(), "Y".to_string()]);
    }

    #[test]
    fn filter_sentinel_matches_everything() {
        let set = default_records();
        assert_eq!(set.filtered(&CategoryFilter::parse("all")).len(), set.len());
        let growth = set.filtered(&CategoryFilter::parse("Growth"));
        assert_eq!(growth.len(), 1);
        assert!(set.filtered(&CategoryFilter::parse("growth")).is_empty());
    }

    #[test]
    fn serializes_as_plain_array() {
        let set = RecordSet::from(vec![Record::new("a", "X")]);
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"[{"text":"a","category":"X"}]"#);
    }
}

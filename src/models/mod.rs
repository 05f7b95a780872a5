use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

/// Property category as labelled on the listing badge
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PropertyType {
    House,
    Apartment,
    Land,
    Shophouse,
    BoardingHouse,
}

impl PropertyType {
    pub const ALL: [PropertyType; 5] = [
        PropertyType::House,
        PropertyType::Apartment,
        PropertyType::Land,
        PropertyType::Shophouse,
        PropertyType::BoardingHouse,
    ];

    /// Label used by the site (and in the export)
    pub fn label(self) -> &'static str {
        match self {
            PropertyType::House => "Rumah",
            PropertyType::Apartment => "Apartemen",
            PropertyType::Land => "Tanah",
            PropertyType::Shophouse => "Ruko",
            PropertyType::BoardingHouse => "Kost",
        }
    }

    /// Exact match against the closed set of badge labels
    pub fn from_label(text: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.label() == text)
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Normalized price: a number when the text parsed, otherwise the original text
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum PriceValue {
    Numeric(f64),
    Raw(String),
}

impl PriceValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PriceValue::Numeric(v) => Some(*v),
            PriceValue::Raw(_) => None,
        }
    }
}

impl fmt::Display for PriceValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriceValue::Numeric(v) => write!(f, "{v}"),
            PriceValue::Raw(s) => f.write_str(s),
        }
    }
}

/// One scraped property listing
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ListingRecord {
    pub url: String,
    pub title: Option<String>,
    pub location: Option<String>,
    pub price: Option<String>,
    pub price_numeric: Option<PriceValue>,
    pub original_price: Option<String>,
    pub original_price_numeric: Option<PriceValue>,
    pub savings: Option<String>,
    pub property_type: Option<PropertyType>,
    pub updated_date: Option<String>,
    pub posted_by: Option<String>,
    pub description: Option<String>,
    pub installment_info: Option<String>,
    /// All specification pairs as `key: value; key: value`
    pub specifications_text: String,
    pub interior_exterior: Option<String>,
    pub facilities: Option<String>,
    pub surroundings: Option<String>,
    pub points_of_interest: Option<String>,
    /// Specification pairs in first-seen order, kept out of the export
    #[serde(skip)]
    pub specifications: Vec<(String, String)>,
    /// Dynamic `spec_*`, `facility_*` and `poi_*` columns
    pub extra: BTreeMap<String, String>,
}

impl ListingRecord {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Flatten into column name -> cell text; null fields are omitted
    pub fn to_row(&self) -> BTreeMap<String, String> {
        let mut row = BTreeMap::new();
        row.insert("url".to_string(), self.url.clone());

        let optional = [
            ("title", self.title.clone()),
            ("location", self.location.clone()),
            ("price", self.price.clone()),
            ("price_numeric", self.price_numeric.as_ref().map(|p| p.to_string())),
            ("original_price", self.original_price.clone()),
            (
                "original_price_numeric",
                self.original_price_numeric.as_ref().map(|p| p.to_string()),
            ),
            ("savings", self.savings.clone()),
            ("property_type", self.property_type.map(|t| t.to_string())),
            ("updated_date", self.updated_date.clone()),
            ("posted_by", self.posted_by.clone()),
            ("description", self.description.clone()),
            ("installment_info", self.installment_info.clone()),
            ("interior_exterior", self.interior_exterior.clone()),
            ("facilities", self.facilities.clone()),
            ("surroundings", self.surroundings.clone()),
            ("points_of_interest", self.points_of_interest.clone()),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                row.insert(key.to_string(), value);
            }
        }

        row.insert(
            "specifications_text".to_string(),
            self.specifications_text.clone(),
        );
        for (key, value) in &self.extra {
            row.insert(key.clone(), value.clone());
        }
        row
    }
}

/// Outcome of scraping one listing URL
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionResult {
    Listing(ListingRecord),
    Failed { url: String, error: String },
}

impl ExtractionResult {
    pub fn failed(url: impl Into<String>, error: impl fmt::Display) -> Self {
        ExtractionResult::Failed {
            url: url.into(),
            error: error.to_string(),
        }
    }

    pub fn url(&self) -> &str {
        match self {
            ExtractionResult::Listing(record) => &record.url,
            ExtractionResult::Failed { url, .. } => url,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ExtractionResult::Failed { .. })
    }

    pub fn to_row(&self) -> BTreeMap<String, String> {
        match self {
            ExtractionResult::Listing(record) => record.to_row(),
            ExtractionResult::Failed { url, error } => BTreeMap::from([
                ("url".to_string(), url.clone()),
                ("error".to_string(), error.clone()),
            ]),
        }
    }
}

/// Every specification label seen so far; grows only
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpecFieldSet {
    fields: BTreeSet<String>,
}

impl SpecFieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: impl Into<String>) -> bool {
        self.fields.insert(field.into())
    }

    pub fn merge(&mut self, other: &SpecFieldSet) {
        self.fields.extend(other.fields.iter().cloned());
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains(field)
    }

    /// Sorted iteration
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for SpecFieldSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// Deduplicated listing URLs, iterated in first-seen order
#[derive(Debug, Clone, Default)]
pub struct LinkSet {
    seen: HashSet<String>,
    ordered: Vec<String>,
}

impl LinkSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when the link was not already present
    pub fn insert(&mut self, link: impl Into<String>) -> bool {
        let link = link.into();
        if self.seen.contains(&link) {
            return false;
        }
        self.seen.insert(link.clone());
        self.ordered.push(link);
        true
    }

    /// Adds every link, returning how many were new
    pub fn extend<I, S>(&mut self, links: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut added = 0;
        for link in links {
            if self.insert(link) {
                added += 1;
            }
        }
        added
    }

    pub fn contains(&self, link: &str) -> bool {
        self.seen.contains(link)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ordered.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    pub fn into_vec(self) -> Vec<String> {
        self.ordered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn property_type_matches_exact_labels_only() {
        assert_eq!(PropertyType::from_label("Ruko"), Some(PropertyType::Shophouse));
        assert_eq!(PropertyType::from_label("ruko"), None);
        assert_eq!(PropertyType::from_label("Rumah Baru"), None);
    }

    #[test]
    fn error_row_only_has_url_and_error() {
        let result = ExtractionResult::failed("https://x/properti/a/", "boom");
        let row = result.to_row();
        assert_eq!(row.len(), 2);
        assert_eq!(row["url"], "https://x/properti/a/");
        assert_eq!(row["error"], "boom");
    }

    #[test]
    fn record_row_skips_null_fields() {
        let mut record = ListingRecord::new("https://x/properti/a/");
        record.title = Some("Rumah".to_string());
        record.price_numeric = Some(PriceValue::Numeric(1_500_000_000.0));
        record.extra.insert("spec_kamar_tidur".to_string(), "3".to_string());

        let row = record.to_row();
        assert_eq!(row["title"], "Rumah");
        assert_eq!(row["price_numeric"], "1500000000");
        assert_eq!(row["specifications_text"], "");
        assert_eq!(row["spec_kamar_tidur"], "3");
        assert!(!row.contains_key("location"));
    }

    #[test]
    fn link_set_keeps_first_seen_order() {
        let mut links = LinkSet::new();
        assert_eq!(links.extend(["b", "a", "b", "c"]), 3);
        assert!(!links.insert("a"));
        assert_eq!(links.iter().collect::<Vec<_>>(), vec!["b", "a", "c"]);
    }

    #[test]
    fn spec_field_set_merges() {
        let mut fields: SpecFieldSet = ["luas tanah"].into_iter().collect();
        let other: SpecFieldSet = ["kamar tidur", "luas tanah"].into_iter().collect();
        fields.merge(&other);
        assert_eq!(fields.iter().collect::<Vec<_>>(), vec!["kamar tidur", "luas tanah"]);
    }
}

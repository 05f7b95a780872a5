use super::text_of;
use crate::config::ExtractOptions;
use crate::models::{ListingRecord, SpecFieldSet};
use lazy_static::lazy_static;
use scraper::{ElementRef, Html, Selector};

lazy_static! {
    /// Item containers, most specific first. Every strategy runs; a later one
    /// overwrites the value of a label an earlier one already found.
    static ref ITEM_STRATEGIES: Vec<Selector> = [
        "div#property-information div.mb-4.flex.items-center.gap-4.text-sm",
        "div.mb-4.flex.items-center.gap-4.text-sm",
        "div.flex.items-center.gap-4.text-sm",
        "div.flex.items-center",
    ]
    .iter()
    .map(|css| Selector::parse(css).unwrap())
    .collect();

    /// (label, value) selector pairs tried inside one item
    static ref PAIR_METHODS: Vec<(Selector, Selector)> = [
        ("p.w-32.text-xs.font-light.text-gray-500", "p:not(.w-32)"),
        ("span.text-xs.text-gray-500", "span.text-xs.font-medium"),
        ("span.text-sm.text-gray-500", "span.text-sm.font-medium"),
        (
            "p.w-32.text-xs.font-light.text-gray-500, span.text-xs.text-gray-500, span.text-sm.text-gray-500",
            "p:not(.w-32), span.text-xs.font-medium, span.text-sm.font-medium",
        ),
    ]
    .iter()
    .map(|(label, value)| (Selector::parse(label).unwrap(), Selector::parse(value).unwrap()))
    .collect();
}

const MIN_LABEL_LEN: usize = 2;
const MIN_VALUE_LEN: usize = 1;

/// Ordered label -> value pairs where re-inserting a label replaces its value
/// in place
#[derive(Debug, Default)]
pub struct SpecTable {
    pairs: Vec<(String, String)>,
}

impl SpecTable {
    pub fn set(&mut self, label: String, value: String) {
        match self.pairs.iter_mut().find(|(k, _)| *k == label) {
            Some(pair) => pair.1 = value,
            None => self.pairs.push((label, value)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// `key: value; key: value`
    pub fn to_text(&self) -> String {
        self.pairs
            .iter()
            .map(|(k, v)| format!("{k}: {v}"))
            .collect::<Vec<_>>()
            .join("; ")
    }

    pub fn into_pairs(self) -> Vec<(String, String)> {
        self.pairs
    }
}

/// Run every strategy over the page and store the results on the record
pub fn apply(
    doc: &Html,
    record: &mut ListingRecord,
    options: &ExtractOptions,
    fields: &mut SpecFieldSet,
) {
    let mut table = SpecTable::default();

    for items in ITEM_STRATEGIES.iter() {
        collect(doc, items, &mut table, fields);
    }

    record.specifications_text = table.to_text();
    let pairs = table.into_pairs();
    if options.split_details {
        for (label, value) in &pairs {
            record.extra.insert(column_name(label), value.clone());
        }
    }
    record.specifications = pairs;
}

fn collect(doc: &Html, items: &Selector, table: &mut SpecTable, fields: &mut SpecFieldSet) {
    for item in doc.select(items) {
        if let Some((label, value)) = read_pair(item) {
            fields.insert(label.clone());
            table.set(label, value);
        }
    }
}

/// First method that yields an acceptable label and value. The label length
/// is measured before colons are stripped.
fn read_pair(item: ElementRef<'_>) -> Option<(String, String)> {
    PAIR_METHODS.iter().find_map(|(label_sel, value_sel)| {
        let raw = text_of(item.select(label_sel).next()?);
        let value = text_of(item.select(value_sel).next()?);
        let accepted = raw.chars().count() >= MIN_LABEL_LEN && value.chars().count() >= MIN_VALUE_LEN;
        accepted.then(|| (normalize_label(&raw), value))
    })
}

/// Lower-cased with colons removed
pub fn normalize_label(raw: &str) -> String {
    raw.to_lowercase().replace(':', "").trim().to_string()
}

/// `luas tanah` -> `spec_luas_tanah`
pub fn column_name(label: &str) -> String {
    let key: String = label
        .replace(' ', "_")
        .chars()
        .filter(|c| !matches!(c, ':' | ',' | ';'))
        .collect();
    format!("spec_{key}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run(html: &str, options: ExtractOptions) -> (ListingRecord, SpecFieldSet) {
        let doc = Html::parse_document(html);
        let mut record = ListingRecord::new("https://www.rumah123.com/properti/x/");
        let mut fields = SpecFieldSet::new();
        apply(&doc, &mut record, &options, &mut fields);
        (record, fields)
    }

    #[test]
    fn span_layout_is_recognised() {
        let (record, _) = run(
            r#"<div class="flex items-center">
                 <span class="text-sm text-gray-500">Daya Listrik</span>
                 <span class="text-sm font-medium">2200 Watt</span>
               </div>"#,
            ExtractOptions::default(),
        );
        assert_eq!(record.specifications_text, "daya listrik: 2200 Watt");
        assert_eq!(record.extra["spec_daya_listrik"], "2200 Watt");
    }

    #[test]
    fn short_labels_are_rejected() {
        let (record, fields) = run(
            r#"<div class="flex items-center">
                 <p class="w-32 text-xs font-light text-gray-500">K</p><p>2</p>
               </div>"#,
            ExtractOptions::default(),
        );
        assert!(record.specifications.is_empty());
        assert!(fields.is_empty());
    }

    #[test]
    fn label_length_counts_the_colon() {
        let (record, fields) = run(
            r#"<div class="flex items-center">
                 <p class="w-32 text-xs font-light text-gray-500">K:</p><p>2</p>
               </div>"#,
            ExtractOptions::default(),
        );
        assert_eq!(record.specifications_text, "k: 2");
        assert!(fields.contains("k"));
    }

    #[test]
    fn later_strategy_overwrites_value_in_place() {
        let mut table = SpecTable::default();
        table.set("kamar tidur".into(), "2".into());
        table.set("kamar mandi".into(), "1".into());
        table.set("kamar tidur".into(), "3".into());
        assert_eq!(table.to_text(), "kamar tidur: 3; kamar mandi: 1");
    }

    #[test]
    fn split_details_off_keeps_text_only() {
        let (record, fields) = run(
            r#"<div class="flex items-center">
                 <p class="w-32 text-xs font-light text-gray-500">Jumlah Lantai</p><p>2</p>
               </div>"#,
            ExtractOptions {
                split_details: false,
                ..ExtractOptions::default()
            },
        );
        assert_eq!(record.specifications_text, "jumlah lantai: 2");
        assert!(record.extra.is_empty());
        assert!(fields.contains("jumlah lantai"));
    }

    #[test]
    fn column_names_drop_punctuation() {
        assert_eq!(column_name("sertifikat, imb; pbb"), "spec_sertifikat_imb_pbb");
        assert_eq!(normalize_label("Luas Bangunan:"), "luas bangunan");
    }
}

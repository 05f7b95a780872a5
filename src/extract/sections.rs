//! Collapsible listing sections (interior, facilities, surroundings, nearby
//! places). Each category is looked up on its own so one broken section
//! cannot hide the others.

use super::{has_class, text_of};
use crate::config::ExtractOptions;
use crate::models::ListingRecord;
use lazy_static::lazy_static;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

lazy_static! {
    static ref TOGGLE: Selector = Selector::parse("button.flex.items-center.justify-between").unwrap();
    static ref TOGGLE_TITLE: Selector = Selector::parse("div.text-sm.font-bold").unwrap();
    static ref BUTTON: Selector = Selector::parse("button").unwrap();
    static ref ROW: Selector = Selector::parse("div.mb-4.flex.items-center").unwrap();
    static ref ROW_LABEL: Selector = Selector::parse("p.w-32").unwrap();
    static ref ROW_VALUE: Selector = Selector::parse("p:not(.w-32)").unwrap();
    static ref DIV: Selector = Selector::parse("div").unwrap();
    static ref TEXT_NODE: Selector = Selector::parse("p, span").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionField {
    InteriorExterior,
    Facilities,
    Surroundings,
    PointsOfInterest,
}

impl SectionField {
    fn slot(self, record: &mut ListingRecord) -> &mut Option<String> {
        match self {
            SectionField::InteriorExterior => &mut record.interior_exterior,
            SectionField::Facilities => &mut record.facilities,
            SectionField::Surroundings => &mut record.surroundings,
            SectionField::PointsOfInterest => &mut record.points_of_interest,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Category {
    /// Heading text as shown on the page
    pub heading: &'static str,
    pub field: SectionField,
    /// Prefix of the per-item presence columns, if this category has them
    pub flag_prefix: Option<&'static str>,
}

pub const CATEGORIES: [Category; 4] = [
    Category {
        heading: "Interior & Exterior",
        field: SectionField::InteriorExterior,
        flag_prefix: None,
    },
    Category {
        heading: "Fasilitas",
        field: SectionField::Facilities,
        flag_prefix: Some("facility"),
    },
    Category {
        heading: "Sekitar Properti",
        field: SectionField::Surroundings,
        flag_prefix: None,
    },
    Category {
        heading: "Lokasi Terdekat",
        field: SectionField::PointsOfInterest,
        flag_prefix: Some("poi"),
    },
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionItem {
    Pair { label: String, value: String },
    Bare(String),
}

impl SectionItem {
    pub fn to_text(&self) -> String {
        match self {
            SectionItem::Pair { label, value } => format!("{label}: {value}"),
            SectionItem::Bare(text) => text.clone(),
        }
    }

    fn key(&self) -> &str {
        match self {
            SectionItem::Pair { label, .. } => label,
            SectionItem::Bare(text) => text,
        }
    }
}

/// Heading-based lookup for every category, then the containment-based
/// fallback for whichever categories are still empty
pub fn apply(doc: &Html, record: &mut ListingRecord, options: &ExtractOptions) {
    for category in CATEGORIES {
        let items = from_headings(doc, category.heading);
        store(record, category, &items, options);
    }

    for category in CATEGORIES {
        if category.field.slot(record).is_some() {
            continue;
        }
        let items = from_containers(doc, category.heading);
        if !items.is_empty() {
            debug!("Section `{}` found by fallback", category.heading);
        }
        store(record, category, &items, options);
    }
}

fn store(record: &mut ListingRecord, category: Category, items: &[SectionItem], options: &ExtractOptions) {
    if items.is_empty() {
        return;
    }

    let text = items
        .iter()
        .map(SectionItem::to_text)
        .collect::<Vec<_>>()
        .join("; ");
    *category.field.slot(record) = Some(text);

    if let (true, Some(prefix)) = (options.section_flags, category.flag_prefix) {
        for item in items {
            let slug = slugify(item.key());
            if !slug.is_empty() {
                record
                    .extra
                    .insert(format!("{prefix}_{slug}"), "true".to_string());
            }
        }
    }
}

/// Section toggles are buttons holding a bold title; the items live in the
/// first sibling `div` that does not contain the button.
pub fn from_headings(doc: &Html, heading: &str) -> Vec<SectionItem> {
    let mut items = Vec::new();
    for button in doc.select(&TOGGLE) {
        let Some(title) = button.select(&TOGGLE_TITLE).next() else {
            continue;
        };
        if !text_of(title).contains(heading) {
            continue;
        }

        let Some(parent) = button.parent().and_then(ElementRef::wrap) else {
            continue;
        };
        let content = parent
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|child| child.value().name() == "div")
            .find(|div| div.select(&BUTTON).next().is_none());
        let Some(content) = content else {
            continue;
        };

        for row in content.select(&ROW) {
            let pair = row.select(&ROW_LABEL).next().zip(row.select(&ROW_VALUE).next());
            if let Some(item) = to_item(row, pair) {
                push_unique(&mut items, item);
            }
        }
    }
    items
}

/// Looser lookup: any `border-b` block whose text mentions the heading.
/// The innermost matching blocks are read first; one without rows hands over
/// to the nearest `border-b` block around it.
pub fn from_containers(doc: &Html, heading: &str) -> Vec<SectionItem> {
    let matching: Vec<ElementRef<'_>> = doc
        .select(&DIV)
        .filter(|div| is_block(*div))
        .filter(|div| div.text().collect::<String>().contains(heading))
        .collect();

    let innermost = matching.iter().filter(|outer| {
        !matching.iter().any(|inner| {
            inner.id() != outer.id() && inner.ancestors().any(|a| a.id() == outer.id())
        })
    });

    let mut items = Vec::new();
    let mut visited = Vec::new();
    for block in innermost {
        let mut current = Some(*block);
        while let Some(section) = current {
            if visited.contains(&section.id()) {
                break;
            }
            visited.push(section.id());

            let found = rows_of(section);
            if !found.is_empty() {
                for item in found {
                    push_unique(&mut items, item);
                }
                break;
            }
            current = section
                .ancestors()
                .filter_map(ElementRef::wrap)
                .find(|a| a.value().name() == "div" && is_block(*a));
        }
    }
    items
}

fn is_block(div: ElementRef<'_>) -> bool {
    div.value().classes().any(|c| c.contains("border-b"))
}

fn rows_of(section: ElementRef<'_>) -> Vec<SectionItem> {
    section
        .select(&DIV)
        .filter(|div| {
            let element = div.value();
            element.classes().any(|c| c.contains("mb-4")) && element.classes().any(|c| c.contains("flex"))
        })
        .filter_map(|row| to_item(row, loose_pair(row)))
        .collect()
}

fn loose_pair(row: ElementRef<'_>) -> Option<(ElementRef<'_>, ElementRef<'_>)> {
    let label = row.select(&TEXT_NODE).find(|el| {
        el.value()
            .classes()
            .any(|c| c.contains("w-32") || c.contains("text-gray-500"))
    })?;

    let sibling = label
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .find(|el| matches!(el.value().name(), "p" | "span"));
    let value = sibling.or_else(|| row.select(&TEXT_NODE).find(|el| el.id() != label.id()))?;
    Some((label, value))
}

fn to_item(row: ElementRef<'_>, pair: Option<(ElementRef<'_>, ElementRef<'_>)>) -> Option<SectionItem> {
    if let Some((label, value)) = pair {
        let label = text_of(label);
        let value = text_of(value);
        if !label.is_empty() && !value.is_empty() {
            return Some(SectionItem::Pair { label, value });
        }
    }

    // rows that only wrap other rows carry no item of their own
    if row.children().filter_map(ElementRef::wrap).any(|c| has_class(c, "mb-4")) {
        return None;
    }
    let text = squash(&text_of(row));
    (!text.is_empty()).then_some(SectionItem::Bare(text))
}

fn push_unique(items: &mut Vec<SectionItem>, item: SectionItem) {
    if !items.contains(&item) {
        items.push(item);
    }
}

fn squash(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// `Kolam Renang (Umum)` -> `kolam_renang_umum`
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.to_lowercase().chars() {
        if c.is_alphanumeric() {
            slug.push(c);
        } else if !slug.ends_with('_') {
            slug.push('_');
        }
    }
    slug.trim_matches('_').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SECTIONS_PAGE: &str = r#"
<div class="border-b">
  <div>
    <button class="flex items-center justify-between w-full"><div class="text-sm font-bold">Interior &amp; Exterior</div></button>
    <div>
      <div class="mb-4 flex items-center"><p class="w-32 text-xs">Hadap</p><p>Utara</p></div>
      <div class="mb-4 flex items-center"><p class="w-32 text-xs">Carport</p><p>2</p></div>
    </div>
  </div>
</div>
<div class="border-b">
  <div>
    <button class="flex items-center justify-between"><div class="text-sm font-bold">Fasilitas</div></button>
    <div>
      <div class="mb-4 flex items-center"><p>Kolam Renang</p></div>
      <div class="mb-4 flex items-center"><p>Keamanan 24 Jam</p></div>
    </div>
  </div>
</div>
<div class="border-b pb-4">
  <h3>Lokasi Terdekat</h3>
  <div class="mb-4 flex"><span class="text-gray-500">Sekolah</span><span>SDN 01 (500 m)</span></div>
  <div class="mb-4 flex"><span class="text-gray-500">Rumah Sakit</span><span>RS Medika (1,2 km)</span></div>
</div>
"#;

    fn run(html: &str, options: ExtractOptions) -> ListingRecord {
        let doc = Html::parse_document(html);
        let mut record = ListingRecord::new("https://www.rumah123.com/properti/x/");
        apply(&doc, &mut record, &options);
        record
    }

    #[test]
    fn heading_pass_reads_pairs_and_bare_items() {
        let record = run(SECTIONS_PAGE, ExtractOptions::default());
        assert_eq!(record.interior_exterior.as_deref(), Some("Hadap: Utara; Carport: 2"));
        assert_eq!(record.facilities.as_deref(), Some("Kolam Renang; Keamanan 24 Jam"));
        assert_eq!(record.extra["facility_kolam_renang"], "true");
        assert_eq!(record.extra["facility_keamanan_24_jam"], "true");
    }

    #[test]
    fn fallback_pass_fills_remaining_categories() {
        let record = run(SECTIONS_PAGE, ExtractOptions::default());
        assert_eq!(
            record.points_of_interest.as_deref(),
            Some("Sekolah: SDN 01 (500 m); Rumah Sakit: RS Medika (1,2 km)")
        );
        assert_eq!(record.extra["poi_sekolah"], "true");
        assert_eq!(record.extra["poi_rumah_sakit"], "true");
        assert_eq!(record.surroundings, None);
    }

    #[test]
    fn fallback_climbs_out_of_heading_only_block() {
        let html = r#"
<div class="border-b pb-4">
  <div class="border-b"><h3>Fasilitas</h3></div>
  <div class="mb-4 flex"><span class="text-gray-500">Kolam Renang</span><span>Ada</span></div>
</div>"#;
        let doc = Html::parse_document(html);
        assert_eq!(
            from_containers(&doc, "Fasilitas"),
            vec![SectionItem::Pair {
                label: "Kolam Renang".to_string(),
                value: "Ada".to_string(),
            }]
        );

        let record = run(html, ExtractOptions::default());
        assert_eq!(record.facilities.as_deref(), Some("Kolam Renang: Ada"));
        assert_eq!(record.extra["facility_kolam_renang"], "true");
    }

    #[test]
    fn fallback_prefers_innermost_block() {
        let doc = Html::parse_document(SECTIONS_PAGE);
        let items = from_containers(&doc, "Lokasi Terdekat");
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|item| !item.to_text().contains("Hadap")));
    }

    #[test]
    fn flags_can_be_disabled() {
        let record = run(
            SECTIONS_PAGE,
            ExtractOptions {
                section_flags: false,
                ..ExtractOptions::default()
            },
        );
        assert!(record.facilities.is_some());
        assert!(record.extra.is_empty());
    }

    #[test]
    fn missing_sections_stay_null() {
        let record = run("<div class='border-b'>Deskripsi</div>", ExtractOptions::default());
        assert_eq!(record.interior_exterior, None);
        assert_eq!(record.facilities, None);
        assert_eq!(record.points_of_interest, None);
    }

    #[test]
    fn slugs_collapse_punctuation() {
        assert_eq!(slugify("Kolam Renang (Umum)"), "kolam_renang_umum");
        assert_eq!(slugify("  AC / Pemanas  "), "ac_pemanas");
        assert_eq!(slugify("--"), "");
    }
}

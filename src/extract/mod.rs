//! HTML to [`ListingRecord`] extraction for rumah123 listing pages.
//!
//! Every field is located by an ordered chain of rules; the first rule that
//! produces a non-empty value wins. A page that matches nothing still yields
//! a record carrying its URL.

pub mod links;
pub mod price;
pub mod sections;
pub mod specs;
pub mod structured;

use crate::config::ExtractOptions;
use crate::models::{ExtractionResult, ListingRecord, PropertyType, SpecFieldSet};
use anyhow::Result;
use lazy_static::lazy_static;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

pub use price::clean_price;

/// Path prefix shared by every listing page
pub const LISTING_PATH_PREFIX: &str = "/properti/";

const SAVINGS_MARKER: &str = "HEMAT";
const INSTALLMENT_MARKER: &str = "Cicilan";

lazy_static! {
    static ref TITLE: Selector = Selector::parse("h1.text-gray-800").unwrap();
    static ref LOCATION: Selector = Selector::parse("p.text-xs.text-gray-500").unwrap();
    static ref PRICE: Selector = Selector::parse("span.text-primary.font-bold").unwrap();
    static ref ORIGINAL_PRICE: Selector =
        Selector::parse("span.text-greyText.font-medium.line-through").unwrap();
    static ref SAVINGS: Selector = Selector::parse("span.text-accent.mr-1.font-medium").unwrap();
    static ref INSTALLMENT: Selector = Selector::parse("div.installmets-container div").unwrap();
    static ref BADGE: Selector = Selector::parse("div.rounded-full").unwrap();
    static ref UPDATED: Selector = Selector::parse("p.text-3xs.text-gray-400").unwrap();
    static ref DESCRIPTION: Vec<Selector> = [
        "div#property-information p.text-sm.font-light.mb-6.whitespace-pre-wrap",
        "div.text-sm.text-gray-800.whitespace-pre-line",
        "div.whitespace-pre-line",
        "div[data-testid='description']",
    ]
    .iter()
    .map(|css| Selector::parse(css).unwrap())
    .collect();
    static ref UPDATED_LINE: Regex =
        Regex::new(r"(?s)Diperbarui\s+(\d+\s+\w+\s+\d+).*?oleh\s+(.+)$").unwrap();
}

/// A single extraction strategy for one field
pub type FieldRule = fn(&Html) -> Option<String>;

/// Trimmed text content of an element
pub(crate) fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

pub(crate) fn has_class(element: ElementRef<'_>, class: &str) -> bool {
    element.value().classes().any(|c| c == class)
}

/// Trimmed text of the first element matching `sel`, if any
pub(crate) fn first_text(doc: &Html, sel: &Selector) -> Option<String> {
    doc.select(sel).next().map(text_of)
}

/// Try each rule in order and keep the first non-empty value
pub fn first_match(doc: &Html, rules: &[FieldRule]) -> Option<String> {
    rules
        .iter()
        .filter_map(|rule| rule(doc))
        .find(|value| !value.is_empty())
}

/// Extract one listing page. Never fails: an unusable page becomes an error
/// record that still carries the URL.
pub fn extract_listing(
    html: &str,
    url: &str,
    options: &ExtractOptions,
    fields: &mut SpecFieldSet,
) -> ExtractionResult {
    match try_extract(html, url, options, fields) {
        Ok(record) => ExtractionResult::Listing(record),
        Err(e) => {
            warn!("Error extracting details from {}: {:#}", url, e);
            ExtractionResult::failed(url, format!("{e:#}"))
        }
    }
}

fn try_extract(
    html: &str,
    url: &str,
    options: &ExtractOptions,
    fields: &mut SpecFieldSet,
) -> Result<ListingRecord> {
    if html.trim().is_empty() {
        anyhow::bail!("empty document");
    }
    check_listing_url(url);

    let doc = Html::parse_document(html);
    let mut record = ListingRecord::new(url);

    record.title = first_match(&doc, &[title]);
    record.location = first_match(&doc, &[location]);

    record.price = first_match(&doc, &[price]);
    record.price_numeric = record.price.as_deref().and_then(clean_price);

    record.original_price = first_match(&doc, &[original_price]);
    record.original_price_numeric = record.original_price.as_deref().and_then(clean_price);

    record.savings = first_match(&doc, &[savings]);
    record.property_type = property_type(&doc);

    if let Some((date, poster)) = updated_and_poster(&doc) {
        record.updated_date = Some(date);
        record.posted_by = Some(poster);
    }

    record.installment_info = first_match(&doc, &[installment]);

    specs::apply(&doc, &mut record, options, fields);

    record.description = first_match(&doc, &[description]);

    structured::fill_missing(&doc, &mut record);

    sections::apply(&doc, &mut record, options);

    debug!(
        "Extracted {} with {} specification pairs",
        url,
        record.specifications.len()
    );
    Ok(record)
}

fn check_listing_url(url: &str) {
    match url::Url::parse(url) {
        Ok(parsed) if parsed.path().starts_with(LISTING_PATH_PREFIX) => {}
        _ => warn!("Invalid property URL format: {}", url),
    }
}

fn title(doc: &Html) -> Option<String> {
    first_text(doc, &TITLE)
}

fn location(doc: &Html) -> Option<String> {
    first_text(doc, &LOCATION)
}

fn price(doc: &Html) -> Option<String> {
    first_text(doc, &PRICE)
}

fn original_price(doc: &Html) -> Option<String> {
    first_text(doc, &ORIGINAL_PRICE)
}

fn savings(doc: &Html) -> Option<String> {
    first_text(doc, &SAVINGS)
        .filter(|text| text.contains(SAVINGS_MARKER))
        .map(|text| text.replace(SAVINGS_MARKER, "").trim().to_string())
}

fn installment(doc: &Html) -> Option<String> {
    doc.select(&INSTALLMENT)
        .map(text_of)
        .find(|text| text.contains(INSTALLMENT_MARKER))
}

fn description(doc: &Html) -> Option<String> {
    DESCRIPTION
        .iter()
        .filter_map(|sel| first_text(doc, sel))
        .find(|text| !text.is_empty())
}

/// First badge whose text is exactly one of the known categories
fn property_type(doc: &Html) -> Option<PropertyType> {
    doc.select(&BADGE)
        .find_map(|badge| PropertyType::from_label(&text_of(badge)))
}

/// `Diperbarui 12 Mei 2024 oleh Budi` -> ("12 Mei 2024", "Budi")
fn updated_and_poster(doc: &Html) -> Option<(String, String)> {
    parse_updated_line(&first_text(doc, &UPDATED)?)
}

pub(crate) fn parse_updated_line(text: &str) -> Option<(String, String)> {
    UPDATED_LINE
        .captures(text)
        .map(|caps| (caps[1].to_string(), caps[2].trim().to_string()))
}

use crate::models::{ListingRecord, PriceValue};
use lazy_static::lazy_static;
use scraper::{Html, Selector};
use serde_json::Value;
use tracing::debug;

lazy_static! {
    static ref JSON_LD: Selector = Selector::parse(r#"script[type="application/ld+json"]"#).unwrap();
}

const ADDRESS_PARTS: [&str; 3] = ["streetAddress", "addressLocality", "addressRegion"];

/// Fill still-empty fields from embedded JSON-LD blocks. Values found in the
/// markup are never replaced; blocks that fail to parse are skipped.
pub fn fill_missing(doc: &Html, record: &mut ListingRecord) {
    for script in doc.select(&JSON_LD) {
        let raw = script.text().collect::<String>();
        let data: Value = match serde_json::from_str(raw.trim()) {
            Ok(data) => data,
            Err(e) => {
                debug!("Skipping malformed JSON-LD block: {}", e);
                continue;
            }
        };

        match &data {
            Value::Object(_) => fill_from(&data, record),
            Value::Array(items) => items.iter().for_each(|item| fill_from(item, record)),
            _ => {}
        }
    }
}

fn fill_from(data: &Value, record: &mut ListingRecord) {
    if !data.is_object() {
        return;
    }

    if record.title.is_none() {
        if let Some(name) = data.get("name").and_then(non_empty_str) {
            record.title = Some(name);
        }
    }

    if record.location.is_none() {
        if let Some(address) = data.get("address").filter(|a| a.is_object()) {
            let parts: Vec<String> = ADDRESS_PARTS
                .iter()
                .filter_map(|key| address.get(*key).and_then(non_empty_str))
                .collect();
            if !parts.is_empty() {
                record.location = Some(parts.join(", "));
            }
        }
    }

    let offer_price = data.get("offers").and_then(|offers| match offers {
        Value::Array(list) => list.first().and_then(|o| o.get("price")),
        Value::Object(_) => offers.get("price"),
        _ => None,
    });
    if let Some(price) = offer_price {
        if record.price_numeric.is_none() {
            if let Some(value) = as_number(price) {
                record.price_numeric = Some(PriceValue::Numeric(value));
                if record.price.is_none() {
                    record.price = Some(display_price(price));
                }
            }
        }
    }
}

fn non_empty_str(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn display_price(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn filled(html: &str, record: &mut ListingRecord) {
        let doc = Html::parse_document(html);
        fill_missing(&doc, record);
    }

    #[test]
    fn fills_only_null_fields() {
        let mut record = ListingRecord::new("u");
        record.title = Some("From markup".to_string());
        filled(
            r#"<script type="application/ld+json">
               {"name": "From JSON", "address": {"streetAddress": "Jl. Melati 5", "addressRegion": "Bali"},
                "offers": {"price": 2500000000}}
               </script>"#,
            &mut record,
        );
        assert_eq!(record.title.as_deref(), Some("From markup"));
        assert_eq!(record.location.as_deref(), Some("Jl. Melati 5, Bali"));
        assert_eq!(record.price_numeric, Some(PriceValue::Numeric(2_500_000_000.0)));
        assert_eq!(record.price.as_deref(), Some("2500000000"));
    }

    #[test]
    fn malformed_blocks_are_ignored() {
        let mut record = ListingRecord::new("u");
        filled(
            r#"<script type="application/ld+json">{not json</script>
               <script type="application/ld+json">[{"name": "Second block"}]</script>"#,
            &mut record,
        );
        assert_eq!(record.title.as_deref(), Some("Second block"));
    }

    #[test]
    fn raw_price_is_not_replaced() {
        let mut record = ListingRecord::new("u");
        record.price = Some("Hubungi".to_string());
        record.price_numeric = Some(PriceValue::Raw("Hubungi".to_string()));
        filled(
            r#"<script type="application/ld+json">{"offers": {"price": "900000000"}}</script>"#,
            &mut record,
        );
        assert_eq!(record.price_numeric, Some(PriceValue::Raw("Hubungi".to_string())));
    }
}

use crate::models::PriceValue;

const BILLION: f64 = 1_000_000_000.0;
const MILLION: f64 = 1_000_000.0;
const THOUSAND: f64 = 1_000.0;

/// Turn a price label such as `Rp 1,5 Miliar` into a number.
///
/// Keeps only digits, commas and periods, treats the comma as the decimal
/// separator and multiplies by the unit found in the original text. Text
/// that does not parse is handed back unchanged as [`PriceValue::Raw`].
pub fn clean_price(text: &str) -> Option<PriceValue> {
    if text.trim().is_empty() {
        return None;
    }

    let digits: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .collect();
    let normalized = digits.replace(',', ".");

    match normalized.parse::<f64>() {
        Ok(value) => Some(PriceValue::Numeric(value * scale_of(text))),
        Err(_) => Some(PriceValue::Raw(text.to_string())),
    }
}

/// Unit multiplier, billion before million before thousand
fn scale_of(text: &str) -> f64 {
    let lower = text.to_lowercase();
    let tokens: Vec<&str> = lower
        .split_whitespace()
        .map(|t| t.trim_end_matches(['.', ',', ')', '/']))
        .collect();

    if lower.contains("miliar") || lower.contains("milyar") || tokens.iter().any(|t| is_unit(t, "m")) {
        BILLION
    } else if lower.contains("juta") || tokens.iter().any(|t| is_unit(t, "jt")) {
        MILLION
    } else if lower.contains("ribu") || tokens.iter().any(|t| is_unit(t, "rb")) {
        THOUSAND
    } else {
        1.0
    }
}

/// `m`, `1,5m`, `500rb`: the abbreviation alone or glued to the number
fn is_unit(token: &str, abbrev: &str) -> bool {
    token.strip_suffix(abbrev).map_or(false, |rest| {
        rest.chars().all(|c| c.is_ascii_digit() || c == ',' || c == '.')
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn numeric(text: &str) -> f64 {
        clean_price(text).and_then(|p| p.as_f64()).unwrap()
    }

    #[test]
    fn scales_by_unit_word() {
        assert_eq!(numeric("Rp 1,5 Miliar"), 1_500_000_000.0);
        assert_eq!(numeric("Rp 850 Juta"), 850_000_000.0);
        assert_eq!(numeric("Rp 500 Ribu"), 500_000.0);
        assert_eq!(numeric("Rp 2 M"), 2_000_000_000.0);
        assert_eq!(numeric("Rp 750 jt"), 750_000_000.0);
        assert_eq!(numeric("Rp 300rb"), 300_000.0);
    }

    #[test]
    fn billion_wins_over_million() {
        // digits are concatenated before scaling
        assert_eq!(numeric("Rp 1 Miliar 200 Juta"), 1_200_000_000_000.0);
    }

    #[test]
    fn per_square_meter_is_not_billion() {
        assert_eq!(numeric("Rp 10 Juta/m²"), 10_000_000.0);
    }

    #[test]
    fn plain_number_has_no_scale() {
        assert_eq!(numeric("Rp 250000"), 250_000.0);
    }

    #[test]
    fn unparseable_text_is_returned_unchanged() {
        assert_eq!(
            clean_price("Hubungi Agen"),
            Some(PriceValue::Raw("Hubungi Agen".to_string()))
        );
        assert_eq!(
            clean_price("Rp 1.500.000.000"),
            Some(PriceValue::Raw("Rp 1.500.000.000".to_string()))
        );
    }

    #[test]
    fn empty_text_is_null() {
        assert_eq!(clean_price("  "), None);
    }
}

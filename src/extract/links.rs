use super::LISTING_PATH_PREFIX;
use crate::models::LinkSet;
use anyhow::{Context, Result};
use lazy_static::lazy_static;
use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

lazy_static! {
    static ref ANCHOR: Selector = Selector::parse("a[href]").unwrap();
}

/// Listing URLs referenced by one index page, in document order without
/// duplicates. Only anchors of the form `/properti/.../` qualify.
pub fn harvest_links(html: &str, origin: &Url) -> Result<Vec<String>> {
    let doc = Html::parse_document(html);
    let mut links = LinkSet::new();
    for anchor in doc.select(&ANCHOR) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        if !is_listing_path(href) {
            continue;
        }
        let absolute = origin
            .join(href)
            .with_context(|| format!("Failed to resolve {href} against {origin}"))?;
        // joining collapses dot segments, which can walk out of the listing tree
        if !is_listing_path(absolute.path()) {
            debug!("Skipping {} (resolves to {})", href, absolute);
            continue;
        }
        links.insert(absolute.to_string());
    }
    Ok(links.into_vec())
}

pub fn is_listing_path(href: &str) -> bool {
    href.starts_with(LISTING_PATH_PREFIX) && href.ends_with('/')
}

/// `scheme://host[:port]` of the start URL
pub fn origin_of(start_url: &str) -> Result<Url> {
    let parsed = Url::parse(start_url).with_context(|| format!("Invalid start URL: {start_url}"))?;
    let origin = parsed.origin().ascii_serialization();
    Url::parse(&origin).with_context(|| format!("Start URL has no usable origin: {start_url}"))
}

/// Index page URL for `page`, appended as a query parameter
pub fn page_url(base: &str, page: u32) -> String {
    if base.contains('?') {
        format!("{base}&page={page}")
    } else {
        format!("{base}?page={page}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn origin() -> Url {
        origin_of("https://www.rumah123.com/jual/dki-jakarta/rumah/").unwrap()
    }

    #[test]
    fn keeps_only_listing_anchors() {
        let html = r#"<a href="/properti/abc/">A</a><a href="/other/xyz">B</a>"#;
        assert_eq!(
            harvest_links(html, &origin()).unwrap(),
            vec!["https://www.rumah123.com/properti/abc/".to_string()]
        );
    }

    #[test]
    fn rejects_paths_without_trailing_slash_and_absolute_urls() {
        let html = r#"
            <a href="/properti/abc">no slash</a>
            <a href="https://www.rumah123.com/properti/def/">absolute</a>
            <a href="/properti/ghi/">ok</a>
            <a href="/properti/ghi/">dup</a>"#;
        assert_eq!(
            harvest_links(html, &origin()).unwrap(),
            vec!["https://www.rumah123.com/properti/ghi/".to_string()]
        );
    }

    #[test]
    fn dot_segments_cannot_escape_listing_tree() {
        let html = r#"
            <a href="/properti/../agen/budi/">escape</a>
            <a href="/properti/./depok/hos9/">dot</a>"#;
        assert_eq!(
            harvest_links(html, &origin()).unwrap(),
            vec!["https://www.rumah123.com/properti/depok/hos9/".to_string()]
        );
    }

    #[test]
    fn empty_page_yields_nothing() {
        assert!(harvest_links("<html></html>", &origin()).unwrap().is_empty());
    }

    #[test]
    fn page_parameter_respects_existing_query() {
        assert_eq!(
            page_url("https://www.rumah123.com/jual/bali/rumah/", 2),
            "https://www.rumah123.com/jual/bali/rumah/?page=2"
        );
        assert_eq!(
            page_url("https://www.rumah123.com/jual/bali/rumah/?sort=price", 3),
            "https://www.rumah123.com/jual/bali/rumah/?sort=price&page=3"
        );
    }

    #[test]
    fn origin_drops_path_and_query() {
        assert_eq!(
            origin_of("http://localhost:8080/jual/?x=1").unwrap().as_str(),
            "http://localhost:8080/"
        );
        assert!(origin_of("not a url").is_err());
    }
}

use async_trait::async_trait;
use reqwest::StatusCode;
use rumah_scout::accumulator::combine_session_links;
use rumah_scout::config::ScrapeConfig;
use rumah_scout::export::{read_records, save_records};
use rumah_scout::models::SpecFieldSet;
use rumah_scout::scrapers::{FetchError, PageFetcher, Rumah123Scraper, SearchParams};
use rumah_scout::session::{write_links, SessionDir};
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;

struct StaticSite {
    pages: HashMap<String, String>,
}

#[async_trait]
impl PageFetcher for StaticSite {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.pages.get(url).cloned().ok_or_else(|| FetchError::Status {
            url: url.to_string(),
            status: StatusCode::NOT_FOUND,
        })
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

const INDEX: &str = r#"
<ul>
  <li><a href="/properti/depok/hos1/">Rumah Depok</a></li>
  <li><a href="/properti/bogor/hos2/">Tanah Bogor</a></li>
  <li><a href="/agen/budi">Agen</a></li>
</ul>"#;

const HOUSE: &str = r#"
<h1 class="text-gray-800">Rumah Minimalis Depok</h1>
<span class="text-primary font-bold">Rp 850 Juta</span>
<div class="rounded-full">Rumah</div>
<div class="flex items-center"><p class="w-32 text-xs font-light text-gray-500">Kamar Tidur</p><p>2</p></div>"#;

const LAND: &str = r#"
<h1 class="text-gray-800">Tanah Kavling Bogor</h1>
<span class="text-primary font-bold">Hubungi Agen</span>
<div class="rounded-full">Tanah</div>
<div class="flex items-center"><p class="w-32 text-xs font-light text-gray-500">Sertifikat</p><p>SHM</p></div>"#;

fn site() -> StaticSite {
    let base = "https://www.rumah123.com/jual/jawa-barat/rumah/";
    StaticSite {
        pages: HashMap::from([
            (format!("{base}?page=1"), INDEX.to_string()),
            ("https://www.rumah123.com/properti/depok/hos1/".to_string(), HOUSE.to_string()),
            ("https://www.rumah123.com/properti/bogor/hos2/".to_string(), LAND.to_string()),
        ]),
    }
}

#[tokio::test]
async fn harvest_extract_export_and_combine() {
    let results_dir = tempfile::tempdir().unwrap();
    let session = SessionDir::create(results_dir.path()).unwrap();
    let config = ScrapeConfig {
        min_delay: 0.0,
        max_delay: 0.0,
        ..ScrapeConfig::default()
    };
    let scraper = Rumah123Scraper::new(site(), config, CancellationToken::new());

    let params = SearchParams {
        start_url: "https://www.rumah123.com/jual/jawa-barat/rumah/".to_string(),
        start_page: 1,
        pages: 1,
    };
    let links = scraper.harvest_links(&params).await.unwrap();
    assert_eq!(links.len(), 2);
    write_links(&links, &session.links_file()).unwrap();

    let mut fields = SpecFieldSet::new();
    let links = links.into_vec();
    let results = scraper.scrape_listings(&links, &mut fields, None).await;
    assert_eq!(results.len(), 2);
    assert_eq!(fields.iter().collect::<Vec<_>>(), vec!["kamar tidur", "sertifikat"]);

    let saved = save_records(&results, &session.final_csv()).unwrap().unwrap();
    let rows = read_records(&saved).unwrap();
    assert_eq!(rows[0]["title"], "Rumah Minimalis Depok");
    assert_eq!(rows[0]["price_numeric"].parse::<f64>().unwrap(), 850_000_000.0);
    assert_eq!(rows[0]["spec_kamar_tidur"], "2");
    assert!(!rows[0].contains_key("spec_sertifikat"));
    assert_eq!(rows[1]["property_type"], "Tanah");
    assert_eq!(rows[1]["price_numeric"], "Hubungi Agen");

    let first = combine_session_links(results_dir.path()).unwrap();
    assert_eq!(first.new_links, 2);
    let second = combine_session_links(results_dir.path()).unwrap();
    assert!(second.created.is_none());
    assert_eq!(second.overall_total, 2);
}

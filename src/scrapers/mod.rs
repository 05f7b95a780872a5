pub mod fetcher;
pub mod rumah123;
pub mod traits;
pub mod types;

pub use fetcher::{FetchError, HttpFetcher};
pub use rumah123::Rumah123Scraper;
pub use traits::PageFetcher;
pub use types::SearchParams;

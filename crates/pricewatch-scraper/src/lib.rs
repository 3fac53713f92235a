pub mod adapter;
pub mod client;
pub mod error;
mod falabella;
mod mercadolibre;
pub mod price;
pub(crate) mod retry;
pub mod types;

pub use adapter::Adapter;
pub use client::SiteClient;
pub use error::ScraperError;
pub use price::parse_price_text;
pub use types::{ScrapeConfig, ScrapeInput};

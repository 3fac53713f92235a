//! Price-text normalization and scraped-item validation.

use rust_decimal::Decimal;

use pricewatch_core::ScrapedItem;

/// Parses a site-formatted price string into a [`Decimal`].
///
/// Currency symbols, thousands separators (dots), and whitespace are
/// stripped; a decimal comma becomes a decimal point. This follows Chilean
/// retail formatting, where `$ 1.299.990` is 1299990 and `1.299,90` is
/// 1299.90.
///
/// Returns `None` when nothing parseable remains.
#[must_use]
pub fn parse_price_text(raw: &str) -> Option<Decimal> {
    let kept: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();

    if kept.is_empty() {
        return None;
    }

    // Dots are thousands separators; the comma, when present, is the
    // decimal mark.
    let normalized = kept.replace('.', "").replace(',', ".");
    normalized.parse::<Decimal>().ok()
}

/// Drops scraped items that fail the adapter contract: empty product name,
/// negative price, or a non-absolute product URL. Each rejection is logged,
/// never propagated.
#[must_use]
pub fn retain_valid(items: Vec<ScrapedItem>, source_name: &str) -> Vec<ScrapedItem> {
    items
        .into_iter()
        .filter(|item| match validate(item) {
            Ok(()) => true,
            Err(reason) => {
                tracing::warn!(
                    source = %source_name,
                    product_url = %item.product_url,
                    reason,
                    "dropping invalid scraped item"
                );
                false
            }
        })
        .collect()
}

fn validate(item: &ScrapedItem) -> Result<(), &'static str> {
    if item.product_name.trim().is_empty() {
        return Err("empty product name");
    }
    if item.price.is_sign_negative() {
        return Err("negative price");
    }
    if !is_absolute_url(&item.product_url) {
        return Err("product URL is not absolute");
    }
    Ok(())
}

fn is_absolute_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

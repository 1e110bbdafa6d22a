//! Listing page field extraction
//!
//! Extraction is best-effort: a missing element yields an empty or absent
//! field rather than failing the page. Only a page without HTML is rejected.

use crate::drain::ItemError;
use crate::extract::price::parse_price;
use crate::html::Document;
use crate::storage::{Property, RawPage};

const TITLE: &str = ".re-title__title";
const DESCRIPTION_HEADING: &str = ".re-contentDescriptionHeading__title";
const DESCRIPTION_BODY: &str = ".in-readAll";
const FEATURE_ITEM: &str = ".re-mainFeatures__item";
const LAST_UPDATE: &str = ".re-lastUpdate__text";
const PRICE: &str = ".re-overview__price";
const PRICE_TEXT: &str = ".re-overview__price > span:first-child";
const PRICE_RANGE_CLASS: &str = "has-range";

/// Extracts the structured fields of one captured listing
///
/// The title is the heading text as it appears on the page, untrimmed.
///
/// # Arguments
///
/// * `page` - A captured raw page
///
/// # Returns
///
/// * `Ok(Property)` - Extracted fields, missing ones empty
/// * `Err(ItemError::EmptyHtml)` - The page has no HTML content
pub fn extract_property(page: &RawPage) -> Result<Property, ItemError> {
    if page.html.is_empty() {
        return Err(ItemError::EmptyHtml(page.url.clone()));
    }

    let document = Document::parse(&page.html);

    let title = document.text(TITLE);
    let description = format!(
        "{}\n{}",
        document.text(DESCRIPTION_HEADING),
        document.text(DESCRIPTION_BODY)
    );

    let main_features = document
        .select(FEATURE_ITEM)
        .into_iter()
        .map(|el| document.element_text(el).trim().to_string())
        .collect();

    let last_updated = document
        .text(LAST_UPDATE)
        .split_whitespace()
        .last()
        .map(str::to_string);

    let is_range = document.has_class(PRICE, PRICE_RANGE_CLASS);
    let price = parse_price(&document.text(PRICE_TEXT), is_range);

    Ok(Property {
        url: page.url.clone(),
        title,
        price_min: price.min,
        price_max: price.max,
        price_unit: price.unit,
        price_raw: price.raw,
        description,
        main_features,
        last_updated,
        city_id: page.city_id,
    })
}

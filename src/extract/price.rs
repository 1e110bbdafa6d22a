//! Price text parsing
//!
//! Listing prices read like `€ 150.000` or, for ranges, `€ 150.000 - 200.000`.
//! Numbers use the site locale: `.` groups thousands and `,` starts the
//! decimal part.

/// Parsed price fields of a listing
#[derive(Debug, Clone, PartialEq)]
pub struct PriceInfo {
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// First character of the price text, usually the currency symbol
    pub unit: Option<String>,
    /// The price text as shown on the page (trimmed)
    pub raw: String,
}

/// Parses a price text
///
/// Without the range flag the last whitespace-separated token becomes the
/// minimum. With it, the text is split on `-` and the last token of each
/// side becomes the minimum and maximum. Tokens that are not numbers leave
/// their bound empty; the raw text is always kept.
///
/// # Example
///
/// ```
/// use listing_harvester::extract::parse_price;
///
/// let price = parse_price("€ 150.000 - 200.000", true);
/// assert_eq!(price.min, Some(150000.0));
/// assert_eq!(price.max, Some(200000.0));
/// assert_eq!(price.unit.as_deref(), Some("€"));
/// ```
pub fn parse_price(text: &str, is_range: bool) -> PriceInfo {
    let raw = text.trim();
    let unit = raw.chars().next().map(String::from);

    let (min, max) = if is_range {
        let mut sides = raw.split('-');
        let min = sides.next().and_then(last_token).and_then(parse_number);
        let max = sides.next().and_then(last_token).and_then(parse_number);
        (min, max)
    } else {
        (last_token(raw).and_then(parse_number), None)
    };

    PriceInfo {
        min,
        max,
        unit,
        raw: raw.to_string(),
    }
}

fn last_token(text: &str) -> Option<&str> {
    text.split_whitespace().last()
}

/// Parses one locale-formatted number
///
/// Accepts plain digits (`99000`), dotted thousands groups (`150.000`) and
/// an optional comma decimal part (`1.250,50`). Anything else is `None`.
pub fn parse_number(token: &str) -> Option<f64> {
    let (integer, fraction) = match token.split_once(',') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (token, None),
    };

    let mut groups = integer.split('.');
    let first = groups.next()?;
    if first.is_empty() || !first.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let mut digits = first.to_string();
    let mut grouped = false;
    for group in groups {
        if group.len() != 3 || !group.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        grouped = true;
        digits.push_str(group);
    }
    if grouped && first.len() > 3 {
        return None;
    }

    if let Some(fraction) = fraction {
        if fraction.is_empty() || !fraction.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.push('.');
        digits.push_str(fraction);
    }

    digits.parse().ok()
}

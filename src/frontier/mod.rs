//! Search-space generation
//!
//! Turns every (city, purpose, category) combination into a search-result URL
//! template. The page number is left as a placeholder that the pagination
//! crawler fills in.

use crate::storage::City;
use std::fmt;

/// Placeholder substituted with the page number
pub const PAGE_PLACEHOLDER: &str = "*";

/// Query string appended to every search path: newest listings first
const SEARCH_QUERY: &str = "?criterio=data&ordine=desc&pag=";

/// Transaction purpose of a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Purpose {
    Sale,
    Rent,
}

impl Purpose {
    pub const ALL: [Purpose; 2] = [Purpose::Sale, Purpose::Rent];

    fn path_prefix(&self) -> &'static str {
        match self {
            Self::Sale => "vendita",
            Self::Rent => "affitto",
        }
    }
}

/// Property categories searchable for both purposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Houses,
    Garages,
    Offices,
    Shops,
    Warehouses,
    Land,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Houses,
        Category::Garages,
        Category::Offices,
        Category::Shops,
        Category::Warehouses,
        Category::Land,
    ];

    fn path_suffix(&self) -> &'static str {
        match self {
            Self::Houses => "case",
            Self::Garages => "garage",
            Self::Offices => "uffici",
            Self::Shops => "negozi",
            Self::Warehouses => "magazzini",
            Self::Land => "terreni",
        }
    }
}

/// Categories that only exist for one purpose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecialCategory {
    /// New construction, sale only
    NewConstruction,
    /// Single rooms, rent only
    RoomRental,
}

impl SpecialCategory {
    pub const ALL: [SpecialCategory; 2] = [
        SpecialCategory::NewConstruction,
        SpecialCategory::RoomRental,
    ];

    pub fn purpose(&self) -> Purpose {
        match self {
            Self::NewConstruction => Purpose::Sale,
            Self::RoomRental => Purpose::Rent,
        }
    }

    fn segment(&self) -> &'static str {
        match self {
            Self::NewConstruction => "nuove-costruzioni",
            Self::RoomRental => "affitto-stanze",
        }
    }
}

/// Which slice of the search space a seed covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchKind {
    Shared(Purpose, Category),
    Special(SpecialCategory),
}

impl SearchKind {
    /// Path segment on the listing site, e.g. `vendita-case`
    pub fn segment(&self) -> String {
        match self {
            Self::Shared(purpose, category) => {
                format!("{}-{}", purpose.path_prefix(), category.path_suffix())
            }
            Self::Special(special) => special.segment().to_string(),
        }
    }

    pub fn purpose(&self) -> Purpose {
        match self {
            Self::Shared(purpose, _) => *purpose,
            Self::Special(special) => special.purpose(),
        }
    }
}

impl fmt::Display for SearchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segment())
    }
}

/// A search-result URL template tagged with its city
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedUrl {
    /// URL with [`PAGE_PLACEHOLDER`] where the page number goes
    pub template: String,
    pub city_id: i64,
    pub city: String,
    pub kind: SearchKind,
}

impl SeedUrl {
    /// Builds a seed from an arbitrary template, mostly for tests and ad-hoc crawls
    pub fn new(template: impl Into<String>, city_id: i64, city: impl Into<String>, kind: SearchKind) -> Self {
        Self {
            template: template.into(),
            city_id,
            city: city.into(),
            kind,
        }
    }

    /// The concrete URL of result page `page`
    pub fn page_url(&self, page: u32) -> String {
        self.template.replacen(PAGE_PLACEHOLDER, &page.to_string(), 1)
    }
}

/// Number of seeds generated per city
pub fn seeds_per_city() -> usize {
    SpecialCategory::ALL.len() + Purpose::ALL.len() * Category::ALL.len()
}

/// Produces the full cross product of search URLs for `cities`
///
/// Purpose-specific categories come first for each city, then every shared
/// category for sale and for rent. Output size is
/// `cities.len() * seeds_per_city()`.
///
/// # Example
///
/// ```
/// use listing_harvester::frontier::generate_seeds;
/// use listing_harvester::storage::City;
///
/// let cities = vec![City { id: 1, name: "milano".to_string() }];
/// let seeds = generate_seeds("https://www.immobiliare.it", &cities);
/// assert_eq!(seeds.len(), 14);
/// assert_eq!(
///     seeds[2].page_url(1),
///     "https://www.immobiliare.it/vendita-case/milano/?criterio=data&ordine=desc&pag=1"
/// );
/// ```
pub fn generate_seeds(base_url: &str, cities: &[City]) -> Vec<SeedUrl> {
    let base = base_url.trim_end_matches('/');
    let mut kinds: Vec<SearchKind> = SpecialCategory::ALL
        .iter()
        .map(|special| SearchKind::Special(*special))
        .collect();
    for purpose in Purpose::ALL {
        for category in Category::ALL {
            kinds.push(SearchKind::Shared(purpose, category));
        }
    }

    let mut seeds = Vec::with_capacity(cities.len() * kinds.len());
    for city in cities {
        for kind in &kinds {
            let template = format!(
                "{}/{}/{}/{}{}",
                base,
                kind.segment(),
                city.name,
                SEARCH_QUERY,
                PAGE_PLACEHOLDER
            );
            seeds.push(SeedUrl {
                template,
                city_id: city.id,
                city: city.name.clone(),
                kind: *kind,
            });
        }
    }
    seeds
}

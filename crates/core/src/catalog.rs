//! In-memory product listing filter.
//!
//! The listing fetches approved products once and narrows them locally on
//! every search or category change; no backend round trip per keystroke.

use std::collections::BTreeSet;

use crate::entities::Product;

/// Category selection. `All` matches every product.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(String),
}

impl CategoryFilter {
    /// Parse a category query parameter. Missing, empty or `all` select all.
    #[must_use]
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("" | "all") => Self::All,
            Some(category) => Self::Only(category.to_owned()),
        }
    }

    /// Value to echo back into the category select.
    #[must_use]
    pub fn as_param(&self) -> &str {
        match self {
            Self::All => "all",
            Self::Only(category) => category,
        }
    }

    /// Whether `product` falls in the selected category.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        match self {
            Self::All => true,
            Self::Only(category) => product.category.as_deref() == Some(category.as_str()),
        }
    }
}

/// Search term plus category selection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListingFilter {
    search: String,
    pub category: CategoryFilter,
}

impl ListingFilter {
    /// Build a filter from raw query parameters.
    #[must_use]
    pub fn new(search: Option<&str>, category: Option<&str>) -> Self {
        Self {
            search: search.unwrap_or_default().to_owned(),
            category: CategoryFilter::parse(category),
        }
    }

    /// The search term as entered.
    #[must_use]
    pub fn search(&self) -> &str {
        &self.search
    }

    /// Case-insensitive substring match on title or description.
    #[must_use]
    pub fn matches_search(&self, product: &Product) -> bool {
        if self.search.is_empty() {
            return true;
        }
        let needle = self.search.to_lowercase();
        product.title.to_lowercase().contains(&needle)
            || product
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&needle))
    }

    /// Whether `product` passes both predicates.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        self.matches_search(product) && self.category.matches(product)
    }

    /// Products passing the filter, in their original order.
    #[must_use]
    pub fn apply<'a>(&self, products: &'a [Product]) -> Vec<&'a Product> {
        products.iter().filter(|p| self.matches(p)).collect()
    }
}

/// Distinct, non-empty categories present in `products`.
#[must_use]
pub fn categories(products: &[Product]) -> Vec<String> {
    products
        .iter()
        .filter_map(|p| p.category.as_deref())
        .filter(|c| !c.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_owned)
        .collect()
}

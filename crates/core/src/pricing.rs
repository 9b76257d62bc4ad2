//! Unit price derivation for sale and bulk pricing.
//!
//! Precedence is fixed: a sale price only counts when it undercuts the base
//! price, and a bulk price, once its quantity threshold is met, wins over the
//! sale price whether or not the bulk price is the cheaper of the two.

use crate::types::Money;

/// Price columns of a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pricing {
    pub price: Money,
    pub sale_price: Option<Money>,
    pub bulk_price: Option<Money>,
    /// Minimum quantity for bulk pricing. Unset means any quantity.
    pub bulk_quantity: Option<i32>,
}

/// Derived prices for a requested quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceQuote {
    pub quantity: u32,
    /// List price.
    pub base_unit: Money,
    /// List price after a qualifying sale price.
    pub effective_unit: Money,
    /// Price actually charged per unit.
    pub final_unit: Money,
    pub bulk_applies: bool,
}

impl Pricing {
    /// Effective unit price before bulk pricing.
    #[must_use]
    pub fn effective_unit(&self) -> Money {
        match self.sale_price {
            Some(sale) if sale < self.price => sale,
            _ => self.price,
        }
    }

    /// Minimum quantity at which bulk pricing kicks in.
    #[must_use]
    pub fn bulk_threshold(&self) -> i64 {
        i64::from(self.bulk_quantity.unwrap_or(1))
    }

    /// Whether bulk pricing applies at `quantity`.
    #[must_use]
    pub fn bulk_applies(&self, quantity: u32) -> bool {
        self.bulk_price.is_some() && i64::from(quantity) >= self.bulk_threshold()
    }

    /// Derive the unit and total prices for `quantity`.
    #[must_use]
    pub fn quote(&self, quantity: u32) -> PriceQuote {
        let effective_unit = self.effective_unit();
        let bulk_applies = self.bulk_applies(quantity);
        let final_unit = match self.bulk_price {
            Some(bulk) if bulk_applies => bulk,
            _ => effective_unit,
        };

        PriceQuote {
            quantity,
            base_unit: self.price,
            effective_unit,
            final_unit,
            bulk_applies,
        }
    }
}

impl PriceQuote {
    /// Amount charged for the whole quantity.
    #[must_use]
    pub fn total(&self) -> Money {
        self.final_unit.times(self.quantity)
    }

    /// List price for the whole quantity, shown struck through.
    #[must_use]
    pub fn original_total(&self) -> Money {
        self.base_unit.times(self.quantity)
    }

    /// Whether the struck-through list price should be shown.
    #[must_use]
    pub fn shows_original(&self) -> bool {
        self.effective_unit != self.base_unit || self.bulk_applies
    }

    /// What bulk pricing saves over the effective price.
    ///
    /// `None` unless bulk applies and actually undercuts the effective price.
    #[must_use]
    pub fn bulk_savings(&self) -> Option<Money> {
        (self.bulk_applies && self.final_unit < self.effective_unit)
            .then(|| (self.effective_unit - self.final_unit).times(self.quantity))
    }
}

/// Stock availability of a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    /// Stock is not tracked.
    Untracked,
    InStock(u32),
    OutOfStock,
}

impl Availability {
    /// Classify a `stock_quantity` column.
    #[must_use]
    pub fn from_stock(stock_quantity: Option<i32>) -> Self {
        match stock_quantity {
            None => Self::Untracked,
            Some(n) if n > 0 => Self::InStock(n.unsigned_abs()),
            Some(_) => Self::OutOfStock,
        }
    }

    /// Whether the product can be added to the cart.
    #[must_use]
    pub const fn purchasable(&self) -> bool {
        !matches!(self, Self::OutOfStock)
    }

    /// Clamp a requested quantity into `1..=stock`.
    ///
    /// Missing or zero requests become 1. Untracked and out-of-stock products
    /// only get the lower bound.
    #[must_use]
    pub fn clamp_quantity(&self, requested: Option<u32>) -> u32 {
        let quantity = requested.unwrap_or(1).max(1);
        match self {
            Self::InStock(stock) => quantity.min(*stock),
            Self::Untracked | Self::OutOfStock => quantity,
        }
    }

    /// Whether the quantity stepper may go above `quantity`.
    #[must_use]
    pub const fn can_increase(&self, quantity: u32) -> bool {
        match self {
            Self::Untracked => true,
            Self::InStock(stock) => quantity < *stock,
            Self::OutOfStock => false,
        }
    }

    /// Label shown next to the quantity stepper.
    #[must_use]
    pub fn label(&self) -> Option<String> {
        match self {
            Self::Untracked => None,
            Self::InStock(n) => Some(format!("{n} available")),
            Self::OutOfStock => Some("Out of stock".to_owned()),
        }
    }
}

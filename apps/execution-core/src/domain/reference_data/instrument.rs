//! Instrument definition.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::shared::{Currency, DomainError, InstrumentId, Money, Price, Quantity};

/// Which market price to read from the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PriceType {
    /// Best bid.
    Bid,
    /// Best ask.
    Ask,
    /// Last traded price.
    Last,
}

/// A tradeable instrument and its trading limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument {
    /// Instrument identifier (`SYMBOL.VENUE`).
    pub id: InstrumentId,
    /// Decimal places allowed on prices.
    pub price_precision: u8,
    /// Decimal places allowed on quantities.
    pub size_precision: u8,
    /// Smallest price step.
    pub price_increment: Price,
    /// Contract multiplier applied to notional values.
    pub multiplier: Decimal,
    /// Currency prices are quoted in.
    pub quote_currency: Currency,
    /// Base currency for FX and crypto pairs.
    pub base_currency: Option<Currency>,
    /// Smallest order size accepted by the venue.
    pub min_quantity: Option<Quantity>,
    /// Largest order size accepted by the venue.
    pub max_quantity: Option<Quantity>,
    /// Smallest order notional accepted by the venue.
    pub min_notional: Option<Money>,
    /// Largest order notional accepted by the venue.
    pub max_notional: Option<Money>,
}

impl Instrument {
    /// Create an instrument with a unit multiplier and no venue limits.
    ///
    /// # Errors
    ///
    /// Returns error if a precision exceeds the supported maximum.
    pub fn new(
        id: InstrumentId,
        price_precision: u8,
        size_precision: u8,
        quote_currency: Currency,
    ) -> Result<Self, DomainError> {
        if price_precision > crate::domain::shared::MAX_PRECISION
            || size_precision > crate::domain::shared::MAX_PRECISION
        {
            return Err(DomainError::InvalidValue {
                field: "precision".to_string(),
                message: format!(
                    "{id}: precision out of range (price {price_precision}, size {size_precision})"
                ),
            });
        }
        let price_increment =
            Price::new(Decimal::new(1, u32::from(price_precision)), price_precision)?;
        Ok(Self {
            id,
            price_precision,
            size_precision,
            price_increment,
            multiplier: Decimal::ONE,
            quote_currency,
            base_currency: None,
            min_quantity: None,
            max_quantity: None,
            min_notional: None,
            max_notional: None,
        })
    }

    /// Set the base currency.
    #[must_use]
    pub fn with_base_currency(mut self, currency: Currency) -> Self {
        self.base_currency = Some(currency);
        self
    }

    /// Set min/max order quantity limits.
    #[must_use]
    pub fn with_quantity_limits(mut self, min: Option<Quantity>, max: Option<Quantity>) -> Self {
        self.min_quantity = min;
        self.max_quantity = max;
        self
    }

    /// Set min/max order notional limits.
    #[must_use]
    pub fn with_notional_limits(mut self, min: Option<Money>, max: Option<Money>) -> Self {
        self.min_notional = min;
        self.max_notional = max;
        self
    }

    /// Set the contract multiplier.
    #[must_use]
    pub fn with_multiplier(mut self, multiplier: Decimal) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Notional value of `quantity` at `price`, in the quote currency.
    #[must_use]
    pub fn notional_value(&self, quantity: Quantity, price: Price) -> Money {
        Money::new(
            quantity.as_decimal() * price.as_decimal() * self.multiplier,
            self.quote_currency.clone(),
        )
    }

    /// Create a quantity with this instrument's size precision.
    ///
    /// # Errors
    ///
    /// Returns error if the value is negative.
    pub fn make_qty(&self, value: Decimal) -> Result<Quantity, DomainError> {
        Quantity::new(value, self.size_precision)
    }

    /// Create a price with this instrument's price precision.
    ///
    /// # Errors
    ///
    /// Returns error if the precision is invalid.
    pub fn make_price(&self, value: Decimal) -> Result<Price, DomainError> {
        Price::new(value, self.price_precision)
    }
}

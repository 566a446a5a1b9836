//! Pre-trade checks.
//!
//! Each check reads the cache and instrument limits and returns the first
//! failure as a [`CheckFailure`]. Failures carry a stable `check` label for
//! metrics and the reason shown on the denied or rejected order.

use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::application::cache::{Cache, QueryFilter};
use crate::domain::account::AccountType;
use crate::domain::order_execution::{Order, OrderSide, OrderType, TimeInForce};
use crate::domain::reference_data::{Instrument, PriceType};
use crate::domain::risk_management::TradingState;
use crate::domain::shared::{InstrumentId, Money, PositionId, Price, Quantity, Timestamp};

/// A failed check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckFailure {
    /// Metric label of the check.
    pub check: &'static str,
    /// Reason reported on the order.
    pub reason: String,
}

impl CheckFailure {
    fn new(check: &'static str, reason: impl Into<String>) -> Self {
        Self {
            check,
            reason: reason.into(),
        }
    }
}

pub type CheckResult<T = ()> = Result<T, CheckFailure>;

// ============================================================================
// Trading State
// ============================================================================

/// HALTED denies everything; REDUCING denies orders on the side of the
/// instrument's current net position.
pub fn check_trading_state(state: TradingState, cache: &Cache, order: &Order) -> CheckResult {
    match state {
        TradingState::Active => Ok(()),
        TradingState::Halted => Err(CheckFailure::new("trading_state", "TradingState::HALTED")),
        TradingState::Reducing => {
            check_reducing(cache, order.instrument_id(), order.side()).map_err(|exposure| {
                CheckFailure::new(
                    "trading_state",
                    format!(
                        "{} when TradingState::REDUCING and {exposure} {}",
                        order.side(),
                        order.instrument_id()
                    ),
                )
            })
        }
    }
}

/// `Err("LONG")` or `Err("SHORT")` when `side` adds to the net position.
pub fn check_reducing(
    cache: &Cache,
    instrument_id: &InstrumentId,
    side: OrderSide,
) -> Result<(), &'static str> {
    let net = cache.net_position_quantity(instrument_id, None);
    match side {
        OrderSide::Buy if net > Decimal::ZERO => Err("LONG"),
        OrderSide::Sell if net < Decimal::ZERO => Err("SHORT"),
        _ => Ok(()),
    }
}

// ============================================================================
// Price and Quantity
// ============================================================================

/// Precision and sign of a price or trigger price.
pub fn check_price(instrument: &Instrument, price: Option<Price>, label: &str) -> CheckResult {
    let Some(price) = price else {
        return Ok(());
    };
    if price.precision() > instrument.price_precision {
        return Err(CheckFailure::new(
            "price",
            format!(
                "{label} {price} invalid (precision {} > {})",
                price.precision(),
                instrument.price_precision
            ),
        ));
    }
    if !price.is_positive() {
        return Err(CheckFailure::new("price", format!("{label} {price} invalid (<= 0)")));
    }
    Ok(())
}

/// Prices of the order, and that a GTD expiry is still ahead.
pub fn check_order_prices(instrument: &Instrument, order: &Order, now: Timestamp) -> CheckResult {
    check_price(instrument, order.price(), "price")?;
    check_price(instrument, order.trigger_price(), "trigger price")?;
    if order.time_in_force() == TimeInForce::Gtd {
        match order.expire_time() {
            Some(expire_time) if expire_time <= now => {
                return Err(CheckFailure::new(
                    "price",
                    format!("GTD {} already past", expire_time.to_rfc3339()),
                ));
            }
            None => {
                return Err(CheckFailure::new("price", "GTD order has no expire time"));
            }
            Some(_) => {}
        }
    }
    Ok(())
}

/// Precision, sign and instrument trade-size limits.
pub fn check_quantity(instrument: &Instrument, quantity: Quantity) -> CheckResult {
    if quantity.precision() > instrument.size_precision {
        return Err(CheckFailure::new(
            "quantity",
            format!(
                "quantity {quantity} invalid (precision {} > {})",
                quantity.precision(),
                instrument.size_precision
            ),
        ));
    }
    if !quantity.is_positive() {
        return Err(CheckFailure::new(
            "quantity",
            format!("quantity {quantity} invalid (<= 0)"),
        ));
    }
    if let Some(max) = instrument.max_quantity {
        if quantity > max {
            return Err(CheckFailure::new(
                "quantity",
                format!("quantity {quantity} invalid (> maximum trade size of {max})"),
            ));
        }
    }
    if let Some(min) = instrument.min_quantity {
        if quantity < min {
            return Err(CheckFailure::new(
                "quantity",
                format!("quantity {quantity} invalid (< minimum trade size of {min})"),
            ));
        }
    }
    Ok(())
}

// ============================================================================
// Notional and Balance
// ============================================================================

/// Price used to value an order: its own limit or trigger price, else the
/// latest ask (buys) or bid (sells), else the last trade.
fn notional_price(cache: &Cache, order: &Order) -> Option<Price> {
    let own = match order.order_type() {
        OrderType::Limit | OrderType::StopLimit | OrderType::LimitIfTouched => order.price(),
        OrderType::StopMarket | OrderType::MarketIfTouched => order.trigger_price(),
        OrderType::Market | OrderType::MarketToLimit => None,
    };
    own.or_else(|| {
        let side = match order.side() {
            OrderSide::Buy => PriceType::Ask,
            OrderSide::Sell => PriceType::Bid,
        };
        cache
            .price(order.instrument_id(), side)
            .or_else(|| cache.price(order.instrument_id(), PriceType::Last))
    })
}

/// Order notional against the per-order maximum and instrument limits.
///
/// Returns `None` (and passes) when no price is available.
pub fn check_notional(
    cache: &Cache,
    instrument: &Instrument,
    order: &Order,
    max_per_order: Option<Decimal>,
) -> CheckResult<Option<Money>> {
    let Some(price) = notional_price(cache, order) else {
        warn!(
            client_order_id = %order.client_order_id(),
            instrument_id = %instrument.id,
            "Cannot check notional: no market price"
        );
        return Ok(None);
    };
    let notional = instrument.notional_value(order.quantity(), price);

    if let Some(max) = max_per_order {
        if notional.amount() > max {
            return Err(CheckFailure::new(
                "notional",
                format!(
                    "NOTIONAL_EXCEEDS_MAX_PER_ORDER: max_notional={max}, notional={}",
                    notional.amount()
                ),
            ));
        }
    }
    if let Some(max) = &instrument.max_notional {
        if notional.amount() > max.amount() {
            return Err(CheckFailure::new(
                "notional",
                format!(
                    "NOTIONAL_GREATER_THAN_MAX_FOR_INSTRUMENT: max_notional={max}, notional={notional}"
                ),
            ));
        }
    }
    if let Some(min) = &instrument.min_notional {
        if notional.amount() < min.amount() {
            return Err(CheckFailure::new(
                "notional",
                format!(
                    "NOTIONAL_LESS_THAN_MIN_FOR_INSTRUMENT: min_notional={min}, notional={notional}"
                ),
            ));
        }
    }
    Ok(Some(notional))
}

/// Amount an order draws from a cash account: quote notional for buys,
/// base quantity for sells of instruments with a base currency.
pub fn balance_impact(instrument: &Instrument, order: &Order, notional: &Money) -> Option<Money> {
    match order.side() {
        OrderSide::Buy => Some(notional.clone()),
        OrderSide::Sell => instrument.base_currency.as_ref().map(|base| {
            Money::new(
                order.quantity().as_decimal() * instrument.multiplier,
                base.clone(),
            )
        }),
    }
}

/// Free balance of the venue's cash account against `required`.
///
/// Margin accounts, and venues without a cached account, pass.
pub fn check_balance(
    cache: &Cache,
    instrument: &Instrument,
    required: &Money,
    cumulative: bool,
) -> CheckResult {
    let Some(account) = cache.account_for_venue(&instrument.id.venue()) else {
        debug!(instrument_id = %instrument.id, "No account for venue, balance not checked");
        return Ok(());
    };
    if account.account_type() == AccountType::Margin {
        return Ok(());
    }
    let Some(free) = account.balance_free(required.currency()) else {
        debug!(currency = %required.currency(), "No balance in currency, not checked");
        return Ok(());
    };
    if required.amount() > free.amount() {
        let reason = if cumulative {
            format!("CUM_NOTIONAL_EXCEEDS_FREE_BALANCE: free={free}, cum_notional={required}")
        } else {
            format!("NOTIONAL_EXCEEDS_FREE_BALANCE: free={free}, notional={required}")
        };
        return Err(CheckFailure::new("balance", reason));
    }
    Ok(())
}

// ============================================================================
// Positions
// ============================================================================

/// A referenced position must be open.
pub fn check_position_open(cache: &Cache, position_id: Option<&PositionId>) -> CheckResult {
    match position_id {
        Some(position_id) if !cache.is_position_open(position_id) => Err(CheckFailure::new(
            "position",
            format!("Position {position_id} not open"),
        )),
        _ => Ok(()),
    }
}

/// A reduce-only order must not increase the position it reduces: the
/// referenced one, else the strategy's open position on the instrument.
pub fn check_reduce_only(
    cache: &Cache,
    order: &Order,
    position_id: Option<&PositionId>,
) -> CheckResult {
    if !order.is_reduce_only() {
        return Ok(());
    }
    let position = match position_id {
        Some(position_id) => cache.position(position_id).filter(|p| p.is_open()),
        None => {
            let filter = QueryFilter::all()
                .instrument(order.instrument_id().clone())
                .strategy(order.strategy_id().clone());
            cache.positions_open(&filter).into_iter().next()
        }
    };
    let Some(position) = position else {
        let target = position_id.map_or_else(|| order.instrument_id().to_string(), ToString::to_string);
        return Err(CheckFailure::new(
            "position",
            format!("Position {target} not found for reduce-only order"),
        ));
    };
    if !order.would_reduce_only(position.side(), position.quantity()) {
        return Err(CheckFailure::new(
            "position",
            format!(
                "Reduce only order would increase position {} ({} {})",
                position.id(),
                position.side(),
                position.quantity()
            ),
        ));
    }
    Ok(())
}

//! Position Aggregate Root
//!
//! Signed quantity is the running sum of signed fill quantities in receipt
//! order. Average prices are volume-weighted; realized PnL is charged with
//! commissions paid in the settlement currency.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::order_execution::events::OrderFilled;
use crate::domain::order_execution::value_objects::OrderSide;
use crate::domain::position_management::value_objects::PositionSide;
use crate::domain::reference_data::Instrument;
use crate::domain::shared::{
    AccountId, ClientOrderId, Currency, DomainError, InstrumentId, Money, PositionId, Price,
    Quantity, StrategyId, Timestamp, TradeId, TraderId,
};

/// Position Aggregate Root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    id: PositionId,
    trader_id: TraderId,
    strategy_id: StrategyId,
    instrument_id: InstrumentId,
    account_id: Option<AccountId>,
    opening_order_id: ClientOrderId,
    closing_order_id: Option<ClientOrderId>,
    entry: OrderSide,
    side: PositionSide,
    signed_qty: Decimal,
    quantity: Quantity,
    peak_qty: Quantity,
    size_precision: u8,
    multiplier: Decimal,
    quote_currency: Currency,
    settlement_currency: Currency,
    avg_px_open: Decimal,
    avg_px_close: Option<Decimal>,
    realized_return: Decimal,
    realized_pnl: Option<Money>,
    buy_qty: Quantity,
    sell_qty: Quantity,
    commissions: BTreeMap<Currency, Money>,
    trade_ids: Vec<TradeId>,
    events: Vec<OrderFilled>,
    ts_init: Timestamp,
    ts_opened: Timestamp,
    ts_last: Timestamp,
    ts_closed: Option<Timestamp>,
}

impl Position {
    /// Open a position from its first fill.
    ///
    /// # Errors
    ///
    /// Returns error if the fill has no position ID or is for another instrument.
    pub fn new(instrument: &Instrument, fill: &OrderFilled) -> Result<Self, DomainError> {
        let Some(id) = fill.position_id.clone() else {
            return Err(DomainError::InvalidValue {
                field: "position_id".to_string(),
                message: format!("fill {} has no position ID", fill.trade_id),
            });
        };
        if instrument.id != fill.header.instrument_id {
            return Err(DomainError::InvalidValue {
                field: "instrument_id".to_string(),
                message: format!(
                    "fill for {} cannot open a {} position",
                    fill.header.instrument_id, instrument.id
                ),
            });
        }

        let zero = Quantity::zero(instrument.size_precision);
        let mut position = Self {
            id,
            trader_id: fill.header.trader_id.clone(),
            strategy_id: fill.header.strategy_id.clone(),
            instrument_id: fill.header.instrument_id.clone(),
            account_id: fill.header.account_id.clone(),
            opening_order_id: fill.header.client_order_id.clone(),
            closing_order_id: None,
            entry: fill.order_side,
            side: PositionSide::Flat,
            signed_qty: Decimal::ZERO,
            quantity: zero,
            peak_qty: zero,
            size_precision: instrument.size_precision,
            multiplier: instrument.multiplier,
            quote_currency: instrument.quote_currency.clone(),
            settlement_currency: instrument.quote_currency.clone(),
            avg_px_open: fill.last_px.as_decimal(),
            avg_px_close: None,
            realized_return: Decimal::ZERO,
            realized_pnl: None,
            buy_qty: zero,
            sell_qty: zero,
            commissions: BTreeMap::new(),
            trade_ids: Vec::new(),
            events: Vec::new(),
            ts_init: fill.header.ts_init,
            ts_opened: fill.header.ts_event,
            ts_last: fill.header.ts_event,
            ts_closed: None,
        };
        position.apply(fill)?;
        Ok(position)
    }

    // ========================================================================
    // Getters
    // ========================================================================

    /// Position ID.
    #[must_use]
    pub const fn id(&self) -> &PositionId {
        &self.id
    }

    /// Trader instance.
    #[must_use]
    pub const fn trader_id(&self) -> &TraderId {
        &self.trader_id
    }

    /// Owning strategy.
    #[must_use]
    pub const fn strategy_id(&self) -> &StrategyId {
        &self.strategy_id
    }

    /// Instrument.
    #[must_use]
    pub const fn instrument_id(&self) -> &InstrumentId {
        &self.instrument_id
    }

    /// Account of the opening fill.
    #[must_use]
    pub const fn account_id(&self) -> Option<&AccountId> {
        self.account_id.as_ref()
    }

    /// Order that opened the position.
    #[must_use]
    pub const fn opening_order_id(&self) -> &ClientOrderId {
        &self.opening_order_id
    }

    /// Order that closed the position.
    #[must_use]
    pub const fn closing_order_id(&self) -> Option<&ClientOrderId> {
        self.closing_order_id.as_ref()
    }

    /// Side of the order that established the current exposure.
    #[must_use]
    pub const fn entry(&self) -> OrderSide {
        self.entry
    }

    /// Current side.
    #[must_use]
    pub const fn side(&self) -> PositionSide {
        self.side
    }

    /// Signed quantity (negative when short).
    #[must_use]
    pub const fn signed_qty(&self) -> Decimal {
        self.signed_qty
    }

    /// Absolute quantity.
    #[must_use]
    pub const fn quantity(&self) -> Quantity {
        self.quantity
    }

    /// Largest absolute quantity reached since opening.
    #[must_use]
    pub const fn peak_qty(&self) -> Quantity {
        self.peak_qty
    }

    /// Volume-weighted average opening price.
    #[must_use]
    pub const fn avg_px_open(&self) -> Decimal {
        self.avg_px_open
    }

    /// Volume-weighted average closing price.
    #[must_use]
    pub const fn avg_px_close(&self) -> Option<Decimal> {
        self.avg_px_close
    }

    /// Return on the closed portion.
    #[must_use]
    pub const fn realized_return(&self) -> Decimal {
        self.realized_return
    }

    /// Realized PnL net of settlement-currency commissions.
    #[must_use]
    pub const fn realized_pnl(&self) -> Option<&Money> {
        self.realized_pnl.as_ref()
    }

    /// Total bought quantity.
    #[must_use]
    pub const fn buy_qty(&self) -> Quantity {
        self.buy_qty
    }

    /// Total sold quantity.
    #[must_use]
    pub const fn sell_qty(&self) -> Quantity {
        self.sell_qty
    }

    /// Commission per currency.
    #[must_use]
    pub const fn commissions(&self) -> &BTreeMap<Currency, Money> {
        &self.commissions
    }

    /// Quote currency of the instrument.
    #[must_use]
    pub const fn quote_currency(&self) -> &Currency {
        &self.quote_currency
    }

    /// Currency PnL is settled in.
    #[must_use]
    pub const fn settlement_currency(&self) -> &Currency {
        &self.settlement_currency
    }

    /// Applied trade IDs.
    #[must_use]
    pub fn trade_ids(&self) -> &[TradeId] {
        &self.trade_ids
    }

    /// Applied fills since the position last opened.
    #[must_use]
    pub fn events(&self) -> &[OrderFilled] {
        &self.events
    }

    /// Number of applied fills.
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Client order IDs that contributed fills, in first-seen order.
    #[must_use]
    pub fn client_order_ids(&self) -> Vec<ClientOrderId> {
        let mut ids: Vec<ClientOrderId> = Vec::new();
        for fill in &self.events {
            if !ids.contains(&fill.header.client_order_id) {
                ids.push(fill.header.client_order_id.clone());
            }
        }
        ids
    }

    /// Quantity of the last fill.
    #[must_use]
    pub fn last_qty(&self) -> Option<Quantity> {
        self.events.last().map(|fill| fill.last_qty)
    }

    /// Price of the last fill.
    #[must_use]
    pub fn last_px(&self) -> Option<Price> {
        self.events.last().map(|fill| fill.last_px)
    }

    /// Last applied trade ID.
    #[must_use]
    pub fn last_trade_id(&self) -> Option<&TradeId> {
        self.trade_ids.last()
    }

    /// Creation timestamp of the opening fill.
    #[must_use]
    pub const fn ts_init(&self) -> Timestamp {
        self.ts_init
    }

    /// When the position (last) opened.
    #[must_use]
    pub const fn ts_opened(&self) -> Timestamp {
        self.ts_opened
    }

    /// Timestamp of the last fill.
    #[must_use]
    pub const fn ts_last(&self) -> Timestamp {
        self.ts_last
    }

    /// When the position closed.
    #[must_use]
    pub const fn ts_closed(&self) -> Option<Timestamp> {
        self.ts_closed
    }

    /// Time between opening and closing.
    #[must_use]
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.ts_closed.map(|closed| closed - self.ts_opened)
    }

    /// Long or short.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.side != PositionSide::Flat
    }

    /// Flat.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.side == PositionSide::Flat
    }

    /// Long.
    #[must_use]
    pub fn is_long(&self) -> bool {
        self.side == PositionSide::Long
    }

    /// Short.
    #[must_use]
    pub fn is_short(&self) -> bool {
        self.side == PositionSide::Short
    }

    /// Returns true if an order on `side` would reduce this position.
    #[must_use]
    pub fn is_opposite_side(&self, side: OrderSide) -> bool {
        self.entry != side
    }

    // ========================================================================
    // Fill Application
    // ========================================================================

    /// Apply a fill. A fill on a flat position starts a fresh history.
    ///
    /// # Errors
    ///
    /// Returns error if the fill's trade ID was already applied.
    pub fn apply(&mut self, fill: &OrderFilled) -> Result<(), DomainError> {
        if self.trade_ids.contains(&fill.trade_id) {
            return Err(DomainError::Duplicate {
                entity_type: "TradeId".to_string(),
                id: fill.trade_id.to_string(),
            });
        }

        if self.side == PositionSide::Flat {
            self.reset_history(fill);
        }

        self.events.push(fill.clone());
        self.trade_ids.push(fill.trade_id.clone());
        if let Some(commission) = &fill.commission {
            let total = self
                .commissions
                .entry(commission.currency().clone())
                .or_insert_with(|| Money::zero(commission.currency().clone()));
            if let Ok(sum) = total.checked_add(commission) {
                *total = sum;
            }
        }

        match fill.order_side {
            OrderSide::Buy => self.handle_buy_fill(fill),
            OrderSide::Sell => self.handle_sell_fill(fill),
        }

        self.quantity = Quantity::new(self.signed_qty.abs(), self.size_precision)
            .unwrap_or(self.quantity);
        if self.quantity > self.peak_qty {
            self.peak_qty = self.quantity;
        }

        if self.signed_qty > Decimal::ZERO {
            self.entry = OrderSide::Buy;
            self.side = PositionSide::Long;
        } else if self.signed_qty < Decimal::ZERO {
            self.entry = OrderSide::Sell;
            self.side = PositionSide::Short;
        } else {
            self.side = PositionSide::Flat;
            self.closing_order_id = Some(fill.header.client_order_id.clone());
            self.ts_closed = Some(fill.header.ts_event);
        }

        self.ts_last = fill.header.ts_event;
        Ok(())
    }

    /// Unrealized PnL at `last`.
    #[must_use]
    pub fn unrealized_pnl(&self, last: Price) -> Money {
        if self.side == PositionSide::Flat {
            return Money::zero(self.settlement_currency.clone());
        }
        let pnl = self.pnl_raw(self.avg_px_open, last.as_decimal(), self.quantity.as_decimal());
        Money::new(pnl, self.settlement_currency.clone())
    }

    /// Realized plus unrealized PnL at `last`.
    #[must_use]
    pub fn total_pnl(&self, last: Price) -> Money {
        let realized = self.realized_pnl.as_ref().map_or(Decimal::ZERO, Money::amount);
        Money::new(
            realized + self.unrealized_pnl(last).amount(),
            self.settlement_currency.clone(),
        )
    }

    // ========================================================================
    // Private Helpers
    // ========================================================================

    fn reset_history(&mut self, fill: &OrderFilled) {
        let zero = Quantity::zero(self.size_precision);
        self.events.clear();
        self.trade_ids.clear();
        self.buy_qty = zero;
        self.sell_qty = zero;
        self.commissions.clear();
        self.opening_order_id = fill.header.client_order_id.clone();
        self.closing_order_id = None;
        self.peak_qty = zero;
        self.ts_init = fill.header.ts_init;
        self.ts_opened = fill.header.ts_event;
        self.ts_closed = None;
        self.avg_px_open = fill.last_px.as_decimal();
        self.avg_px_close = None;
        self.realized_return = Decimal::ZERO;
        self.realized_pnl = None;
    }

    fn commission_charge(&self, fill: &OrderFilled) -> Decimal {
        fill.commission
            .as_ref()
            .filter(|c| c.currency() == &self.settlement_currency)
            .map_or(Decimal::ZERO, |c| -c.amount())
    }

    fn handle_buy_fill(&mut self, fill: &OrderFilled) {
        let mut realized = self.commission_charge(fill);
        let last_px = fill.last_px.as_decimal();
        let last_qty = fill.last_qty.as_decimal();

        if self.signed_qty > Decimal::ZERO {
            self.avg_px_open = self.avg_px_open_after(last_px, last_qty);
        } else if self.signed_qty < Decimal::ZERO {
            let avg_px_close = self.avg_px_close_after(last_px, last_qty);
            self.avg_px_close = Some(avg_px_close);
            self.realized_return = self.return_of(self.avg_px_open, avg_px_close);
            realized += self.pnl_raw(self.avg_px_open, last_px, last_qty);
        }

        self.add_realized(realized);
        self.signed_qty += last_qty;
        self.buy_qty += fill.last_qty;
    }

    fn handle_sell_fill(&mut self, fill: &OrderFilled) {
        let mut realized = self.commission_charge(fill);
        let last_px = fill.last_px.as_decimal();
        let last_qty = fill.last_qty.as_decimal();

        if self.signed_qty < Decimal::ZERO {
            self.avg_px_open = self.avg_px_open_after(last_px, last_qty);
        } else if self.signed_qty > Decimal::ZERO {
            let avg_px_close = self.avg_px_close_after(last_px, last_qty);
            self.avg_px_close = Some(avg_px_close);
            self.realized_return = self.return_of(self.avg_px_open, avg_px_close);
            realized += self.pnl_raw(self.avg_px_open, last_px, last_qty);
        }

        self.add_realized(realized);
        self.signed_qty -= last_qty;
        self.sell_qty += fill.last_qty;
    }

    fn add_realized(&mut self, amount: Decimal) {
        let total = self
            .realized_pnl
            .as_ref()
            .map_or(Decimal::ZERO, Money::amount)
            + amount;
        self.realized_pnl = Some(Money::new(total, self.settlement_currency.clone()));
    }

    fn avg_px(qty: Decimal, avg_px: Decimal, last_px: Decimal, last_qty: Decimal) -> Decimal {
        let total = qty + last_qty;
        if total.is_zero() {
            return last_px;
        }
        (avg_px * qty + last_px * last_qty) / total
    }

    fn avg_px_open_after(&self, last_px: Decimal, last_qty: Decimal) -> Decimal {
        Self::avg_px(self.quantity.as_decimal(), self.avg_px_open, last_px, last_qty)
    }

    fn avg_px_close_after(&self, last_px: Decimal, last_qty: Decimal) -> Decimal {
        let Some(avg_px_close) = self.avg_px_close else {
            return last_px;
        };
        let closing_qty = if self.side == PositionSide::Long {
            self.sell_qty
        } else {
            self.buy_qty
        };
        Self::avg_px(closing_qty.as_decimal(), avg_px_close, last_px, last_qty)
    }

    fn points(&self, avg_px_open: Decimal, avg_px_close: Decimal) -> Decimal {
        match self.side {
            PositionSide::Long => avg_px_close - avg_px_open,
            PositionSide::Short => avg_px_open - avg_px_close,
            PositionSide::Flat => Decimal::ZERO,
        }
    }

    fn return_of(&self, avg_px_open: Decimal, avg_px_close: Decimal) -> Decimal {
        if avg_px_open.is_zero() {
            return Decimal::ZERO;
        }
        self.points(avg_px_open, avg_px_close) / avg_px_open
    }

    fn pnl_raw(&self, avg_px_open: Decimal, avg_px_close: Decimal, quantity: Decimal) -> Decimal {
        let quantity = quantity.min(self.signed_qty.abs());
        quantity * self.multiplier * self.points(avg_px_open, avg_px_close)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order_execution::events::OrderEventHeader;
    use crate::domain::order_execution::value_objects::{LiquiditySide, OrderType};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn audusd() -> Instrument {
        Instrument::new(InstrumentId::new("AUD/USD.SIM"), 5, 0, Currency::new("USD")).unwrap()
    }

    fn make_fill(order: &str, trade: &str, side: OrderSide, qty: u64, px: &str) -> OrderFilled {
        OrderFilled {
            header: OrderEventHeader::new(
                TraderId::new("TESTER-000"),
                StrategyId::new("S-001"),
                InstrumentId::new("AUD/USD.SIM"),
                ClientOrderId::new(order),
                Utc::now(),
            )
            .with_account_id(AccountId::new("SIM-001")),
            trade_id: TradeId::new(trade),
            position_id: Some(PositionId::new("P-1")),
            order_side: side,
            order_type: OrderType::Market,
            last_qty: Quantity::from_u64(qty),
            last_px: px.parse().unwrap(),
            currency: Currency::new("USD"),
            commission: Some(Money::new(dec!(2.00), Currency::new("USD"))),
            liquidity_side: LiquiditySide::Taker,
        }
    }

    #[test]
    fn open_long_position() {
        let fill = make_fill("O-1", "T-1", OrderSide::Buy, 100_000, "1.00001");
        let position = Position::new(&audusd(), &fill).unwrap();

        assert!(position.is_long());
        assert_eq!(position.quantity(), Quantity::from_u64(100_000));
        assert_eq!(position.peak_qty(), Quantity::from_u64(100_000));
        assert_eq!(position.avg_px_open(), dec!(1.00001));
        assert_eq!(position.realized_pnl().unwrap().amount(), dec!(-2.00));
        assert_eq!(position.entry(), OrderSide::Buy);
        assert_eq!(position.opening_order_id().as_str(), "O-1");
    }

    #[test]
    fn close_long_position_realizes_pnl() {
        let mut position = Position::new(
            &audusd(),
            &make_fill("O-1", "T-1", OrderSide::Buy, 100_000, "1.00000"),
        )
        .unwrap();
        position
            .apply(&make_fill("O-2", "T-2", OrderSide::Sell, 100_000, "1.00010"))
            .unwrap();

        assert!(position.is_closed());
        assert_eq!(position.signed_qty(), Decimal::ZERO);
        assert_eq!(position.avg_px_close(), Some(dec!(1.00010)));
        // 100_000 * 0.0001 = 10, minus two commissions of 2
        assert_eq!(position.realized_pnl().unwrap().amount(), dec!(6.00000));
        assert_eq!(position.closing_order_id().unwrap().as_str(), "O-2");
        assert!(position.duration().is_some());
        assert_eq!(position.commissions()[&Currency::new("USD")].amount(), dec!(4.00));
    }

    #[test]
    fn duplicate_trade_is_rejected() {
        let fill = make_fill("O-1", "T-1", OrderSide::Buy, 10, "1.0");
        let mut position = Position::new(&audusd(), &fill).unwrap();
        assert!(position.apply(&fill).is_err());
        assert_eq!(position.event_count(), 1);
    }

    #[test]
    fn fill_on_flat_position_resets_history() {
        let mut position = Position::new(
            &audusd(),
            &make_fill("O-1", "T-1", OrderSide::Buy, 10, "1.0"),
        )
        .unwrap();
        position
            .apply(&make_fill("O-2", "T-2", OrderSide::Sell, 10, "1.1"))
            .unwrap();
        position
            .apply(&make_fill("O-3", "T-3", OrderSide::Sell, 5, "1.2"))
            .unwrap();

        assert!(position.is_short());
        assert_eq!(position.event_count(), 1);
        assert_eq!(position.opening_order_id().as_str(), "O-3");
        assert!(position.ts_closed().is_none());
        assert_eq!(position.avg_px_close(), None);
    }

    #[test]
    fn unrealized_pnl_for_short() {
        let position = Position::new(
            &audusd(),
            &make_fill("O-1", "T-1", OrderSide::Sell, 100, "1.00000"),
        )
        .unwrap();
        let pnl = position.unrealized_pnl("0.99000".parse().unwrap());
        assert_eq!(pnl.amount(), dec!(1.00000));
        assert_eq!(
            position.total_pnl("0.99000".parse().unwrap()).amount(),
            dec!(-1.00000)
        );
    }

    #[test]
    fn fill_without_position_id_cannot_open() {
        let mut fill = make_fill("O-1", "T-1", OrderSide::Buy, 10, "1.0");
        fill.position_id = None;
        assert!(Position::new(&audusd(), &fill).is_err());
    }
}

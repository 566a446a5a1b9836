//! TWAP Schedule
//!
//! Splits a quantity into equal slices, one per interval, rounded down to the
//! instrument's size precision. The remainder rides on the final slice.

use std::collections::VecDeque;

use rust_decimal::{Decimal, RoundingStrategy};

use crate::domain::execution_tactics::errors::TacticError;
use crate::domain::execution_tactics::value_objects::TwapParams;
use crate::domain::shared::Quantity;

/// Remaining slice sizes of a TWAP execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TwapSchedule {
    params: TwapParams,
    sizes: VecDeque<Quantity>,
}

impl TwapSchedule {
    /// Build the schedule for `quantity`.
    ///
    /// # Errors
    ///
    /// Returns error if a slice would round down to zero.
    pub fn new(
        quantity: Quantity,
        size_precision: u8,
        params: TwapParams,
    ) -> Result<Self, TacticError> {
        let num_intervals = params.num_intervals().max(1);
        let per_slice = (quantity.as_decimal() / Decimal::from(num_intervals))
            .round_dp_with_strategy(u32::from(size_precision), RoundingStrategy::ToZero);
        if per_slice <= Decimal::ZERO {
            return Err(TacticError::InvalidSliceQuantity {
                quantity: per_slice.to_string(),
            });
        }

        let slice = Self::make_qty(per_slice, size_precision)?;
        let mut sizes: VecDeque<Quantity> = (0..num_intervals).map(|_| slice).collect();
        let remainder = quantity.as_decimal() - per_slice * Decimal::from(num_intervals);
        if remainder > Decimal::ZERO {
            if let Some(last) = sizes.back_mut() {
                *last = Self::make_qty(last.as_decimal() + remainder, size_precision)?;
            }
        }

        Ok(Self { params, sizes })
    }

    /// Parameters the schedule was built from.
    #[must_use]
    pub const fn params(&self) -> &TwapParams {
        &self.params
    }

    /// Slices not yet taken.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.sizes.len()
    }

    /// Returns true once every slice has been taken.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.sizes.is_empty()
    }

    /// Take the next slice. The flag is true when it is the final slice.
    pub fn next_slice(&mut self) -> Option<(Quantity, bool)> {
        let size = self.sizes.pop_front()?;
        Some((size, self.sizes.is_empty()))
    }

    /// Drop every remaining slice.
    pub fn clear(&mut self) {
        self.sizes.clear();
    }

    fn make_qty(value: Decimal, precision: u8) -> Result<Quantity, TacticError> {
        Quantity::new(value, precision).map_err(|_| TacticError::InvalidSliceQuantity {
            quantity: value.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::time::Duration;

    fn make_params(horizon_secs: u64, interval_secs: u64) -> TwapParams {
        TwapParams::new(
            Duration::from_secs(horizon_secs),
            Duration::from_secs(interval_secs),
        )
        .unwrap()
    }

    #[test]
    fn even_split() {
        let mut schedule =
            TwapSchedule::new(Quantity::from_u64(100), 0, make_params(2, 1)).unwrap();
        assert_eq!(schedule.remaining(), 2);
        assert_eq!(schedule.next_slice(), Some((Quantity::from_u64(50), false)));
        assert_eq!(schedule.next_slice(), Some((Quantity::from_u64(50), true)));
        assert!(schedule.is_complete());
        assert_eq!(schedule.next_slice(), None);
    }

    #[test]
    fn remainder_goes_to_final_slice() {
        let mut schedule =
            TwapSchedule::new(Quantity::from_u64(100), 0, make_params(3, 1)).unwrap();
        let sizes: Vec<Decimal> = std::iter::from_fn(|| schedule.next_slice())
            .map(|(qty, _)| qty.as_decimal())
            .collect();
        assert_eq!(sizes, vec![dec!(33), dec!(33), dec!(34)]);
    }

    #[test]
    fn too_small_to_slice() {
        let result = TwapSchedule::new(Quantity::from_u64(1), 0, make_params(3, 1));
        assert!(matches!(
            result,
            Err(TacticError::InvalidSliceQuantity { .. })
        ));
    }

    #[test]
    fn clear_stops_schedule() {
        let mut schedule =
            TwapSchedule::new(Quantity::from_u64(100), 0, make_params(4, 1)).unwrap();
        schedule.next_slice();
        schedule.clear();
        assert!(schedule.is_complete());
    }
}

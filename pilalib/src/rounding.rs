//! Округления по Декрету 1990 от 2016 г.
//!
//! - IBC: вверх до целого песо;
//! - взносы: вверх до ближайших 100 песо.
//!
//! Отрицательное или отсутствующее значение даёт 0.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// IBC: потолок до целого песо. `1234.01 -> 1235`, `1234.00 -> 1234`.
pub fn round_base(value: impl Into<Option<Decimal>>) -> i64 {
    match value.into() {
        Some(v) if v > Decimal::ZERO => v.ceil().to_i64().unwrap_or(i64::MAX),
        _ => 0,
    }
}

/// Взнос: потолок до кратного 100. `899470 -> 899500`, `100000 -> 100000`.
pub fn round_contribution(value: impl Into<Option<Decimal>>) -> i64 {
    match value.into() {
        Some(v) if v > Decimal::ZERO => {
            let hundreds = (v / Decimal::ONE_HUNDRED).ceil();
            (hundreds * Decimal::ONE_HUNDRED)
                .to_i64()
                .unwrap_or(i64::MAX)
        }
        _ => 0,
    }
}

/// Промежуточные суммы до сотых, половина от нуля.
pub(crate) fn to_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// `base × rate`, приведённое к сотым.
pub(crate) fn percent_of(base: Decimal, rate: Decimal) -> Decimal {
    to_cents(base * rate)
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn pesos() -> impl Strategy<Value = Decimal> {
        // до ~10^10 песо с копейками
        (0i64..1_000_000_000_000).prop_map(|cents| Decimal::new(cents, 2))
    }

    proptest! {
        #[test]
        fn base_is_ceiling(x in pesos()) {
            let r = Decimal::from(round_base(x));
            prop_assert!(r >= x);
            prop_assert!(r - x < Decimal::ONE);
        }

        #[test]
        fn contribution_is_next_hundred(x in pesos()) {
            let r = round_contribution(x);
            prop_assert_eq!(r % 100, 0);
            prop_assert!(Decimal::from(r) >= x);
            prop_assert!(Decimal::from(r) - x < Decimal::ONE_HUNDRED);
        }

        #[test]
        fn fixed_points_are_stable(x in pesos()) {
            let b = round_base(x);
            prop_assert_eq!(round_base(Decimal::from(b)), b);
            let c = round_contribution(x);
            prop_assert_eq!(round_contribution(Decimal::from(c)), c);
        }

        #[test]
        fn monotonic(x in pesos(), y in pesos()) {
            let (lo, hi) = if x <= y { (x, y) } else { (y, x) };
            prop_assert!(round_base(lo) <= round_base(hi));
            prop_assert!(round_contribution(lo) <= round_contribution(hi));
        }
    }
}

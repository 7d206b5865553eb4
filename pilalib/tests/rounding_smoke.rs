use pilalib::rounding::{round_base, round_contribution};
use rust_decimal::Decimal;
use std::str::FromStr;

fn d(s: &str) -> Decimal {
    Decimal::from_str(s).expect("decimal")
}

#[test]
fn base_rounds_up_to_whole_peso() {
    assert_eq!(round_base(d("1234.01")), 1235);
    assert_eq!(round_base(d("1234.00")), 1234);
    assert_eq!(round_base(d("866666.67")), 866667);
}

#[test]
fn contribution_rounds_up_to_hundred() {
    assert_eq!(round_contribution(d("899470")), 899500);
    assert_eq!(round_contribution(d("100000")), 100000);
    assert_eq!(round_contribution(d("10440")), 10500);
    assert_eq!(round_contribution(d("0.01")), 100);
}

#[test]
fn null_and_negative_are_zero() {
    assert_eq!(round_base(None::<Decimal>), 0);
    assert_eq!(round_contribution(None::<Decimal>), 0);
    assert_eq!(round_base(d("-5")), 0);
    assert_eq!(round_contribution(d("-150.5")), 0);
    assert_eq!(round_contribution(Decimal::ZERO), 0);
}

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

pub const SERVICE_FEE_RATE: Decimal = dec!(0.10);
pub const DISTANCE_RATE_PER_KM: Decimal = dec!(10);
pub const MIN_DELIVERY_FEE: Decimal = dec!(30.00);
pub const BAG_UNIT_PRICE: Decimal = dec!(3.50);
pub const DRIVER_COMMISSION_RATE: Decimal = dec!(0.20);

/// Round half up to two decimal places. Applied once per computed amount.
pub fn round_money(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}

pub fn service_fee(subtotal: Decimal) -> Decimal {
    round_money(subtotal * SERVICE_FEE_RATE)
}

pub fn distance_fee(distance_km: f64) -> Decimal {
    let km = Decimal::from_f64_retain(distance_km).unwrap_or_default();
    round_money(km * DISTANCE_RATE_PER_KM).max(MIN_DELIVERY_FEE)
}

pub fn bags_total(bag_count: u32) -> Decimal {
    round_money(Decimal::from(bag_count) * BAG_UNIT_PRICE)
}

pub fn order_total(
    subtotal: Decimal,
    service_fee: Decimal,
    delivery_fee: Decimal,
    bags_total: Decimal,
) -> Decimal {
    subtotal + service_fee + delivery_fee + bags_total
}

pub fn till_total_needed(till_amount: Decimal, bags_total: Decimal) -> Decimal {
    till_amount + bags_total
}

pub fn driver_payout(delivery_fee: Decimal) -> Decimal {
    round_money(delivery_fee * (Decimal::ONE - DRIVER_COMMISSION_RATE))
}

//! Order pricing: subtotal, tax and credit point redemption.
//!
//! One credit point is worth one cent. Redemption is capped at the order
//! total, so a quote's total never drops below zero.

use cinema_core::Money;
use serde::Serialize;

/// Default tax rate, in percent
pub const DEFAULT_TAX_PERCENT: u32 = 5;

/// Value of one credit point
pub const POINT_VALUE: Money = Money::from_cents(1);

/// Pricing summary shown before checkout
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuote {
    /// Price of one ticket before tax
    pub ticket_price: Money,
    /// Number of tickets
    pub seat_count: u32,
    /// Tax rate, in percent
    pub tax_percent: u32,
    /// `ticket_price * seat_count`
    pub subtotal: Money,
    /// Tax on the subtotal
    pub tax: Money,
    /// Points that will be debited from the payer
    pub redeemed_points: u64,
    /// What the redeemed points are worth
    pub points_value: Money,
    /// Amount due after redemption
    pub total: Money,
}

impl PriceQuote {
    /// Price an order of `seat_count` tickets
    ///
    /// # Examples
    ///
    /// ```
    /// use cinema_booking::pricing::PriceQuote;
    /// use cinema_core::Money;
    ///
    /// let quote = PriceQuote::compute(Money::from_cents(1910), 3, 5, 500, true);
    /// assert_eq!(quote.subtotal, Money::from_cents(5730));
    /// assert_eq!(quote.tax, Money::from_cents(287));
    /// assert_eq!(quote.redeemed_points, 500);
    /// assert_eq!(quote.total, Money::from_cents(5517));
    /// ```
    #[must_use]
    pub fn compute(
        ticket_price: Money,
        seat_count: u32,
        tax_percent: u32,
        available_points: u64,
        redeem: bool,
    ) -> Self {
        let subtotal = ticket_price.saturating_multiply(seat_count);
        let tax = subtotal.percent_of(tax_percent);
        let gross = subtotal.saturating_add(tax);

        let redeemed_points = if redeem {
            available_points.min(gross.cents() / POINT_VALUE.cents())
        } else {
            0
        };
        let points_value = Money::from_cents(redeemed_points.saturating_mul(POINT_VALUE.cents()));

        Self {
            ticket_price,
            seat_count,
            tax_percent,
            subtotal,
            tax,
            redeemed_points,
            points_value,
            total: gross.saturating_sub(points_value),
        }
    }

    /// What a single ticket's payment charges: its price plus its tax
    #[must_use]
    pub fn per_seat_charge(&self) -> Money {
        self.ticket_price
            .saturating_add(self.ticket_price.percent_of(self.tax_percent))
    }

    /// Points left on the payer's balance after redemption
    #[must_use]
    pub const fn remaining_points(&self, available_points: u64) -> u64 {
        available_points.saturating_sub(self.redeemed_points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRICE: Money = Money::from_cents(1910);

    #[test]
    fn test_quote_without_redemption() {
        let quote = PriceQuote::compute(PRICE, 2, 5, 1_000, false);

        assert_eq!(quote.subtotal, Money::from_cents(3820));
        assert_eq!(quote.tax, Money::from_cents(191));
        assert_eq!(quote.redeemed_points, 0);
        assert_eq!(quote.total, Money::from_cents(4011));
    }

    #[test]
    fn test_redemption_capped_at_total() {
        let quote = PriceQuote::compute(PRICE, 1, 5, 100_000, true);

        assert_eq!(quote.redeemed_points, 2006);
        assert_eq!(quote.points_value, Money::from_cents(2006));
        assert_eq!(quote.total, Money::ZERO);
        assert_eq!(quote.remaining_points(100_000), 97_994);
    }

    #[test]
    fn test_per_seat_charge_includes_tax() {
        let quote = PriceQuote::compute(PRICE, 4, 5, 0, false);
        assert_eq!(quote.per_seat_charge(), Money::from_cents(2006));
    }

    #[test]
    fn test_empty_order() {
        let quote = PriceQuote::compute(PRICE, 0, 5, 300, true);

        assert_eq!(quote.total, Money::ZERO);
        assert_eq!(quote.redeemed_points, 0);
    }
}

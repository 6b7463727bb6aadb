//! Type-safe price representation using decimal arithmetic.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (e.g., pesos, not centavos).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// Apply a percentage discount, rounding half-up to two decimal places.
    ///
    /// Discounts above 100% are treated as 100%.
    #[must_use]
    pub fn discounted(self, percent: u8) -> Self {
        let percent = Decimal::from(percent.min(100));
        let factor = (Decimal::ONE_HUNDRED - percent) / Decimal::ONE_HUNDRED;
        Self {
            amount: (self.amount * factor)
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
            currency_code: self.currency_code,
        }
    }

    /// Format for display with thousands separators (e.g., "$1,299.00 MXN").
    #[must_use]
    pub fn display(&self) -> String {
        let rounded = self
            .amount
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        let text = format!("{:.2}", rounded.abs());
        let (whole, cents) = text.split_once('.').unwrap_or((text.as_str(), "00"));

        let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
        for (i, ch) in whole.chars().enumerate() {
            if i > 0 && (whole.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(ch);
        }

        let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
            "-"
        } else {
            ""
        };
        format!(
            "{sign}{}{grouped}.{cents} {}",
            self.currency_code.symbol(),
            self.currency_code.code()
        )
    }
}

/// ISO 4217 currency codes supported by the storefront.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    MXN,
    USD,
}

impl CurrencyCode {
    /// Currency symbol used in price labels.
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::MXN | Self::USD => "$",
        }
    }

    /// Three-letter ISO code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::MXN => "MXN",
            Self::USD => "USD",
        }
    }
}

impl std::str::FromStr for CurrencyCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "MXN" => Ok(Self::MXN),
            "USD" => Ok(Self::USD),
            _ => Err(format!("unsupported currency: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_groups_thousands() {
        let price = Price::new(Decimal::new(129_900, 2), CurrencyCode::MXN);
        assert_eq!(price.display(), "$1,299.00 MXN");

        let price = Price::new(Decimal::from(250), CurrencyCode::MXN);
        assert_eq!(price.display(), "$250.00 MXN");

        let price = Price::new(Decimal::from(1_000_000), CurrencyCode::USD);
        assert_eq!(price.display(), "$1,000,000.00 USD");
    }

    #[test]
    fn test_discounted() {
        let price = Price::new(Decimal::from(2000), CurrencyCode::MXN);
        assert_eq!(price.discounted(15).amount, Decimal::from(1700));
        assert_eq!(price.discounted(0).amount, Decimal::from(2000));
        assert_eq!(price.discounted(150).amount, Decimal::ZERO);

        let odd = Price::new(Decimal::new(999, 2), CurrencyCode::MXN);
        // 9.99 * 0.67 = 6.6933
        assert_eq!(odd.discounted(33).amount, Decimal::new(669, 2));
    }

    #[test]
    fn test_currency_from_str() {
        assert_eq!("mxn".parse::<CurrencyCode>().unwrap(), CurrencyCode::MXN);
        assert!("EUR".parse::<CurrencyCode>().is_err());
    }
}

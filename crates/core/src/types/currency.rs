//! Currency codes for wallet balances.
//!
//! Monetary amounts themselves are plain [`rust_decimal::Decimal`] values;
//! the wallet carries a `CurrencyCode` so a balance is never interpreted in
//! the wrong currency.

use serde::{Deserialize, Serialize};

/// ISO 4217 currency codes supported by the wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    USD,
    EUR,
    GBP,
    CAD,
    AUD,
}

impl CurrencyCode {
    /// The three-letter ISO code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::USD => "USD",
            Self::EUR => "EUR",
            Self::GBP => "GBP",
            Self::CAD => "CAD",
            Self::AUD => "AUD",
        }
    }

    /// Display symbol for formatting amounts.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::USD | Self::CAD | Self::AUD => "$",
            Self::EUR => "\u{20ac}",
            Self::GBP => "\u{a3}",
        }
    }
}

impl core::fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for CurrencyCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "USD" => Ok(Self::USD),
            "EUR" => Ok(Self::EUR),
            "GBP" => Ok(Self::GBP),
            "CAD" => Ok(Self::CAD),
            "AUD" => Ok(Self::AUD),
            _ => Err(format!("unsupported currency code: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_code_roundtrip() {
        for code in [
            CurrencyCode::USD,
            CurrencyCode::EUR,
            CurrencyCode::GBP,
            CurrencyCode::CAD,
            CurrencyCode::AUD,
        ] {
            assert_eq!(code.code().parse::<CurrencyCode>().unwrap(), code);
        }
    }

    #[test]
    fn test_unknown_code_rejected() {
        assert!("JPY".parse::<CurrencyCode>().is_err());
        assert!("usd".parse::<CurrencyCode>().is_err());
    }

    #[test]
    fn test_display_matches_code() {
        assert_eq!(CurrencyCode::USD.to_string(), "USD");
    }
}

//! [`Money`]-related definitions.

use std::{fmt, str::FromStr};

use rust_decimal::{prelude::ToPrimitive as _, Decimal};

use crate::define_kind;

/// Amount of money in some [`Currency`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Money {
    /// Amount of this [`Money`].
    pub amount: Decimal,

    /// [`Currency`] of this amount.
    pub currency: Currency,
}

impl Money {
    /// Indicates whether this [`Money`] is a strictly positive amount.
    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.amount > Decimal::ZERO
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self { amount, currency } = self;
        if amount.is_integer() {
            write!(f, "{}{currency}", amount.to_i128().expect("integer"))
        } else {
            write!(f, "{amount}{currency}")
        }
    }
}

impl FromStr for Money {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() < 4 {
            return Err("too short");
        }

        let (amount, currency) = s.split_at(s.len() - 3);
        let amount = Decimal::from_str(amount).map_err(|_| "invalid amount")?;
        let currency =
            Currency::from_str(currency).map_err(|_| "invalid currency")?;

        Ok(Self { amount, currency })
    }
}

define_kind! {
    #[doc = "Currency of a [`Money`] amount."]
    enum Currency {
        #[doc = "US Dollar."]
        Usd = 1,

        #[doc = "Euro."]
        Eur = 2,

        #[doc = "Japanese Yen."]
        Jpy = 3,

        #[doc = "South Korean Won."]
        Krw = 4,

        #[doc = "UAE Dirham."]
        Aed = 5,
    }
}

#[cfg(feature = "juniper")]
mod juniper {
    //! Module providing integration with [`juniper`] crate.

    use std::str::FromStr as _;

    use juniper::{graphql_scalar, InputValue, ScalarValue, Value};

    /// Money in `{major}.{minor}{currency}` format, where:
    /// - `major` is an integer;
    /// - `minor` is an optional integer;
    /// - `currency` is a three-letter currency code.
    #[graphql_scalar(with = Self, parse_token(String))]
    type Money = super::Money;

    impl Money {
        fn to_output<S: ScalarValue>(m: &Money) -> Value<S> {
            Value::scalar(m.to_string())
        }

        fn from_input<S: ScalarValue>(
            input: &InputValue<S>,
        ) -> Result<Self, String> {
            input
                .as_string_value()
                .ok_or_else(|| {
                    format!(
                        "Cannot parse `Money` input scalar from \
                         non-string value: {input}",
                    )
                })
                .and_then(|s| {
                    Self::from_str(s).map_err(|e| {
                        format!("Cannot parse `Money` input scalar: {e}")
                    })
                })
        }
    }
}

#[cfg(test)]
mod spec {
    use std::str::FromStr as _;

    use rust_decimal::Decimal;

    use super::{Currency, Money};

    fn decimal(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn from_str() {
        assert_eq!(
            Money::from_str("18500.50USD").unwrap(),
            Money {
                amount: decimal("18500.50"),
                currency: Currency::Usd,
            },
        );
        assert_eq!(
            Money::from_str("2450000JPY").unwrap(),
            Money {
                amount: decimal("2450000"),
                currency: Currency::Jpy,
            },
        );
        assert_eq!(
            Money::from_str("31000000KRW").unwrap(),
            Money {
                amount: decimal("31000000"),
                currency: Currency::Krw,
            },
        );

        assert!(Money::from_str("1200").is_err());
        assert!(Money::from_str("1200Us").is_err());
        assert!(Money::from_str("1200Dirham").is_err());
        assert!(Money::from_str("USD").is_err());

        assert!(Money::from_str("1200.00AED").is_ok());
        assert!(Money::from_str("1200EUR").is_ok());
    }

    #[test]
    fn to_string_drops_zero_fraction() {
        assert_eq!(
            Money {
                amount: decimal("4300.75"),
                currency: Currency::Eur,
            }
            .to_string(),
            "4300.75EUR",
        );
        assert_eq!(
            Money {
                amount: decimal("4300.00"),
                currency: Currency::Eur,
            }
            .to_string(),
            "4300EUR",
        );
    }

    #[test]
    fn positivity() {
        assert!(Money::from_str("0.01USD").unwrap().is_positive());
        assert!(!Money::from_str("0USD").unwrap().is_positive());
        assert!(!Money::from_str("-15USD").unwrap().is_positive());
    }
}

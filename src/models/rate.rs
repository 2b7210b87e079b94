//! Rate record data structure.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One bank's currently listed deposit offer.
///
/// `bank_name` is the natural key: two records with the same bank name
/// describe the same offer, whatever their other fields say.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RateRecord {
    /// Bank display name (the key)
    pub bank_name: String,

    /// Deposit product label, empty when the card had none
    #[serde(default)]
    pub deposit_name: String,

    /// Annual percentage rate; zero means the rate could not be read
    pub rate: Decimal,
}

impl RateRecord {
    pub fn new(bank_name: impl Into<String>, deposit_name: impl Into<String>, rate: Decimal) -> Self {
        Self {
            bank_name: bank_name.into(),
            deposit_name: deposit_name.into(),
            rate,
        }
    }

    /// A record can be stored only with a bank name and a positive rate.
    pub fn is_valid(&self) -> bool {
        !self.bank_name.trim().is_empty() && self.rate > Decimal::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_validity() {
        assert!(RateRecord::new("Alpha Bank", "Saver", dec("7.5")).is_valid());
        assert!(RateRecord::new("Alpha Bank", "", dec("7.5")).is_valid());
        assert!(!RateRecord::new("", "Saver", dec("7.5")).is_valid());
        assert!(!RateRecord::new("Alpha Bank", "Saver", Decimal::ZERO).is_valid());
        assert!(!RateRecord::new("Alpha Bank", "Saver", dec("-1")).is_valid());
    }

    #[test]
    fn test_json_shape() {
        let record = RateRecord::new("Alpha Bank", "Saver", dec("7.50"));
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["bank_name"], "Alpha Bank");
        assert_eq!(json["rate"], "7.50");

        let back: RateRecord =
            serde_json::from_str(r#"{"bank_name":"Alpha Bank","rate":"7.5"}"#).unwrap();
        assert_eq!(back.deposit_name, "");
        assert_eq!(back.rate, dec("7.5"));
    }
}

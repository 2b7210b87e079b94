// src/services/parser.rs

//! Record parser.
//!
//! Recovers a [`RateRecord`] from the visible text of one listing card.
//! The card text carries no semantic tags, so structure comes from line
//! position and two cheap content signals: a percent sign and a currency
//! symbol.
//!
//! ## Fill order
//!
//! Non-empty trimmed lines are read top to bottom. Each line fills at most
//! one slot and the first matching rule wins:
//!
//! 1. **bank**: the bank slot is empty and the line has no percent sign
//!    and no currency symbol.
//! 2. **deposit**: the bank slot is filled, the deposit slot is empty and
//!    the line has no percent sign and no currency symbol.
//! 3. **rate**: the rate slot is empty and the line has a percent sign.
//!    The percent sign and all whitespace are removed and the rest is read
//!    as a decimal with either `.` or `,` as separator, rounded half away
//!    from zero to two places. A line that does not read as a positive
//!    number is skipped with a diagnostic.
//!
//! Scanning stops once all three slots are filled, so trailing lines such
//! as the projected income are never looked at.

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};

use crate::models::RateRecord;

const PERCENT: char = '%';

/// Decimal places a rate is kept at.
pub const RATE_SCALE: u32 = 2;

/// Currency symbols that mark an amount line.
const CURRENCY_SYMBOLS: [char; 5] = ['₽', '$', '€', '£', '¥'];

/// A percent line that could not be read as a rate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseDiagnostic {
    pub line: String,
    pub reason: String,
}

/// Parser output with the diagnostics recorded along the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCard {
    pub record: RateRecord,
    pub diagnostics: Vec<ParseDiagnostic>,
}

/// The three slots of a card, filled in the documented order.
#[derive(Debug, Default)]
struct CardSlots {
    bank: Option<String>,
    deposit: Option<String>,
    rate: Option<Decimal>,
}

#[derive(Debug, PartialEq, Eq)]
enum Progress {
    NeedMore,
    Complete,
}

impl CardSlots {
    fn is_complete(&self) -> bool {
        self.bank.is_some() && self.deposit.is_some() && self.rate.is_some()
    }

    fn feed(&mut self, line: &str, diagnostics: &mut Vec<ParseDiagnostic>) -> Progress {
        let has_percent = line.contains(PERCENT);
        let is_label = !has_percent && !line.contains(&CURRENCY_SYMBOLS[..]);

        if is_label && self.bank.is_none() {
            self.bank = Some(line.to_string());
        } else if is_label && self.deposit.is_none() {
            self.deposit = Some(line.to_string());
        } else if has_percent && self.rate.is_none() {
            match parse_rate(line) {
                Ok(rate) => self.rate = Some(rate),
                Err(reason) => diagnostics.push(ParseDiagnostic {
                    line: line.to_string(),
                    reason,
                }),
            }
        }

        if self.is_complete() {
            Progress::Complete
        } else {
            Progress::NeedMore
        }
    }

    fn into_record(self) -> RateRecord {
        RateRecord {
            bank_name: self.bank.unwrap_or_default(),
            deposit_name: self.deposit.unwrap_or_default(),
            rate: self.rate.unwrap_or(Decimal::ZERO),
        }
    }
}

/// Read a percent line such as `"6,25 %"` as a decimal rate.
pub fn parse_rate(line: &str) -> Result<Decimal, String> {
    let cleaned: String = line
        .chars()
        .filter(|c| *c != PERCENT && !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect();

    let rate = Decimal::from_str(&cleaned)
        .map_err(|e| format!("'{cleaned}' is not a number: {e}"))?
        .round_dp_with_strategy(RATE_SCALE, RoundingStrategy::MidpointAwayFromZero);
    if rate <= Decimal::ZERO {
        return Err(format!("'{cleaned}' is not a positive rate"));
    }
    Ok(rate)
}

/// Parse one card, keeping the diagnostics.
pub fn parse_card(raw: &str) -> ParsedCard {
    let mut slots = CardSlots::default();
    let mut diagnostics = Vec::new();

    for line in raw.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if slots.feed(line, &mut diagnostics) == Progress::Complete {
            break;
        }
    }

    ParsedCard {
        record: slots.into_record(),
        diagnostics,
    }
}

/// Parse one card, logging any diagnostics.
pub fn parse(raw: &str) -> RateRecord {
    let parsed = parse_card(raw);
    for diagnostic in &parsed.diagnostics {
        log::warn!(
            "Skipped rate line '{}' for bank '{}': {}",
            diagnostic.line,
            parsed.record.bank_name,
            diagnostic.reason
        );
    }
    parsed.record
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_bank_deposit_rate_in_order() {
        let record = parse("Alpha Bank\nSaver\n7.5%\nextra line\n100 000 ₽");
        assert_eq!(record, RateRecord::new("Alpha Bank", "Saver", dec("7.5")));
    }

    #[test]
    fn test_comma_separator_and_income_line() {
        let record = parse("Gamma Bank\n\nPremium Saver\n6,25%\n1 234 ₽");
        assert_eq!(record.bank_name, "Gamma Bank");
        assert_eq!(record.deposit_name, "Premium Saver");
        assert_eq!(record.rate, dec("6.25"));
    }

    #[test]
    fn test_lines_are_trimmed_and_blank_lines_skipped() {
        let record = parse("\n   \n  Delta Bank  \n\n\t\n  Flex  \n  9 %  ");
        assert_eq!(record, RateRecord::new("Delta Bank", "Flex", dec("9")));
    }

    #[test]
    fn test_stops_after_all_slots_filled() {
        // Lines after the rate are never read.
        let parsed = parse_card("Alpha Bank\nSaver\n7.5%\n8.0%\nnot a number %");
        assert_eq!(parsed.record.rate, dec("7.5"));
        assert!(parsed.diagnostics.is_empty());
    }

    #[test]
    fn test_no_bank_line() {
        let record = parse("7.5%\n1 000 ₽");
        assert_eq!(record.bank_name, "");
        assert_eq!(record.rate, dec("7.5"));
        assert!(!record.is_valid());
    }

    #[test]
    fn test_rate_failure_records_diagnostic_and_continues() {
        let parsed = parse_card("Alpha Bank\nSaver\nup to 8%\n7,10 %");
        assert_eq!(parsed.record.rate, dec("7.10"));
        assert_eq!(parsed.diagnostics.len(), 1);
        assert_eq!(parsed.diagnostics[0].line, "up to 8%");
    }

    #[test]
    fn test_every_rate_line_fails() {
        let parsed = parse_card("Alpha Bank\nSaver\nhigh %\n0%");
        assert_eq!(parsed.record.rate, Decimal::ZERO);
        assert_eq!(parsed.diagnostics.len(), 2);
        assert!(!parsed.record.is_valid());
    }

    #[test]
    fn test_currency_lines_never_become_labels() {
        let record = parse("Alpha Bank\n500 000 ₽\nSaver\n7%");
        assert_eq!(record.deposit_name, "Saver");

        let record = parse("$ 1,000\nBeta Bank\nFlex\n9%");
        assert_eq!(record.bank_name, "Beta Bank");
    }

    #[test]
    fn test_rate_before_labels() {
        let record = parse("8%\nAlpha Bank\nSaver");
        assert_eq!(record, RateRecord::new("Alpha Bank", "Saver", dec("8")));
    }

    #[test]
    fn test_missing_deposit_line() {
        let record = parse("Alpha Bank\n7.5%\n1 000 ₽");
        assert_eq!(record.deposit_name, "");
        assert!(record.is_valid());
    }

    #[test]
    fn test_parse_rate_whitespace_variants() {
        assert_eq!(parse_rate("12,5\u{a0}%").unwrap(), dec("12.5"));
        assert_eq!(parse_rate(" 1 0 . 5 % ").unwrap(), dec("10.5"));
        assert!(parse_rate("%").is_err());
        assert!(parse_rate("-3%").is_err());
    }

    #[test]
    fn test_parse_rate_rounds_to_two_places() {
        assert_eq!(parse_rate("6.125%").unwrap(), dec("6.13"));
        assert_eq!(parse_rate("7,504 %").unwrap(), dec("7.50"));
        assert_eq!(parse_rate("7.5%").unwrap(), dec("7.5"));
        assert!(parse_rate("0.004%").is_err());
    }
}

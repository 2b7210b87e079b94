// src/notify/format.rs

//! Message formatter.
//!
//! Renders change events and the digest as chat messages. Change messages
//! are plain text. The digest is a table written in Telegram MarkdownV2:
//! every table line is escaped, bank and deposit names included, so the
//! only live markup is the bold title.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::models::{ChangeEvent, RateRecord};
use crate::services::parser::RATE_SCALE;

/// Characters with markup meaning in the channel's markdown dialect.
const MARKDOWN_SPECIAL: &[char] = &[
    '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
];

/// Render a rate with exactly two decimal places.
pub fn format_rate(rate: Decimal) -> String {
    let mut rounded = rate.round_dp_with_strategy(RATE_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(RATE_SCALE);
    rounded.to_string()
}

pub fn format_added(record: &RateRecord) -> String {
    format!(
        "Bank added: {} at rate {}%",
        record.bank_name,
        format_rate(record.rate)
    )
}

pub fn format_changed(record: &RateRecord, previous_rate: Decimal) -> String {
    format!(
        "Rate change at {}: was {}% → now {}%",
        record.bank_name,
        format_rate(previous_rate),
        format_rate(record.rate)
    )
}

/// Message for one change event.
pub fn format_event(event: &ChangeEvent) -> String {
    match event {
        ChangeEvent::Added { record } => format_added(record),
        ChangeEvent::Changed {
            record,
            previous_rate,
        } => format_changed(record, *previous_rate),
    }
}

/// Digest of every stored record, or `None` when there is nothing to report.
pub fn format_digest(records: &[RateRecord]) -> Option<String> {
    if records.is_empty() {
        return None;
    }

    let mut msg = String::from("*Deposit rate digest*\n\n");
    push_escaped_line(&mut msg, "| Bank | Deposit | Rate |");
    push_escaped_line(&mut msg, "|------|---------|------|");
    for record in records {
        let row = format!(
            "| {} | {} | {}% |",
            record.bank_name,
            record.deposit_name,
            format_rate(record.rate)
        );
        push_escaped_line(&mut msg, &row);
    }
    msg.push_str(&format!("\nTotal banks: {}", records.len()));
    Some(msg)
}

fn push_escaped_line(msg: &mut String, line: &str) {
    msg.push_str(&escape_markdown(line));
    msg.push('\n');
}

/// Prefix every markup character with a backslash.
pub fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if MARKDOWN_SPECIAL.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(bank: &str, deposit: &str, rate: &str) -> RateRecord {
        RateRecord::new(bank, deposit, rate.parse().unwrap())
    }

    #[test]
    fn test_format_rate_two_places() {
        assert_eq!(format_rate("7.5".parse().unwrap()), "7.50");
        assert_eq!(format_rate("9".parse().unwrap()), "9.00");
        assert_eq!(format_rate("6.125".parse().unwrap()), "6.13");
    }

    #[test]
    fn test_format_added() {
        let msg = format_added(&record("Beta Bank", "Flex", "9.0"));
        assert_eq!(msg, "Bank added: Beta Bank at rate 9.00%");
    }

    #[test]
    fn test_format_changed() {
        let msg = format_changed(&record("Alpha Bank", "Saver", "8.0"), "7.5".parse().unwrap());
        assert_eq!(msg, "Rate change at Alpha Bank: was 7.50% → now 8.00%");
    }

    #[test]
    fn test_format_event_dispatches_on_kind() {
        let added = ChangeEvent::Added {
            record: record("Beta Bank", "Flex", "9"),
        };
        assert!(format_event(&added).starts_with("Bank added"));

        let changed = ChangeEvent::Changed {
            record: record("Alpha Bank", "Saver", "8"),
            previous_rate: "7.5".parse().unwrap(),
        };
        assert!(format_event(&changed).starts_with("Rate change"));
    }

    #[test]
    fn test_format_digest_empty() {
        assert_eq!(format_digest(&[]), None);
    }

    #[test]
    fn test_format_digest_lists_every_record() {
        let records = vec![
            record("Alpha Bank", "Saver", "7.5"),
            record("Beta Bank", "Flex", "9"),
            record("Gamma Bank", "Premium Saver", "6.25"),
        ];
        let msg = format_digest(&records).unwrap();

        for (bank, rate) in [("Alpha Bank", "7.50"), ("Beta Bank", "9.00"), ("Gamma Bank", "6.25")] {
            let rate = escape_markdown(rate);
            assert!(msg.contains(bank), "missing {bank}");
            assert!(msg.contains(&format!("{rate}%")), "missing {rate}");
        }
        assert!(msg.ends_with("Total banks: 3"));
    }

    #[test]
    fn test_format_digest_escapes_names() {
        let records = vec![record("A-Bank (Moscow)", "Save_More!", "7")];
        let msg = format_digest(&records).unwrap();
        assert!(msg.contains(r"\| A\-Bank \(Moscow\) \| Save\_More\! \| 7\.00% \|"));
    }

    #[test]
    fn test_format_digest_is_valid_markdown_v2() {
        let records = vec![record("Alpha Bank", "Saver", "7.5")];
        let msg = format_digest(&records).unwrap();
        assert_eq!(
            msg,
            concat!(
                "*Deposit rate digest*\n\n",
                r"\| Bank \| Deposit \| Rate \|", "\n",
                r"\|\-\-\-\-\-\-\|\-\-\-\-\-\-\-\-\-\|\-\-\-\-\-\-\|", "\n",
                r"\| Alpha Bank \| Saver \| 7\.50% \|", "\n",
                "\nTotal banks: 1",
            )
        );

        // Outside the bold title, every reserved character is escaped.
        let body = msg.trim_start_matches("*Deposit rate digest*");
        let mut chars = body.chars();
        while let Some(c) = chars.next() {
            if c == '\\' {
                chars.next();
            } else {
                assert!(!MARKDOWN_SPECIAL.contains(&c), "unescaped {c:?} in {body}");
            }
        }
    }

    #[test]
    fn test_escape_markdown() {
        assert_eq!(escape_markdown("plain text"), "plain text");
        assert_eq!(escape_markdown("a.b"), r"a\.b");
        assert_eq!(
            escape_markdown("_*[]()~`>#+-=|{}.!"),
            r"\_\*\[\]\(\)\~\`\>\#\+\-\=\|\{\}\.\!"
        );
        assert_eq!(escape_markdown(r"back\slash"), r"back\slash");
    }
}

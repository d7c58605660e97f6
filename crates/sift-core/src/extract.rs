//! Label extraction heuristics for unparsed bank messages
//!
//! Best-effort regex extraction over raw SMS/email text to pre-fill the
//! manual labeling form. Indian bank formats dominate the corpus: amounts
//! as `Rs.`, `INR`, `₹` or `Amt`, account masks as `A/c XX1234`, references
//! as UTR/TXN ids. Every function degrades to a neutral default; a message
//! these heuristics cannot read is exactly what the training queue is for.

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::models::{Direction, LabelForm, UNCATEGORIZED};

fn amount_re() -> Regex {
    Regex::new(r"(?i)(?:Rs\.?|INR|₹|Amt)\s*([\d,]+(?:\.\d{1,2})?)").expect("valid regex")
}

fn account_mask_re() -> Regex {
    Regex::new(r"(?i)(?:A/c|Acct|ending|XX|card)\s*(\d{3,4})").expect("valid regex")
}

fn ref_id_re() -> Regex {
    Regex::new(r"(?i)(?:Ref|UTR|TXN|ID)\s*:?\s*([A-Z0-9]{8,})").expect("valid regex")
}

fn credit_re() -> Regex {
    Regex::new(r"(?i)credit|received|deposit|incoming|refund").expect("valid regex")
}

/// Extract the first currency amount, 0.0 when none is found
///
/// Thousands separators are stripped; Indian grouping (1,23,456.78) parses
/// the same way since only the commas matter.
pub fn extract_amount(raw: &str) -> f64 {
    amount_re()
        .captures(raw)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().replace(',', "").parse().ok())
        .unwrap_or(0.0)
}

/// Extract the 3-4 digit account mask, empty when none is found
pub fn extract_account_mask(raw: &str) -> String {
    account_mask_re()
        .captures(raw)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// Extract the bank reference id (UTR/TXN), uppercase-normalized, empty
/// when none is found
pub fn extract_ref_id(raw: &str) -> String {
    ref_id_re()
        .captures(raw)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_uppercase())
        .unwrap_or_default()
}

/// Classify the money direction; anything not clearly incoming is a debit
pub fn extract_direction(raw: &str) -> Direction {
    if credit_re().is_match(raw) {
        Direction::Credit
    } else {
        Direction::Debit
    }
}

/// Compose a pre-filled labeling form for a raw message
///
/// `received_at` (when the message was queued) stands in for the
/// transaction date; the labeler corrects it if the message says otherwise.
pub fn suggest_label(raw: &str, received_at: DateTime<Utc>) -> LabelForm {
    LabelForm {
        amount: extract_amount(raw),
        date: received_at.naive_utc(),
        account_mask: extract_account_mask(raw),
        recipient: String::new(),
        description: String::new(),
        ref_id: extract_ref_id(raw),
        category: UNCATEGORIZED.to_string(),
        direction: extract_direction(raw),
        exclude_from_reports: false,
        generate_pattern: false,
    }
}

/// The variable spans (amount, account mask, reference id) the heuristics
/// matched in a raw message, as (start, end, generalized replacement),
/// sorted by position
fn variable_spans(raw: &str) -> Vec<(usize, usize, &'static str)> {
    let mut spans: Vec<(usize, usize, &'static str)> = Vec::new();

    if let Some(m) = amount_re().captures(raw).and_then(|c| c.get(1)) {
        spans.push((m.start(), m.end(), r"([\d,]+(?:\.\d{1,2})?)"));
    }
    if let Some(m) = account_mask_re().captures(raw).and_then(|c| c.get(1)) {
        spans.push((m.start(), m.end(), r"(\d{3,4})"));
    }
    if let Some(m) = ref_id_re().captures(raw).and_then(|c| c.get(1)) {
        spans.push((m.start(), m.end(), r"([A-Za-z0-9]{8,})"));
    }

    spans.sort_by_key(|s| s.0);
    spans
}

/// Derive a reusable extraction regex from a labeled message
///
/// The spans the heuristics matched (amount, account mask, reference id)
/// are generalized back into capture groups and everything else is escaped
/// literally. The result recognizes future messages from the same template.
pub fn derive_pattern(raw: &str) -> String {
    let mut pattern = String::new();
    let mut cursor = 0;
    for (start, end, replacement) in variable_spans(raw) {
        if start < cursor {
            // Two heuristics claimed overlapping text; first one wins
            continue;
        }
        pattern.push_str(&regex::escape(&raw[cursor..start]));
        pattern.push_str(replacement);
        cursor = end;
    }
    pattern.push_str(&regex::escape(&raw[cursor..]));
    pattern
}

/// Pick a suppression keyword for a raw message
///
/// Suppression rules match by substring, so the keyword is the longest
/// literal stretch between the variable spans: the fixed template text
/// identifies siblings while amounts and references vary. An empty result
/// means the message has no stable text worth keying a rule on.
pub fn suppression_keyword(raw: &str) -> String {
    let mut best = "";
    let mut cursor = 0;
    for (start, end, _) in variable_spans(raw) {
        if start < cursor {
            continue;
        }
        let segment = raw[cursor..start].trim();
        if segment.len() > best.len() {
            best = segment;
        }
        cursor = end;
    }
    let tail = raw[cursor..].trim();
    if tail.len() > best.len() {
        best = tail;
    }

    // A couple of characters would suppress half the inbox
    if best.len() < 4 {
        String::new()
    } else {
        best.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HDFC_DEBIT: &str =
        "Rs.1,250.00 debited from A/c XX3012 on 03-07-24 to VPA swiggy@ybl Ref 417233991812";
    const SBI_CREDIT: &str =
        "INR 15,000 credited to your Acct 4471 by NEFT UTR: SBIN0THX8291044";

    #[test]
    fn test_extract_amount_variants() {
        assert_eq!(extract_amount(HDFC_DEBIT), 1250.0);
        assert_eq!(extract_amount(SBI_CREDIT), 15000.0);
        assert_eq!(extract_amount("₹99.50 paid at BIGBAZAAR"), 99.5);
        assert_eq!(extract_amount("Amt 320 spent on card"), 320.0);
        assert_eq!(extract_amount("Your OTP is 4912"), 0.0);
    }

    #[test]
    fn test_extract_amount_indian_grouping() {
        assert_eq!(extract_amount("Rs. 1,23,456.78 transferred"), 123456.78);
    }

    #[test]
    fn test_extract_account_mask() {
        assert_eq!(extract_account_mask(HDFC_DEBIT), "3012");
        assert_eq!(extract_account_mask(SBI_CREDIT), "4471");
        assert_eq!(extract_account_mask("card ending 9921 used"), "9921");
        assert_eq!(extract_account_mask("no mask here"), "");
    }

    #[test]
    fn test_extract_ref_id() {
        assert_eq!(extract_ref_id(HDFC_DEBIT), "417233991812");
        assert_eq!(extract_ref_id(SBI_CREDIT), "SBIN0THX8291044");
        assert_eq!(extract_ref_id("Ref 123"), ""); // too short
        // Lowercase references normalize to uppercase
        assert_eq!(extract_ref_id("txn id: abc1234xyz99"), "ABC1234XYZ99");
    }

    #[test]
    fn test_extract_direction() {
        assert_eq!(extract_direction(HDFC_DEBIT), Direction::Debit);
        assert_eq!(extract_direction(SBI_CREDIT), Direction::Credit);
        assert_eq!(extract_direction("refund of Rs.200 processed"), Direction::Credit);
        assert_eq!(extract_direction("cash deposit received"), Direction::Credit);
    }

    #[test]
    fn test_suggest_label_composes_defaults() {
        let now = Utc::now();
        let form = suggest_label("Your OTP is 4912", now);
        assert_eq!(form.amount, 0.0);
        assert_eq!(form.account_mask, "");
        assert_eq!(form.ref_id, "");
        assert_eq!(form.direction, Direction::Debit);
        assert_eq!(form.category, UNCATEGORIZED);
    }

    #[test]
    fn test_derive_pattern_recognizes_siblings() {
        let pattern = derive_pattern(HDFC_DEBIT);
        let re = Regex::new(&pattern).unwrap();

        // The same template with different values still matches
        let sibling =
            "Rs.89.00 debited from A/c XX3012 on 03-07-24 to VPA swiggy@ybl Ref 900100200300";
        assert!(re.is_match(sibling));
        // A different template does not
        assert!(!re.is_match(SBI_CREDIT));
    }

    #[test]
    fn test_suppression_keyword_survives_varying_values() {
        let keyword = suppression_keyword(SBI_CREDIT);
        assert_eq!(keyword, "credited to your Acct");

        // A sibling with different values still contains the keyword
        let sibling = "INR 2,500 credited to your Acct 4471 by NEFT UTR: SBIN0ABC1102938";
        assert!(sibling.contains(&keyword));
    }

    #[test]
    fn test_suppression_keyword_rejects_short_remnants() {
        assert_eq!(suppression_keyword("Rs.100"), "");
        assert_eq!(suppression_keyword(""), "");
    }
}

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::errors::DomainError;

static NUMERIC_TOKEN: OnceLock<Regex> = OnceLock::new();

fn numeric_token() -> &'static Regex {
    NUMERIC_TOKEN.get_or_init(|| Regex::new(r"^[0-9]+(\.[0-9]+)?$").expect("numeric token pattern"))
}

/// Checks that `raw` looks like a `threshold:price` table, one entry per line.
///
/// Only the shape is checked here. A string can pass validation and still fail
/// [`CostTable::parse`], which splits entries on whitespace rather than newlines.
pub fn validate_costs_string(raw: &str) -> Result<(), DomainError> {
    let cleaned = raw.trim();
    if cleaned.is_empty() {
        return Err(DomainError::EmptyCostTable);
    }
    if !cleaned.contains(':') {
        return Err(DomainError::MissingSeparator);
    }

    let mut tokens: Vec<&str> = cleaned.split([':', '\n']).collect();
    // trailing empty tokens are not counted
    while tokens.last().is_some_and(|token| token.is_empty()) {
        tokens.pop();
    }

    if tokens.len() % 2 != 0 {
        return Err(DomainError::OddTokenCount { count: tokens.len() });
    }

    match tokens.iter().find(|token| !numeric_token().is_match(token.trim())) {
        Some(token) => Err(DomainError::InvalidToken { token: token.trim().to_string() }),
        None => Ok(()),
    }
}

pub fn is_valid_costs_string(raw: &str) -> bool {
    validate_costs_string(raw).is_ok()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WeightTier {
    pub threshold: Decimal,
    pub price: Decimal,
}

/// Weight thresholds mapped to prices, ordered by threshold.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CostTable {
    tiers: BTreeMap<Decimal, Decimal>,
}

impl CostTable {
    /// Parses whitespace-separated `threshold:price` entries. A threshold that appears
    /// more than once keeps the price of its last occurrence.
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let mut tiers = BTreeMap::new();

        for entry in raw.split_whitespace() {
            let mut parts = entry.split(':');
            let threshold = parts.next().unwrap_or_default();
            let price = parts
                .next()
                .ok_or_else(|| DomainError::MissingPrice { token: entry.to_string() })?;

            tiers.insert(parse_number(threshold)?, parse_number(price)?);
        }

        Ok(Self { tiers })
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    pub fn max_threshold(&self) -> Option<Decimal> {
        self.tiers.last_key_value().map(|(threshold, _)| *threshold)
    }

    /// Smallest threshold that is at least `weight`.
    pub fn weight_class_for(&self, weight: Decimal) -> Option<Decimal> {
        self.tiers.range(weight..).next().map(|(threshold, _)| *threshold)
    }

    pub fn cost_for(&self, weight: Decimal) -> Option<Decimal> {
        self.tiers.range(weight..).next().map(|(_, price)| *price)
    }

    pub fn tiers(&self) -> Vec<WeightTier> {
        self.tiers
            .iter()
            .map(|(threshold, price)| WeightTier { threshold: *threshold, price: *price })
            .collect()
    }
}

fn parse_number(value: &str) -> Result<Decimal, DomainError> {
    let value = value.trim();
    Decimal::from_str(value).map_err(|_| DomainError::InvalidNumber { value: value.to_string() })
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{is_valid_costs_string, validate_costs_string, CostTable};
    use crate::errors::DomainError;

    fn dec(value: i64) -> Decimal {
        Decimal::from(value)
    }

    #[test]
    fn accepts_newline_separated_entries() {
        assert!(is_valid_costs_string("1:5\n2:7\n5:10"));
        assert!(is_valid_costs_string("  0.5:4.25\n10:15.5\n  "));
        assert!(is_valid_costs_string("1 : 5\n2 : 7"));
    }

    #[test]
    fn rejects_empty_and_separatorless_tables() {
        assert_eq!(validate_costs_string("   \n "), Err(DomainError::EmptyCostTable));
        assert_eq!(validate_costs_string("15"), Err(DomainError::MissingSeparator));
    }

    #[test]
    fn rejects_odd_token_counts() {
        assert_eq!(validate_costs_string("1:5\n2"), Err(DomainError::OddTokenCount { count: 3 }));
    }

    #[test]
    fn rejects_comma_separated_entries() {
        assert!(matches!(
            validate_costs_string("1:5,2:7"),
            Err(DomainError::OddTokenCount { .. }) | Err(DomainError::InvalidToken { .. })
        ));
        assert!(!is_valid_costs_string("1:5,2:7"));
    }

    #[test]
    fn rejects_non_numeric_tokens() {
        assert_eq!(
            validate_costs_string("1:5\nheavy:7"),
            Err(DomainError::InvalidToken { token: "heavy".to_string() })
        );
        assert!(!is_valid_costs_string("1:5\n2:7abc"));
        assert!(!is_valid_costs_string("1:5\n2:..."));
        assert!(!is_valid_costs_string("1:5\n-2:7"));
        assert!(!is_valid_costs_string("1:5\n\n2:7"));
    }

    #[test]
    fn rejects_non_ascii_digits() {
        assert_eq!(
            validate_costs_string("١:٥"),
            Err(DomainError::InvalidToken { token: "١".to_string() })
        );
        assert!(CostTable::parse("١:٥").is_err());
    }

    #[test]
    fn trailing_separator_does_not_count_as_a_token() {
        assert!(is_valid_costs_string("1:5:"));
    }

    #[test]
    fn parses_tiers_in_threshold_order() {
        let table = CostTable::parse("5:10\n1:5\n2:7").expect("valid table");
        let thresholds: Vec<Decimal> = table.tiers().iter().map(|tier| tier.threshold).collect();

        assert_eq!(thresholds, vec![dec(1), dec(2), dec(5)]);
        assert_eq!(table.max_threshold(), Some(dec(5)));
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn later_duplicate_threshold_wins() {
        let table = CostTable::parse("1:5\n2:7\n1:9").expect("valid table");

        assert_eq!(table.len(), 2);
        assert_eq!(table.cost_for(dec(1)), Some(dec(9)));
    }

    #[test]
    fn selects_smallest_threshold_not_below_weight() {
        let table = CostTable::parse("1:5\n2:7\n5:10").expect("valid table");

        assert_eq!(table.weight_class_for(Decimal::new(5, 1)), Some(dec(1)));
        assert_eq!(table.weight_class_for(dec(1)), Some(dec(1)));
        assert_eq!(table.weight_class_for(dec(3)), Some(dec(5)));
        assert_eq!(table.cost_for(dec(3)), Some(dec(10)));
        assert_eq!(table.weight_class_for(dec(6)), None);
        assert_eq!(table.cost_for(dec(6)), None);
    }

    #[test]
    fn parse_reports_malformed_entries() {
        assert_eq!(
            CostTable::parse("1:5\n2"),
            Err(DomainError::MissingPrice { token: "2".to_string() })
        );
        assert_eq!(
            CostTable::parse("1:five"),
            Err(DomainError::InvalidNumber { value: "five".to_string() })
        );
    }

    #[test]
    fn spaced_entries_validate_but_do_not_parse() {
        assert!(is_valid_costs_string("1: 5"));
        assert!(CostTable::parse("1: 5").is_err());
    }

    #[test]
    fn blank_input_parses_to_an_empty_table() {
        let table = CostTable::parse("  ").expect("blank table");
        assert!(table.is_empty());
        assert_eq!(table.max_threshold(), None);
    }
}

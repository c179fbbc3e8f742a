//! Parser test suites
//!
//! Fixtures are shared with the integration tests under `tests/fixtures`.
//! Variations are produced by textual edits of a fixture, so every test
//! starts from a document known to parse.

pub mod legacy_tests;

use crate::error::ExtractionError;
use crate::models::{AwardNotice, MonetaryValue, ParseOutcome};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::str::FromStr;

pub const LEGACY: &str = include_str!("../../../tests/fixtures/legacy_award.txt");
pub const EARLY: &str = include_str!("../../../tests/fixtures/early_award.en");
pub const UNIFIED_R207: &str = include_str!("../../../tests/fixtures/unified_r207_award.xml");
pub const UNIFIED_R208: &str = include_str!("../../../tests/fixtures/unified_r208_award.xml");
pub const UNIFIED_R209: &str = include_str!("../../../tests/fixtures/unified_r209_award.xml");
pub const UBL: &str = include_str!("../../../tests/fixtures/ubl_award.xml");

/// Fixture with one fragment replaced; the fragment must be present
pub fn edit(fixture: &str, from: &str, to: &str) -> String {
    assert!(fixture.contains(from), "fixture does not contain {from:?}");
    fixture.replacen(from, to, 1)
}

pub fn expect_notice(result: Result<ParseOutcome, ExtractionError>) -> AwardNotice {
    match result {
        Ok(ParseOutcome::Document(notice)) => *notice,
        other => panic!("Expected a parsed notice, got {other:?}"),
    }
}

pub fn expect_error(result: Result<ParseOutcome, ExtractionError>) -> ExtractionError {
    match result {
        Err(err) => err,
        Ok(outcome) => panic!("Expected an extraction error, got {outcome:?}"),
    }
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub fn money(amount: &str, currency: &str) -> Option<MonetaryValue> {
    Some(MonetaryValue {
        amount: Decimal::from_str(amount).unwrap(),
        currency: Some(currency.to_string()),
    })
}

//! Legacy field-coded parser tests

use super::{LEGACY, date, edit, expect_error, expect_notice, money};
use crate::error::ExtractionError;
use crate::models::{Entity, NoticeFormat, ParseOutcome};
use crate::parsers::legacy::{parse, split_blocks};
use pretty_assertions::assert_eq;

#[test]
fn test_award_notice_fields() {
    let notice = expect_notice(parse(LEGACY, "legacy_award.txt"));

    let doc = &notice.document;
    assert_eq!(doc.identifier, "12345-2010");
    assert_eq!(doc.format, NoticeFormat::LegacyFieldCoded);
    assert_eq!(doc.publication_date, date(2010, 12, 20));
    assert_eq!(doc.dispatch_date, Some(date(2010, 12, 16)));
    assert_eq!(doc.document_type_code, "7");
    assert_eq!(doc.original_language.as_deref(), Some("EN"));
    assert_eq!(doc.source_country.as_deref(), Some("UK"));
    assert_eq!(doc.journal_reference.as_deref(), Some("2010/S 247-012345"));

    assert_eq!(notice.contracting_body.name, "City of Springfield");
    assert_eq!(notice.contracting_body.town.as_deref(), Some("Springfield"));

    let contract = &notice.contracts[0];
    assert_eq!(contract.title, "UK-Springfield: cleaning services");
    assert_eq!(contract.main_cpv_code.as_deref(), Some("90910000"));
    assert_eq!(contract.additional_cpv_codes, vec!["90911200".to_string()]);
    assert_eq!(contract.contract_nature_code.as_deref(), Some("4"));
    assert_eq!(contract.procedure_type_code.as_deref(), Some("1"));
    assert!(!contract.has_lots);

    let award = &contract.awards[0];
    assert!(award.awarded);
    assert_eq!(award.conclusion_date, Some(date(2010, 12, 15)));
    assert_eq!(award.tenders.received, Some(4));
    assert_eq!(award.awarded_value, money("123456.78", "EUR"));

    let (contractor, is_lead) = notice.award_contractors(award).next().unwrap();
    assert_eq!(contractor.name, "Acme Cleaning Ltd");
    assert_eq!(contractor.address.as_deref(), Some("1 High Street, Springfield"));
    assert_eq!(is_lead, None);
    assert!(notice.dropped.is_empty());
}

#[test]
fn test_other_document_types_are_filtered() {
    let prior = edit(LEGACY, "TD: 7 - Contract award", "TD: 3 - Prior information");
    assert_eq!(
        parse(&prior, "prior.txt").unwrap(),
        ParseOutcome::NotAnAwardNotice {
            format: NoticeFormat::LegacyFieldCoded,
            type_code: Some("3".to_string()),
        }
    );

    let untyped = edit(LEGACY, "TD: 7 - Contract award\n", "");
    assert!(matches!(
        parse(&untyped, "untyped.txt").unwrap(),
        ParseOutcome::NotAnAwardNotice { type_code: None, .. }
    ));
}

#[test]
fn test_missing_identifier_fails_document() {
    let text = edit(LEGACY, "ND: 12345-2010\n", "");
    let err = expect_error(parse(&text, "no_id.txt"));
    assert_eq!(
        err,
        ExtractionError::missing(NoticeFormat::LegacyFieldCoded, Entity::Document, "identifier")
    );
}

#[test]
fn test_conflicting_repeated_code_is_malformed() {
    let text = edit(LEGACY, "PD: 20101220\n", "PD: 20101220\nPD: 20101221\n");
    let err = expect_error(parse(&text, "twice.txt"));
    assert_eq!(err.offending_field().as_deref(), Some("document.PD"));
    assert_eq!(err.offending_raw_value(), Some("20101221"));
}

#[test]
fn test_bad_award_date_drops_award_and_fails_empty_notice() {
    let text = edit(LEGACY, "Date of award: 15.12.2010.", "Date of award: 31.02.2010");
    let err = expect_error(parse(&text, "bad_date.txt"));
    assert_eq!(err.offending_field().as_deref(), Some("award.conclusion_date"));
    assert_eq!(err.offending_raw_value(), Some("31.02.2010"));
}

#[test]
fn test_several_award_sections() {
    let text = format!(
        "{LEGACY}    Award of contract\n    Date of award: 20.12.2010\n    Contract value: EUR 5 000\n"
    );
    let notice = expect_notice(parse(&text, "two_awards.txt"));
    let awards: Vec<_> = notice.awards().collect();
    assert_eq!(awards.len(), 2);
    assert_eq!(awards[1].conclusion_date, Some(date(2010, 12, 20)));
    assert_eq!(awards[1].awarded_value, money("5000", "EUR"));
    assert!(awards[1].contractors.is_empty());
}

#[test]
fn test_unreadable_contract_value_is_reported_with_source_text() {
    let text = edit(LEGACY, "Contract value: 123 456,78 EUR", "Contract value: about 100k EUR");
    let err = expect_error(parse(&text, "value.txt"));
    assert_eq!(err.offending_field().as_deref(), Some("award.awarded_value"));
    assert_eq!(err.offending_raw_value(), Some("about 100k EUR"));
}

#[test]
fn test_ambiguous_thousands_separator_drops_award() {
    let text = edit(LEGACY, "Contract value: 123 456,78 EUR", "Contract value: EUR 16,425");
    let err = expect_error(parse(&text, "ambiguous.txt"));
    assert_eq!(err.offending_field().as_deref(), Some("award.awarded_value"));
    assert_eq!(err.offending_raw_value(), Some("EUR 16,425"));

    let text = format!(
        "{LEGACY}    Award of contract\n    Date of award: 20.12.2010\n    Contract value: EUR 16,425\n"
    );
    let notice = expect_notice(parse(&text, "two_awards.txt"));
    assert_eq!(notice.awards().count(), 1);
    assert_eq!(notice.dropped.len(), 1);
    assert_eq!(notice.dropped[0].offending_raw_value(), Some("EUR 16,425"));
}

#[test]
fn test_second_block_is_structural_corruption() {
    let text = format!("{LEGACY}\n{LEGACY}");
    let err = expect_error(parse(&text, "archive.txt"));
    assert!(matches!(err, ExtractionError::StructuralCorruption { .. }));

    let blocks = split_blocks(&text);
    assert_eq!(blocks.len(), 2);
    for block in &blocks {
        expect_notice(parse(block, "block.txt"));
    }
}

#[test]
fn test_split_skips_preamble_without_fields() {
    let text = format!("*** archive header ***\n\n{LEGACY}");
    let blocks = split_blocks(&text);
    assert_eq!(blocks.len(), 1);
    assert!(blocks[0].starts_with("1.0/012345"));
}

#[test]
fn test_stray_text_is_structural_corruption() {
    let text = edit(LEGACY, "AU: City of Springfield\n", "AU: City of Springfield\n\nstray text\n");
    let err = expect_error(parse(&text, "stray.txt"));
    assert!(matches!(
        err,
        ExtractionError::StructuralCorruption { format: Some(NoticeFormat::LegacyFieldCoded), .. }
    ));
}

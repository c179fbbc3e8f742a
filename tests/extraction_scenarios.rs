//! Extraction scenarios through the public entry point

use chrono::NaiveDate;
use notice_processor::{
    AwardNotice, ExtractionConfig, ExtractionError, MonetaryValue, NoticeFormat, NoticeInput,
    ParseOutcome, SubRevision, detect_all, extract, sniff,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;

const LEGACY: &str = include_str!("fixtures/legacy_award.txt");
const EARLY: &str = include_str!("fixtures/early_award.en");
const UNIFIED_R207: &str = include_str!("fixtures/unified_r207_award.xml");
const UNIFIED_R208: &str = include_str!("fixtures/unified_r208_award.xml");
const UNIFIED_R209: &str = include_str!("fixtures/unified_r209_award.xml");
const UBL: &str = include_str!("fixtures/ubl_award.xml");

/// The same award published in each of the four formats
const SAME_AWARD: &[(&str, &str, NoticeFormat)] = &[
    ("12345-2010.txt", LEGACY, NoticeFormat::LegacyFieldCoded),
    ("012345-2010.en", EARLY, NoticeFormat::EarlyStructuredXml),
    ("012345-2010.xml", UNIFIED_R207, NoticeFormat::UnifiedNamespacedXml),
    ("00012345-2010.xml", UBL, NoticeFormat::UblStandard),
];

fn run(text: &str, filename: &str) -> ParseOutcome {
    extract(&NoticeInput::new(text, filename), &ExtractionConfig::default())
}

fn notice(text: &str, filename: &str) -> AwardNotice {
    match run(text, filename) {
        ParseOutcome::Document(notice) => *notice,
        other => panic!("{filename}: expected a notice, got {other:?}"),
    }
}

fn euros(amount: &str) -> Option<MonetaryValue> {
    Some(MonetaryValue {
        amount: Decimal::from_str(amount).unwrap(),
        currency: Some("EUR".to_string()),
    })
}

#[test]
fn test_r207_award_is_extracted_exactly() {
    let notice = notice(UNIFIED_R207, "012345-2010.xml");

    assert_eq!(notice.document.format, NoticeFormat::UnifiedNamespacedXml);
    assert_eq!(notice.document.sub_revision, Some(SubRevision::R207));
    assert_eq!(notice.contracts.len(), 1);

    let award = &notice.contracts[0].awards[0];
    assert_eq!(award.awarded_value, euros("123456.78"));
    assert_eq!(
        award.awarded_value.as_ref().unwrap().amount.to_string(),
        "123456.78"
    );
    assert!(notice.dropped.is_empty());
}

#[test]
fn test_every_unified_sub_revision_is_recognised() {
    let revisions: Vec<_> = [UNIFIED_R207, UNIFIED_R208, UNIFIED_R209]
        .iter()
        .map(|text| notice(text, "unified.xml").document.sub_revision)
        .collect();
    assert_eq!(
        revisions,
        vec![
            Some(SubRevision::R207),
            Some(SubRevision::R208),
            Some(SubRevision::R209)
        ]
    );
}

#[test]
fn test_same_award_in_every_format() {
    let expected_date = NaiveDate::from_ymd_opt(2010, 12, 15);

    for (filename, text, format) in SAME_AWARD {
        let notice = notice(text, filename);
        assert_eq!(notice.document.format, *format, "{filename}");
        assert_eq!(
            notice.document.publication_date,
            NaiveDate::from_ymd_opt(2010, 12, 20).unwrap(),
            "{filename}"
        );
        assert_eq!(notice.contracting_body.name, "City of Springfield", "{filename}");

        let award = &notice.contracts[0].awards[0];
        assert!(award.awarded, "{filename}");
        assert_eq!(award.conclusion_date, expected_date, "{filename}");
        assert_eq!(award.awarded_value, euros("123456.78"), "{filename}");

        let (contractor, _) = notice.award_contractors(award).next().unwrap();
        assert_eq!(contractor.name, "Acme Cleaning Ltd", "{filename}");
    }
}

#[test]
fn test_other_language_rendition_is_excluded() {
    let german = EARLY.replace("<LG_OJ>EN</LG_OJ>", "<LG_OJ>DE</LG_OJ>");
    assert_eq!(
        run(&german, "012345-2010.de"),
        ParseOutcome::LanguageExcluded {
            format: NoticeFormat::EarlyStructuredXml,
            language: "DE".to_string(),
        }
    );
}

#[test]
fn test_legacy_notice_behind_archive_header() {
    let text = format!("*** TED archive header ***\n\n{LEGACY}");
    let notice = notice(&text, "archive.txt");
    assert_eq!(notice.document.format, NoticeFormat::LegacyFieldCoded);
    assert_eq!(notice.document.identifier, "12345-2010");
}

#[test]
fn test_missing_document_type_is_not_an_award() {
    let text = LEGACY.replace("TD: 7 - Contract award\n", "");
    assert_eq!(
        run(&text, "no_type.txt"),
        ParseOutcome::NotAnAwardNotice {
            format: NoticeFormat::LegacyFieldCoded,
            type_code: None,
        }
    );
}

#[test]
fn test_missing_identifier_is_a_failure() {
    let text = LEGACY.replace("ND: 12345-2010\n", "");
    match run(&text, "no_id.txt") {
        ParseOutcome::Failure(err) => {
            assert!(matches!(err, ExtractionError::RequiredFieldMissing { .. }));
            assert_eq!(err.offending_field().as_deref(), Some("document.identifier"));
        }
        other => panic!("Expected a failure, got {other:?}"),
    }
}

#[test]
fn test_unrecognised_content() {
    for garbage in ["", "   \n", "just some prose\nover two lines", "{\"json\": true}"] {
        assert!(matches!(
            run(garbage, "garbage.bin"),
            ParseOutcome::Failure(ExtractionError::FormatNotRecognized { .. })
        ));
    }
}

#[test]
fn test_publication_date_is_never_defaulted() {
    let deletions = [
        ("legacy.txt", LEGACY, "PD: 20101220\n"),
        ("early.en", EARLY, "<DATE_PUB>20101220</DATE_PUB>"),
        ("r207.xml", UNIFIED_R207, "<DATE_PUB>20101220</DATE_PUB>"),
        (
            "ubl.xml",
            UBL,
            "<efbc:PublicationDate>2010-12-20+01:00</efbc:PublicationDate>",
        ),
    ];

    for (filename, text, fragment) in deletions {
        assert!(text.contains(fragment), "{filename}");
        match run(&text.replacen(fragment, "", 1), filename) {
            ParseOutcome::Failure(err) => assert_eq!(
                err.offending_field().as_deref(),
                Some("document.publication_date"),
                "{filename}"
            ),
            other => panic!("{filename}: expected a failure, got {other:?}"),
        }
    }
}

#[test]
fn test_fixtures_match_exactly_one_detector() {
    for (filename, text, format) in SAME_AWARD {
        assert_eq!(detect_all(text.as_bytes(), 4096), vec![*format], "{filename}");
        assert_eq!(sniff(text.as_bytes(), filename, 4096).unwrap(), *format);
    }
}

#[test]
fn test_declared_format_never_overrides_content() {
    let input = NoticeInput::new(UBL, "ubl.xml").with_declared_format(NoticeFormat::LegacyFieldCoded);
    let outcome = extract(&input, &ExtractionConfig::default());
    assert_eq!(
        outcome.notice().map(|n| n.document.format),
        Some(NoticeFormat::UblStandard)
    );
}

type Clear = fn(&mut AwardNotice);

fn clear_dispatch_date(notice: &mut AwardNotice) {
    notice.document.dispatch_date = None;
}

fn clear_buyer_town(notice: &mut AwardNotice) {
    notice.contracting_body.town = None;
}

/// Optional source fields and the single output field each one feeds
const OPTIONAL_DELETIONS: &[(&str, &str, &str, Clear)] = &[
    ("legacy.txt", LEGACY, "DS: 20101216\n", clear_dispatch_date),
    ("legacy.txt", LEGACY, "TW: Springfield\n", clear_buyer_town),
    ("early.en", EARLY, "<DATE_DISP>20101216</DATE_DISP>", clear_dispatch_date),
    ("early.en", EARLY, "<TOWN>Springfield</TOWN>", clear_buyer_town),
    (
        "r207.xml",
        UNIFIED_R207,
        "<DS_DATE_DISPATCH>20101216</DS_DATE_DISPATCH>",
        clear_dispatch_date,
    ),
    ("r207.xml", UNIFIED_R207, "<TOWN>Springfield</TOWN>", clear_buyer_town),
    (
        "ubl.xml",
        UBL,
        "<cbc:IssueDate>2010-12-16+01:00</cbc:IssueDate>",
        clear_dispatch_date,
    ),
    (
        "ubl.xml",
        UBL,
        "<cbc:CityName>Springfield</cbc:CityName>",
        clear_buyer_town,
    ),
];

fn fixture_strategy() -> impl Strategy<Value = (&'static str, &'static str)> {
    prop::sample::select(vec![
        ("legacy.txt", LEGACY),
        ("early.en", EARLY),
        ("r207.xml", UNIFIED_R207),
        ("r208.xml", UNIFIED_R208),
        ("r209.xml", UNIFIED_R209),
        ("ubl.xml", UBL),
    ])
}

proptest! {
    #[test]
    fn prop_extraction_is_idempotent((filename, text) in fixture_strategy()) {
        let first = run(text, filename);
        let second = run(text, filename);
        prop_assert_eq!(&first, &second);

        let with_bom = [b"\xEF\xBB\xBF".as_slice(), text.as_bytes()].concat();
        let third = extract(&NoticeInput::new(with_bom, filename), &ExtractionConfig::default());
        prop_assert_eq!(&first, &third);
    }

    #[test]
    fn prop_deleted_optional_field_is_absent_and_nothing_else_changes(
        index in 0..OPTIONAL_DELETIONS.len(),
    ) {
        let (filename, text, fragment, clear) = OPTIONAL_DELETIONS[index];
        prop_assert!(text.contains(fragment));

        let mut expected = notice(text, filename);
        clear(&mut expected);
        let actual = notice(&text.replacen(fragment, "", 1), filename);
        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn prop_truncation_never_yields_a_partial_document(
        (filename, text) in fixture_strategy(),
        cut in 0.05f64..0.95,
    ) {
        let mut end = (text.len() as f64 * cut) as usize;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        let truncated = &text[..end];
        if let ParseOutcome::Document(notice) = run(truncated, filename) {
            // Only the line-based legacy format can lose a tail and still be whole
            prop_assert_eq!(notice.document.format, NoticeFormat::LegacyFieldCoded);
        }
    }
}

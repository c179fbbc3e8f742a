//! Single entry point from raw input to [`ParseOutcome`].
//!
//! Sniffs the format, decodes the bytes as declared, and hands the text to the
//! matching parser. The parser's result is returned unchanged; any error
//! becomes [`ParseOutcome::Failure`].

use crate::config::ExtractionConfig;
use crate::error::ExtractionError;
use crate::models::{DeclaredEncoding, NoticeFormat, NoticeInput, ParseOutcome};
use crate::parsers::{early_xml, legacy, ubl, unified_xml};
use crate::sniffer;
use tracing::{debug, warn};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Extract one document
pub fn extract(input: &NoticeInput, config: &ExtractionConfig) -> ParseOutcome {
    match try_extract(input, config) {
        Ok(outcome) => outcome,
        Err(err) => {
            debug!("{}: {}", input.filename, err);
            ParseOutcome::Failure(err)
        }
    }
}

fn try_extract(
    input: &NoticeInput,
    config: &ExtractionConfig,
) -> Result<ParseOutcome, ExtractionError> {
    let format = sniffer::sniff(&input.bytes, &input.filename, config.sniff_prefix_bytes)?;

    if let Some(declared) = input.declared_format {
        if declared != format {
            warn!(
                "{}: declared as {} but content is {}, using {}",
                input.filename, declared, format, format
            );
        }
    }

    let text = decode(input, format)?;
    debug!("{}: dispatching to {} parser", input.filename, format);
    dispatch(format, &text, &input.filename, config)
}

/// Run the parser for an already identified format
pub fn dispatch(
    format: NoticeFormat,
    text: &str,
    filename: &str,
    config: &ExtractionConfig,
) -> Result<ParseOutcome, ExtractionError> {
    match format {
        NoticeFormat::LegacyFieldCoded => legacy::parse(text, filename),
        NoticeFormat::EarlyStructuredXml => early_xml::parse(text, filename, config),
        NoticeFormat::UnifiedNamespacedXml => unified_xml::parse(text, filename),
        NoticeFormat::UblStandard => ubl::parse(text, filename),
    }
}

/// Text of the input in its declared encoding, without a byte order mark.
/// Bytes that are not valid in the declared encoding are never repaired.
pub fn decode(input: &NoticeInput, format: NoticeFormat) -> Result<String, ExtractionError> {
    let bytes = input.bytes.strip_prefix(UTF8_BOM).unwrap_or(&input.bytes);
    match input.declared_encoding {
        DeclaredEncoding::Utf8 => std::str::from_utf8(bytes).map(str::to_string).map_err(|err| {
            ExtractionError::corrupt(
                &input.filename,
                Some(format),
                format!("invalid UTF-8 at byte {}", err.valid_up_to()),
            )
        }),
        DeclaredEncoding::Latin1 => Ok(bytes.iter().map(|&b| char::from(b)).collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEGACY: &str = "ND: 123-1998\nPD: 19980105\nTD: 3 - Prior information\nTI: GB-London: cleaning\n";

    #[test]
    fn test_unrecognized_input_is_a_failure() {
        let input = NoticeInput::new(b"%PDF-1.4".to_vec(), "scan.pdf");
        let outcome = extract(&input, &ExtractionConfig::default());
        match outcome {
            ParseOutcome::Failure(ExtractionError::FormatNotRecognized { filename }) => {
                assert_eq!(filename, "scan.pdf")
            }
            other => panic!("Expected FormatNotRecognized, got {other:?}"),
        }
    }

    #[test]
    fn test_declared_format_never_overrides_sniffing() {
        let input = NoticeInput::new(LEGACY.as_bytes().to_vec(), "notice.xml")
            .with_declared_format(NoticeFormat::UblStandard);
        let outcome = extract(&input, &ExtractionConfig::default());
        match outcome {
            ParseOutcome::NotAnAwardNotice { format, type_code } => {
                assert_eq!(format, NoticeFormat::LegacyFieldCoded);
                assert_eq!(type_code.as_deref(), Some("3"));
            }
            other => panic!("Expected NotAnAwardNotice, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_utf8_is_structural_corruption() {
        let mut bytes = LEGACY.as_bytes().to_vec();
        bytes.extend_from_slice(b"TX: caf\xE9\n");
        let input = NoticeInput::new(bytes.clone(), "latin.txt");
        match extract(&input, &ExtractionConfig::default()) {
            ParseOutcome::Failure(ExtractionError::StructuralCorruption { format, .. }) => {
                assert_eq!(format, Some(NoticeFormat::LegacyFieldCoded))
            }
            other => panic!("Expected StructuralCorruption, got {other:?}"),
        }

        let latin = NoticeInput::new(bytes, "latin.txt").with_encoding(DeclaredEncoding::Latin1);
        let text = decode(&latin, NoticeFormat::LegacyFieldCoded).unwrap();
        assert!(text.ends_with("TX: café\n"));
    }

    #[test]
    fn test_bom_is_stripped() {
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice(LEGACY.as_bytes());
        let input = NoticeInput::new(bytes, "bom.txt");
        let text = decode(&input, NoticeFormat::LegacyFieldCoded).unwrap();
        assert!(text.starts_with("ND:"));
    }
}

//! Application constants for notice extraction
//!
//! Document-type codes, namespace URIs, element names used by the sniffer,
//! and default configuration values.

// =============================================================================
// Notice Classification
// =============================================================================

/// Document-type code of a contract award notice
pub const AWARD_NOTICE_CODE: &str = "7";

/// eForms notice type list name shared by all result notices
pub const UBL_RESULT_LIST_NAME: &str = "result";

// =============================================================================
// Sniffing
// =============================================================================

/// Default number of bytes inspected by the sniffer
pub const DEFAULT_SNIFF_PREFIX_BYTES: usize = 4096;

/// Smallest prefix that still reaches past a typical XML prolog
pub const MIN_SNIFF_PREFIX_BYTES: usize = 256;

/// Field-code lines required before text is accepted as legacy field-coded
pub const LEGACY_MIN_FIELD_LINES: usize = 3;

/// Legacy archive header lines start with this marker and carry no fields
pub const ARCHIVE_HEADER_MARKER: &str = "***";

pub mod roots {
    pub const EARLY_STRUCTURED: &str = "INTERNAL_OJS";
    pub const UNIFIED_EXPORT: &str = "TED_EXPORT";
    pub const UBL_AWARD_NOTICE: &str = "ContractAwardNotice";
}

pub mod namespaces {
    pub const TED_EXPORT: &str = "http://publications.europa.eu/TED_schema/Export";
    pub const TED_EXPORT_R209: &str =
        "http://publications.europa.eu/resource/schema/ted/R2.0.9/publication";
    pub const UBL_CONTRACT_AWARD_NOTICE: &str =
        "urn:oasis:names:specification:ubl:schema:xsd:ContractAwardNotice-2";
}

// =============================================================================
// Defaults
// =============================================================================

pub const DEFAULT_WORKING_LANGUAGE: &str = "EN";

/// Extensions collected by batch discovery; two-letter language suffixes of
/// per-language files are matched separately
pub const DEFAULT_FILE_EXTENSIONS: &[&str] = &["xml", "txt"];

/// Log target prefix used by the binary's default filter
pub const LOG_TARGET: &str = "notice_processor";

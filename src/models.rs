//! Core data structures for award notice extraction.
//!
//! Defines the format tags, the normalized record tree every parser targets,
//! the per-document `ParseOutcome`, and batch processing statistics.
//!
//! Every optional field is `None` unless an explicit source element, attribute
//! or field code supplied it. Money is `rust_decimal::Decimal`, dates are
//! `chrono::NaiveDate`.

use crate::error::ExtractionError;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;

/// Encoding families, in dispatch priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NoticeFormat {
    LegacyFieldCoded,
    EarlyStructuredXml,
    UnifiedNamespacedXml,
    UblStandard,
}

impl NoticeFormat {
    /// Tie-break order when more than one detector matches
    pub const PRIORITY: [NoticeFormat; 4] = [
        NoticeFormat::LegacyFieldCoded,
        NoticeFormat::EarlyStructuredXml,
        NoticeFormat::UnifiedNamespacedXml,
        NoticeFormat::UblStandard,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            NoticeFormat::LegacyFieldCoded => "legacy-field-coded",
            NoticeFormat::EarlyStructuredXml => "early-structured-xml",
            NoticeFormat::UnifiedNamespacedXml => "unified-namespaced-xml",
            NoticeFormat::UblStandard => "ubl-standard",
        }
    }

    /// Parse a label as produced by [`NoticeFormat::label`]
    pub fn from_label(label: &str) -> Option<Self> {
        Self::PRIORITY
            .into_iter()
            .find(|format| format.label().eq_ignore_ascii_case(label.trim()))
    }
}

impl fmt::Display for NoticeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Schema sub-revisions of the unified namespaced XML family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SubRevision {
    R207,
    R208,
    R209,
}

impl SubRevision {
    pub fn version_marker(&self) -> &'static str {
        match self {
            SubRevision::R207 => "R2.0.7",
            SubRevision::R208 => "R2.0.8",
            SubRevision::R209 => "R2.0.9",
        }
    }
}

impl fmt::Display for SubRevision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.version_marker())
    }
}

/// Record tree entity named in extraction failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Entity {
    Document,
    ContractingBody,
    Contract,
    Lot,
    Award,
    Contractor,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Entity::Document => "document",
            Entity::ContractingBody => "contracting_body",
            Entity::Contract => "contract",
            Entity::Lot => "lot",
            Entity::Award => "award",
            Entity::Contractor => "contractor",
        };
        f.write_str(name)
    }
}

/// Character encoding declared by whoever supplied the bytes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeclaredEncoding {
    #[default]
    Utf8,
    Latin1,
}

/// One raw document handed to the extraction core
#[derive(Debug, Clone)]
pub struct NoticeInput {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub declared_encoding: DeclaredEncoding,
    pub declared_format: Option<NoticeFormat>,
}

impl NoticeInput {
    pub fn new(bytes: impl Into<Vec<u8>>, filename: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            filename: filename.into(),
            declared_encoding: DeclaredEncoding::Utf8,
            declared_format: None,
        }
    }

    pub fn with_encoding(mut self, encoding: DeclaredEncoding) -> Self {
        self.declared_encoding = encoding;
        self
    }

    pub fn with_declared_format(mut self, format: NoticeFormat) -> Self {
        self.declared_format = Some(format);
        self
    }
}

/// Amount with the currency stated next to it in the source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonetaryValue {
    pub amount: Decimal,
    pub currency: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub identifier: String,
    pub format: NoticeFormat,
    pub sub_revision: Option<SubRevision>,
    pub publication_date: NaiveDate,
    pub document_type_code: String,
    pub original_language: Option<String>,
    /// Language of this rendition, when the source states it
    pub language: Option<String>,
    pub source_country: Option<String>,
    pub schema_version: Option<String>,
    pub dispatch_date: Option<NaiveDate>,
    pub deletion_date: Option<NaiveDate>,
    pub journal_reference: Option<String>,
    pub reception_id: Option<String>,
    pub english_title: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractingBody {
    pub name: String,
    pub english_name: Option<String>,
    pub national_id: Option<String>,
    pub address: Option<String>,
    pub town: Option<String>,
    pub postal_code: Option<String>,
    pub country_code: Option<String>,
    pub nuts_code: Option<String>,
    pub contact_point: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub fax: Option<String>,
    pub url_general: Option<String>,
    pub url_buyer: Option<String>,
    pub authority_type_code: Option<String>,
    pub main_activity_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contract {
    pub title: String,
    pub reference_number: Option<String>,
    pub short_description: Option<String>,
    pub main_cpv_code: Option<String>,
    pub additional_cpv_codes: Vec<String>,
    pub contract_nature_code: Option<String>,
    pub procedure_type_code: Option<String>,
    pub total_value: Option<MonetaryValue>,
    pub performance_nuts_code: Option<String>,
    pub has_lots: bool,
    pub lots: Vec<Lot>,
    pub awards: Vec<Award>,
}

impl Contract {
    pub fn lot_count(&self) -> usize {
        self.lots.len()
    }

    pub fn lot(&self, lot_number: &str) -> Option<&Lot> {
        self.lots.iter().find(|lot| lot.lot_number == lot_number)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lot {
    pub lot_number: String,
    pub title: Option<String>,
    pub short_description: Option<String>,
    pub estimated_value: Option<MonetaryValue>,
    pub performance_nuts_code: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenderStatistics {
    pub received: Option<u32>,
    pub received_sme: Option<u32>,
    pub received_other_eu: Option<u32>,
    pub received_non_eu: Option<u32>,
    pub received_electronic: Option<u32>,
}

impl TenderStatistics {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// One award decision. `conclusion_date` is always present when `awarded`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Award {
    pub contract_number: Option<String>,
    pub lot_number: Option<String>,
    pub title: Option<String>,
    pub awarded: bool,
    pub conclusion_date: Option<NaiveDate>,
    pub non_award_reason: Option<String>,
    pub tenders: TenderStatistics,
    pub awarded_value: Option<MonetaryValue>,
    pub subcontracted_value: Option<MonetaryValue>,
    pub contractors: Vec<AwardContractorLink>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contractor {
    pub name: String,
    pub national_id: Option<String>,
    pub address: Option<String>,
    pub town: Option<String>,
    pub postal_code: Option<String>,
    pub country_code: Option<String>,
    pub nuts_code: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub url: Option<String>,
    pub is_sme: Option<bool>,
}

/// Award to contractor join; `contractor` indexes `AwardNotice::contractors`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwardContractorLink {
    pub contractor: usize,
    pub is_lead: Option<bool>,
}

/// The normalized record tree for one notice
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AwardNotice {
    pub document: Document,
    pub contracting_body: ContractingBody,
    pub contracts: Vec<Contract>,
    pub contractors: Vec<Contractor>,
    /// Entities dropped because a required field was missing or malformed
    pub dropped: Vec<ExtractionError>,
}

impl AwardNotice {
    pub fn awards(&self) -> impl Iterator<Item = &Award> {
        self.contracts.iter().flat_map(|contract| contract.awards.iter())
    }

    /// Contractors linked to an award, with their lead flag
    pub fn award_contractors<'a>(
        &'a self,
        award: &'a Award,
    ) -> impl Iterator<Item = (&'a Contractor, Option<bool>)> + 'a {
        award
            .contractors
            .iter()
            .filter_map(|link| self.contractors.get(link.contractor).map(|c| (c, link.is_lead)))
    }

    /// Distinct reference codes used anywhere in the tree
    pub fn reference_codes(&self) -> ReferenceCodes {
        let mut codes = ReferenceCodes::default();
        let doc = &self.document;
        codes.languages.extend(doc.original_language.iter().cloned());
        codes.languages.extend(doc.language.iter().cloned());
        codes.countries.extend(doc.source_country.iter().cloned());

        let body = &self.contracting_body;
        codes.countries.extend(body.country_code.iter().cloned());
        codes.nuts_codes.extend(body.nuts_code.iter().cloned());

        for contract in &self.contracts {
            codes.cpv_codes.extend(contract.main_cpv_code.iter().cloned());
            codes.cpv_codes.extend(contract.additional_cpv_codes.iter().cloned());
            codes.nuts_codes.extend(contract.performance_nuts_code.iter().cloned());
            codes.add_currency(contract.total_value.as_ref());
            for lot in &contract.lots {
                codes.nuts_codes.extend(lot.performance_nuts_code.iter().cloned());
                codes.add_currency(lot.estimated_value.as_ref());
            }
            for award in &contract.awards {
                codes.add_currency(award.awarded_value.as_ref());
                codes.add_currency(award.subcontracted_value.as_ref());
            }
        }

        for contractor in &self.contractors {
            codes.countries.extend(contractor.country_code.iter().cloned());
            codes.nuts_codes.extend(contractor.nuts_code.iter().cloned());
        }
        codes
    }
}

/// Reference data collected from a notice for lookup tables
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceCodes {
    pub languages: BTreeSet<String>,
    pub countries: BTreeSet<String>,
    pub nuts_codes: BTreeSet<String>,
    pub currencies: BTreeSet<String>,
    pub cpv_codes: BTreeSet<String>,
}

impl ReferenceCodes {
    fn add_currency(&mut self, value: Option<&MonetaryValue>) {
        if let Some(currency) = value.and_then(|v| v.currency.clone()) {
            self.currencies.insert(currency);
        }
    }

    pub fn merge(&mut self, other: ReferenceCodes) {
        self.languages.extend(other.languages);
        self.countries.extend(other.countries);
        self.nuts_codes.extend(other.nuts_codes);
        self.currencies.extend(other.currencies);
        self.cpv_codes.extend(other.cpv_codes);
    }
}

/// Result of handing one document to the extraction core
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    Document(Box<AwardNotice>),
    /// Recognized format, but not a contract award notice
    NotAnAwardNotice {
        format: NoticeFormat,
        type_code: Option<String>,
    },
    /// Per-language file outside the working language
    LanguageExcluded {
        format: NoticeFormat,
        language: String,
    },
    Failure(ExtractionError),
}

impl ParseOutcome {
    pub fn notice(&self) -> Option<&AwardNotice> {
        match self {
            ParseOutcome::Document(notice) => Some(notice),
            _ => None,
        }
    }

    pub fn into_notice(self) -> Option<AwardNotice> {
        match self {
            ParseOutcome::Document(notice) => Some(*notice),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&ExtractionError> {
        match self {
            ParseOutcome::Failure(err) => Some(err),
            _ => None,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, ParseOutcome::Failure(_))
    }
}

/// Batch processing statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProcessingStats {
    pub files_processed: usize,
    pub files_unreadable: usize,
    pub documents: usize,
    pub not_award_notices: usize,
    pub language_excluded: usize,
    pub failures: usize,
    pub failures_by_kind: BTreeMap<String, usize>,
    pub documents_by_format: BTreeMap<String, usize>,
    pub dropped_entities: usize,
    pub output_path: Option<PathBuf>,
    pub processing_time_ms: u128,
}

impl ProcessingStats {
    pub fn record(&mut self, outcome: &ParseOutcome) {
        match outcome {
            ParseOutcome::Document(notice) => {
                self.documents += 1;
                self.dropped_entities += notice.dropped.len();
                *self
                    .documents_by_format
                    .entry(notice.document.format.label().to_string())
                    .or_default() += 1;
            }
            ParseOutcome::NotAnAwardNotice { .. } => self.not_award_notices += 1,
            ParseOutcome::LanguageExcluded { .. } => self.language_excluded += 1,
            ParseOutcome::Failure(err) => {
                self.failures += 1;
                *self
                    .failures_by_kind
                    .entry(err.kind().to_string())
                    .or_default() += 1;
            }
        }
    }
}

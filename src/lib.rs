//! Notice Processor Library
//!
//! Format detection and extraction for public procurement contract award
//! notices. Four source encodings are recognised and normalised into one
//! record model:
//!
//! - Legacy field-coded plain text (two-letter field codes)
//! - Early structured XML, one file per language rendition
//! - Unified namespaced XML in sub-revisions R2.0.7, R2.0.8 and R2.0.9
//! - UBL based eForms result notices
//!
//! Extraction is pure: [`extract`] turns one [`NoticeInput`] into one
//! [`ParseOutcome`]. A document that cannot be read faithfully is reported as
//! a [`ParseOutcome::Failure`] naming the offending field, never patched up
//! with a guess. [`BatchProcessor`] runs the same extraction over a
//! directory tree.

pub mod cli;
pub mod config;
pub mod constants;
pub mod dispatcher;
pub mod error;
pub mod fields;
pub mod fingerprint;
pub mod models;
pub mod parsers;
pub mod processor;
pub mod sniffer;
pub mod xml;

pub use config::ExtractionConfig;
pub use dispatcher::extract;
pub use error::{ExtractionError, NoticeError, Result};
pub use models::{
    Award, AwardContractorLink, AwardNotice, Contract, ContractingBody, Contractor,
    DeclaredEncoding, Document, Entity, Lot, MonetaryValue, NoticeFormat, NoticeInput, ParseOutcome,
    ProcessingStats, SubRevision, TenderStatistics,
};
pub use processor::{BatchProcessor, BatchReport, ProcessedDocument};
pub use sniffer::{detect_all, sniff};

//! Legacy field-coded plain text notices.
//!
//! Each notice is a block of `XX: value` lines, optionally opened by a record
//! separator such as `1.0/000123`. Indented lines continue the previous field
//! and a blank line closes it. Award details live inside the free-text `TX`
//! field as labelled lines, one `Award of contract` section per award.

use super::{NoticeAssembly, PendingAward, PendingContractor};
use crate::constants::{ARCHIVE_HEADER_MARKER, AWARD_NOTICE_CODE};
use crate::error::ExtractionError;
use crate::fields::{FieldScope, clean_code, clean_text, leading_code};
use crate::models::{
    Award, Contract, ContractingBody, Contractor, Document, Entity, MonetaryValue, NoticeFormat,
    ParseOutcome, TenderStatistics,
};
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

const FORMAT: NoticeFormat = NoticeFormat::LegacyFieldCoded;

static RECORD_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.\d+/\d{6}$").expect("valid record separator pattern"));

static FIELD_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Z]{2}):\s*(.*)$").expect("valid field line pattern"));

static CPV_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{8}\b").expect("valid CPV pattern"));

static AWARD_SECTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:\d+\.\s*)?award of contract\b").expect("valid award section pattern")
});

static AWARD_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:\d+\.\s*)?(date of award|number of tenders received|name and address of successful tenderer|contract value)\s*:\s*(.*)$",
    )
    .expect("valid award label pattern")
});

/// Split an archive text into notice blocks, one per record separator.
/// Lines before the first separator form a block of their own only when
/// they contain field codes.
pub fn split_blocks(text: &str) -> Vec<String> {
    let mut blocks: Vec<String> = Vec::new();
    let mut current = String::new();

    for line in text.lines() {
        if RECORD_SEPARATOR.is_match(line.trim()) {
            if current.lines().any(|l| FIELD_LINE.is_match(l)) {
                blocks.push(std::mem::take(&mut current));
            } else {
                current.clear();
            }
        }
        current.push_str(line);
        current.push('\n');
    }

    if current.lines().any(|l| FIELD_LINE.is_match(l)) {
        blocks.push(current);
    }
    blocks
}

/// Field codes and values of one notice block
#[derive(Debug, Default)]
struct FieldBlock {
    record_id: Option<String>,
    fields: Vec<(String, String)>,
}

impl FieldBlock {
    /// First value of a field code, whitespace-normalised
    fn text(&self, code: &str) -> Option<String> {
        self.raw(code).and_then(clean_text)
    }

    /// First value of a field code as written, continuation lines included
    fn raw(&self, code: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(c, _)| c == code)
            .map(|(_, v)| v.as_str())
    }

    /// A document-level code that must not carry two different values
    fn single(&self, code: &'static str) -> Result<Option<String>, ExtractionError> {
        let mut values = self
            .fields
            .iter()
            .filter(|(c, _)| c == code)
            .filter_map(|(_, v)| clean_text(v));
        let first = values.next();
        if let Some(other) = values.find(|v| Some(v) != first.as_ref()) {
            return Err(FieldScope::new(FORMAT, Entity::Document).malformed(
                code,
                &other,
                "field code repeated with a different value",
            ));
        }
        Ok(first)
    }
}

/// Line-by-line accumulator for a field block
#[derive(Debug, Default)]
struct FieldBlockBuilder {
    block: FieldBlock,
    open_field: bool,
    blocks_seen: usize,
}

impl FieldBlockBuilder {
    fn parse_line(&mut self, line: &str, filename: &str) -> Result<(), ExtractionError> {
        let trimmed = line.trim();

        if trimmed.is_empty() {
            self.open_field = false;
            return Ok(());
        }
        if trimmed.starts_with(ARCHIVE_HEADER_MARKER) {
            return Ok(());
        }

        if RECORD_SEPARATOR.is_match(trimmed) {
            self.blocks_seen += 1;
            if self.blocks_seen > 1 {
                return Err(ExtractionError::corrupt(
                    filename,
                    Some(FORMAT),
                    format!("second notice block '{trimmed}' in one document"),
                ));
            }
            self.block.record_id = Some(trimmed.to_string());
            self.open_field = false;
            return Ok(());
        }

        if let Some(caps) = FIELD_LINE.captures(line) {
            self.block
                .fields
                .push((caps[1].to_string(), caps[2].trim_end().to_string()));
            self.open_field = true;
            return Ok(());
        }

        match self.block.fields.last_mut() {
            Some((_, value)) if self.open_field => {
                value.push('\n');
                value.push_str(trimmed);
                Ok(())
            }
            _ => Err(ExtractionError::corrupt(
                filename,
                Some(FORMAT),
                format!("text outside any field: '{trimmed}'"),
            )),
        }
    }

    fn build(self, filename: &str) -> Result<FieldBlock, ExtractionError> {
        if self.block.fields.is_empty() {
            return Err(ExtractionError::corrupt(
                filename,
                Some(FORMAT),
                "no field codes found",
            ));
        }
        Ok(self.block)
    }
}

/// Parse one legacy notice block
pub fn parse(text: &str, filename: &str) -> Result<ParseOutcome, ExtractionError> {
    let mut builder = FieldBlockBuilder::default();
    for line in text.lines() {
        builder.parse_line(line, filename)?;
    }
    let block = builder.build(filename)?;

    let type_code = block.raw("TD").and_then(leading_code);
    if type_code.as_deref() != Some(AWARD_NOTICE_CODE) {
        debug!("{}: document type {:?}, not an award notice", filename, type_code);
        return Ok(ParseOutcome::NotAnAwardNotice {
            format: FORMAT,
            type_code,
        });
    }

    let document = parse_document(&block, AWARD_NOTICE_CODE)?;
    let contracting_body = parse_contracting_body(&block)?;

    let mut assembly = NoticeAssembly::new(FORMAT);
    let contract = parse_contract(&block, &mut assembly);
    let contracts = assembly.keep(contract).into_iter().collect();

    let notice = assembly.finish(document, contracting_body, contracts)?;
    debug!(
        "{}: legacy notice {} ({:?}) parsed",
        filename, notice.document.identifier, block.record_id
    );
    Ok(ParseOutcome::Document(Box::new(notice)))
}

fn parse_document(block: &FieldBlock, type_code: &str) -> Result<Document, ExtractionError> {
    let scope = FieldScope::new(FORMAT, Entity::Document);

    let identifier = scope.require("identifier", block.single("ND")?)?;
    let publication_raw = scope.require("publication_date", block.single("PD")?)?;
    let publication_date = scope.compact_date("publication_date", &publication_raw)?;
    let dispatch_date = block
        .single("DS")?
        .map(|raw| scope.compact_date("dispatch_date", &raw))
        .transpose()?;

    Ok(Document {
        identifier,
        format: FORMAT,
        sub_revision: None,
        publication_date,
        document_type_code: type_code.to_string(),
        original_language: block.single("OL")?,
        language: None,
        source_country: block.single("CY")?,
        schema_version: None,
        dispatch_date,
        deletion_date: None,
        journal_reference: block.single("OJ")?,
        reception_id: block.single("RN")?,
        english_title: None,
    })
}

fn parse_contracting_body(block: &FieldBlock) -> Result<ContractingBody, ExtractionError> {
    let scope = FieldScope::new(FORMAT, Entity::ContractingBody);
    Ok(ContractingBody {
        name: scope.require("name", block.text("AU"))?,
        town: block.text("TW"),
        country_code: block.raw("CY").and_then(clean_code),
        ..ContractingBody::default()
    })
}

fn parse_contract(
    block: &FieldBlock,
    assembly: &mut NoticeAssembly,
) -> Result<Contract, ExtractionError> {
    let scope = FieldScope::new(FORMAT, Entity::Contract);
    let title = scope.require("title", block.text("TI"))?;

    let mut cpv_codes = block
        .raw("PC")
        .map(|pc| {
            CPV_CODE
                .find_iter(pc)
                .map(|m| m.as_str().to_string())
                .collect::<Vec<_>>()
        })
        .unwrap_or_default()
        .into_iter();
    let main_cpv_code = cpv_codes.next();

    let mut awards = Vec::new();
    if let Some(tx) = block.raw("TX") {
        for section in award_sections(tx) {
            let award = parse_award(&section, assembly);
            if let Some(pending) = assembly.keep(award) {
                awards.push(assembly.register_award(pending));
            }
        }
    }

    Ok(Contract {
        title,
        reference_number: None,
        short_description: None,
        main_cpv_code,
        additional_cpv_codes: cpv_codes.collect(),
        contract_nature_code: block.raw("NC").and_then(leading_code),
        procedure_type_code: block.raw("PR").and_then(leading_code),
        total_value: None,
        performance_nuts_code: None,
        has_lots: false,
        lots: Vec::new(),
        awards,
    })
}

/// Labelled award lines of one `Award of contract` section
#[derive(Debug, Default)]
struct AwardSection {
    labels: Vec<(String, String)>,
}

impl AwardSection {
    fn get(&self, label: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, v)| v.trim().trim_end_matches('.').trim())
            .filter(|v| !v.is_empty())
    }
}

/// Split free text into award sections. Without explicit section headers the
/// whole text is one section, provided it carries award labels at all.
fn award_sections(tx: &str) -> Vec<AwardSection> {
    let mut sections: Vec<AwardSection> = Vec::new();
    let mut current = AwardSection::default();
    let mut in_section = false;
    let mut open_label = false;

    for line in tx.lines().map(str::trim) {
        if AWARD_SECTION.is_match(line) {
            if in_section || !current.labels.is_empty() {
                sections.push(std::mem::take(&mut current));
            }
            in_section = true;
            open_label = false;
            continue;
        }

        if let Some(caps) = AWARD_LABEL.captures(line) {
            current
                .labels
                .push((caps[1].to_lowercase(), caps[2].to_string()));
            open_label = true;
        } else if open_label && !line.is_empty() {
            if let Some((_, value)) = current.labels.last_mut() {
                value.push('\n');
                value.push_str(line);
            }
        }
    }

    if in_section || !current.labels.is_empty() {
        sections.push(current);
    }
    sections
}

fn parse_award(
    section: &AwardSection,
    assembly: &mut NoticeAssembly,
) -> Result<PendingAward, ExtractionError> {
    let scope = FieldScope::new(FORMAT, Entity::Award);

    let date_raw = scope.require("conclusion_date", section.get("date of award"))?;
    let conclusion_date = scope.day_first_date("conclusion_date", date_raw)?;

    let received = section
        .get("number of tenders received")
        .map(|raw| scope.count("tenders_received", raw))
        .transpose()?;

    let awarded_value = section
        .get("contract value")
        .map(|raw| parse_value(&scope, raw))
        .transpose()?;

    let contractors = section
        .get("name and address of successful tenderer")
        .and_then(|raw| assembly.keep(parse_tenderer(raw)))
        .map(|contractor| PendingContractor {
            contractor,
            is_lead: None,
            key: None,
        })
        .into_iter()
        .collect();

    Ok(PendingAward {
        award: Award {
            contract_number: None,
            lot_number: None,
            title: None,
            awarded: true,
            conclusion_date: Some(conclusion_date),
            non_award_reason: None,
            tenders: TenderStatistics {
                received,
                ..TenderStatistics::default()
            },
            awarded_value,
            subcontracted_value: None,
            contractors: Vec::new(),
        },
        contractors,
    })
}

/// `1 234 567 DEM` or `EUR 1 234 567`; the currency token is optional
fn parse_value(scope: &FieldScope, raw: &str) -> Result<MonetaryValue, ExtractionError> {
    let tokens: Vec<&str> = raw.split_whitespace().collect();

    let (currency, amount_tokens) = match tokens.as_slice() {
        [first, rest @ ..] if is_currency_code(first) => (Some(first.to_string()), rest),
        [rest @ .., last] if is_currency_code(last) => (Some(last.to_string()), rest),
        all => (None, all),
    };

    let amount = scope
        .amount("awarded_value", &amount_tokens.join(" "))
        .map_err(|_| scope.malformed("awarded_value", raw, "not a decimal amount with currency"))?;
    Ok(MonetaryValue { amount, currency })
}

fn is_currency_code(token: &str) -> bool {
    token.len() == 3 && token.chars().all(|c| c.is_ascii_uppercase())
}

/// Name before the first comma, remainder as address
fn parse_tenderer(raw: &str) -> Result<Contractor, ExtractionError> {
    let scope = FieldScope::new(FORMAT, Entity::Contractor);
    let text = clean_text(raw);
    let (name, address) = match text.as_deref().and_then(|t| t.split_once(',')) {
        Some((name, rest)) => (clean_text(name), clean_text(rest)),
        None => (text.clone(), None),
    };
    Ok(Contractor {
        name: scope.require("name", name)?,
        address,
        ..Contractor::default()
    })
}

//! Early structured XML notices (`INTERNAL_OJS`).
//!
//! One file per language rendition. Only the rendition in the working language
//! is extracted; the others are reported as [`ParseOutcome::LanguageExcluded`].
//! The same element may also appear wrapped in a `TED_EXPORT` envelope.

use super::common::{
    ContactPaths, ValuePaths, parse_xml, read_component_date, read_contracting_body, read_contractor,
    read_count, read_value,
};
use super::{NoticeAssembly, PendingAward, PendingContractor};
use crate::config::ExtractionConfig;
use crate::constants::{AWARD_NOTICE_CODE, roots};
use crate::error::ExtractionError;
use crate::fields::{FieldScope, clean_code};
use crate::models::{
    Award, Contract, ContractingBody, Document, Entity, NoticeFormat, ParseOutcome,
    TenderStatistics,
};
use crate::xml::Element;
use std::path::Path;
use tracing::debug;

const FORMAT: NoticeFormat = NoticeFormat::EarlyStructuredXml;

const FORM: &str = "FD_CONTRACT_AWARD_SUM";

const CONTACT: ContactPaths = ContactPaths {
    name: "ORGANISATION",
    national_id: None,
    address: "ADDRESS",
    town: "TOWN",
    postal_code: "POSTAL_CODE",
    country: "COUNTRY",
    nuts: None,
    contact_point: None,
    phone: "PHONE",
    email: "E_MAIL",
    fax: "FAX",
    url: Some("URL"),
};

/// Relative to `TOTAL_FINAL_VALUE`, which sits at varying depth in the form
const TOTAL_VALUE: ValuePaths = ValuePaths {
    element: "COSTS_RANGE_AND_CURRENCY_WITH_VAT_RATE",
    amount_child: Some("VALUE_COST"),
};

const AWARD_VALUE: ValuePaths = ValuePaths {
    element: "CONTRACT_VALUE_INFORMATION/COSTS_RANGE_AND_CURRENCY_WITH_VAT_RATE",
    amount_child: Some("VALUE_COST"),
};

pub fn parse(
    text: &str,
    filename: &str,
    config: &ExtractionConfig,
) -> Result<ParseOutcome, ExtractionError> {
    let root = parse_xml(text, filename, FORMAT)?;
    let ojs = notice_root(&root).ok_or_else(|| {
        ExtractionError::corrupt(filename, Some(FORMAT), "no INTERNAL_OJS element")
    })?;

    let type_code = ojs.raw_text_at("BIB_DOC_S/NAT_NOTICE").and_then(clean_code);
    if type_code.as_deref() != Some(AWARD_NOTICE_CODE) {
        debug!("{}: notice type {:?}, not an award notice", filename, type_code);
        return Ok(ParseOutcome::NotAnAwardNotice {
            format: FORMAT,
            type_code,
        });
    }

    let language = ojs
        .raw_text_at("BIB_INFO/REF_OJS/LG_OJ")
        .and_then(clean_code)
        .map(|lg| lg.to_ascii_uppercase())
        .or_else(|| filename_language(filename));
    let language = FieldScope::new(FORMAT, Entity::Document).require("language", language)?;
    if !config.is_working_language(&language) {
        debug!("{}: rendition in {}, skipped", filename, language);
        return Ok(ParseOutcome::LanguageExcluded {
            format: FORMAT,
            language,
        });
    }

    let document = parse_document(ojs, &root, language)?;
    let form = ojs.descendant(FORM);
    let contracting_body = parse_contracting_body(form)?;

    let mut assembly = NoticeAssembly::new(FORMAT);
    let contract = parse_contract(ojs, form, &mut assembly);
    let contracts = assembly.keep(contract).into_iter().collect();

    let notice = assembly.finish(document, contracting_body, contracts)?;
    debug!("{}: early notice {} parsed", filename, notice.document.identifier);
    Ok(ParseOutcome::Document(Box::new(notice)))
}

/// `INTERNAL_OJS` as the root or directly inside an export envelope
fn notice_root(root: &Element) -> Option<&Element> {
    if root.name() == roots::EARLY_STRUCTURED {
        Some(root)
    } else if root.name() == roots::UNIFIED_EXPORT {
        root.child(roots::EARLY_STRUCTURED)
    } else {
        None
    }
}

/// Two-letter language suffix: `notice.en`, `012345-2008_EN.xml`
fn filename_language(filename: &str) -> Option<String> {
    let path = Path::new(filename);
    let extension = path.extension()?.to_str()?;
    let candidate = if extension.eq_ignore_ascii_case("xml") {
        path.file_stem()?.to_str()?.rsplit(['_', '.', '-']).next()?
    } else {
        extension
    };
    (candidate.len() == 2 && candidate.chars().all(|c| c.is_ascii_alphabetic()))
        .then(|| candidate.to_ascii_uppercase())
}

fn parse_document(
    ojs: &Element,
    root: &Element,
    language: String,
) -> Result<Document, ExtractionError> {
    let scope = FieldScope::new(FORMAT, Entity::Document);

    let identifier = scope.require("identifier", ojs.text_at("BIB_DOC_S/NO_DOC_OJS"))?;
    let publication_raw = scope.require(
        "publication_date",
        ojs.raw_text_at("BIB_INFO/REF_OJS/DATE_PUB"),
    )?;
    let publication_date = scope.compact_date("publication_date", publication_raw)?;

    let optional_date = |path: &str, field: &'static str| {
        ojs.raw_text_at(path)
            .map(|raw| scope.compact_date(field, raw))
            .transpose()
    };

    Ok(Document {
        journal_reference: Some(identifier.clone()),
        identifier,
        format: FORMAT,
        sub_revision: None,
        publication_date,
        document_type_code: AWARD_NOTICE_CODE.to_string(),
        original_language: ojs.raw_text_at("BIB_DOC_S/LG_ORIG").and_then(clean_code),
        language: Some(language),
        source_country: ojs
            .raw_text_at("BIB_DOC_S/ISO_COUNTRY")
            .and_then(clean_code)
            .or_else(|| ojs.attr_at("BIB_DOC_S/ISO_COUNTRY", "VALUE")),
        schema_version: ojs.attr("VERSION").or_else(|| root.attr("VERSION")).and_then(clean_code),
        dispatch_date: optional_date("BIB_DOC_S/DATE_DISP", "dispatch_date")?,
        deletion_date: optional_date("TECHNICAL_INFO/DELETION_DATE", "deletion_date")?,
        reception_id: None,
        english_title: None,
    })
}

fn parse_contracting_body(form: Option<&Element>) -> Result<ContractingBody, ExtractionError> {
    match form.and_then(|f| f.descendant("CA_CE_CONCESSIONAIRE_PROFILE")) {
        Some(profile) => read_contracting_body(profile, &CONTACT, FORMAT),
        None => Err(ExtractionError::missing(FORMAT, Entity::ContractingBody, "name")),
    }
}

fn parse_contract(
    ojs: &Element,
    form: Option<&Element>,
    assembly: &mut NoticeAssembly,
) -> Result<Contract, ExtractionError> {
    let scope = FieldScope::new(FORMAT, Entity::Contract);
    let title = scope.require("title", ojs.text_at("BIB_DOC_S/TI_DOC"))?;

    let total_value = match form.and_then(|f| f.descendant("TOTAL_FINAL_VALUE")) {
        Some(total) => read_value(total, &TOTAL_VALUE, &scope, "total_value")?,
        None => None,
    };

    let mut awards = Vec::new();
    if let Some(form) = form {
        for element in form.find_all("AWARD_OF_CONTRACT_SUM") {
            let award = parse_award(element, assembly);
            if let Some(pending) = assembly.keep(award) {
                awards.push(assembly.register_award(pending));
            }
        }
    }

    Ok(Contract {
        title,
        reference_number: None,
        short_description: form
            .and_then(|f| f.descendant("DESCRIPTION_SUM"))
            .and_then(Element::deep_text),
        main_cpv_code: ojs
            .raw_text_at("BIB_DOC_S/ORIGINAL_CPV")
            .and_then(clean_code)
            .or_else(|| ojs.attr_at("BIB_DOC_S/ORIGINAL_CPV", "CODE")),
        additional_cpv_codes: Vec::new(),
        contract_nature_code: ojs.raw_text_at("CODIF_DATA/NC_CONTRACT_NATURE").and_then(clean_code),
        procedure_type_code: ojs.raw_text_at("CODIF_DATA/PR_PROC").and_then(clean_code),
        total_value,
        performance_nuts_code: None,
        has_lots: false,
        lots: Vec::new(),
        awards,
    })
}

fn parse_award(
    element: &Element,
    assembly: &mut NoticeAssembly,
) -> Result<PendingAward, ExtractionError> {
    let scope = FieldScope::new(FORMAT, Entity::Award);

    let date = scope.require("conclusion_date", element.find("CONTRACT_AWARD_DATE"))?;
    let conclusion_date = read_component_date(date, &scope, "conclusion_date")?;
    let received = read_count(element, Some("OFFERS_RECEIVED_NUMBER"), &scope, "tenders_received")?;
    let awarded_value = read_value(element, &AWARD_VALUE, &scope, "awarded_value")?;

    let contractors = element
        .find_all("ECONOMIC_OPERATOR_NAME_ADDRESS/CONTACT_DATA_WITHOUT_RESPONSIBLE_NAME")
        .into_iter()
        .filter_map(|contact| assembly.keep(read_contractor(contact, &CONTACT, FORMAT)))
        .map(|contractor| PendingContractor {
            contractor,
            is_lead: None,
            key: None,
        })
        .collect();

    Ok(PendingAward {
        award: Award {
            contract_number: element.text_at("CONTRACT_NUMBER"),
            lot_number: element.raw_text_at("LOT_NUMBER").and_then(clean_code),
            title: element.text_at("CONTRACT_TITLE"),
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

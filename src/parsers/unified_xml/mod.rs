//! Unified namespaced XML notices (`TED_EXPORT`), sub-revisions R2.0.7 to R2.0.9.
//!
//! The coded data, technical and translation sections are shared by every
//! sub-revision and read here directly. The form section differs, so each
//! sub-revision gets its own path table in [`paths`]; the extraction code is
//! the same for all three.
//!
//! The sub-revision is resolved from the declared version (`VERSION`, then
//! `xsi:schemaLocation`, then the namespace URI) and must agree with the form
//! element actually present. A disagreement fails the document.

mod paths;

use self::paths::{DatePath, FieldPaths, LotPaths};
use super::common::{parse_xml, read_component_date, read_contracting_body, read_contractor, read_count, read_value};
use super::{NoticeAssembly, PendingAward, PendingContractor};
use crate::constants::{AWARD_NOTICE_CODE, roots};
use crate::error::ExtractionError;
use crate::fields::{FieldScope, clean_code};
use crate::models::{
    Award, Contract, ContractingBody, Contractor, Document, Entity, Lot, NoticeFormat,
    ParseOutcome, SubRevision, TenderStatistics,
};
use crate::xml::Element;
use tracing::debug;

const FORMAT: NoticeFormat = NoticeFormat::UnifiedNamespacedXml;

const SUB_REVISIONS: [SubRevision; 3] = [SubRevision::R207, SubRevision::R208, SubRevision::R209];

/// Language of the translated title and authority name blocks
const TRANSLATION_LANGUAGE: &str = "EN";

pub fn parse(text: &str, filename: &str) -> Result<ParseOutcome, ExtractionError> {
    let root = parse_xml(text, filename, FORMAT)?;
    if root.name() != roots::UNIFIED_EXPORT {
        return Err(ExtractionError::corrupt(
            filename,
            Some(FORMAT),
            format!("unexpected root element <{}>", root.name()),
        ));
    }

    let type_code = root.attr_at("CODED_DATA_SECTION/CODIF_DATA/TD_DOCUMENT_TYPE", "CODE");
    if type_code.as_deref() != Some(AWARD_NOTICE_CODE) {
        debug!("{}: document type {:?}, not an award notice", filename, type_code);
        return Ok(ParseOutcome::NotAnAwardNotice {
            format: FORMAT,
            type_code,
        });
    }

    let revision = resolve_sub_revision(&root)?;
    let paths = paths::for_revision(revision);
    let form = select_form(&root, paths, filename)?;
    debug!("{}: sub-revision {}, form <{}>", filename, revision, paths.form);

    let document = parse_document(&root, form, revision)?;
    let contracting_body = parse_contracting_body(&root, form, paths)?;

    let mut assembly = NoticeAssembly::new(FORMAT);
    let contract = parse_contract(&root, form, paths, &mut assembly);
    let contracts = assembly.keep(contract).into_iter().collect();

    let notice = assembly.finish(document, contracting_body, contracts)?;
    debug!(
        "{}: {} contract(s), {} contractor(s), {} dropped",
        filename,
        notice.contracts.len(),
        notice.contractors.len(),
        notice.dropped.len()
    );
    Ok(ParseOutcome::Document(Box::new(notice)))
}

/// First declaration naming a known sub-revision, else the first declaration
fn version_marker(root: &Element) -> Option<&str> {
    let declared: Vec<&str> = [root.attr("VERSION"), root.attr("schemaLocation"), root.namespace()]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|marker| !marker.is_empty())
        .collect();

    declared
        .iter()
        .copied()
        .find(|marker| {
            SUB_REVISIONS
                .iter()
                .any(|revision| marker.contains(revision.version_marker()))
        })
        .or_else(|| declared.first().copied())
}

/// Declared sub-revision, checked against the form element present
pub(crate) fn resolve_sub_revision(root: &Element) -> Result<SubRevision, ExtractionError> {
    let scope = FieldScope::new(FORMAT, Entity::Document);
    let marker = scope.require("schema_version", version_marker(root))?;

    let declared = SUB_REVISIONS
        .into_iter()
        .find(|revision| marker.contains(revision.version_marker()))
        .ok_or_else(|| scope.malformed("schema_version", marker, "unknown schema sub-revision"))?;

    let form = paths::for_revision(declared).form;
    if root.find(&format!("FORM_SECTION/{form}")).is_none() {
        return Err(scope.malformed(
            "schema_version",
            marker,
            format!("{declared} declared but no <{form}> form present"),
        ));
    }
    Ok(declared)
}

/// The single form, or the one marked as the original when several
/// language versions are bundled
fn select_form<'a>(
    root: &'a Element,
    paths: &FieldPaths,
    filename: &str,
) -> Result<&'a Element, ExtractionError> {
    let forms = root.find_all(&format!("FORM_SECTION/{}", paths.form));
    match forms.as_slice() {
        [only] => Ok(*only),
        _ => forms
            .iter()
            .copied()
            .find(|form| form.attr("CATEGORY") == Some("ORIGINAL"))
            .ok_or_else(|| {
                ExtractionError::corrupt(
                    filename,
                    Some(FORMAT),
                    format!("{} <{}> forms and none marked ORIGINAL", forms.len(), paths.form),
                )
            }),
    }
}

/// Entry of a translation list in the translation language
fn translated<'a>(root: &'a Element, path: &str) -> Option<&'a Element> {
    root.find_all(path)
        .into_iter()
        .find(|entry| entry.attr("LG") == Some(TRANSLATION_LANGUAGE))
}

fn parse_document(
    root: &Element,
    form: &Element,
    revision: SubRevision,
) -> Result<Document, ExtractionError> {
    let scope = FieldScope::new(FORMAT, Entity::Document);

    let identifier = scope.require("identifier", root.attr("DOC_ID").and_then(clean_code))?;
    let publication_raw = scope.require(
        "publication_date",
        root.raw_text_at("CODED_DATA_SECTION/REF_OJS/DATE_PUB"),
    )?;
    let publication_date = scope.compact_date("publication_date", publication_raw)?;

    let optional_date = |path: &str, field: &'static str| {
        root.raw_text_at(path)
            .map(|raw| scope.compact_date(field, raw))
            .transpose()
    };

    Ok(Document {
        identifier,
        format: FORMAT,
        sub_revision: Some(revision),
        publication_date,
        document_type_code: AWARD_NOTICE_CODE.to_string(),
        original_language: root
            .raw_text_at("CODED_DATA_SECTION/NOTICE_DATA/LG_ORIG")
            .and_then(clean_code),
        language: form.attr("LG").and_then(clean_code),
        source_country: root.attr_at("CODED_DATA_SECTION/NOTICE_DATA/ISO_COUNTRY", "VALUE"),
        schema_version: root
            .attr("VERSION")
            .or_else(|| form.attr("VERSION"))
            .and_then(clean_code),
        dispatch_date: optional_date(
            "CODED_DATA_SECTION/CODIF_DATA/DS_DATE_DISPATCH",
            "dispatch_date",
        )?,
        deletion_date: optional_date("TECHNICAL_SECTION/DELETION_DATE", "deletion_date")?,
        journal_reference: root.text_at("CODED_DATA_SECTION/NOTICE_DATA/NO_DOC_OJS"),
        reception_id: root.text_at("TECHNICAL_SECTION/RECEPTION_ID"),
        english_title: translated(root, "TRANSLATION_SECTION/ML_TITLES/ML_TI_DOC")
            .and_then(|entry| entry.text_at("TI_TEXT")),
    })
}

fn parse_contracting_body(
    root: &Element,
    form: &Element,
    paths: &FieldPaths,
) -> Result<ContractingBody, ExtractionError> {
    let element = form
        .find(paths.body)
        .ok_or_else(|| ExtractionError::missing(FORMAT, Entity::ContractingBody, "name"))?;

    let mut body = read_contracting_body(element, &paths.body_contact, FORMAT)?;
    body.english_name = translated(root, "TRANSLATION_SECTION/ML_AA_NAMES/AA_NAME")
        .and_then(Element::deep_text);
    body.url_general = form.text_at(paths.body_url_general);
    body.url_buyer = form.text_at(paths.body_url_buyer);
    body.authority_type_code =
        root.attr_at("CODED_DATA_SECTION/CODIF_DATA/AA_AUTHORITY_TYPE", "CODE");
    body.main_activity_code =
        root.attr_at("CODED_DATA_SECTION/CODIF_DATA/MA_MAIN_ACTIVITIES", "CODE");
    Ok(body)
}

fn parse_contract(
    root: &Element,
    form: &Element,
    paths: &FieldPaths,
    assembly: &mut NoticeAssembly,
) -> Result<Contract, ExtractionError> {
    let scope = FieldScope::new(FORMAT, Entity::Contract);
    let title = scope.require("title", form.text_at(paths.title))?;
    let total_value = read_value(form, &paths.total_value, &scope, "total_value")?;

    let mut additional_cpv_codes: Vec<String> = Vec::new();
    for code in form
        .find_all(paths.additional_cpv)
        .into_iter()
        .filter_map(|e| e.attr("CODE").and_then(clean_code))
    {
        if !additional_cpv_codes.contains(&code) {
            additional_cpv_codes.push(code);
        }
    }

    let lots = match &paths.lots {
        Some(lot_paths) => form
            .find_all(lot_paths.element)
            .into_iter()
            .filter_map(|element| {
                let lot = parse_lot(element, lot_paths)?;
                assembly.keep(lot)
            })
            .collect(),
        None => Vec::new(),
    };

    let mut awards = Vec::new();
    for element in form.find_all(paths.award) {
        let award = parse_award(element, paths, assembly);
        if let Some(pending) = assembly.keep(award) {
            awards.push(assembly.register_award(pending));
        }
    }

    Ok(Contract {
        title,
        reference_number: form.text_at(paths.reference_number),
        short_description: form.text_at(paths.short_description),
        main_cpv_code: form.attr_at(paths.main_cpv, "CODE"),
        additional_cpv_codes,
        contract_nature_code: root.attr_at("CODED_DATA_SECTION/CODIF_DATA/NC_CONTRACT_NATURE", "CODE"),
        procedure_type_code: root.attr_at("CODED_DATA_SECTION/CODIF_DATA/PR_PROC", "CODE"),
        total_value,
        performance_nuts_code: paths.performance_nuts.and_then(|p| form.attr_at(p, "CODE")),
        has_lots: paths.lot_division.is_some_and(|p| form.find(p).is_some()),
        lots,
        awards,
    })
}

/// A lot description; object descriptions without a lot number are not lots
fn parse_lot(element: &Element, paths: &LotPaths) -> Option<Result<Lot, ExtractionError>> {
    let lot_number = element.raw_text_at(paths.number).and_then(clean_code)?;
    let scope = FieldScope::new(FORMAT, Entity::Lot);
    Some(
        read_value(element, &paths.estimated_value, &scope, "estimated_value").map(
            |estimated_value| Lot {
                lot_number,
                title: element.text_at(paths.title),
                short_description: element.text_at(paths.short_description),
                estimated_value,
                performance_nuts_code: element.attr_at(paths.nuts, "CODE"),
            },
        ),
    )
}

fn parse_award(
    element: &Element,
    paths: &FieldPaths,
    assembly: &mut NoticeAssembly,
) -> Result<PendingAward, ExtractionError> {
    let scope = FieldScope::new(FORMAT, Entity::Award);

    let mut award = Award {
        contract_number: element.text_at(paths.award_contract_number),
        lot_number: element.raw_text_at(paths.award_lot_number).and_then(clean_code),
        title: element.text_at(paths.award_title),
        awarded: true,
        conclusion_date: None,
        non_award_reason: None,
        tenders: TenderStatistics::default(),
        awarded_value: None,
        subcontracted_value: None,
        contractors: Vec::new(),
    };

    if let Some(marker) = paths.no_award.and_then(|p| element.find(p)) {
        award.awarded = false;
        award.non_award_reason = marker.children().next().map(|reason| reason.name().to_string());
        return Ok(PendingAward {
            award,
            contractors: Vec::new(),
        });
    }

    award.conclusion_date = Some(match paths.award_date {
        DatePath::Components(path) => {
            let date = scope.require("conclusion_date", element.find(path))?;
            read_component_date(date, &scope, "conclusion_date")?
        }
        DatePath::IsoText(path) => {
            let raw = scope.require("conclusion_date", element.raw_text_at(path))?;
            scope.iso_date("conclusion_date", raw)?
        }
    });

    let tenders = &paths.tenders;
    award.tenders = TenderStatistics {
        received: read_count(element, tenders.received, &scope, "tenders_received")?,
        received_sme: read_count(element, tenders.sme, &scope, "tenders_received_sme")?,
        received_other_eu: read_count(element, tenders.other_eu, &scope, "tenders_received_other_eu")?,
        received_non_eu: read_count(element, tenders.non_eu, &scope, "tenders_received_non_eu")?,
        received_electronic: read_count(
            element,
            tenders.electronic,
            &scope,
            "tenders_received_electronic",
        )?,
    };

    award.awarded_value = read_value(element, &paths.award_value, &scope, "awarded_value")?;
    award.subcontracted_value = match &paths.subcontracted_value {
        Some(value_paths) => read_value(element, value_paths, &scope, "subcontracted_value")?,
        None => None,
    };

    let contractors = element
        .find_all(paths.contractor)
        .into_iter()
        .filter_map(|entry| assembly.keep(parse_contractor(entry, paths)))
        .map(|contractor| PendingContractor {
            contractor,
            is_lead: None,
            key: None,
        })
        .collect();

    Ok(PendingAward { award, contractors })
}

fn parse_contractor(element: &Element, paths: &FieldPaths) -> Result<Contractor, ExtractionError> {
    let scope = FieldScope::new(FORMAT, Entity::Contractor);
    let address = element
        .find(paths.contractor_address)
        .ok_or_else(|| scope.missing("name"))?;
    let mut contractor = read_contractor(address, &paths.contractor_contact, FORMAT)?;

    if let Some((sme, no_sme)) = paths.contractor_sme {
        contractor.is_sme = match (element.has_child(sme), element.has_child(no_sme)) {
            (true, false) => Some(true),
            (false, true) => Some(false),
            (false, false) => None,
            (true, true) => {
                return Err(scope.malformed(
                    "is_sme",
                    &format!("{sme} {no_sme}"),
                    "both SME markers present",
                ));
            }
        };
    }
    Ok(contractor)
}

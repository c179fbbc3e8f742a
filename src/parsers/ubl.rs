//! UBL contract award notices (eForms `ContractAwardNotice`).
//!
//! Results live in the eForms extension and are linked by identifier:
//!
//! ```text
//! LotResult --SettledContract/ID--> SettledContract --LotTender/ID--> LotTender
//!     LotTender --TenderingParty/ID--> TenderingParty --Tenderer/ID--> Organization
//! ```
//!
//! Each settled contract of a winning lot result becomes one award; a lot
//! result without a winner becomes one award flagged as not awarded. Every
//! reference must resolve: a dangling identifier drops the entity holding it.

use super::common::parse_xml;
use super::{NoticeAssembly, PendingAward, PendingContractor};
use crate::constants::{UBL_RESULT_LIST_NAME, roots};
use crate::error::ExtractionError;
use crate::fields::{FieldScope, clean_code};
use crate::models::{
    Award, Contract, ContractingBody, Contractor, Document, Entity, Lot, MonetaryValue,
    NoticeFormat, ParseOutcome, TenderStatistics,
};
use crate::xml::Element;
use std::collections::HashMap;
use tracing::debug;

const FORMAT: NoticeFormat = NoticeFormat::UblStandard;

const EXTENSION: &str = "UBLExtensions/UBLExtension/ExtensionContent/EformsExtension";

/// Winner-selection status of a lot result with a chosen tender
const WINNER_SELECTED: &str = "selec-w";

/// Elements of the eForms extension, keyed by their identifiers
#[derive(Debug, Default)]
struct ResultIndex<'a> {
    settled_contracts: HashMap<&'a str, &'a Element>,
    lot_tenders: HashMap<&'a str, &'a Element>,
    tendering_parties: HashMap<&'a str, &'a Element>,
    /// `Company` elements by party identifier
    organizations: HashMap<&'a str, &'a Element>,
}

fn by_id<'a>(
    elements: impl IntoIterator<Item = &'a Element>,
    id_path: &str,
) -> HashMap<&'a str, &'a Element> {
    elements
        .into_iter()
        .filter_map(|element| element.raw_text_at(id_path).map(|id| (id, element)))
        .collect()
}

impl<'a> ResultIndex<'a> {
    fn build(extension: Option<&'a Element>) -> Self {
        let Some(extension) = extension else {
            return Self::default();
        };
        let results = extension.find("NoticeResult");
        let children = |name: &'static str| {
            results
                .into_iter()
                .flat_map(move |result| result.children_named(name))
        };

        Self {
            settled_contracts: by_id(children("SettledContract"), "ID"),
            lot_tenders: by_id(children("LotTender"), "ID"),
            tendering_parties: by_id(children("TenderingParty"), "ID"),
            organizations: by_id(
                extension.find_all("Organizations/Organization/Company"),
                "PartyIdentification/ID",
            ),
        }
    }
}

pub fn parse(text: &str, filename: &str) -> Result<ParseOutcome, ExtractionError> {
    let root = parse_xml(text, filename, FORMAT)?;
    if root.name() != roots::UBL_AWARD_NOTICE {
        return Err(ExtractionError::corrupt(
            filename,
            Some(FORMAT),
            format!("unexpected root element <{}>", root.name()),
        ));
    }

    let notice_type = root.child("NoticeTypeCode");
    let type_code = notice_type.and_then(|e| clean_code(e.own_text()));
    if notice_type.and_then(|e| e.attr("listName")) != Some(UBL_RESULT_LIST_NAME) {
        debug!("{}: notice type {:?}, not a result notice", filename, type_code);
        return Ok(ParseOutcome::NotAnAwardNotice {
            format: FORMAT,
            type_code,
        });
    }

    let extension = root.find(EXTENSION);
    let document = parse_document(&root, extension, type_code)?;
    let index = ResultIndex::build(extension);
    let contracting_body = parse_contracting_body(&root, &index)?;

    let mut assembly = NoticeAssembly::new(FORMAT);
    let contract = parse_contract(&root, extension, &index, &mut assembly);
    let contracts = assembly.keep(contract).into_iter().collect();

    let notice = assembly.finish(document, contracting_body, contracts)?;
    debug!(
        "{}: UBL notice {} with {} award(s)",
        filename,
        notice.document.identifier,
        notice.awards().count()
    );
    Ok(ParseOutcome::Document(Box::new(notice)))
}

fn parse_document(
    root: &Element,
    extension: Option<&Element>,
    type_code: Option<String>,
) -> Result<Document, ExtractionError> {
    let scope = FieldScope::new(FORMAT, Entity::Document);
    let publication = extension.and_then(|e| e.find("Publication"));

    let identifier = scope.require(
        "identifier",
        publication.and_then(|p| p.raw_text_at("NoticePublicationID")).and_then(clean_code),
    )?;
    let publication_raw = scope.require(
        "publication_date",
        publication.and_then(|p| p.raw_text_at("PublicationDate")),
    )?;
    let publication_date = scope.iso_date("publication_date", publication_raw)?;
    let dispatch_date = root
        .raw_text_at("IssueDate")
        .map(|raw| scope.iso_date("dispatch_date", raw))
        .transpose()?;

    Ok(Document {
        identifier,
        format: FORMAT,
        sub_revision: None,
        publication_date,
        document_type_code: scope.require("document_type_code", type_code)?,
        original_language: root.raw_text_at("NoticeLanguageCode").and_then(clean_code),
        language: root.attr_at("ProcurementProject/Name", "languageID"),
        source_country: None,
        schema_version: root.raw_text_at("CustomizationID").and_then(clean_code),
        dispatch_date,
        deletion_date: None,
        journal_reference: publication.and_then(|p| p.text_at("GazetteID")),
        reception_id: None,
        english_title: None,
    })
}

/// Address and contact fields of an eForms `Company`
struct CompanyFields {
    name: String,
    national_id: Option<String>,
    address: Option<String>,
    town: Option<String>,
    postal_code: Option<String>,
    country_code: Option<String>,
    nuts_code: Option<String>,
    contact_point: Option<String>,
    phone: Option<String>,
    email: Option<String>,
    fax: Option<String>,
    url: Option<String>,
}

fn read_company(company: &Element, entity: Entity) -> Result<CompanyFields, ExtractionError> {
    let scope = FieldScope::new(FORMAT, entity);
    Ok(CompanyFields {
        name: scope.require("name", company.text_at("PartyName/Name"))?,
        national_id: company.text_at("PartyLegalEntity/CompanyID"),
        address: company.text_at("PostalAddress/StreetName"),
        town: company.text_at("PostalAddress/CityName"),
        postal_code: company.text_at("PostalAddress/PostalZone"),
        country_code: company
            .raw_text_at("PostalAddress/Country/IdentificationCode")
            .and_then(clean_code),
        nuts_code: company
            .raw_text_at("PostalAddress/CountrySubentityCode")
            .and_then(clean_code),
        contact_point: company.text_at("Contact/Name"),
        phone: company.text_at("Contact/Telephone"),
        email: company.text_at("Contact/ElectronicMail"),
        fax: company.text_at("Contact/Telefax"),
        url: company.text_at("WebsiteURI"),
    })
}

/// The organization named as contracting party; no identifier, no buyer
fn parse_contracting_body(
    root: &Element,
    index: &ResultIndex<'_>,
) -> Result<ContractingBody, ExtractionError> {
    let scope = FieldScope::new(FORMAT, Entity::ContractingBody);
    let party = root.child("ContractingParty");
    let id = scope.require(
        "organization_id",
        party.and_then(|p| p.raw_text_at("Party/PartyIdentification/ID")),
    )?;
    let company = index
        .organizations
        .get(id)
        .ok_or_else(|| scope.malformed("organization_id", id, "no organization with this identifier"))?;

    let fields = read_company(company, Entity::ContractingBody)?;
    Ok(ContractingBody {
        name: fields.name,
        english_name: None,
        national_id: fields.national_id,
        address: fields.address,
        town: fields.town,
        postal_code: fields.postal_code,
        country_code: fields.country_code,
        nuts_code: fields.nuts_code,
        contact_point: fields.contact_point,
        phone: fields.phone,
        email: fields.email,
        fax: fields.fax,
        url_general: fields.url,
        url_buyer: party.and_then(|p| p.text_at("BuyerProfileURI")),
        authority_type_code: party
            .and_then(|p| p.raw_text_at("ContractingPartyType/PartyTypeCode"))
            .and_then(clean_code),
        main_activity_code: party
            .and_then(|p| p.raw_text_at("ContractingActivity/ActivityTypeCode"))
            .and_then(clean_code),
    })
}

/// Schema decimal amount with its `currencyID` attribute
fn read_amount(
    context: &Element,
    path: &str,
    scope: &FieldScope,
    field: &'static str,
) -> Result<Option<MonetaryValue>, ExtractionError> {
    let Some(element) = context.find(path) else {
        return Ok(None);
    };
    let raw = element.own_text().trim();
    if raw.is_empty() {
        return Ok(None);
    }
    Ok(Some(MonetaryValue {
        amount: scope.machine_amount(field, raw)?,
        currency: element.attr("currencyID").and_then(clean_code),
    }))
}

fn parse_contract(
    root: &Element,
    extension: Option<&Element>,
    index: &ResultIndex<'_>,
    assembly: &mut NoticeAssembly,
) -> Result<Contract, ExtractionError> {
    let scope = FieldScope::new(FORMAT, Entity::Contract);
    let project = root.child("ProcurementProject");
    let title = scope.require("title", project.and_then(|p| p.text_at("Name")))?;

    let results = extension.and_then(|e| e.find("NoticeResult"));
    let total_value = match results {
        Some(results) => read_amount(results, "TotalAmount", &scope, "total_value")?,
        None => None,
    };

    let lots: Vec<Lot> = root
        .children_named("ProcurementProjectLot")
        .filter(|lot| lot.find("ID").and_then(|id| id.attr("schemeName")) != Some("Part"))
        .filter_map(|lot| assembly.keep(parse_lot(lot)))
        .collect();

    let mut awards = Vec::new();
    for result in results.into_iter().flat_map(|r| r.children_named("LotResult")) {
        for pending in lot_result_awards(result, index, assembly) {
            awards.push(assembly.register_award(pending));
        }
    }

    let additional_cpv_codes = project
        .map(|p| {
            p.find_all("AdditionalCommodityClassification/ItemClassificationCode")
                .into_iter()
                .filter_map(|code| clean_code(code.own_text()))
                .collect()
        })
        .unwrap_or_default();

    Ok(Contract {
        title,
        reference_number: project.and_then(|p| p.text_at("ID")),
        short_description: project.and_then(|p| p.text_at("Description")),
        main_cpv_code: project
            .and_then(|p| p.raw_text_at("MainCommodityClassification/ItemClassificationCode"))
            .and_then(clean_code),
        additional_cpv_codes,
        contract_nature_code: project
            .and_then(|p| p.raw_text_at("ProcurementTypeCode"))
            .and_then(clean_code),
        procedure_type_code: root
            .raw_text_at("TenderingProcess/ProcedureCode")
            .and_then(clean_code),
        total_value,
        performance_nuts_code: project
            .and_then(|p| p.raw_text_at("RealizedLocation/Address/CountrySubentityCode"))
            .and_then(clean_code),
        // eForms describes even a single purchase as one lot
        has_lots: !lots.is_empty(),
        lots,
        awards,
    })
}

fn parse_lot(lot: &Element) -> Result<Lot, ExtractionError> {
    let scope = FieldScope::new(FORMAT, Entity::Lot);
    Ok(Lot {
        lot_number: scope.require("lot_number", lot.raw_text_at("ID").and_then(clean_code))?,
        title: lot.text_at("ProcurementProject/Name"),
        short_description: lot.text_at("ProcurementProject/Description"),
        estimated_value: read_amount(
            lot,
            "ProcurementProject/RequestedTenderTotal/EstimatedOverallContractAmount",
            &scope,
            "estimated_value",
        )?,
        performance_nuts_code: lot
            .raw_text_at("ProcurementProject/RealizedLocation/Address/CountrySubentityCode")
            .and_then(clean_code),
    })
}

/// Awards of one lot result. Failures are recorded in the assembly.
fn lot_result_awards(
    result: &Element,
    index: &ResultIndex<'_>,
    assembly: &mut NoticeAssembly,
) -> Vec<PendingAward> {
    let Some(base) = assembly.keep(lot_result_base(result)) else {
        return Vec::new();
    };

    if !base.awarded {
        return vec![PendingAward {
            award: base,
            contractors: Vec::new(),
        }];
    }

    let contract_ids: Vec<&str> = result
        .children_named("SettledContract")
        .filter_map(|c| c.raw_text_at("ID"))
        .collect();
    if contract_ids.is_empty() {
        assembly.drop_entity(ExtractionError::missing(FORMAT, Entity::Award, "conclusion_date"));
        return Vec::new();
    }

    let mut awards = Vec::new();
    for id in contract_ids {
        let award = settled_contract_award(&base, id, index, assembly);
        if let Some(award) = assembly.keep(award) {
            awards.push(award);
        }
    }
    awards
}

/// Fields shared by every award of a lot result
fn lot_result_base(result: &Element) -> Result<Award, ExtractionError> {
    let scope = FieldScope::new(FORMAT, Entity::Award);
    let code = scope.require("result_code", result.raw_text_at("TenderResultCode"))?;
    let awarded = code == WINNER_SELECTED;

    Ok(Award {
        contract_number: None,
        lot_number: result.raw_text_at("TenderLot/ID").and_then(clean_code),
        title: None,
        awarded,
        conclusion_date: None,
        non_award_reason: if awarded {
            None
        } else {
            result
                .raw_text_at("DecisionReason/DecisionReasonCode")
                .or(Some(code))
                .and_then(clean_code)
        },
        tenders: submission_statistics(result, &scope)?,
        awarded_value: None,
        subcontracted_value: None,
        contractors: Vec::new(),
    })
}

fn submission_statistics(
    result: &Element,
    scope: &FieldScope,
) -> Result<TenderStatistics, ExtractionError> {
    let mut tenders = TenderStatistics::default();
    for statistic in result.children_named("ReceivedSubmissionsStatistics") {
        let (slot, field) = match statistic.raw_text_at("StatisticsCode") {
            Some("tenders") => (&mut tenders.received, "tenders_received"),
            Some("t-sme") => (&mut tenders.received_sme, "tenders_received_sme"),
            Some("t-oth-eu") => (&mut tenders.received_other_eu, "tenders_received_other_eu"),
            Some("t-no-eea") => (&mut tenders.received_non_eu, "tenders_received_non_eu"),
            Some("t-esubm") => (&mut tenders.received_electronic, "tenders_received_electronic"),
            _ => continue,
        };
        if let Some(raw) = statistic.raw_text_at("StatisticsNumeric") {
            *slot = Some(scope.count(field, raw)?);
        }
    }
    Ok(tenders)
}

fn settled_contract_award(
    base: &Award,
    contract_id: &str,
    index: &ResultIndex<'_>,
    assembly: &mut NoticeAssembly,
) -> Result<PendingAward, ExtractionError> {
    let scope = FieldScope::new(FORMAT, Entity::Award);
    let contract = index.settled_contracts.get(contract_id).ok_or_else(|| {
        scope.malformed(
            "settled_contract",
            contract_id,
            "no settled contract with this identifier",
        )
    })?;

    let date_raw = scope.require("conclusion_date", contract.raw_text_at("IssueDate"))?;
    let conclusion_date = scope.iso_date("conclusion_date", date_raw)?;

    let tenders = contract
        .children_named("LotTender")
        .filter_map(|t| t.raw_text_at("ID"))
        .map(|id| {
            index
                .lot_tenders
                .get(id)
                .copied()
                .ok_or_else(|| scope.malformed("lot_tender", id, "no tender with this identifier"))
        })
        .collect::<Result<Vec<_>, _>>()?;

    // A value is only attributable when the contract settles a single tender
    let awarded_value = match tenders.as_slice() {
        [tender] => read_amount(tender, "LegalMonetaryTotal/PayableAmount", &scope, "awarded_value")?,
        _ => None,
    };

    let mut contractors = Vec::new();
    for tender in &tenders {
        let party_id = scope.require("tendering_party", tender.raw_text_at("TenderingParty/ID"))?;
        let party = index.tendering_parties.get(party_id).ok_or_else(|| {
            scope.malformed(
                "tendering_party",
                party_id,
                "no tendering party with this identifier",
            )
        })?;
        for tenderer in party.children_named("Tenderer") {
            if let Some(pending) = assembly.keep(read_tenderer(tenderer, index)) {
                contractors.push(pending);
            }
        }
    }

    Ok(PendingAward {
        award: Award {
            contract_number: contract.text_at("ContractReference/ID"),
            title: contract.text_at("Title"),
            conclusion_date: Some(conclusion_date),
            awarded_value,
            ..base.clone()
        },
        contractors,
    })
}

fn read_tenderer(
    tenderer: &Element,
    index: &ResultIndex<'_>,
) -> Result<PendingContractor, ExtractionError> {
    let scope = FieldScope::new(FORMAT, Entity::Contractor);
    let id = scope.require("organization_id", tenderer.raw_text_at("ID"))?;
    let company = index
        .organizations
        .get(id)
        .ok_or_else(|| scope.malformed("organization_id", id, "no organization with this identifier"))?;

    let fields = read_company(company, Entity::Contractor)?;
    let is_sme = company
        .raw_text_at("CompanySizeCode")
        .map(|raw| match raw {
            "sme" | "micro" | "small" | "medium" => Ok(true),
            "large" => Ok(false),
            other => Err(scope.malformed("is_sme", other, "unknown company size code")),
        })
        .transpose()?;
    let is_lead = tenderer
        .raw_text_at("GroupLeadIndicator")
        .map(|raw| scope.flag("is_lead", raw))
        .transpose()?;

    Ok(PendingContractor {
        contractor: Contractor {
            name: fields.name,
            national_id: fields.national_id,
            address: fields.address,
            town: fields.town,
            postal_code: fields.postal_code,
            country_code: fields.country_code,
            nuts_code: fields.nuts_code,
            phone: fields.phone,
            email: fields.email,
            url: fields.url,
            is_sme,
        },
        is_lead,
        key: Some(id.to_string()),
    })
}

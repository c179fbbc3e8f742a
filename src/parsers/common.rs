//! Element readers shared by the XML parsers: contact blocks, costed values,
//! day/month/year dates and counts.

use crate::error::ExtractionError;
use crate::fields::{FieldScope, clean_code};
use crate::models::{ContractingBody, Contractor, Entity, MonetaryValue, NoticeFormat};
use crate::xml::{self, Element};
use chrono::NaiveDate;

/// Parse markup, turning any well-formedness problem into structural corruption
pub(crate) fn parse_xml(
    text: &str,
    filename: &str,
    format: NoticeFormat,
) -> Result<Element, ExtractionError> {
    xml::parse_document(text).map_err(|reason| ExtractionError::corrupt(filename, Some(format), reason))
}

/// Paths of contact fields, relative to the element holding the address
#[derive(Debug, Clone, Copy)]
pub(crate) struct ContactPaths {
    pub name: &'static str,
    pub national_id: Option<&'static str>,
    pub address: &'static str,
    pub town: &'static str,
    pub postal_code: &'static str,
    /// Element carrying the country code in its `VALUE` attribute
    pub country: &'static str,
    /// Element carrying the NUTS code in its `CODE` attribute
    pub nuts: Option<&'static str>,
    pub contact_point: Option<&'static str>,
    pub phone: &'static str,
    pub email: &'static str,
    pub fax: &'static str,
    pub url: Option<&'static str>,
}

fn optional_text(element: &Element, path: Option<&str>) -> Option<String> {
    path.and_then(|p| element.text_at(p))
}

pub(crate) fn read_contracting_body(
    element: &Element,
    paths: &ContactPaths,
    format: NoticeFormat,
) -> Result<ContractingBody, ExtractionError> {
    let scope = FieldScope::new(format, Entity::ContractingBody);
    Ok(ContractingBody {
        name: scope.require("name", element.text_at(paths.name))?,
        national_id: optional_text(element, paths.national_id),
        address: element.text_at(paths.address),
        town: element.text_at(paths.town),
        postal_code: element.text_at(paths.postal_code),
        country_code: element.attr_at(paths.country, "VALUE"),
        nuts_code: paths.nuts.and_then(|p| element.attr_at(p, "CODE")),
        contact_point: optional_text(element, paths.contact_point),
        phone: element.text_at(paths.phone),
        email: element.text_at(paths.email),
        fax: element.text_at(paths.fax),
        url_general: optional_text(element, paths.url),
        ..ContractingBody::default()
    })
}

pub(crate) fn read_contractor(
    element: &Element,
    paths: &ContactPaths,
    format: NoticeFormat,
) -> Result<Contractor, ExtractionError> {
    let scope = FieldScope::new(format, Entity::Contractor);
    Ok(Contractor {
        name: scope.require("name", element.text_at(paths.name))?,
        national_id: optional_text(element, paths.national_id),
        address: element.text_at(paths.address),
        town: element.text_at(paths.town),
        postal_code: element.text_at(paths.postal_code),
        country_code: element.attr_at(paths.country, "VALUE"),
        nuts_code: paths.nuts.and_then(|p| element.attr_at(p, "CODE")),
        phone: element.text_at(paths.phone),
        email: element.text_at(paths.email),
        url: optional_text(element, paths.url),
        is_sme: None,
    })
}

/// Where a monetary value sits
#[derive(Debug, Clone, Copy)]
pub(crate) struct ValuePaths {
    /// Element carrying the currency attribute
    pub element: &'static str,
    /// Child holding the amount; `None` when the element itself holds it
    pub amount_child: Option<&'static str>,
}

/// Read a value whose amount is either a machine `FMTVAL` attribute or text.
/// Absent element or amount is `None`; unreadable amount is an error.
pub(crate) fn read_value(
    context: &Element,
    paths: &ValuePaths,
    scope: &FieldScope,
    field: &'static str,
) -> Result<Option<MonetaryValue>, ExtractionError> {
    let Some(element) = context.find(paths.element) else {
        return Ok(None);
    };
    let holder = match paths.amount_child {
        Some(child) => match element.find(child) {
            Some(holder) => holder,
            None => return Ok(None),
        },
        None => element,
    };

    let machine = holder.attr("FMTVAL").map(str::trim).filter(|v| !v.is_empty());
    let text = holder.own_text().trim();
    let amount = match machine {
        Some(raw) => scope.machine_amount(field, raw)?,
        None if !text.is_empty() => scope.amount(field, text)?,
        None => return Ok(None),
    };

    Ok(Some(MonetaryValue {
        amount,
        currency: element.attr("CURRENCY").and_then(clean_code),
    }))
}

/// Date held in `DAY`, `MONTH` and `YEAR` children
pub(crate) fn read_component_date(
    element: &Element,
    scope: &FieldScope,
    field: &'static str,
) -> Result<NaiveDate, ExtractionError> {
    let part = |name: &str| element.raw_text_at(name).unwrap_or_default();
    scope.component_date(field, part("DAY"), part("MONTH"), part("YEAR"))
}

pub(crate) fn read_count(
    context: &Element,
    path: Option<&str>,
    scope: &FieldScope,
    field: &'static str,
) -> Result<Option<u32>, ExtractionError> {
    path.and_then(|p| context.raw_text_at(p))
        .map(|raw| scope.count(field, raw))
        .transpose()
}

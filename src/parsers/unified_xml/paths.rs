//! Element path tables, one per schema sub-revision.
//!
//! Paths are relative to the form element unless noted. Award-level paths
//! are relative to one award element, contractor paths to one contractor.

use crate::models::SubRevision;
use crate::parsers::common::{ContactPaths, ValuePaths};

/// How an award conclusion date is written
#[derive(Debug, Clone, Copy)]
pub(crate) enum DatePath {
    /// `DAY`, `MONTH`, `YEAR` children of the element at this path
    Components(&'static str),
    /// ISO `YYYY-MM-DD` text at this path
    IsoText(&'static str),
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct TenderPaths {
    pub received: Option<&'static str>,
    pub sme: Option<&'static str>,
    pub other_eu: Option<&'static str>,
    pub non_eu: Option<&'static str>,
    pub electronic: Option<&'static str>,
}

/// Lot descriptions; fields are relative to one lot element
#[derive(Debug, Clone, Copy)]
pub(crate) struct LotPaths {
    pub element: &'static str,
    pub number: &'static str,
    pub title: &'static str,
    pub short_description: &'static str,
    pub nuts: &'static str,
    pub estimated_value: ValuePaths,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct FieldPaths {
    /// Form element name inside `FORM_SECTION`
    pub form: &'static str,

    pub body: &'static str,
    pub body_contact: ContactPaths,
    pub body_url_general: &'static str,
    pub body_url_buyer: &'static str,

    pub title: &'static str,
    pub short_description: &'static str,
    pub reference_number: &'static str,
    pub main_cpv: &'static str,
    pub additional_cpv: &'static str,
    pub total_value: ValuePaths,
    pub performance_nuts: Option<&'static str>,
    pub lot_division: Option<&'static str>,
    pub lots: Option<LotPaths>,

    pub award: &'static str,
    pub award_contract_number: &'static str,
    pub award_lot_number: &'static str,
    pub award_title: &'static str,
    pub award_date: DatePath,
    pub tenders: TenderPaths,
    pub award_value: ValuePaths,
    pub subcontracted_value: Option<ValuePaths>,
    /// Marker element of an unsuccessful or discontinued procedure
    pub no_award: Option<&'static str>,

    pub contractor: &'static str,
    /// Address block inside a contractor element; empty for the element itself
    pub contractor_address: &'static str,
    pub contractor_contact: ContactPaths,
    /// Presence markers for SME and non-SME contractors
    pub contractor_sme: Option<(&'static str, &'static str)>,
}

pub(crate) fn for_revision(revision: SubRevision) -> &'static FieldPaths {
    match revision {
        SubRevision::R207 => &R207,
        SubRevision::R208 => &R208,
        SubRevision::R209 => &R209,
    }
}

const CONTACT_R207: ContactPaths = ContactPaths {
    name: "ORGANISATION",
    national_id: None,
    address: "ADDRESS",
    town: "TOWN",
    postal_code: "POSTAL_CODE",
    country: "COUNTRY",
    nuts: None,
    contact_point: Some("CONTACT_POINT"),
    phone: "PHONE",
    email: "//E_MAIL",
    fax: "FAX",
    url: Some("URL"),
};

const CONTACT_R208: ContactPaths = ContactPaths {
    name: "ORGANISATION/OFFICIALNAME",
    national_id: Some("ORGANISATION/NATIONALID"),
    ..CONTACT_R207
};

const CONTACT_R209: ContactPaths = ContactPaths {
    name: "OFFICIALNAME",
    national_id: Some("NATIONALID"),
    address: "ADDRESS",
    town: "TOWN",
    postal_code: "POSTAL_CODE",
    country: "COUNTRY",
    nuts: Some("NUTS"),
    contact_point: Some("CONTACT_POINT"),
    phone: "PHONE",
    email: "E_MAIL",
    fax: "FAX",
    url: Some("URL"),
};

const COSTED_VALUE: ValuePaths = ValuePaths {
    element: "CONTRACT_VALUE_INFORMATION/COSTS_RANGE_AND_CURRENCY_WITH_VAT_RATE",
    amount_child: Some("VALUE_COST"),
};

const R207: FieldPaths = FieldPaths {
    form: "CONTRACT_AWARD",

    body: "FD_CONTRACT_AWARD//CA_CE_CONCESSIONAIRE_PROFILE",
    body_contact: ContactPaths {
        url: None,
        ..CONTACT_R207
    },
    body_url_general: "FD_CONTRACT_AWARD//INTERNET_ADDRESSES_CONTRACT_AWARD/URL_GENERAL",
    body_url_buyer: "FD_CONTRACT_AWARD//INTERNET_ADDRESSES_CONTRACT_AWARD/URL_BUYER",

    title: "FD_CONTRACT_AWARD//DESCRIPTION_AWARD_NOTICE_INFORMATION/TITLE_CONTRACT",
    short_description:
        "FD_CONTRACT_AWARD//DESCRIPTION_AWARD_NOTICE_INFORMATION/SHORT_CONTRACT_DESCRIPTION",
    reference_number: "FD_CONTRACT_AWARD//FILE_REFERENCE_NUMBER",
    main_cpv: "FD_CONTRACT_AWARD//DESCRIPTION_AWARD_NOTICE_INFORMATION//CPV_MAIN/CPV_CODE",
    additional_cpv:
        "FD_CONTRACT_AWARD//DESCRIPTION_AWARD_NOTICE_INFORMATION//CPV_ADDITIONAL/CPV_CODE",
    total_value: ValuePaths {
        element: "FD_CONTRACT_AWARD//TOTAL_FINAL_VALUE/COSTS_RANGE_AND_CURRENCY_WITH_VAT_RATE",
        amount_child: Some("VALUE_COST"),
    },
    performance_nuts: Some("FD_CONTRACT_AWARD//DESCRIPTION_AWARD_NOTICE_INFORMATION//NUTS"),
    lot_division: None,
    lots: None,

    award: "FD_CONTRACT_AWARD/AWARD_OF_CONTRACT",
    award_contract_number: "CONTRACT_NUMBER",
    award_lot_number: "LOT_NUMBER",
    award_title: "CONTRACT_TITLE",
    award_date: DatePath::Components("CONTRACT_AWARD_DATE"),
    tenders: TenderPaths {
        received: Some("OFFERS_RECEIVED_NUMBER"),
        sme: None,
        other_eu: None,
        non_eu: None,
        electronic: None,
    },
    award_value: COSTED_VALUE,
    subcontracted_value: None,
    no_award: None,

    contractor: "ECONOMIC_OPERATOR_NAME_ADDRESS/CONTACT_DATA_WITHOUT_RESPONSIBLE_NAME",
    contractor_address: "",
    contractor_contact: CONTACT_R207,
    contractor_sme: None,
};

const R208: FieldPaths = FieldPaths {
    body_contact: ContactPaths {
        url: None,
        ..CONTACT_R208
    },
    contractor_contact: CONTACT_R208,
    ..R207
};

const R209: FieldPaths = FieldPaths {
    form: "F03_2014",

    body: "CONTRACTING_BODY/ADDRESS_CONTRACTING_BODY",
    body_contact: CONTACT_R209,
    body_url_general: "CONTRACTING_BODY/ADDRESS_CONTRACTING_BODY/URL_GENERAL",
    body_url_buyer: "CONTRACTING_BODY/ADDRESS_CONTRACTING_BODY/URL_BUYER",

    title: "OBJECT_CONTRACT/TITLE",
    short_description: "OBJECT_CONTRACT/SHORT_DESCR",
    reference_number: "OBJECT_CONTRACT/REFERENCE_NUMBER",
    main_cpv: "OBJECT_CONTRACT/CPV_MAIN/CPV_CODE",
    additional_cpv: "OBJECT_CONTRACT/OBJECT_DESCR/CPV_ADDITIONAL/CPV_CODE",
    total_value: ValuePaths {
        element: "OBJECT_CONTRACT/VAL_TOTAL",
        amount_child: None,
    },
    performance_nuts: None,
    lot_division: Some("OBJECT_CONTRACT/LOT_DIVISION"),
    lots: Some(LotPaths {
        element: "OBJECT_CONTRACT/OBJECT_DESCR",
        number: "LOT_NO",
        title: "TITLE",
        short_description: "SHORT_DESCR",
        nuts: "NUTS",
        estimated_value: ValuePaths {
            element: "VAL_OBJECT",
            amount_child: None,
        },
    }),

    award: "AWARD_CONTRACT",
    award_contract_number: "CONTRACT_NO",
    award_lot_number: "LOT_NO",
    award_title: "TITLE",
    award_date: DatePath::IsoText("AWARDED_CONTRACT/DATE_CONCLUSION_CONTRACT"),
    tenders: TenderPaths {
        received: Some("AWARDED_CONTRACT/TENDERS/NB_TENDERS_RECEIVED"),
        sme: Some("AWARDED_CONTRACT/TENDERS/NB_TENDERS_RECEIVED_SME"),
        other_eu: Some("AWARDED_CONTRACT/TENDERS/NB_TENDERS_RECEIVED_OTHER_EU"),
        non_eu: Some("AWARDED_CONTRACT/TENDERS/NB_TENDERS_RECEIVED_NON_EU"),
        electronic: Some("AWARDED_CONTRACT/TENDERS/NB_TENDERS_RECEIVED_EMEANS"),
    },
    award_value: ValuePaths {
        element: "AWARDED_CONTRACT/VALUES/VAL_TOTAL",
        amount_child: None,
    },
    subcontracted_value: Some(ValuePaths {
        element: "AWARDED_CONTRACT/VAL_SUBCONTRACTING",
        amount_child: None,
    }),
    no_award: Some("NO_AWARDED_CONTRACT"),

    contractor: "AWARDED_CONTRACT/CONTRACTORS/CONTRACTOR",
    contractor_address: "ADDRESS_CONTRACTOR",
    contractor_contact: CONTACT_R209,
    contractor_sme: Some(("SME", "NO_SME")),
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_elements_per_revision() {
        assert_eq!(for_revision(SubRevision::R207).form, "CONTRACT_AWARD");
        assert_eq!(for_revision(SubRevision::R208).form, "CONTRACT_AWARD");
        assert_eq!(for_revision(SubRevision::R209).form, "F03_2014");
    }

    #[test]
    fn test_organisation_name_differs_between_r207_and_r208() {
        let r207 = for_revision(SubRevision::R207);
        let r208 = for_revision(SubRevision::R208);
        assert_eq!(r207.contractor_contact.name, "ORGANISATION");
        assert_eq!(r208.contractor_contact.name, "ORGANISATION/OFFICIALNAME");
        assert_eq!(r207.award, r208.award);
    }
}

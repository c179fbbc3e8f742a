//! Format parsers.
//!
//! One module per encoding family. Each exposes a pure `parse` function taking
//! decoded text and returning `Result<ParseOutcome, ExtractionError>`. Shared
//! bookkeeping lives in [`NoticeAssembly`]: entities that fail their own
//! required fields are dropped and recorded here, and the final tree is
//! checked before it is handed back.

pub(crate) mod common;
pub mod early_xml;
pub mod legacy;
pub mod ubl;
pub mod unified_xml;

#[cfg(test)]
mod tests;

use crate::error::ExtractionError;
use crate::models::{
    Award, AwardContractorLink, AwardNotice, Contract, ContractingBody, Contractor, Document,
    Entity, NoticeFormat,
};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Contractor read for an award, before it is placed in the notice table
#[derive(Debug, Clone)]
pub(crate) struct PendingContractor {
    pub contractor: Contractor,
    pub is_lead: Option<bool>,
    /// Source identifier shared by every mention of the same organisation
    pub key: Option<String>,
}

/// Award plus the contractors it links to
#[derive(Debug, Clone)]
pub(crate) struct PendingAward {
    pub award: Award,
    pub contractors: Vec<PendingContractor>,
}

/// Collects contracts, contractors and drop records for one document
#[derive(Debug)]
pub(crate) struct NoticeAssembly {
    format: NoticeFormat,
    contractors: Vec<Contractor>,
    contractor_keys: HashMap<String, usize>,
    dropped: Vec<ExtractionError>,
}

impl NoticeAssembly {
    pub fn new(format: NoticeFormat) -> Self {
        Self {
            format,
            contractors: Vec::new(),
            contractor_keys: HashMap::new(),
            dropped: Vec::new(),
        }
    }

    /// Keep a successfully read entity, or record why it was dropped
    pub fn keep<T>(&mut self, result: Result<T, ExtractionError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                self.drop_entity(err);
                None
            }
        }
    }

    pub fn drop_entity(&mut self, err: ExtractionError) {
        debug!("{}: dropping entity: {}", self.format, err);
        self.dropped.push(err);
    }

    /// Place an award's contractors in the notice table and link them
    pub fn register_award(&mut self, pending: PendingAward) -> Award {
        let PendingAward {
            mut award,
            contractors,
        } = pending;

        for pending in contractors {
            let index = match pending.key.as_ref().and_then(|k| self.contractor_keys.get(k)) {
                Some(&index) => index,
                None => {
                    let index = self.contractors.len();
                    self.contractors.push(pending.contractor);
                    if let Some(key) = pending.key {
                        self.contractor_keys.insert(key, index);
                    }
                    index
                }
            };
            award.contractors.push(AwardContractorLink {
                contractor: index,
                is_lead: pending.is_lead,
            });
        }
        award
    }

    /// Final checks: duplicate lots are dropped, contracts left without awards
    /// are dropped, and a notice with no contract left fails as a whole.
    pub fn finish(
        mut self,
        document: Document,
        contracting_body: ContractingBody,
        contracts: Vec<Contract>,
    ) -> Result<AwardNotice, ExtractionError> {
        let mut kept = Vec::with_capacity(contracts.len());

        for mut contract in contracts {
            let mut seen = HashSet::new();
            let lots = std::mem::take(&mut contract.lots);
            for lot in lots {
                if seen.insert(lot.lot_number.clone()) {
                    contract.lots.push(lot);
                } else {
                    self.drop_entity(ExtractionError::malformed(
                        self.format,
                        Entity::Lot,
                        "lot_number",
                        lot.lot_number,
                        "duplicate lot number within contract",
                    ));
                }
            }

            if contract.awards.is_empty() {
                self.drop_entity(ExtractionError::missing(
                    self.format,
                    Entity::Contract,
                    "awards",
                ));
                continue;
            }
            kept.push(contract);
        }

        if kept.is_empty() {
            let format = self.format;
            // The first recorded drop is the root cause of the empty tree
            return Err(self
                .dropped
                .into_iter()
                .next()
                .unwrap_or_else(|| ExtractionError::missing(format, Entity::Document, "contracts")));
        }

        Ok(AwardNotice {
            document,
            contracting_body,
            contracts: kept,
            contractors: self.contractors,
            dropped: self.dropped,
        })
    }
}

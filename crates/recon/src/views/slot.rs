//! Supply and allocation slot tables. The two are built, edited and
//! exported independently; nothing joins them back together.

use ratebook_core::{coerce_int, RawTable};

use crate::error::ViewError;
use crate::model::{AllocationRow, PricingModel, SupplyRow, ViewKind, ViewTable};
use crate::schema::{self, ContextField};
use crate::views::{project, require};

const SUPPLY_CONTEXT: [ContextField; 3] = [ContextField::SupplyBu, ContextField::Property, ContextField::Date];

const CPD_ALLOCATION_CONTEXT: [ContextField; 4] = [
    ContextField::SupplyBu,
    ContextField::AllocationBu,
    ContextField::Property,
    ContextField::Date,
];

const CPM_ALLOCATION_CONTEXT: [ContextField; 3] =
    [ContextField::Date, ContextField::AllocationBu, ContextField::Property];

pub fn build_supply(raw: &RawTable, pricing: PricingModel) -> Result<ViewTable<SupplyRow>, ViewError> {
    let kind = match pricing {
        PricingModel::Cpd => ViewKind::CpdSupply,
        PricingModel::Cpm => ViewKind::CpmSupply,
    };
    let id = require(raw, &schema::supply_id(), kind)?;
    let inventory = require(raw, &schema::supply_inventory(), kind)?;

    let rows: Vec<SupplyRow> = project(raw, &[id, inventory], &SUPPLY_CONTEXT)
        .into_iter()
        .map(|p| {
            let inventory = coerce_int(&p.values[1]);
            SupplyRow {
                id: p.values[0].clone(),
                inventory,
                new_inventory: 0,
                total_inventory: inventory,
                context: p.context,
            }
        })
        .collect();

    tracing::debug!(view = %kind, rows = rows.len(), "prepared supply slots");
    Ok(ViewTable::new(kind, rows))
}

pub fn build_allocation(raw: &RawTable, pricing: PricingModel) -> Result<ViewTable<AllocationRow>, ViewError> {
    let (kind, context): (ViewKind, &[ContextField]) = match pricing {
        PricingModel::Cpd => (ViewKind::CpdAllocation, &CPD_ALLOCATION_CONTEXT[..]),
        PricingModel::Cpm => (ViewKind::CpmAllocation, &CPM_ALLOCATION_CONTEXT[..]),
    };
    let id = require(raw, &schema::allocation_id(), kind)?;
    let impressions = require(raw, &schema::allocation_impressions(), kind)?;

    let rows: Vec<AllocationRow> = project(raw, &[id, impressions], context)
        .into_iter()
        .map(|p| {
            let impressions = coerce_int(&p.values[1]);
            AllocationRow {
                id: p.values[0].clone(),
                impressions,
                new_impressions: 0,
                total_impressions: impressions,
                context: p.context,
            }
        })
        .collect();

    tracing::debug!(view = %kind, rows = rows.len(), "prepared allocation slots");
    Ok(ViewTable::new(kind, rows))
}

//! Translation between [`OrgNode`] and the flat `org` row.

use std::collections::HashSet;

use roster_types::{OrgId, OrgNode, OrgStatus, state::OrgRow};
use sqlx::FromRow;
use tracing::trace;

use crate::{DbError, DbResult, StoreHandle};

pub(crate) const SELECT_BY_ID: &str =
    "SELECT uuid, name, address, parent, status, start_time, validity FROM org WHERE uuid = ?";

/// Flatten a node into its row. Absent address, parent and validity become NULL.
pub fn to_row(node: &OrgNode) -> OrgRow {
    OrgRow {
        uuid: node.id.map(|id| id.to_string()).unwrap_or_default(),
        name: node.name.clone(),
        address: node.address.clone(),
        parent: node.parent_id().map(|id| id.to_string()),
        status: node.status.bits() as i64,
        start_time: node.start_time,
        validity: node.validity.map(|days| i64::try_from(days).unwrap_or(i64::MAX)),
    }
}

/// Rebuild a node from its row, fetching every ancestor by identifier.
///
/// The returned node carries its whole chain up to the root, however deep.
/// Fails with [`DbError::ParentRecordNotFound`] if a parent reference dangles
/// and with [`DbError::HierarchyCycle`] if the chain revisits an org.
pub async fn from_row(handle: &mut impl StoreHandle, row: OrgRow) -> DbResult<OrgNode> {
    let mut seen = HashSet::from([row.uuid.clone()]);
    let mut next_parent = non_empty(row.parent.as_deref());
    let mut node = decode(row)?;
    let mut ancestors: Vec<OrgNode> = Vec::new();

    while let Some(parent_uuid) = next_parent {
        if !seen.insert(parent_uuid.clone()) {
            return Err(DbError::HierarchyCycle { id: parent_uuid });
        }
        let Some(parent_row) = fetch_org_row_by_id(&mut *handle, &parent_uuid).await? else {
            let child = ancestors.last().unwrap_or(&node);
            return Err(DbError::ParentRecordNotFound {
                name: child.name.clone(),
            });
        };
        trace!(org = %node.name, ancestor = %parent_row.name, "materialized ancestor");
        next_parent = non_empty(parent_row.parent.as_deref());
        ancestors.push(decode(parent_row)?);
    }

    node.parent = ancestors.into_iter().rev().fold(None, |above, mut ancestor| {
        ancestor.parent = above;
        Some(Box::new(ancestor))
    });
    Ok(node)
}

/// Fetch a single raw row by canonical identifier.
pub async fn fetch_org_row_by_id(handle: &mut impl StoreHandle, uuid: &str) -> DbResult<Option<OrgRow>> {
    let row = handle.get_one(sqlx::query(SELECT_BY_ID).bind(uuid.to_string())).await?;
    row.map(|r| OrgRow::from_row(&r)).transpose().map_err(DbError::from)
}

pub(crate) fn parse_id(uuid: &str) -> DbResult<OrgId> {
    uuid.parse().map_err(|err| DbError::invalid("uuid", err))
}

fn non_empty(uuid: Option<&str>) -> Option<String> {
    uuid.filter(|u| !u.is_empty()).map(str::to_string)
}

/// Direct fields only; `parent` is left for the caller to attach.
fn decode(row: OrgRow) -> DbResult<OrgNode> {
    let id = if row.uuid.is_empty() { None } else { Some(parse_id(&row.uuid)?) };
    Ok(OrgNode {
        id,
        name: row.name,
        address: row.address,
        parent: None,
        status: OrgStatus::from_bits_retain(row.status as u64),
        start_time: row.start_time,
        validity: row.validity.and_then(|days| u64::try_from(days).ok()),
    })
}

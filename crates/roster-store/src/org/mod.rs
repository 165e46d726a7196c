//! Org hierarchy persistence.
//!
//! Nodes arrive either as fresh in-memory trees (no identifiers yet, parents
//! described by name/address) or as references to rows already stored
//! (identifier known). Every operation first resolves identifiers root-first,
//! then works on rows.
//!
//! Cascading update and delete are issued as a sequence of independent
//! statements. A failure part-way through leaves the subtree partially
//! written; callers that need all-or-nothing pass a transaction and roll it
//! back on error.

mod row;

use std::collections::HashSet;

use chrono::Utc;
use futures::future::BoxFuture;
use roster_types::{
    ORG_NAME_MAX_LEN, OrgId, OrgNode, state::OrgRow, validation::{ValidationError, check_text}
};
use sqlx::{FromRow, Row};
use tracing::{debug, info, trace};

pub use row::{fetch_org_row_by_id, from_row, to_row};
use row::parse_id;

use crate::{DbError, DbResult, StoreHandle};

/// Deepest in-memory ancestor chain an operation accepts. Stored chains
/// built one level at a time may be deeper.
pub const MAX_HIERARCHY_DEPTH: usize = 64;

const ENTITY: &str = "org";

const SELECT_BY_TRIPLE: &str = "SELECT uuid, name, address, parent, status, start_time, validity FROM org \
     WHERE name = ? AND address IS ? AND parent IS ?";
const SELECT_CHILDREN: &str =
    "SELECT uuid, name, address, parent, status, start_time, validity FROM org WHERE parent = ? ORDER BY name";
const SELECT_CHILD_IDS: &str = "SELECT uuid FROM org WHERE parent = ?";
const INSERT_ORG: &str =
    "INSERT INTO org (uuid, name, address, parent, status, start_time, validity) VALUES (?, ?, ?, ?, ?, ?, ?)";
const UPDATE_ORG: &str = "UPDATE org SET status = ?, validity = ? WHERE uuid = ?";
const DELETE_ORG: &str = "DELETE FROM org WHERE uuid = ?";
const COUNT_ORGS: &str = "SELECT COUNT(*) AS total FROM org";

fn describe(node: &OrgNode) -> String {
    match &node.id {
        Some(id) => id.to_string(),
        None => node.lineage().join("/"),
    }
}

fn validate_node(node: &OrgNode) -> DbResult<()> {
    if !node.status.is_valid() {
        return Err(DbError::invalid("status", ValidationError::InvalidFlags(node.status.bits())));
    }
    check_text(&node.name, ORG_NAME_MAX_LEN, true).map_err(|err| DbError::invalid("name", err))?;
    if let Some(address) = &node.address {
        check_text(address, ORG_NAME_MAX_LEN, false).map_err(|err| DbError::invalid("address", err))?;
    }
    if node.validity.is_some_and(|days| i64::try_from(days).is_err()) {
        return Err(DbError::invalid("validity", "value out of range"));
    }
    if node.depth() > MAX_HIERARCHY_DEPTH {
        return Err(DbError::HierarchyTooDeep {
            name: node.name.clone(),
            max: MAX_HIERARCHY_DEPTH,
        });
    }
    Ok(())
}

/// Look a node up by `(name, address, parent)`.
///
/// A node whose parent has no identifier cannot be stored yet, so it matches
/// nothing. More than one match is a data-integrity failure.
async fn lookup_by_triple(handle: &mut impl StoreHandle, node: &OrgNode) -> DbResult<Option<OrgRow>> {
    if node.parent.is_some() && node.parent_id().is_none() {
        return Ok(None);
    }
    let rows = handle
        .get_many(
            sqlx::query(SELECT_BY_TRIPLE)
                .bind(node.name.clone())
                .bind(node.address.clone())
                .bind(node.parent_id().map(|id| id.to_string())),
        )
        .await?;
    if rows.len() > 1 {
        return Err(DbError::RecordNotUnique {
            entity: ENTITY,
            key: describe(node),
        });
    }
    rows.first().map(OrgRow::from_row).transpose().map_err(DbError::from)
}

/// Load the stored row for a node, by identifier when known, else by triple.
async fn load_current(handle: &mut impl StoreHandle, node: &OrgNode) -> DbResult<Option<OrgRow>> {
    match &node.id {
        Some(id) => fetch_org_row_by_id(handle, &id.to_string()).await,
        None => lookup_by_triple(handle, node).await,
    }
}

fn resolve_chain<'a, H: StoreHandle>(handle: &'a mut H, node: &'a mut OrgNode) -> BoxFuture<'a, DbResult<()>> {
    Box::pin(async move {
        if let Some(parent) = node.parent.as_deref_mut() {
            resolve_chain(&mut *handle, parent).await?;
        }
        if node.id.is_none()
            && let Some(row) = lookup_by_triple(&mut *handle, node).await?
        {
            node.id = Some(parse_id(&row.uuid)?);
            trace!(org = %node.name, id = %row.uuid, "resolved identifier");
        }
        Ok(())
    })
}

/// Fill in missing identifiers from the root down to `node` itself.
///
/// Nodes that already carry an identifier are not looked up again. A node
/// with no stored match keeps `id == None`.
pub async fn resolve_ancestor_ids(handle: &mut impl StoreHandle, node: &mut OrgNode) -> DbResult<()> {
    resolve_chain(handle, node).await
}

fn exists_chain<'a, H: StoreHandle>(handle: &'a mut H, node: &'a mut OrgNode) -> BoxFuture<'a, DbResult<bool>> {
    Box::pin(async move {
        if let Some(parent) = node.parent.as_deref_mut() {
            match exists_chain(&mut *handle, parent).await {
                Ok(true) => {}
                Ok(false) => return Err(DbError::ParentRecordNotFound { name: node.name.clone() }),
                Err(err @ DbError::RecordNotUnique { .. }) => return Err(err),
                Err(err) => {
                    debug!(org = %node.name, error = %err, "ancestor check failed");
                    return Err(DbError::ParentRecordNotFound { name: node.name.clone() });
                }
            }
        }

        match node.id {
            Some(id) => Ok(fetch_org_row_by_id(&mut *handle, &id.to_string()).await?.is_some()),
            None => match lookup_by_triple(&mut *handle, node).await {
                Ok(Some(row)) => {
                    node.id = Some(parse_id(&row.uuid)?);
                    Ok(true)
                }
                Ok(None) => Ok(false),
                Err(err @ DbError::RecordNotUnique { .. }) => Err(err),
                Err(err) => {
                    debug!(org = %node.name, error = %err, "org lookup failed");
                    Err(DbError::not_found(ENTITY, describe(node)))
                }
            },
        }
    })
}

/// Whether `node` is stored, requiring every ancestor to be stored too.
///
/// Returns `Ok(false)` when the node itself is absent, and
/// [`DbError::ParentRecordNotFound`] when one of its ancestors is. Identifiers
/// found on the way are written back into the tree.
pub async fn org_exists_in_hierarchy(handle: &mut impl StoreHandle, node: &mut OrgNode) -> DbResult<bool> {
    exists_chain(handle, node).await
}

/// Persist `node` under its (already stored) parent chain.
///
/// Creating a node that already exists is a no-op returning its identifier.
/// Two concurrent creates of the same node may both pass the existence check;
/// the primary key catches an identifier clash, not a duplicate triple.
pub async fn create_org_entry(handle: &mut impl StoreHandle, node: &mut OrgNode) -> DbResult<OrgId> {
    validate_node(node)?;
    resolve_chain(&mut *handle, node).await?;

    let exists = exists_chain(&mut *handle, node).await?;
    if let (true, Some(id)) = (exists, node.id) {
        debug!(org = %node.name, %id, "org already present");
        return Ok(id);
    }

    let id = OrgId::new();
    let start_time = Utc::now();
    let mut row = to_row(node);
    row.uuid = id.to_string();
    row.start_time = Some(start_time);

    let result = handle
        .exec(
            sqlx::query(INSERT_ORG)
                .bind(row.uuid)
                .bind(row.name)
                .bind(row.address)
                .bind(row.parent)
                .bind(row.status)
                .bind(row.start_time)
                .bind(row.validity),
        )
        .await;
    match result {
        Ok(_) => {}
        Err(DbError::Query(sqlx::Error::Database(db_err))) if db_err.is_unique_violation() => {
            return Err(DbError::RetryableCreate { name: node.name.clone() });
        }
        Err(err) => return Err(err),
    }

    node.id = Some(id);
    node.start_time = Some(start_time);
    info!(org = %node.name, %id, "org created");
    Ok(id)
}

fn create_lineage<'a, H: StoreHandle>(handle: &'a mut H, node: &'a mut OrgNode) -> BoxFuture<'a, DbResult<OrgId>> {
    Box::pin(async move {
        if let Some(parent) = node.parent.as_deref_mut()
            && parent.id.is_none()
        {
            create_lineage(&mut *handle, parent).await?;
        }
        create_org_entry(handle, node).await
    })
}

/// Create every missing ancestor root-first, then `node` itself.
///
/// Ancestors given only by identifier must already be stored.
pub async fn create_org_lineage(handle: &mut impl StoreHandle, node: &mut OrgNode) -> DbResult<OrgId> {
    validate_node(node)?;
    create_lineage(handle, node).await
}

/// `root` and every stored descendant, each listed before its own children.
async fn collect_subtree(handle: &mut impl StoreHandle, root: String) -> DbResult<Vec<String>> {
    let mut seen = HashSet::new();
    let mut order = Vec::new();
    let mut pending = vec![root];
    while let Some(uuid) = pending.pop() {
        if !seen.insert(uuid.clone()) {
            return Err(DbError::HierarchyCycle { id: uuid });
        }
        let children = handle.get_many(sqlx::query(SELECT_CHILD_IDS).bind(uuid.clone())).await?;
        for child in children {
            pending.push(child.try_get("uuid")?);
        }
        order.push(uuid);
    }
    Ok(order)
}

/// Apply `node`'s status and validity to the stored node and every descendant.
///
/// Only status and validity are compared and written; other fields identify
/// the node. Returns the number of rows written, 0 when the stored values
/// already match. The subtree is gathered first, then every descendant is
/// written before its parent. A stored parent loop fails with
/// [`DbError::HierarchyCycle`] before anything is written.
pub async fn update_org_entry(handle: &mut impl StoreHandle, node: &mut OrgNode) -> DbResult<u64> {
    if !node.status.is_valid() {
        return Err(DbError::invalid("status", ValidationError::InvalidFlags(node.status.bits())));
    }
    if node.validity.is_some_and(|days| i64::try_from(days).is_err()) {
        return Err(DbError::invalid("validity", "value out of range"));
    }
    resolve_chain(&mut *handle, node).await?;

    let Some(current) = load_current(&mut *handle, node).await? else {
        return Err(DbError::not_found(ENTITY, describe(node)));
    };
    node.id = Some(parse_id(&current.uuid)?);
    node.start_time = current.start_time;

    let wanted = to_row(node);
    let stored_validity = current.validity.filter(|days| *days != 0);
    let wanted_validity = wanted.validity.filter(|days| *days != 0);
    if current.status == wanted.status && stored_validity == wanted_validity {
        trace!(org = %node.name, "org unchanged, nothing to update");
        return Ok(0);
    }

    let subtree = collect_subtree(&mut *handle, current.uuid).await?;
    let mut written = 0;
    for uuid in subtree.iter().rev() {
        written += handle
            .exec(sqlx::query(UPDATE_ORG).bind(wanted.status).bind(wanted.validity).bind(uuid.clone()))
            .await?;
        trace!(org = %uuid, status = wanted.status, "org row updated");
    }
    info!(org = %node.name, rows = written, "org subtree updated");
    Ok(written)
}

/// Remove the stored node and its whole subtree, children first.
///
/// Returns the number of rows removed. On success the node no longer carries
/// an identifier.
pub async fn delete_org_entry(handle: &mut impl StoreHandle, node: &mut OrgNode) -> DbResult<u64> {
    resolve_chain(&mut *handle, node).await?;
    let current = match load_current(&mut *handle, node).await? {
        Some(row) if !row.name.is_empty() => row,
        _ => return Err(DbError::not_found(ENTITY, describe(node))),
    };

    let subtree = collect_subtree(&mut *handle, current.uuid).await?;
    let mut removed = 0;
    for uuid in subtree.iter().rev() {
        removed += handle.exec(sqlx::query(DELETE_ORG).bind(uuid.clone())).await?;
        trace!(org = %uuid, "org row deleted");
    }
    info!(org = %current.name, rows = removed, "org subtree deleted");
    node.id = None;
    node.start_time = None;
    Ok(removed)
}

/// Fetch a stored node with its full ancestor chain.
pub async fn fetch_org_by_id(handle: &mut impl StoreHandle, id: OrgId) -> DbResult<Option<OrgNode>> {
    match fetch_org_row_by_id(&mut *handle, &id.to_string()).await? {
        Some(row) => Ok(Some(from_row(handle, row).await?)),
        None => Ok(None),
    }
}

/// Fetch a stored node by `(name, address, parent)`, resolving the parent chain first.
pub async fn fetch_org_by_name_addr_parent(handle: &mut impl StoreHandle, node: &mut OrgNode) -> DbResult<Option<OrgNode>> {
    if let Some(parent) = node.parent.as_deref_mut() {
        resolve_chain(&mut *handle, parent).await?;
    }
    match lookup_by_triple(&mut *handle, node).await? {
        Some(row) => Ok(Some(from_row(handle, row).await?)),
        None => Ok(None),
    }
}

/// Direct children of a stored node, ordered by name.
pub async fn list_child_orgs(handle: &mut impl StoreHandle, parent: OrgId) -> DbResult<Vec<OrgNode>> {
    let rows = handle.get_many(sqlx::query(SELECT_CHILDREN).bind(parent.to_string())).await?;
    let mut children = Vec::with_capacity(rows.len());
    for row in rows {
        let row = OrgRow::from_row(&row)?;
        children.push(from_row(&mut *handle, row).await?);
    }
    Ok(children)
}

pub async fn count_org_entries(handle: &mut impl StoreHandle) -> DbResult<i64> {
    let row = handle.get_one(sqlx::query(COUNT_ORGS)).await?;
    Ok(match row {
        Some(row) => row.try_get("total")?,
        None => 0,
    })
}

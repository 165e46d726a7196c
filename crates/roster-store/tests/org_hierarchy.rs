mod common;

use common::{lock_org, memory_pool, stored};
use roster_store::{
    DbError, OrgNode, OrgStatus, count_org_entries, create_org_entry, create_org_lineage, delete_org_entry, fetch_org_by_id, list_child_orgs, update_org_entry
};

#[tokio::test]
async fn hq_status_change_reaches_branch_and_delete_removes_both() -> anyhow::Result<()> {
    let mut pool = memory_pool().await;
    let hq = stored(&mut pool, OrgNode::new("HQ").status(OrgStatus::REQUESTED | OrgStatus::APPROVED)).await;
    let branch = stored(&mut pool, OrgNode::new("Branch1").parent(hq.clone())).await;

    let mut change = OrgNode::new("HQ").status(OrgStatus::REQUESTED);
    assert_eq!(update_org_entry(&mut pool, &mut change).await?, 2);

    let branch_now = fetch_org_by_id(&mut pool, branch.id.unwrap()).await?.unwrap();
    assert_eq!(branch_now.status, OrgStatus::REQUESTED);
    let hq_now = fetch_org_by_id(&mut pool, hq.id.unwrap()).await?.unwrap();
    assert_eq!(hq_now.status, OrgStatus::REQUESTED);

    let mut target = OrgNode::new("HQ");
    assert_eq!(delete_org_entry(&mut pool, &mut target).await?, 2);
    assert!(fetch_org_by_id(&mut pool, hq.id.unwrap()).await?.is_none());
    assert!(fetch_org_by_id(&mut pool, branch.id.unwrap()).await?.is_none());
    assert_eq!(count_org_entries(&mut pool).await?, 0);
    Ok(())
}

#[tokio::test]
async fn update_overwrites_whole_subtree() -> anyhow::Result<()> {
    let mut pool = memory_pool().await;
    let hq = stored(&mut pool, OrgNode::new("HQ")).await;
    let east = stored(&mut pool, OrgNode::new("East").parent(hq.clone())).await;
    let west = stored(&mut pool, OrgNode::new("West").validity(7).parent(hq.clone())).await;
    let dock = stored(&mut pool, OrgNode::new("Dock").parent(east.clone())).await;
    let outside = stored(&mut pool, OrgNode::new("Outside")).await;

    let mut change = OrgNode::with_id(hq.id.unwrap()).status(OrgStatus::APPROVED).validity(30);
    assert_eq!(update_org_entry(&mut pool, &mut change).await?, 4);

    for id in [hq.id, east.id, west.id, dock.id] {
        let node = fetch_org_by_id(&mut pool, id.unwrap()).await?.unwrap();
        assert_eq!(node.status, OrgStatus::APPROVED, "{}", node.name);
        assert_eq!(node.validity, Some(30), "{}", node.name);
    }
    let untouched = fetch_org_by_id(&mut pool, outside.id.unwrap()).await?.unwrap();
    assert_eq!(untouched.status, OrgStatus::REQUESTED);
    assert_eq!(untouched.validity, None);
    Ok(())
}

#[tokio::test]
async fn failed_update_leaves_partial_subtree() -> anyhow::Result<()> {
    let mut pool = memory_pool().await;
    let hq = stored(&mut pool, OrgNode::new("HQ")).await;
    let locked = stored(&mut pool, OrgNode::new("Locked").parent(hq.clone())).await;
    let leaf = stored(&mut pool, OrgNode::new("Leaf").parent(locked.clone())).await;
    lock_org(&pool, "Locked").await;

    let mut change = OrgNode::new("HQ").status(OrgStatus::APPROVED);
    let err = update_org_entry(&mut pool, &mut change).await.unwrap_err();
    assert!(matches!(err, DbError::Query(_)));

    // descendants are written first, so the leaf already carries the new status
    assert_eq!(fetch_org_by_id(&mut pool, leaf.id.unwrap()).await?.unwrap().status, OrgStatus::APPROVED);
    assert_eq!(fetch_org_by_id(&mut pool, locked.id.unwrap()).await?.unwrap().status, OrgStatus::REQUESTED);
    assert_eq!(fetch_org_by_id(&mut pool, hq.id.unwrap()).await?.unwrap().status, OrgStatus::REQUESTED);
    Ok(())
}

#[tokio::test]
async fn failed_delete_leaves_partial_subtree() -> anyhow::Result<()> {
    let mut pool = memory_pool().await;
    let hq = stored(&mut pool, OrgNode::new("HQ")).await;
    let locked = stored(&mut pool, OrgNode::new("Locked").parent(hq.clone())).await;
    let leaf = stored(&mut pool, OrgNode::new("Leaf").parent(locked.clone())).await;
    lock_org(&pool, "Locked").await;

    let mut target = OrgNode::with_id(hq.id.unwrap());
    assert!(delete_org_entry(&mut pool, &mut target).await.is_err());
    assert!(target.id.is_some());

    assert!(fetch_org_by_id(&mut pool, leaf.id.unwrap()).await?.is_none());
    assert!(fetch_org_by_id(&mut pool, locked.id.unwrap()).await?.is_some());
    assert!(fetch_org_by_id(&mut pool, hq.id.unwrap()).await?.is_some());
    Ok(())
}

#[tokio::test]
async fn caller_transaction_makes_cascade_all_or_nothing() -> anyhow::Result<()> {
    let mut pool = memory_pool().await;
    let hq = stored(&mut pool, OrgNode::new("HQ")).await;
    let locked = stored(&mut pool, OrgNode::new("Locked").parent(hq.clone())).await;
    let leaf = stored(&mut pool, OrgNode::new("Leaf").parent(locked.clone())).await;
    lock_org(&pool, "Locked").await;

    let mut tx = pool.begin().await?;
    let mut change = OrgNode::new("HQ").status(OrgStatus::APPROVED);
    assert!(update_org_entry(&mut tx, &mut change).await.is_err());
    tx.rollback().await?;
    assert_eq!(fetch_org_by_id(&mut pool, leaf.id.unwrap()).await?.unwrap().status, OrgStatus::REQUESTED);

    let mut tx = pool.begin().await?;
    let mut target = OrgNode::new("HQ");
    assert!(delete_org_entry(&mut tx, &mut target).await.is_err());
    tx.rollback().await?;
    assert_eq!(count_org_entries(&mut pool).await?, 3);

    let mut tx = pool.begin().await?;
    let mut target = OrgNode::new("Leaf").parent(OrgNode::new("Locked").parent(OrgNode::new("HQ")));
    assert_eq!(delete_org_entry(&mut tx, &mut target).await?, 1);
    tx.commit().await?;
    assert_eq!(count_org_entries(&mut pool).await?, 2);
    Ok(())
}

#[tokio::test]
async fn lineage_creates_missing_ancestors_once() -> anyhow::Result<()> {
    let mut pool = memory_pool().await;
    stored(&mut pool, OrgNode::new("HQ")).await;

    let mut team = OrgNode::new("Team A").parent(OrgNode::new("Branch2").address("Harbour Rd").parent(OrgNode::new("HQ")));
    let team_id = create_org_lineage(&mut pool, &mut team).await?;
    assert_eq!(count_org_entries(&mut pool).await?, 3);
    assert!(team.parent.as_ref().unwrap().id.is_some());

    let mut again = OrgNode::new("Team A").parent(OrgNode::new("Branch2").address("Harbour Rd").parent(OrgNode::new("HQ")));
    assert_eq!(create_org_lineage(&mut pool, &mut again).await?, team_id);
    assert_eq!(count_org_entries(&mut pool).await?, 3);

    // plain create still insists on stored ancestors
    let mut orphan = OrgNode::new("Team B").parent(OrgNode::new("Branch3").parent(OrgNode::new("HQ")));
    let err = create_org_entry(&mut pool, &mut orphan).await.unwrap_err();
    assert!(matches!(err, DbError::ParentRecordNotFound { .. }));
    Ok(())
}

#[tokio::test]
async fn reads_materialize_the_ancestor_chain() -> anyhow::Result<()> {
    let mut pool = memory_pool().await;
    let hq = stored(&mut pool, OrgNode::new("HQ")).await;
    let branch = stored(&mut pool, OrgNode::new("Branch1").parent(hq.clone())).await;
    stored(&mut pool, OrgNode::new("Zulu").parent(branch.clone())).await;
    stored(&mut pool, OrgNode::new("Alpha").parent(branch.clone())).await;

    let children = list_child_orgs(&mut pool, branch.id.unwrap()).await?;
    let names: Vec<&str> = children.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Alpha", "Zulu"]);
    assert_eq!(children[0].lineage(), vec!["HQ", "Branch1", "Alpha"]);
    assert_eq!(children[0].parent_id(), branch.id);

    assert!(list_child_orgs(&mut pool, children[0].id.unwrap()).await?.is_empty());
    Ok(())
}

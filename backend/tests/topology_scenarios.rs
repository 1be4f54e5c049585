//! End-to-end scenarios against the in-memory repository.

mod support;

use rail_topology::db::{LocalRepository, Table};
use rail_topology::models::{
    BlockFields, MemberId, MemberKind, SectorId, SectorKind, StationFields,
};
use rail_topology::services::{
    self, catalog, NoCandidateReason, TopologyError,
};

#[tokio::test]
async fn test_adjacency_then_sector_delete() {
    let repo = LocalRepository::new();
    let ids = support::seed_sectors(&repo, SectorKind::Dnc, &["A", "B"]).await;
    assert_eq!(ids, vec![SectorId(1), SectorId(2)]);

    let inserted = services::add_adjacency(&repo, SectorKind::Dnc, SectorId(1), &[SectorId(2)])
        .await
        .unwrap();
    assert_eq!(inserted, vec![SectorId(2)]);
    assert_eq!(
        services::list_adjacent(&repo, SectorKind::Dnc, SectorId(1))
            .await
            .unwrap(),
        vec![SectorId(2)]
    );
    assert_eq!(
        services::list_adjacent(&repo, SectorKind::Dnc, SectorId(2))
            .await
            .unwrap(),
        vec![SectorId(1)]
    );

    let report = services::delete_sector(&repo, SectorKind::Dnc, SectorId(1))
        .await
        .unwrap();
    assert_eq!(report.rows(Table::AdjacentPairs), 1);
    assert!(services::list_adjacent(&repo, SectorKind::Dnc, SectorId(2))
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_reverse_add_reports_already_related() {
    let repo = LocalRepository::new();
    let ids = support::seed_sectors(&repo, SectorKind::Ecd, &["A", "B"]).await;
    services::add_adjacency(&repo, SectorKind::Ecd, ids[0], &[ids[1]])
        .await
        .unwrap();

    match services::add_adjacency(&repo, SectorKind::Ecd, ids[1], &[ids[0]]).await {
        Err(TopologyError::NoValidCandidates {
            sector,
            reason,
            rejected,
        }) => {
            assert_eq!(sector, ids[1]);
            assert_eq!(reason, NoCandidateReason::AllAlreadyRelated);
            assert_eq!(rejected, vec![ids[0]]);
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test]
async fn test_line_with_train_sectors_and_cascade() {
    let repo = LocalRepository::new();
    let dnc = support::seed_sectors(&repo, SectorKind::Dnc, &["Central"]).await[0];
    let ecd = support::seed_sectors(&repo, SectorKind::Ecd, &["Power-1"]).await[0];
    services::add_nearest(&repo, SectorKind::Ecd, ecd, &[dnc])
        .await
        .unwrap();

    let mut stations = Vec::new();
    for (esr, name) in [("500001", "West"), ("500002", "Mid"), ("500003", "East")] {
        let station = catalog::create_station(
            &repo,
            StationFields {
                esr_code: esr.into(),
                name: name.into(),
            },
        )
        .await
        .unwrap();
        stations.push(station.id);
    }
    let block = catalog::create_block(
        &repo,
        BlockFields {
            name: "West-Mid".into(),
            station1_id: stations[0],
            station2_id: stations[1],
        },
    )
    .await
    .unwrap();

    let main = catalog::create_train_sector(&repo, SectorKind::Dnc, dnc, "Main".into())
        .await
        .unwrap();
    let target: Vec<MemberId> = stations.iter().map(|s| MemberId::from(*s)).collect();
    let members =
        services::reconcile_membership(&repo, MemberKind::Station, SectorKind::Dnc, main.id, &target)
            .await
            .unwrap();
    let positions: Vec<i32> = members.iter().map(|m| m.position).collect();
    assert_eq!(positions, vec![1, 2, 3]);
    services::reconcile_membership(
        &repo,
        MemberKind::Block,
        SectorKind::Dnc,
        main.id,
        &[MemberId::from(block.id)],
    )
    .await
    .unwrap();

    // Dropping the middle station keeps the others where they are
    let members = services::reconcile_membership(
        &repo,
        MemberKind::Station,
        SectorKind::Dnc,
        main.id,
        &[target[2], target[0]],
    )
    .await
    .unwrap();
    assert_eq!(
        members
            .iter()
            .map(|m| (m.member_id, m.position))
            .collect::<Vec<_>>(),
        vec![(target[0], 1), (target[2], 3)]
    );

    let report = services::delete_sector(&repo, SectorKind::Dnc, dnc)
        .await
        .unwrap();
    assert_eq!(report.rows(Table::Stations), 2);
    assert_eq!(report.rows(Table::Blocks), 1);
    assert_eq!(report.rows(Table::NearestPairs), 1);
    assert_eq!(report.rows(Table::TrainSectors), 1);

    assert!(services::list_nearest(&repo, SectorKind::Ecd, ecd)
        .await
        .unwrap()
        .is_empty());
    for id in stations {
        let station = catalog::get_station(&repo, id).await.unwrap();
        assert!(station.slots.dnc.is_none());
    }
    assert!(matches!(
        catalog::get_train_sector(&repo, SectorKind::Dnc, main.id).await,
        Err(TopologyError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_failed_cascade_leaves_everything_in_place() {
    let repo = LocalRepository::new();
    let ids = support::seed_sectors(&repo, SectorKind::Dnc, &["A", "B"]).await;
    services::add_adjacency(&repo, SectorKind::Dnc, ids[0], &[ids[1]])
        .await
        .unwrap();
    let ts = catalog::create_train_sector(&repo, SectorKind::Dnc, ids[0], "A-1".into())
        .await
        .unwrap();
    let station = catalog::create_station(
        &repo,
        StationFields {
            esr_code: "600001".into(),
            name: "Lone".into(),
        },
    )
    .await
    .unwrap();
    services::reconcile_membership(
        &repo,
        MemberKind::Station,
        SectorKind::Dnc,
        ts.id,
        &[MemberId::from(station.id)],
    )
    .await
    .unwrap();

    repo.inject_fault(Table::AdjacentPairs);
    let result = services::delete_sector(&repo, SectorKind::Dnc, ids[0]).await;
    assert!(matches!(result, Err(TopologyError::TransactionFailed { .. })));
    repo.clear_faults();

    catalog::get_sector(&repo, SectorKind::Dnc, ids[0]).await.unwrap();
    let members = services::list_membership(&repo, MemberKind::Station, SectorKind::Dnc, ts.id)
        .await
        .unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(
        services::list_adjacent(&repo, SectorKind::Dnc, ids[1])
            .await
            .unwrap(),
        vec![ids[0]]
    );
}

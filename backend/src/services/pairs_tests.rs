use super::*;
use crate::db::repositories::LocalRepository;
use crate::db::repository::RepositoryError;

async fn seed_sectors(repo: &LocalRepository, kind: SectorKind, names: &[&str]) -> Vec<SectorId> {
    let names: Vec<String> = names.iter().map(|n| n.to_string()).collect();
    transaction(repo, "seed", move |tx| {
        names
            .iter()
            .map(|name| tx.insert_sector(kind, name).map(|s| s.id))
            .collect::<Result<Vec<_>, RepositoryError>>()
    })
    .await
    .unwrap()
}

#[test]
fn test_dedup_keeps_first_occurrence() {
    let ids = [SectorId(3), SectorId(1), SectorId(3), SectorId(2), SectorId(1)];
    assert_eq!(
        dedup_in_order(&ids),
        vec![SectorId(3), SectorId(1), SectorId(2)]
    );
}

#[tokio::test]
async fn test_adjacency_is_symmetric() {
    let repo = LocalRepository::new();
    let ids = seed_sectors(&repo, SectorKind::Dnc, &["A", "B"]).await;
    let (a, b) = (ids[0], ids[1]);

    assert_eq!(
        add_adjacency(&repo, SectorKind::Dnc, a, &[b]).await.unwrap(),
        vec![b]
    );
    assert_eq!(list_adjacent(&repo, SectorKind::Dnc, a).await.unwrap(), vec![b]);
    assert_eq!(list_adjacent(&repo, SectorKind::Dnc, b).await.unwrap(), vec![a]);

    let reversed = add_adjacency(&repo, SectorKind::Dnc, b, &[a]).await;
    assert!(matches!(
        reversed,
        Err(TopologyError::NoValidCandidates {
            reason: NoCandidateReason::AllAlreadyRelated,
            ..
        })
    ));
    assert_eq!(repo.adjacent_pair_count(SectorKind::Dnc), 1);
}

#[tokio::test]
async fn test_self_pair_is_rejected() {
    let repo = LocalRepository::new();
    let a = seed_sectors(&repo, SectorKind::Ecd, &["A"]).await[0];

    let result = add_adjacency(&repo, SectorKind::Ecd, a, &[a]).await;
    match result {
        Err(TopologyError::NoValidCandidates {
            reason, rejected, ..
        }) => {
            assert_eq!(reason, NoCandidateReason::NoneExist);
            assert_eq!(rejected, vec![a]);
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(repo.adjacent_pair_count(SectorKind::Ecd), 0);
}

#[tokio::test]
async fn test_partial_success_returns_only_inserted_ids() {
    let repo = LocalRepository::new();
    let ids = seed_sectors(&repo, SectorKind::Dnc, &["A", "B", "C", "D"]).await;
    let (a, b, c, d) = (ids[0], ids[1], ids[2], ids[3]);
    add_adjacency(&repo, SectorKind::Dnc, a, &[c]).await.unwrap();

    let inserted = add_adjacency(
        &repo,
        SectorKind::Dnc,
        a,
        &[d, a, SectorId(999), c, b, d],
    )
    .await
    .unwrap();
    assert_eq!(inserted, vec![d, b]);
    assert_eq!(
        list_adjacent(&repo, SectorKind::Dnc, a).await.unwrap(),
        vec![b, c, d]
    );
}

#[tokio::test]
async fn test_adjacency_ignores_other_kind() {
    let repo = LocalRepository::new();
    let dnc = seed_sectors(&repo, SectorKind::Dnc, &["A"]).await[0];
    let ecd = seed_sectors(&repo, SectorKind::Ecd, &["E"]).await[0];

    let result = add_adjacency(&repo, SectorKind::Dnc, dnc, &[ecd]).await;
    assert!(matches!(
        result,
        Err(TopologyError::NoValidCandidates {
            reason: NoCandidateReason::NoneExist,
            ..
        })
    ));
}

#[tokio::test]
async fn test_unknown_primary_is_not_found() {
    let repo = LocalRepository::new();
    let b = seed_sectors(&repo, SectorKind::Dnc, &["B"]).await[0];

    let result = add_adjacency(&repo, SectorKind::Dnc, SectorId(42), &[b]).await;
    assert!(matches!(result, Err(TopologyError::NotFound { .. })));
    assert!(matches!(
        list_adjacent(&repo, SectorKind::Dnc, SectorId(42)).await,
        Err(TopologyError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_remove_adjacency_is_idempotent_in_either_order() {
    let repo = LocalRepository::new();
    let ids = seed_sectors(&repo, SectorKind::Dnc, &["A", "B"]).await;
    let (a, b) = (ids[0], ids[1]);
    add_adjacency(&repo, SectorKind::Dnc, a, &[b]).await.unwrap();

    assert!(remove_adjacency(&repo, SectorKind::Dnc, b, a).await.unwrap());
    assert!(!remove_adjacency(&repo, SectorKind::Dnc, a, b).await.unwrap());
    assert!(!remove_adjacency(&repo, SectorKind::Dnc, a, a).await.unwrap());
    assert!(list_adjacent(&repo, SectorKind::Dnc, a).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_nearest_from_either_side() {
    let repo = LocalRepository::new();
    let dnc = seed_sectors(&repo, SectorKind::Dnc, &["D1", "D2"]).await;
    let ecd = seed_sectors(&repo, SectorKind::Ecd, &["E1"]).await;

    assert_eq!(
        add_nearest(&repo, SectorKind::Dnc, dnc[0], &[ecd[0], dnc[1]])
            .await
            .unwrap(),
        vec![ecd[0]]
    );
    assert_eq!(
        add_nearest(&repo, SectorKind::Ecd, ecd[0], &[dnc[0], dnc[1]])
            .await
            .unwrap(),
        vec![dnc[1]]
    );

    assert_eq!(
        list_nearest(&repo, SectorKind::Ecd, ecd[0]).await.unwrap(),
        vec![dnc[0], dnc[1]]
    );
    assert_eq!(
        list_nearest(&repo, SectorKind::Dnc, dnc[1]).await.unwrap(),
        vec![ecd[0]]
    );
    assert_eq!(repo.nearest_pair_count(), 2);

    assert!(remove_nearest(&repo, dnc[0], ecd[0]).await.unwrap());
    assert!(!remove_nearest(&repo, dnc[0], ecd[0]).await.unwrap());
    assert_eq!(repo.nearest_pair_count(), 1);
}

#[tokio::test]
async fn test_failed_insert_rolls_back_whole_batch() {
    let repo = LocalRepository::new();
    let ids = seed_sectors(&repo, SectorKind::Dnc, &["A", "B", "C"]).await;
    repo.inject_fault(crate::db::repository::Table::AdjacentPairs);

    let result = add_adjacency(&repo, SectorKind::Dnc, ids[0], &[ids[1], ids[2]]).await;
    assert!(matches!(
        result,
        Err(TopologyError::TransactionFailed { .. })
    ));

    repo.clear_faults();
    assert_eq!(repo.adjacent_pair_count(SectorKind::Dnc), 0);
}

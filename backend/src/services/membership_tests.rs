use super::*;
use crate::db::repositories::LocalRepository;
use crate::db::repository::RepositoryError;
use crate::models::{StationFields, StationId};
use proptest::prelude::*;

fn entry(id: i64, position: i32) -> MembershipEntry {
    MembershipEntry {
        member_id: MemberId(id),
        position,
        belongs: true,
    }
}

fn ids(values: &[i64]) -> Vec<MemberId> {
    values.iter().copied().map(MemberId).collect()
}

struct Fixture {
    repo: LocalRepository,
    train_sectors: Vec<TrainSectorId>,
    stations: Vec<StationId>,
}

/// One DNC sector with two train sectors and `stations` stations.
async fn fixture(stations: usize) -> Fixture {
    let repo = LocalRepository::new();
    let (train_sectors, station_ids) = transaction(&repo, "seed", move |tx| {
        let sector = tx.insert_sector(SectorKind::Dnc, "North")?;
        let ts = vec![
            tx.insert_train_sector(SectorKind::Dnc, sector.id, "N-1")?.id,
            tx.insert_train_sector(SectorKind::Dnc, sector.id, "N-2")?.id,
        ];
        let mut station_ids = Vec::new();
        for i in 0..stations {
            let station = tx.insert_station(&StationFields {
                esr_code: format!("{:06}", i + 1),
                name: format!("Station {}", i + 1),
            })?;
            station_ids.push(station.id);
        }
        Ok::<_, RepositoryError>((ts, station_ids))
    })
    .await
    .unwrap();

    Fixture {
        repo,
        train_sectors,
        stations: station_ids,
    }
}

async fn place(fx: &Fixture, ts: TrainSectorId, station: StationId, position: i32) {
    transaction(&fx.repo, "place", move |tx| {
        tx.set_slot(
            MemberKind::Station,
            SectorKind::Dnc,
            station.into(),
            Some(MemberSlot {
                train_sector_id: ts,
                position,
                belongs: true,
            }),
        )
    })
    .await
    .unwrap();
}

#[test]
fn test_plan_on_empty_list_starts_at_one() {
    let plan = plan_reconciliation(&[], &ids(&[5, 5, 6])).unwrap();
    assert_eq!(plan.additions, vec![(MemberId(5), 1), (MemberId(6), 2)]);
    assert!(plan.removals.is_empty());
    assert!(plan.retained.is_empty());
}

#[test]
fn test_plan_keeps_retained_positions() {
    let current = [entry(1, 0), entry(2, 1)];
    let plan = plan_reconciliation(&current, &ids(&[2, 3])).unwrap();
    assert_eq!(plan.additions, vec![(MemberId(3), 2)]);
    assert_eq!(plan.removals, ids(&[1]));
    assert_eq!(plan.retained, ids(&[2]));
}

#[test]
fn test_plan_same_target_is_noop() {
    let current = [entry(1, 4), entry(2, 9)];
    assert!(plan_reconciliation(&current, &ids(&[2, 1]))
        .unwrap()
        .is_noop());
}

#[test]
fn test_plan_rejects_exhausted_positions() {
    let current = [entry(1, i32::MAX)];
    assert!(matches!(
        plan_reconciliation(&current, &ids(&[1, 2])),
        Err(TopologyError::Validation { .. })
    ));
}

proptest! {
    #[test]
    fn prop_additions_never_collide(
        current in proptest::collection::btree_map(0i64..50, 0i32..100, 0..10),
        target in proptest::collection::vec(0i64..60, 0..20),
    ) {
        let current: Vec<MembershipEntry> =
            current.into_iter().map(|(id, pos)| entry(id, pos)).collect();
        let plan = plan_reconciliation(&current, &ids(&target)).unwrap();

        let max = current.iter().map(|e| e.position).max().unwrap_or(0);
        let positions: Vec<i32> = plan.additions.iter().map(|(_, p)| *p).collect();
        for (i, p) in positions.iter().enumerate() {
            prop_assert_eq!(*p, max + 1 + i as i32);
        }
        prop_assert_eq!(plan.removals.len() + plan.retained.len(), current.len());
    }
}

#[tokio::test]
async fn test_reconcile_is_deterministic_and_idempotent() {
    let fx = fixture(3).await;
    let ts = fx.train_sectors[0];
    let (s1, s2, s3) = (fx.stations[0], fx.stations[1], fx.stations[2]);
    place(&fx, ts, s1, 0).await;
    place(&fx, ts, s2, 1).await;

    let target = [MemberId::from(s2), MemberId::from(s3)];
    let first =
        reconcile_membership(&fx.repo, MemberKind::Station, SectorKind::Dnc, ts, &target)
            .await
            .unwrap();
    assert_eq!(first, vec![entry(s2.0, 1), entry(s3.0, 2)]);

    let second =
        reconcile_membership(&fx.repo, MemberKind::Station, SectorKind::Dnc, ts, &target)
            .await
            .unwrap();
    assert_eq!(first, second);

    let station = transaction(&fx.repo, "read", move |tx| tx.station(s1))
        .await
        .unwrap()
        .unwrap();
    assert!(station.slots.dnc.is_none());
}

#[tokio::test]
async fn test_reconcile_moves_member_between_train_sectors() {
    let fx = fixture(1).await;
    let (from, to) = (fx.train_sectors[0], fx.train_sectors[1]);
    let station = fx.stations[0];
    place(&fx, from, station, 7).await;

    reconcile_membership(
        &fx.repo,
        MemberKind::Station,
        SectorKind::Dnc,
        to,
        &[MemberId::from(station)],
    )
    .await
    .unwrap();

    let old = list_membership(&fx.repo, MemberKind::Station, SectorKind::Dnc, from)
        .await
        .unwrap();
    let new = list_membership(&fx.repo, MemberKind::Station, SectorKind::Dnc, to)
        .await
        .unwrap();
    assert!(old.is_empty());
    assert_eq!(new, vec![entry(station.0, 1)]);
}

#[tokio::test]
async fn test_reconcile_unknown_member_changes_nothing() {
    let fx = fixture(2).await;
    let ts = fx.train_sectors[0];
    place(&fx, ts, fx.stations[0], 0).await;

    let result = reconcile_membership(
        &fx.repo,
        MemberKind::Station,
        SectorKind::Dnc,
        ts,
        &[MemberId::from(fx.stations[1]), MemberId(404)],
    )
    .await;
    assert!(matches!(result, Err(TopologyError::NotFound { .. })));

    let members = list_membership(&fx.repo, MemberKind::Station, SectorKind::Dnc, ts)
        .await
        .unwrap();
    assert_eq!(members, vec![entry(fx.stations[0].0, 0)]);
}

#[tokio::test]
async fn test_reconcile_unknown_train_sector() {
    let fx = fixture(1).await;
    let result = reconcile_membership(
        &fx.repo,
        MemberKind::Station,
        SectorKind::Dnc,
        TrainSectorId(99),
        &[MemberId::from(fx.stations[0])],
    )
    .await;
    assert!(matches!(result, Err(TopologyError::NotFound { .. })));

    // A DNC train sector is not visible as ECD
    let result = list_membership(
        &fx.repo,
        MemberKind::Station,
        SectorKind::Ecd,
        fx.train_sectors[0],
    )
    .await;
    assert!(matches!(result, Err(TopologyError::NotFound { .. })));
}

#[tokio::test]
async fn test_set_member_position_rules() {
    let fx = fixture(2).await;
    let ts = fx.train_sectors[0];
    let (s1, s2) = (fx.stations[0], fx.stations[1]);
    place(&fx, ts, s1, 1).await;
    place(&fx, ts, s2, 2).await;
    let relaxed = EngineOptions::default();
    let strict = EngineOptions {
        strict_positions: true,
    };

    let negative = set_member_position(
        &fx.repo,
        relaxed,
        MemberKind::Station,
        SectorKind::Dnc,
        ts,
        s1.into(),
        -1,
        true,
    )
    .await;
    assert!(matches!(negative, Err(TopologyError::Validation { .. })));

    let outsider = set_member_position(
        &fx.repo,
        relaxed,
        MemberKind::Station,
        SectorKind::Dnc,
        fx.train_sectors[1],
        s1.into(),
        3,
        true,
    )
    .await;
    assert!(matches!(outsider, Err(TopologyError::NotFound { .. })));

    let taken = set_member_position(
        &fx.repo,
        strict,
        MemberKind::Station,
        SectorKind::Dnc,
        ts,
        s1.into(),
        2,
        true,
    )
    .await;
    assert!(matches!(taken, Err(TopologyError::Conflict { .. })));

    let updated = set_member_position(
        &fx.repo,
        strict,
        MemberKind::Station,
        SectorKind::Dnc,
        ts,
        s1.into(),
        5,
        false,
    )
    .await
    .unwrap();
    assert_eq!(
        updated,
        MembershipEntry {
            member_id: s1.into(),
            position: 5,
            belongs: false,
        }
    );

    // Without strict positions a shared position is accepted
    set_member_position(
        &fx.repo,
        relaxed,
        MemberKind::Station,
        SectorKind::Dnc,
        ts,
        s2.into(),
        5,
        true,
    )
    .await
    .unwrap();
    let positions: Vec<i32> = list_membership(&fx.repo, MemberKind::Station, SectorKind::Dnc, ts)
        .await
        .unwrap()
        .iter()
        .map(|e| e.position)
        .collect();
    assert_eq!(positions, vec![5, 5]);
}

#[tokio::test]
async fn test_remove_member_is_idempotent() {
    let fx = fixture(1).await;
    let ts = fx.train_sectors[0];
    let station = fx.stations[0];
    place(&fx, ts, station, 1).await;

    assert!(
        remove_member(&fx.repo, MemberKind::Station, SectorKind::Dnc, ts, station.into())
            .await
            .unwrap()
    );
    assert!(
        !remove_member(&fx.repo, MemberKind::Station, SectorKind::Dnc, ts, station.into())
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn test_block_membership_uses_its_own_slots() {
    let fx = fixture(2).await;
    let ts = fx.train_sectors[0];
    let (a, b) = (fx.stations[0], fx.stations[1]);
    let block = transaction(&fx.repo, "block", move |tx| {
        tx.insert_block(&crate::models::BlockFields {
            name: "A-B".into(),
            station1_id: a,
            station2_id: b,
        })
    })
    .await
    .unwrap();

    let members = reconcile_membership(
        &fx.repo,
        MemberKind::Block,
        SectorKind::Dnc,
        ts,
        &[MemberId::from(block.id)],
    )
    .await
    .unwrap();
    assert_eq!(members, vec![entry(block.id.0, 1)]);

    let stations = list_membership(&fx.repo, MemberKind::Station, SectorKind::Dnc, ts)
        .await
        .unwrap();
    assert!(stations.is_empty());
}

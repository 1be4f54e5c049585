use super::*;
use crate::db::repositories::LocalRepository;

fn station(esr: &str, name: &str) -> StationFields {
    StationFields {
        esr_code: esr.to_string(),
        name: name.to_string(),
    }
}

fn block(name: &str, a: StationId, b: StationId) -> BlockFields {
    BlockFields {
        name: name.to_string(),
        station1_id: a,
        station2_id: b,
    }
}

#[test]
fn test_field_rules() {
    assert!(check_station(&station("123456", "Ok")).is_ok());
    assert!(matches!(
        check_station(&station("1234567", "Too long code")),
        Err(TopologyError::Validation {
            field: "esr_code",
            ..
        })
    ));
    assert!(matches!(
        check_station(&station("1", "   ")),
        Err(TopologyError::Validation { field: "name", .. })
    ));
    // Length counts characters, not bytes
    assert!(check_name(&"ж".repeat(MAX_NAME_LEN)).is_ok());
    assert!(check_name(&"ж".repeat(MAX_NAME_LEN + 1)).is_err());
}

#[tokio::test]
async fn test_station_lifecycle() {
    let repo = LocalRepository::new();
    let created = create_station(&repo, station("200001", "Kazan"))
        .await
        .unwrap();
    assert_eq!(get_station(&repo, created.id).await.unwrap(), created);

    let updated = update_station(&repo, created.id, station("200002", "Kazan-Pass"))
        .await
        .unwrap();
    assert_eq!(updated.esr_code, "200002");
    assert_eq!(list_stations(&repo).await.unwrap(), vec![updated]);

    delete_station(&repo, created.id).await.unwrap();
    assert!(matches!(
        get_station(&repo, created.id).await,
        Err(TopologyError::NotFound { .. })
    ));
    assert!(matches!(
        delete_station(&repo, created.id).await,
        Err(TopologyError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_duplicate_esr_code_is_conflict() {
    let repo = LocalRepository::new();
    let first = create_station(&repo, station("300001", "A")).await.unwrap();
    let second = create_station(&repo, station("300002", "B")).await.unwrap();

    assert!(matches!(
        create_station(&repo, station("300001", "C")).await,
        Err(TopologyError::Conflict { .. })
    ));
    assert!(matches!(
        update_station(&repo, second.id, station("300001", "B")).await,
        Err(TopologyError::Conflict { .. })
    ));
    // Keeping one's own code is fine
    update_station(&repo, first.id, station("300001", "A2"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_block_rules() {
    let repo = LocalRepository::new();
    let a = create_station(&repo, station("400001", "A")).await.unwrap().id;
    let b = create_station(&repo, station("400002", "B")).await.unwrap().id;

    assert!(matches!(
        create_block(&repo, block("Loop", a, a)).await,
        Err(TopologyError::Validation { .. })
    ));
    assert!(matches!(
        create_block(&repo, block("Dangling", a, StationId(999))).await,
        Err(TopologyError::NotFound { .. })
    ));

    let ab = create_block(&repo, block("A-B", a, b)).await.unwrap();
    assert!(matches!(
        create_block(&repo, block("B-A", b, a)).await,
        Err(TopologyError::Conflict { .. })
    ));
    assert!(matches!(
        create_block(&repo, block("A-B", a, b)).await,
        Err(TopologyError::Conflict { .. })
    ));

    assert!(matches!(
        delete_station(&repo, a).await,
        Err(TopologyError::Conflict { .. })
    ));

    let renamed = update_block(&repo, ab.id, block("A-B main", b, a))
        .await
        .unwrap();
    assert_eq!(renamed.name, "A-B main");
    assert_eq!(list_blocks(&repo).await.unwrap().len(), 1);

    delete_block(&repo, ab.id).await.unwrap();
    delete_station(&repo, a).await.unwrap();
    assert!(matches!(
        get_block(&repo, ab.id).await,
        Err(TopologyError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_sector_names_are_unique_per_kind() {
    let repo = LocalRepository::new();
    let dnc = create_sector(&repo, SectorKind::Dnc, "Volga".into())
        .await
        .unwrap();
    create_sector(&repo, SectorKind::Ecd, "Volga".into())
        .await
        .unwrap();

    assert!(matches!(
        create_sector(&repo, SectorKind::Dnc, "Volga".into()).await,
        Err(TopologyError::Conflict { .. })
    ));
    assert!(matches!(
        create_sector(&repo, SectorKind::Dnc, String::new()).await,
        Err(TopologyError::Validation { .. })
    ));

    let renamed = rename_sector(&repo, SectorKind::Dnc, dnc.id, "Upper Volga".into())
        .await
        .unwrap();
    assert_eq!(renamed.name, "Upper Volga");
    assert_eq!(list_sectors(&repo, SectorKind::Dnc).await.unwrap(), vec![renamed]);

    assert!(matches!(
        get_sector(&repo, SectorKind::Ecd, dnc.id).await,
        Err(TopologyError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_train_sector_requires_owner_of_same_kind() {
    let repo = LocalRepository::new();
    let dnc = create_sector(&repo, SectorKind::Dnc, "D".into()).await.unwrap();
    let other = create_sector(&repo, SectorKind::Dnc, "D2".into()).await.unwrap();
    let ecd = create_sector(&repo, SectorKind::Ecd, "E".into()).await.unwrap();

    assert!(matches!(
        create_train_sector(&repo, SectorKind::Dnc, ecd.id, "T".into()).await,
        Err(TopologyError::NotFound { .. })
    ));

    let ts = create_train_sector(&repo, SectorKind::Dnc, dnc.id, "T".into())
        .await
        .unwrap();
    assert!(matches!(
        create_train_sector(&repo, SectorKind::Dnc, other.id, "T".into()).await,
        Err(TopologyError::Conflict { .. })
    ));

    let moved = update_train_sector(&repo, SectorKind::Dnc, ts.id, "T-moved".into(), other.id)
        .await
        .unwrap();
    assert_eq!(moved.sector_id, other.id);
    assert_eq!(
        get_train_sector(&repo, SectorKind::Dnc, ts.id).await.unwrap(),
        moved
    );

    assert!(list_train_sectors(&repo, SectorKind::Dnc, Some(dnc.id))
        .await
        .unwrap()
        .is_empty());
    assert_eq!(
        list_train_sectors(&repo, SectorKind::Dnc, None)
            .await
            .unwrap()
            .len(),
        1
    );
    assert!(matches!(
        list_train_sectors(&repo, SectorKind::Dnc, Some(SectorId(77))).await,
        Err(TopologyError::NotFound { .. })
    ));
}

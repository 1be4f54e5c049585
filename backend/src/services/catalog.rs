//! Entity catalog: stations, blocks, sectors and train sectors.
//!
//! Field rules are checked before the transaction opens. Uniqueness is left to
//! the store, whose violations surface as [`TopologyError::Conflict`].
//! Sector deletion lives in [`super::cascade`].

use log::debug;

use super::error::{TopologyError, TopologyResult};
use crate::db::repository::{transaction, StoreTx, TopologyRepository};
use crate::models::{
    Block, BlockFields, BlockId, Sector, SectorId, SectorKind, Station, StationFields, StationId,
    TrainSector, TrainSectorId, MAX_ESR_CODE_LEN, MAX_NAME_LEN,
};

// =========================================================
// Field rules
// =========================================================

fn check_length(field: &'static str, value: &str, max: usize) -> TopologyResult<()> {
    if value.trim().is_empty() {
        return Err(TopologyError::validation(field, "must not be empty"));
    }
    let len = value.chars().count();
    if len > max {
        return Err(TopologyError::validation(
            field,
            format!("must be at most {} characters, got {}", max, len),
        ));
    }
    Ok(())
}

fn check_name(value: &str) -> TopologyResult<()> {
    check_length("name", value, MAX_NAME_LEN)
}

fn check_station(fields: &StationFields) -> TopologyResult<()> {
    check_length("esr_code", &fields.esr_code, MAX_ESR_CODE_LEN)?;
    check_name(&fields.name)
}

fn check_block(fields: &BlockFields) -> TopologyResult<()> {
    check_name(&fields.name)?;
    if fields.station1_id == fields.station2_id {
        return Err(TopologyError::validation(
            "station2_id",
            format!(
                "a block must connect two different stations, got {} twice",
                fields.station1_id
            ),
        ));
    }
    Ok(())
}

fn require_endpoints(tx: &mut dyn StoreTx, fields: &BlockFields) -> TopologyResult<()> {
    for id in [fields.station1_id, fields.station2_id] {
        if tx.station(id)?.is_none() {
            return Err(TopologyError::not_found("station", id));
        }
    }
    Ok(())
}

fn require_sector(tx: &mut dyn StoreTx, kind: SectorKind, id: SectorId) -> TopologyResult<()> {
    match tx.sector(kind, id)? {
        Some(_) => Ok(()),
        None => Err(TopologyError::not_found(format!("{} sector", kind), id)),
    }
}

// =========================================================
// Stations
// =========================================================

pub async fn create_station<R: TopologyRepository + ?Sized>(
    repo: &R,
    fields: StationFields,
) -> TopologyResult<Station> {
    check_station(&fields)?;
    let station = transaction(repo, "create_station", move |tx| {
        Ok::<_, TopologyError>(tx.insert_station(&fields)?)
    })
    .await?;

    debug!("Created station {} ({})", station.id, station.esr_code);
    Ok(station)
}

pub async fn get_station<R: TopologyRepository + ?Sized>(
    repo: &R,
    id: StationId,
) -> TopologyResult<Station> {
    transaction(repo, "get_station", move |tx| {
        tx.station(id)?
            .ok_or_else(|| TopologyError::not_found("station", id))
    })
    .await
}

pub async fn list_stations<R: TopologyRepository + ?Sized>(
    repo: &R,
) -> TopologyResult<Vec<Station>> {
    transaction(repo, "list_stations", |tx| {
        Ok::<_, TopologyError>(tx.stations()?)
    })
    .await
}

/// Overwrite the ESR code and name of a station. Memberships are kept.
pub async fn update_station<R: TopologyRepository + ?Sized>(
    repo: &R,
    id: StationId,
    fields: StationFields,
) -> TopologyResult<Station> {
    check_station(&fields)?;
    let station = transaction(repo, "update_station", move |tx| {
        if !tx.update_station(id, &fields)? {
            return Err(TopologyError::not_found("station", id));
        }
        tx.station(id)?
            .ok_or_else(|| TopologyError::not_found("station", id))
    })
    .await?;

    debug!("Updated station {}", id);
    Ok(station)
}

/// Delete a station.
///
/// # Errors
/// - [`TopologyError::NotFound`] if the station does not exist
/// - [`TopologyError::Conflict`] if a block still ends at the station
pub async fn delete_station<R: TopologyRepository + ?Sized>(
    repo: &R,
    id: StationId,
) -> TopologyResult<()> {
    transaction(repo, "delete_station", move |tx| {
        let blocks = tx.blocks_touching_station(id)?;
        if !blocks.is_empty() {
            return Err(TopologyError::conflict(format!(
                "station {} is an endpoint of blocks {:?}",
                id,
                blocks.iter().map(|b| b.0).collect::<Vec<_>>()
            )));
        }
        if !tx.delete_station(id)? {
            return Err(TopologyError::not_found("station", id));
        }
        Ok(())
    })
    .await?;

    debug!("Deleted station {}", id);
    Ok(())
}

// =========================================================
// Blocks
// =========================================================

/// Create a block between two existing, distinct stations.
///
/// # Errors
/// - [`TopologyError::Validation`] for a bad name or identical endpoints
/// - [`TopologyError::NotFound`] if an endpoint station does not exist
/// - [`TopologyError::Conflict`] if the name or the unordered endpoint pair
///   is already used by another block
pub async fn create_block<R: TopologyRepository + ?Sized>(
    repo: &R,
    fields: BlockFields,
) -> TopologyResult<Block> {
    check_block(&fields)?;
    let block = transaction(repo, "create_block", move |tx| {
        require_endpoints(tx, &fields)?;
        Ok::<_, TopologyError>(tx.insert_block(&fields)?)
    })
    .await?;

    debug!(
        "Created block {} between stations {} and {}",
        block.id, block.station1_id, block.station2_id
    );
    Ok(block)
}

pub async fn get_block<R: TopologyRepository + ?Sized>(
    repo: &R,
    id: BlockId,
) -> TopologyResult<Block> {
    transaction(repo, "get_block", move |tx| {
        tx.block(id)?
            .ok_or_else(|| TopologyError::not_found("block", id))
    })
    .await
}

pub async fn list_blocks<R: TopologyRepository + ?Sized>(repo: &R) -> TopologyResult<Vec<Block>> {
    transaction(repo, "list_blocks", |tx| {
        Ok::<_, TopologyError>(tx.blocks()?)
    })
    .await
}

pub async fn update_block<R: TopologyRepository + ?Sized>(
    repo: &R,
    id: BlockId,
    fields: BlockFields,
) -> TopologyResult<Block> {
    check_block(&fields)?;
    let block = transaction(repo, "update_block", move |tx| {
        require_endpoints(tx, &fields)?;
        if !tx.update_block(id, &fields)? {
            return Err(TopologyError::not_found("block", id));
        }
        tx.block(id)?
            .ok_or_else(|| TopologyError::not_found("block", id))
    })
    .await?;

    debug!("Updated block {}", id);
    Ok(block)
}

pub async fn delete_block<R: TopologyRepository + ?Sized>(
    repo: &R,
    id: BlockId,
) -> TopologyResult<()> {
    transaction(repo, "delete_block", move |tx| {
        if !tx.delete_block(id)? {
            return Err(TopologyError::not_found("block", id));
        }
        Ok(())
    })
    .await?;

    debug!("Deleted block {}", id);
    Ok(())
}

// =========================================================
// Sectors
// =========================================================

pub async fn create_sector<R: TopologyRepository + ?Sized>(
    repo: &R,
    kind: SectorKind,
    name: String,
) -> TopologyResult<Sector> {
    check_name(&name)?;
    let sector = transaction(repo, "create_sector", move |tx| {
        Ok::<_, TopologyError>(tx.insert_sector(kind, &name)?)
    })
    .await?;

    debug!("Created {} sector {} '{}'", kind, sector.id, sector.name);
    Ok(sector)
}

pub async fn get_sector<R: TopologyRepository + ?Sized>(
    repo: &R,
    kind: SectorKind,
    id: SectorId,
) -> TopologyResult<Sector> {
    transaction(repo, "get_sector", move |tx| {
        tx.sector(kind, id)?
            .ok_or_else(|| TopologyError::not_found(format!("{} sector", kind), id))
    })
    .await
}

pub async fn list_sectors<R: TopologyRepository + ?Sized>(
    repo: &R,
    kind: SectorKind,
) -> TopologyResult<Vec<Sector>> {
    transaction(repo, "list_sectors", move |tx| {
        Ok::<_, TopologyError>(tx.sectors(kind)?)
    })
    .await
}

pub async fn rename_sector<R: TopologyRepository + ?Sized>(
    repo: &R,
    kind: SectorKind,
    id: SectorId,
    name: String,
) -> TopologyResult<Sector> {
    check_name(&name)?;
    let sector = transaction(repo, "rename_sector", move |tx| {
        if !tx.rename_sector(kind, id, &name)? {
            return Err(TopologyError::not_found(format!("{} sector", kind), id));
        }
        tx.sector(kind, id)?
            .ok_or_else(|| TopologyError::not_found(format!("{} sector", kind), id))
    })
    .await?;

    debug!("Renamed {} sector {} to '{}'", kind, id, sector.name);
    Ok(sector)
}

// =========================================================
// Train Sectors
// =========================================================

/// Create a train sector owned by an existing sector of the same kind.
pub async fn create_train_sector<R: TopologyRepository + ?Sized>(
    repo: &R,
    kind: SectorKind,
    sector_id: SectorId,
    name: String,
) -> TopologyResult<TrainSector> {
    check_name(&name)?;
    let train_sector = transaction(repo, "create_train_sector", move |tx| {
        require_sector(tx, kind, sector_id)?;
        Ok::<_, TopologyError>(tx.insert_train_sector(kind, sector_id, &name)?)
    })
    .await?;

    debug!(
        "Created {} train sector {} in sector {}",
        kind, train_sector.id, sector_id
    );
    Ok(train_sector)
}

pub async fn get_train_sector<R: TopologyRepository + ?Sized>(
    repo: &R,
    kind: SectorKind,
    id: TrainSectorId,
) -> TopologyResult<TrainSector> {
    transaction(repo, "get_train_sector", move |tx| {
        tx.train_sector(kind, id)?
            .ok_or_else(|| TopologyError::not_found(format!("{} train sector", kind), id))
    })
    .await
}

/// Train sectors of `kind`, optionally only those owned by `owner`.
///
/// Filtering by an unknown owner is a [`TopologyError::NotFound`] rather
/// than an empty list.
pub async fn list_train_sectors<R: TopologyRepository + ?Sized>(
    repo: &R,
    kind: SectorKind,
    owner: Option<SectorId>,
) -> TopologyResult<Vec<TrainSector>> {
    transaction(repo, "list_train_sectors", move |tx| -> TopologyResult<_> {
        if let Some(owner) = owner {
            require_sector(tx, kind, owner)?;
        }
        Ok(tx.train_sectors(kind, owner)?)
    })
    .await
}

/// Rename a train sector and/or move it to another sector of the same kind.
/// Members keep their slots.
pub async fn update_train_sector<R: TopologyRepository + ?Sized>(
    repo: &R,
    kind: SectorKind,
    id: TrainSectorId,
    name: String,
    sector_id: SectorId,
) -> TopologyResult<TrainSector> {
    check_name(&name)?;
    let train_sector = transaction(repo, "update_train_sector", move |tx| {
        require_sector(tx, kind, sector_id)?;
        if !tx.update_train_sector(kind, id, sector_id, &name)? {
            return Err(TopologyError::not_found(format!("{} train sector", kind), id));
        }
        tx.train_sector(kind, id)?
            .ok_or_else(|| TopologyError::not_found(format!("{} train sector", kind), id))
    })
    .await?;

    debug!(
        "Updated {} train sector {} (sector {})",
        kind, id, train_sector.sector_id
    );
    Ok(train_sector)
}

#[cfg(test)]
#[path = "catalog_tests.rs"]
mod tests;

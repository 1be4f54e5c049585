//! HTTP handlers for the REST API.
//!
//! Each handler checks the caller's capability, then delegates to one
//! service operation. Reads need no capability. Membership changes are
//! gated by the write capability of the train sector's kind.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use super::auth::{self, Permissions};
use super::dto::{
    HealthResponse, ListResponse, MemberPositionRequest, PairAddResponse, PairCandidatesRequest,
    ReconcileRequest, RelatedSectorsResponse, RemovedResponse, SectorRequest, TrainSectorQuery,
    TrainSectorRequest,
};
use super::error::AppError;
use super::state::AppState;
use crate::models::{
    Block, BlockFields, BlockId, MemberId, MemberKind, MembershipEntry, Sector, SectorId,
    SectorKind, Station, StationFields, StationId, TrainSector, TrainSectorId,
};
use crate::services::{cascade, catalog, membership, pairs, CascadeReport};

/// Result type for handlers.
pub type HandlerResult<T> = Result<Json<T>, AppError>;

/// Result type for handlers that create a resource.
pub type CreatedResult<T> = Result<(StatusCode, Json<T>), AppError>;

// =============================================================================
// Health Check
// =============================================================================

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> HandlerResult<HealthResponse> {
    let db_status = match state.repository.health_check().await {
        Ok(true) => "connected".to_string(),
        Ok(false) => "disconnected".to_string(),
        Err(e) => format!("error: {}", e),
    };

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: "v1".to_string(),
        backend: state.repository.backend_name().to_string(),
        database: db_status,
    }))
}

// =============================================================================
// Stations
// =============================================================================

/// GET /v1/stations
pub async fn list_stations(State(state): State<AppState>) -> HandlerResult<ListResponse<Station>> {
    let stations = catalog::list_stations(state.repository.as_ref()).await?;
    Ok(Json(stations.into()))
}

/// POST /v1/stations
pub async fn create_station(
    State(state): State<AppState>,
    perms: Permissions,
    Json(fields): Json<StationFields>,
) -> CreatedResult<Station> {
    perms.require(auth::STATIONS_WRITE)?;
    let station = catalog::create_station(state.repository.as_ref(), fields).await?;
    Ok((StatusCode::CREATED, Json(station)))
}

/// GET /v1/stations/{id}
pub async fn get_station(
    State(state): State<AppState>,
    Path(id): Path<StationId>,
) -> HandlerResult<Station> {
    Ok(Json(catalog::get_station(state.repository.as_ref(), id).await?))
}

/// PUT /v1/stations/{id}
pub async fn update_station(
    State(state): State<AppState>,
    Path(id): Path<StationId>,
    perms: Permissions,
    Json(fields): Json<StationFields>,
) -> HandlerResult<Station> {
    perms.require(auth::STATIONS_WRITE)?;
    Ok(Json(
        catalog::update_station(state.repository.as_ref(), id, fields).await?,
    ))
}

/// DELETE /v1/stations/{id}
pub async fn delete_station(
    State(state): State<AppState>,
    Path(id): Path<StationId>,
    perms: Permissions,
) -> Result<StatusCode, AppError> {
    perms.require(auth::STATIONS_WRITE)?;
    catalog::delete_station(state.repository.as_ref(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Blocks
// =============================================================================

/// GET /v1/blocks
pub async fn list_blocks(State(state): State<AppState>) -> HandlerResult<ListResponse<Block>> {
    let blocks = catalog::list_blocks(state.repository.as_ref()).await?;
    Ok(Json(blocks.into()))
}

/// POST /v1/blocks
pub async fn create_block(
    State(state): State<AppState>,
    perms: Permissions,
    Json(fields): Json<BlockFields>,
) -> CreatedResult<Block> {
    perms.require(auth::BLOCKS_WRITE)?;
    let block = catalog::create_block(state.repository.as_ref(), fields).await?;
    Ok((StatusCode::CREATED, Json(block)))
}

/// GET /v1/blocks/{id}
pub async fn get_block(
    State(state): State<AppState>,
    Path(id): Path<BlockId>,
) -> HandlerResult<Block> {
    Ok(Json(catalog::get_block(state.repository.as_ref(), id).await?))
}

/// PUT /v1/blocks/{id}
pub async fn update_block(
    State(state): State<AppState>,
    Path(id): Path<BlockId>,
    perms: Permissions,
    Json(fields): Json<BlockFields>,
) -> HandlerResult<Block> {
    perms.require(auth::BLOCKS_WRITE)?;
    Ok(Json(
        catalog::update_block(state.repository.as_ref(), id, fields).await?,
    ))
}

/// DELETE /v1/blocks/{id}
pub async fn delete_block(
    State(state): State<AppState>,
    Path(id): Path<BlockId>,
    perms: Permissions,
) -> Result<StatusCode, AppError> {
    perms.require(auth::BLOCKS_WRITE)?;
    catalog::delete_block(state.repository.as_ref(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Sectors
// =============================================================================

/// GET /v1/sectors/{kind}
pub async fn list_sectors(
    State(state): State<AppState>,
    Path(kind): Path<SectorKind>,
) -> HandlerResult<ListResponse<Sector>> {
    let sectors = catalog::list_sectors(state.repository.as_ref(), kind).await?;
    Ok(Json(sectors.into()))
}

/// POST /v1/sectors/{kind}
pub async fn create_sector(
    State(state): State<AppState>,
    Path(kind): Path<SectorKind>,
    perms: Permissions,
    Json(request): Json<SectorRequest>,
) -> CreatedResult<Sector> {
    perms.require(auth::sector_write(kind))?;
    let sector = catalog::create_sector(state.repository.as_ref(), kind, request.name).await?;
    Ok((StatusCode::CREATED, Json(sector)))
}

/// GET /v1/sectors/{kind}/{id}
pub async fn get_sector(
    State(state): State<AppState>,
    Path((kind, id)): Path<(SectorKind, SectorId)>,
) -> HandlerResult<Sector> {
    Ok(Json(
        catalog::get_sector(state.repository.as_ref(), kind, id).await?,
    ))
}

/// PATCH /v1/sectors/{kind}/{id}
pub async fn rename_sector(
    State(state): State<AppState>,
    Path((kind, id)): Path<(SectorKind, SectorId)>,
    perms: Permissions,
    Json(request): Json<SectorRequest>,
) -> HandlerResult<Sector> {
    perms.require(auth::sector_write(kind))?;
    Ok(Json(
        catalog::rename_sector(state.repository.as_ref(), kind, id, request.name).await?,
    ))
}

/// DELETE /v1/sectors/{kind}/{id}
///
/// Cascades through train sectors, member slots and pairs.
pub async fn delete_sector(
    State(state): State<AppState>,
    Path((kind, id)): Path<(SectorKind, SectorId)>,
    perms: Permissions,
) -> HandlerResult<CascadeReport> {
    perms.require(auth::sector_write(kind))?;
    Ok(Json(
        cascade::delete_sector(state.repository.as_ref(), kind, id).await?,
    ))
}

// =============================================================================
// Adjacency
// =============================================================================

/// GET /v1/sectors/{kind}/{id}/adjacent
pub async fn list_adjacent(
    State(state): State<AppState>,
    Path((kind, id)): Path<(SectorKind, SectorId)>,
) -> HandlerResult<RelatedSectorsResponse> {
    let related = pairs::list_adjacent(state.repository.as_ref(), kind, id).await?;
    Ok(Json(RelatedSectorsResponse {
        sector_id: id,
        related,
    }))
}

/// POST /v1/sectors/{kind}/{id}/adjacent
pub async fn add_adjacency(
    State(state): State<AppState>,
    Path((kind, id)): Path<(SectorKind, SectorId)>,
    perms: Permissions,
    Json(request): Json<PairCandidatesRequest>,
) -> HandlerResult<PairAddResponse> {
    perms.require(auth::sector_write(kind))?;
    let inserted =
        pairs::add_adjacency(state.repository.as_ref(), kind, id, &request.candidates).await?;
    Ok(Json(PairAddResponse { inserted }))
}

/// DELETE /v1/sectors/{kind}/{id}/adjacent/{other}
pub async fn remove_adjacency(
    State(state): State<AppState>,
    Path((kind, id, other)): Path<(SectorKind, SectorId, SectorId)>,
    perms: Permissions,
) -> HandlerResult<RemovedResponse> {
    perms.require(auth::sector_write(kind))?;
    let removed = pairs::remove_adjacency(state.repository.as_ref(), kind, id, other).await?;
    Ok(Json(RemovedResponse { removed }))
}

// =============================================================================
// Nearest Neighbors
// =============================================================================

/// GET /v1/sectors/{kind}/{id}/nearest
pub async fn list_nearest(
    State(state): State<AppState>,
    Path((kind, id)): Path<(SectorKind, SectorId)>,
) -> HandlerResult<RelatedSectorsResponse> {
    let related = pairs::list_nearest(state.repository.as_ref(), kind, id).await?;
    Ok(Json(RelatedSectorsResponse {
        sector_id: id,
        related,
    }))
}

/// POST /v1/sectors/{kind}/{id}/nearest
pub async fn add_nearest(
    State(state): State<AppState>,
    Path((kind, id)): Path<(SectorKind, SectorId)>,
    perms: Permissions,
    Json(request): Json<PairCandidatesRequest>,
) -> HandlerResult<PairAddResponse> {
    perms.require(auth::sector_write(kind))?;
    let inserted =
        pairs::add_nearest(state.repository.as_ref(), kind, id, &request.candidates).await?;
    Ok(Json(PairAddResponse { inserted }))
}

/// DELETE /v1/nearest/{dnc}/{ecd}
///
/// Touches both kinds, so both write capabilities are required.
pub async fn remove_nearest(
    State(state): State<AppState>,
    Path((dnc, ecd)): Path<(SectorId, SectorId)>,
    perms: Permissions,
) -> HandlerResult<RemovedResponse> {
    perms.require(auth::sector_write(SectorKind::Dnc))?;
    perms.require(auth::sector_write(SectorKind::Ecd))?;
    let removed = pairs::remove_nearest(state.repository.as_ref(), dnc, ecd).await?;
    Ok(Json(RemovedResponse { removed }))
}

// =============================================================================
// Train Sectors
// =============================================================================

/// GET /v1/train-sectors/{kind}?sector_id=
pub async fn list_train_sectors(
    State(state): State<AppState>,
    Path(kind): Path<SectorKind>,
    Query(query): Query<TrainSectorQuery>,
) -> HandlerResult<ListResponse<TrainSector>> {
    let train_sectors =
        catalog::list_train_sectors(state.repository.as_ref(), kind, query.sector_id).await?;
    Ok(Json(train_sectors.into()))
}

/// POST /v1/train-sectors/{kind}
pub async fn create_train_sector(
    State(state): State<AppState>,
    Path(kind): Path<SectorKind>,
    perms: Permissions,
    Json(request): Json<TrainSectorRequest>,
) -> CreatedResult<TrainSector> {
    perms.require(auth::sector_write(kind))?;
    let train_sector = catalog::create_train_sector(
        state.repository.as_ref(),
        kind,
        request.sector_id,
        request.name,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(train_sector)))
}

/// GET /v1/train-sectors/{kind}/{id}
pub async fn get_train_sector(
    State(state): State<AppState>,
    Path((kind, id)): Path<(SectorKind, TrainSectorId)>,
) -> HandlerResult<TrainSector> {
    Ok(Json(
        catalog::get_train_sector(state.repository.as_ref(), kind, id).await?,
    ))
}

/// PUT /v1/train-sectors/{kind}/{id}
pub async fn update_train_sector(
    State(state): State<AppState>,
    Path((kind, id)): Path<(SectorKind, TrainSectorId)>,
    perms: Permissions,
    Json(request): Json<TrainSectorRequest>,
) -> HandlerResult<TrainSector> {
    perms.require(auth::sector_write(kind))?;
    Ok(Json(
        catalog::update_train_sector(
            state.repository.as_ref(),
            kind,
            id,
            request.name,
            request.sector_id,
        )
        .await?,
    ))
}

/// DELETE /v1/train-sectors/{kind}/{id}
pub async fn delete_train_sector(
    State(state): State<AppState>,
    Path((kind, id)): Path<(SectorKind, TrainSectorId)>,
    perms: Permissions,
) -> HandlerResult<CascadeReport> {
    perms.require(auth::sector_write(kind))?;
    Ok(Json(
        cascade::delete_train_sector(state.repository.as_ref(), kind, id).await?,
    ))
}

// =============================================================================
// Membership
// =============================================================================

/// GET /v1/train-sectors/{kind}/{id}/{member}
pub async fn list_members(
    State(state): State<AppState>,
    Path((kind, id, member)): Path<(SectorKind, TrainSectorId, MemberKind)>,
) -> HandlerResult<ListResponse<MembershipEntry>> {
    let members =
        membership::list_membership(state.repository.as_ref(), member, kind, id).await?;
    Ok(Json(members.into()))
}

/// PUT /v1/train-sectors/{kind}/{id}/{member}
///
/// Replaces the member set; retained members keep their positions.
pub async fn reconcile_members(
    State(state): State<AppState>,
    Path((kind, id, member)): Path<(SectorKind, TrainSectorId, MemberKind)>,
    perms: Permissions,
    Json(request): Json<ReconcileRequest>,
) -> HandlerResult<ListResponse<MembershipEntry>> {
    perms.require(auth::sector_write(kind))?;
    let members = membership::reconcile_membership(
        state.repository.as_ref(),
        member,
        kind,
        id,
        &request.members,
    )
    .await?;
    Ok(Json(members.into()))
}

/// PUT /v1/train-sectors/{kind}/{id}/{member}/{member_id}
pub async fn set_member_position(
    State(state): State<AppState>,
    Path((kind, id, member, member_id)): Path<(SectorKind, TrainSectorId, MemberKind, MemberId)>,
    perms: Permissions,
    Json(request): Json<MemberPositionRequest>,
) -> HandlerResult<MembershipEntry> {
    perms.require(auth::sector_write(kind))?;
    let entry = membership::set_member_position(
        state.repository.as_ref(),
        state.options,
        member,
        kind,
        id,
        member_id,
        request.position,
        request.belongs,
    )
    .await?;
    Ok(Json(entry))
}

/// DELETE /v1/train-sectors/{kind}/{id}/{member}/{member_id}
pub async fn remove_member(
    State(state): State<AppState>,
    Path((kind, id, member, member_id)): Path<(SectorKind, TrainSectorId, MemberKind, MemberId)>,
    perms: Permissions,
) -> HandlerResult<RemovedResponse> {
    perms.require(auth::sector_write(kind))?;
    let removed =
        membership::remove_member(state.repository.as_ref(), member, kind, id, member_id).await?;
    Ok(Json(RemovedResponse { removed }))
}

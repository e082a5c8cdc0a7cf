//! The unified API error type.
//!
//! [`ApiError`] collects every failure kind from the validation, auth,
//! not-found, conflict, transient, and fatal taxonomy into one enum and
//! converts it into the `{error, code, message, ...details}` envelope
//! via its [`IntoResponse`](axum::response::IntoResponse) implementation.
//! The event channel uses the same envelope, built from
//! [`ApiError::envelope`] directly rather than through Axum.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use settlement_construction::ConstructionError;
use settlement_disaster::DisasterError;
use settlement_structures::StructureError;
use settlement_types::{ErrorEnvelope, ResourceAmounts};

/// Errors that can occur anywhere in the HTTP/WebSocket surface.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// A required field was missing or malformed in the request body.
    #[error("missing or invalid field: {0}")]
    MissingFields(String),

    /// A target tile or slot index does not exist on the tile.
    #[error("invalid slot")]
    InvalidSlot,

    /// The target slot is already occupied.
    #[error("slot occupied")]
    SlotOccupied,

    /// A BUILDING-category structure would exceed the settlement's area.
    #[error("settlement area exceeded")]
    AreaExceeded,

    /// A unique-per-settlement structure already exists.
    #[error("structure already exists")]
    UniqueStructureExists,

    /// The settlement's TownHall level is below the definition's minimum.
    #[error("town hall level too low")]
    MinTownHallLevel,

    /// One or more prerequisite structures are missing or under-leveled.
    #[error("prerequisites not met")]
    PrerequisitesNotMet,

    /// Not enough stored resources to cover a cost.
    #[error("insufficient resources")]
    InsufficientResources(ResourceAmounts),

    /// No session was resolved from the request's credentials.
    #[error("unauthenticated")]
    Unauthenticated,

    /// The account does not hold the Administrator role.
    #[error("not an administrator")]
    NotAdmin,

    /// The account does not own the target settlement.
    #[error("not the settlement owner")]
    NotSettlementOwner,

    /// No settlement exists with the given id.
    #[error("settlement not found")]
    SettlementNotFound,

    /// No structure exists with the given id.
    #[error("structure not found")]
    StructureNotFound,

    /// No tile exists with the given id.
    #[error("tile not found")]
    TileNotFound,

    /// No world exists with the given id.
    #[error("world not found")]
    WorldNotFound,

    /// No construction queue entry exists with the given id.
    #[error("construction entry not found")]
    ConstructionNotFound,

    /// No server exists with the given id.
    #[error("server not found")]
    ServerNotFound,

    /// The world has not finished generating.
    #[error("world is not ready")]
    WorldNotReady,

    /// The requested action is disallowed while a disaster is in progress.
    #[error("a disaster is in progress")]
    DisasterInProgress,

    /// The construction queue has reached its 10-entry cap.
    #[error("construction queue is full")]
    QueueFull,

    /// The data store is unavailable after exhausting retries.
    #[error("store unavailable, retry later")]
    StoreUnavailable,

    /// Structure metadata could not be loaded.
    #[error("failed to load structure metadata")]
    MetadataFetchFailed,

    /// A structure build failed for a reason not covered above.
    #[error("failed to create structure: {0}")]
    CreateFailed(String),

    /// A structure upgrade failed for a reason not covered above.
    #[error("failed to upgrade structure: {0}")]
    UpgradeFailed(String),

    /// A structure demolish failed for a reason not covered above.
    #[error("failed to demolish structure: {0}")]
    DemolishFailed(String),

    /// An unanticipated internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// This error's taxonomy code, as delivered on the wire.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::MissingFields(_) => "MISSING_FIELDS",
            Self::InvalidSlot => "INVALID_SLOT",
            Self::SlotOccupied => "SLOT_OCCUPIED",
            Self::AreaExceeded => "AREA_EXCEEDED",
            Self::UniqueStructureExists => "UNIQUE_STRUCTURE_EXISTS",
            Self::MinTownHallLevel => "MIN_TOWN_HALL_LEVEL",
            Self::PrerequisitesNotMet => "PREREQUISITES_NOT_MET",
            Self::InsufficientResources(_) => "INSUFFICIENT_RESOURCES",
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::NotAdmin => "NOT_ADMIN",
            Self::NotSettlementOwner => "NOT_SETTLEMENT_OWNER",
            Self::SettlementNotFound => "SETTLEMENT_NOT_FOUND",
            Self::StructureNotFound => "STRUCTURE_NOT_FOUND",
            Self::TileNotFound => "TILE_NOT_FOUND",
            Self::WorldNotFound | Self::ServerNotFound => "WORLD_NOT_FOUND",
            Self::ConstructionNotFound => "CONSTRUCTION_NOT_FOUND",
            Self::WorldNotReady => "WORLD_NOT_READY",
            Self::DisasterInProgress => "DISASTER_IN_PROGRESS",
            Self::QueueFull => "QUEUE_FULL",
            Self::StoreUnavailable => "STORE_UNAVAILABLE",
            Self::MetadataFetchFailed => "METADATA_FETCH_FAILED",
            Self::CreateFailed(_) => "CREATE_FAILED",
            Self::UpgradeFailed(_) => "UPGRADE_FAILED",
            Self::DemolishFailed(_) => "DEMOLISH_FAILED",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    const fn status(&self) -> StatusCode {
        match self {
            Self::MissingFields(_)
            | Self::InvalidSlot
            | Self::SlotOccupied
            | Self::AreaExceeded
            | Self::UniqueStructureExists
            | Self::MinTownHallLevel
            | Self::PrerequisitesNotMet
            | Self::InsufficientResources(_) => StatusCode::BAD_REQUEST,
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::NotAdmin | Self::NotSettlementOwner => StatusCode::FORBIDDEN,
            Self::SettlementNotFound
            | Self::StructureNotFound
            | Self::TileNotFound
            | Self::WorldNotFound
            | Self::ServerNotFound
            | Self::ConstructionNotFound => StatusCode::NOT_FOUND,
            Self::WorldNotReady | Self::DisasterInProgress | Self::QueueFull => {
                StatusCode::CONFLICT
            }
            Self::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::MetadataFetchFailed
            | Self::CreateFailed(_)
            | Self::UpgradeFailed(_)
            | Self::DemolishFailed(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Build the wire envelope for this error, for delivery on either
    /// REST or the event channel.
    #[must_use]
    pub fn envelope(&self) -> ErrorEnvelope {
        let details = match self {
            Self::InsufficientResources(shortages) => serde_json::to_value(shortages).ok(),
            _ => None,
        };
        ErrorEnvelope {
            error: true,
            code: self.code().to_string(),
            message: self.to_string(),
            details,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(self.envelope())).into_response()
    }
}

impl From<settlement_db::DbError> for ApiError {
    fn from(err: settlement_db::DbError) -> Self {
        if err.is_transient() {
            return Self::StoreUnavailable;
        }
        match err {
            settlement_db::DbError::NotFound(what) => {
                Self::Internal(format!("not found: {what}"))
            }
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<StructureError> for ApiError {
    fn from(err: StructureError) -> Self {
        match err {
            StructureError::PrerequisitesNotMet(_) => Self::PrerequisitesNotMet,
            StructureError::DuplicateUnique(_) => Self::UniqueStructureExists,
            StructureError::SlotOccupied { .. } => Self::SlotOccupied,
            StructureError::InsufficientArea { .. } => Self::AreaExceeded,
            StructureError::TierTooLow { .. } => Self::MinTownHallLevel,
            StructureError::MaxLevelReached { .. } | StructureError::ArithmeticOverflow => {
                Self::UpgradeFailed(err.to_string())
            }
        }
    }
}

impl From<ConstructionError> for ApiError {
    fn from(err: ConstructionError) -> Self {
        match err {
            ConstructionError::InsufficientResources { shortages } => {
                Self::InsufficientResources(shortages)
            }
            ConstructionError::QueueFull => Self::QueueFull,
            ConstructionError::EmergencyNotAllowed
            | ConstructionError::AlreadyTerminal { .. }
            | ConstructionError::ArithmeticOverflow { .. } => Self::CreateFailed(err.to_string()),
        }
    }
}

impl From<DisasterError> for ApiError {
    fn from(err: DisasterError) -> Self {
        Self::Internal(err.to_string())
    }
}

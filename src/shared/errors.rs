use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Not found: {entity} with {field}={value}")]
    NotFound {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("Validation: {0}")]
    Validation(String),

    #[error("Already exists: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl DomainError {
    pub fn not_found(entity: &'static str, field: &'static str, value: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            field,
            value: value.into(),
        }
    }

    /// Whether the record store itself failed (as opposed to a lookup miss
    /// or a rejected value).
    pub fn is_storage(&self) -> bool {
        matches!(self, DomainError::Storage(_))
    }
}

/// Result type for domain operations
pub type DomainResult<T> = Result<T, DomainError>;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed record in {file} line {line}: {reason}")]
    MalformedRecord {
        file: String,
        line: usize,
        reason: String,
    },

    #[error("Field {field} cannot be stored: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

impl From<InfraError> for DomainError {
    fn from(err: InfraError) -> Self {
        DomainError::Storage(err.to_string())
    }
}

/// Rejections and failures of the reservation lifecycle.
///
/// `code()` is the stable token sent to clients in `FAIL:<reason>` replies.
#[derive(Debug, Error)]
pub enum BookingError {
    #[error("Room {0} does not exist")]
    NoSuchRoom(String),

    #[error("Room is not available for the requested dates")]
    RoomNotAvailable,

    #[error("Check-in must be before check-out")]
    InvalidDateRange,

    #[error("Unknown room type: {0}")]
    UnknownRoomType(String),

    #[error("Invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("Reservation {0} not found")]
    ReservationNotFound(String),

    #[error("No stored card for reservation {0}")]
    NoStoredCard(String),

    #[error("Failed to save reservation: {0}")]
    ReservationSave(#[source] DomainError),

    #[error("Failed to save payment: {0}")]
    PaymentSave(#[source] DomainError),

    #[error(transparent)]
    Store(#[from] DomainError),
}

impl BookingError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoSuchRoom(_) => "InvalidRoom",
            Self::RoomNotAvailable => "RoomNotAvailable",
            Self::InvalidDateRange => "InvalidDateRange",
            Self::UnknownRoomType(_) => "UnknownRoomType",
            Self::InvalidField { .. } => "InvalidField",
            Self::ReservationNotFound(_) => "ReservationNotFound",
            Self::NoStoredCard(_) => "NoStoredCard",
            Self::ReservationSave(_) => "ReservationSaveError",
            Self::PaymentSave(_) => "PaymentSaveError",
            Self::Store(_) => "StorageError",
        }
    }

    /// Client-side rejections, not worth an error-level log line.
    pub fn is_rejection(&self) -> bool {
        !matches!(
            self,
            Self::ReservationSave(_) | Self::PaymentSave(_) | Self::Store(_)
        )
    }
}

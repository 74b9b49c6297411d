use crate::scheduling::SlotConflict;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors produced by the storage layer and domain rules.
///
/// The HTTP layer maps these onto status codes: validation failures become
/// 400, slot conflicts 409, missing records 404 and storage failures an
/// opaque 500.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A required field is missing or malformed.
    #[error("{0}")]
    Validation(&'static str),

    /// The requested slot is already occupied by a non-canceled appointment.
    #[error("scheduling conflict: {0}")]
    Conflict(SlotConflict),

    /// The referenced record does not exist.
    #[error("not found")]
    NotFound,

    /// Database error
    #[error("database error")]
    Database(
        #[source]
        #[from]
        sqlx::Error,
    ),
}

#[cfg(test)]
mod tests {
    use time::macros::{date, time};

    use super::*;
    use crate::scheduling::{ConflictParty, SlotConflict};

    #[test]
    fn conflict_errors_carry_the_slot_message() {
        let err = Error::Conflict(SlotConflict {
            party: ConflictParty::Patient,
            date: date!(2025 - 01 - 01),
            time: time!(10:00),
        });

        assert_eq!(
            err.to_string(),
            "scheduling conflict: the patient is already booked on 2025-01-01 at 10:00"
        );
    }

    #[test]
    fn sqlx_errors_convert_into_database_errors() {
        let err: Error = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, Error::Database(_)));
    }
}

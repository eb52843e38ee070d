use pax_core::{ConnectionId, StopId, TripId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TimetableError {
    #[error("transfer graph has {vertices} vertices but the timetable has {stops} stops")]
    GraphTooSmall { vertices: usize, stops: usize },

    #[error("stop {stop} has a negative minimum transfer time")]
    NegativeTransferTime { stop: StopId },

    #[error("connection {connection} references a stop outside the timetable")]
    UnknownStop { connection: ConnectionId },

    #[error("connection {connection} references unknown trip {trip}")]
    UnknownTrip {
        connection: ConnectionId,
        trip: TripId,
    },

    #[error("connection {connection} arrives before it departs")]
    TravelsBackwards { connection: ConnectionId },

    #[error("connection {connection} departs earlier than its predecessor in the array")]
    UnsortedConnections { connection: ConnectionId },

    #[error("connection {connection} does not chain onto {previous} of the same trip")]
    BrokenTripChain {
        connection: ConnectionId,
        previous: ConnectionId,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type TimetableResult<T> = Result<T, TimetableError>;

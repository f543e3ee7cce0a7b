use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const GRID_ROWS: i32 = 3;
pub const GRID_COLS: i32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SeatPosition {
    pub row: i32,
    pub col: i32,
}

impl SeatPosition {
    pub fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    pub fn in_grid(&self) -> bool {
        (1..=GRID_ROWS).contains(&self.row) && (1..=GRID_COLS).contains(&self.col)
    }

    /// Display code for the seat: row 1 is `A`, row 2 is `B`, and the column
    /// number is appended as is (`(2, 3)` -> `"B3"`).
    pub fn seat_code(&self) -> String {
        let row_label = u8::try_from(self.row - 1)
            .ok()
            .and_then(|offset| b'A'.checked_add(offset))
            .map(char::from)
            .unwrap_or('?');
        format!("{}{}", row_label, self.col)
    }
}

impl fmt::Display for SeatPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.row, self.col)
    }
}

/// All seats of the fixed grid, ordered by `(row, col)`.
pub fn grid_positions() -> impl Iterator<Item = SeatPosition> {
    (1..=GRID_ROWS).flat_map(|row| (1..=GRID_COLS).map(move |col| SeatPosition::new(row, col)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeatStatus {
    Available,
    Reserved,
}

impl SeatStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeatStatus::Available => "available",
            SeatStatus::Reserved => "reserved",
        }
    }
}

impl std::str::FromStr for SeatStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(SeatStatus::Available),
            "reserved" => Ok(SeatStatus::Reserved),
            other => Err(anyhow::anyhow!("unknown seat status: {}", other)),
        }
    }
}

/// The party holding a seat. Name is trimmed and phone is already normalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub name: String,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seat {
    pub position: SeatPosition,
    pub reservation: Option<Reservation>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Seat {
    pub fn available(position: SeatPosition) -> Self {
        let now = Utc::now();
        Self {
            position,
            reservation: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn status(&self) -> SeatStatus {
        match self.reservation {
            Some(_) => SeatStatus::Reserved,
            None => SeatStatus::Available,
        }
    }

    pub fn is_reserved_by(&self, reservation: &Reservation) -> bool {
        self.reservation.as_ref() == Some(reservation)
    }

    /// Public projection without the reserver identity.
    pub fn view(&self) -> SeatView {
        SeatView {
            row: self.position.row,
            col: self.position.col,
            status: self.status(),
            seat_code: self.position.seat_code(),
            reserver_name: None,
            reserver_phone: None,
        }
    }

    /// Projection for a caller that already proved who holds the seat.
    pub fn owner_view(&self) -> SeatView {
        let mut view = self.view();
        if let Some(reservation) = &self.reservation {
            view.reserver_name = Some(reservation.name.clone());
            view.reserver_phone = Some(reservation.phone.clone());
        }
        view
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatView {
    pub row: i32,
    pub col: i32,
    pub status: SeatStatus,
    pub seat_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reserver_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reserver_phone: Option<String>,
}

use diesel::prelude::*;
use chrono::{DateTime, Utc};
use shared::*;

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = crate::schema::seats)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct DbSeat {
    pub row_num: i32,
    pub col_num: i32,
    pub status: String,
    pub reserver_name: Option<String>,
    pub reserver_phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::seats)]
pub struct NewSeat {
    pub row_num: i32,
    pub col_num: i32,
    pub status: String,
}

impl From<SeatPosition> for NewSeat {
    fn from(position: SeatPosition) -> Self {
        Self {
            row_num: position.row,
            col_num: position.col,
            status: SeatStatus::Available.as_str().to_string(),
        }
    }
}

impl TryFrom<DbSeat> for Seat {
    type Error = anyhow::Error;

    fn try_from(db_seat: DbSeat) -> Result<Self, Self::Error> {
        let position = SeatPosition::new(db_seat.row_num, db_seat.col_num);
        let status: SeatStatus = db_seat.status.parse()?;
        let reservation = match (status, db_seat.reserver_name, db_seat.reserver_phone) {
            (SeatStatus::Available, None, None) => None,
            (SeatStatus::Reserved, Some(name), Some(phone)) if !name.is_empty() && !phone.is_empty() => {
                Some(Reservation { name, phone })
            }
            _ => anyhow::bail!("seat {} has inconsistent reservation fields", position),
        };

        Ok(Self {
            position,
            reservation,
            created_at: db_seat.created_at,
            updated_at: db_seat.updated_at,
        })
    }
}

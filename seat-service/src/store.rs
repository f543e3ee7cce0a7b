use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::{pooled_connection::bb8::Pool, AsyncPgConnection, RunQueryDsl};
use shared::*;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use crate::models::*;
use crate::schema::*;

pub type DbPool = Pool<AsyncPgConnection>;

/// Persistence for the seat grid.
///
/// `try_reserve` is the only write path for reservations and must apply the
/// transition atomically: it returns `None` if the seat was not available at
/// commit time, so two concurrent callers can never both win the same seat.
#[async_trait]
pub trait SeatStore: Send + Sync {
    /// Creates any missing grid seat as available. Returns how many were created.
    async fn seed(&self) -> Result<usize>;

    async fn list(&self) -> Result<Vec<Seat>>;

    async fn find(&self, position: SeatPosition) -> Result<Option<Seat>>;

    async fn try_reserve(&self, position: SeatPosition, reservation: &Reservation) -> Result<Option<Seat>>;

    async fn find_reserved_by(&self, reservation: &Reservation) -> Result<Vec<Seat>>;

    /// Clears every reserved seat. Returns how many seats changed.
    async fn reset_all(&self) -> Result<usize>;

    async fn count(&self) -> Result<usize>;
}

pub struct PgSeatStore {
    pool: DbPool,
}

impl PgSeatStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn into_seats(rows: Vec<DbSeat>) -> Result<Vec<Seat>> {
    rows.into_iter().map(Seat::try_from).collect()
}

#[async_trait]
impl SeatStore for PgSeatStore {
    async fn seed(&self) -> Result<usize> {
        let mut conn = self.pool.get().await?;
        let new_seats: Vec<NewSeat> = grid_positions().map(NewSeat::from).collect();

        let created = diesel::insert_into(seats::table)
            .values(&new_seats)
            .on_conflict_do_nothing()
            .execute(&mut conn)
            .await?;

        Ok(created)
    }

    async fn list(&self) -> Result<Vec<Seat>> {
        let mut conn = self.pool.get().await?;
        let rows = seats::table
            .order((seats::row_num.asc(), seats::col_num.asc()))
            .select(DbSeat::as_select())
            .load::<DbSeat>(&mut conn)
            .await?;
        into_seats(rows)
    }

    async fn find(&self, position: SeatPosition) -> Result<Option<Seat>> {
        let mut conn = self.pool.get().await?;
        let row = seats::table
            .find((position.row, position.col))
            .select(DbSeat::as_select())
            .first::<DbSeat>(&mut conn)
            .await
            .optional()?;
        row.map(Seat::try_from).transpose()
    }

    async fn try_reserve(&self, position: SeatPosition, reservation: &Reservation) -> Result<Option<Seat>> {
        let mut conn = self.pool.get().await?;

        // The status predicate is re-evaluated under the row lock Postgres
        // takes for the UPDATE, so a concurrent winner leaves zero rows here.
        let row = diesel::update(
            seats::table
                .find((position.row, position.col))
                .filter(seats::status.eq(SeatStatus::Available.as_str())),
        )
        .set((
            seats::status.eq(SeatStatus::Reserved.as_str()),
            seats::reserver_name.eq(Some(reservation.name.as_str())),
            seats::reserver_phone.eq(Some(reservation.phone.as_str())),
            seats::updated_at.eq(Utc::now()),
        ))
        .returning(DbSeat::as_returning())
        .get_result::<DbSeat>(&mut conn)
        .await
        .optional()?;

        row.map(Seat::try_from).transpose()
    }

    async fn find_reserved_by(&self, reservation: &Reservation) -> Result<Vec<Seat>> {
        let mut conn = self.pool.get().await?;
        let rows = seats::table
            .filter(seats::status.eq(SeatStatus::Reserved.as_str()))
            .filter(seats::reserver_name.eq(reservation.name.as_str()))
            .filter(seats::reserver_phone.eq(reservation.phone.as_str()))
            .order((seats::row_num.asc(), seats::col_num.asc()))
            .select(DbSeat::as_select())
            .load::<DbSeat>(&mut conn)
            .await?;
        into_seats(rows)
    }

    async fn reset_all(&self) -> Result<usize> {
        let mut conn = self.pool.get().await?;
        let changed = diesel::update(seats::table.filter(seats::status.eq(SeatStatus::Reserved.as_str())))
            .set((
                seats::status.eq(SeatStatus::Available.as_str()),
                seats::reserver_name.eq(None::<String>),
                seats::reserver_phone.eq(None::<String>),
                seats::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)
            .await?;
        Ok(changed)
    }

    async fn count(&self) -> Result<usize> {
        let mut conn = self.pool.get().await?;
        let count = seats::table.count().get_result::<i64>(&mut conn).await?;
        Ok(usize::try_from(count)?)
    }
}

/// In-process store. The map is only write-locked while seeding; each seat
/// has its own lock, so reservations on different seats never contend.
#[derive(Default)]
pub struct MemorySeatStore {
    seats: RwLock<BTreeMap<SeatPosition, Arc<Mutex<Seat>>>>,
}

impl MemorySeatStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store already holding the full available grid.
    pub fn with_grid() -> Self {
        let seats = grid_positions()
            .map(|position| (position, Arc::new(Mutex::new(Seat::available(position)))))
            .collect();
        Self {
            seats: RwLock::new(seats),
        }
    }

    async fn seat_handles(&self) -> Vec<Arc<Mutex<Seat>>> {
        self.seats.read().await.values().cloned().collect()
    }

    async fn snapshot(&self) -> Vec<Seat> {
        let mut snapshot = Vec::new();
        for seat in self.seat_handles().await {
            snapshot.push(seat.lock().await.clone());
        }
        snapshot
    }
}

#[async_trait]
impl SeatStore for MemorySeatStore {
    async fn seed(&self) -> Result<usize> {
        let mut seats = self.seats.write().await;
        let mut created = 0;
        for position in grid_positions() {
            if !seats.contains_key(&position) {
                seats.insert(position, Arc::new(Mutex::new(Seat::available(position))));
                created += 1;
            }
        }
        Ok(created)
    }

    async fn list(&self) -> Result<Vec<Seat>> {
        Ok(self.snapshot().await)
    }

    async fn find(&self, position: SeatPosition) -> Result<Option<Seat>> {
        let handle = self.seats.read().await.get(&position).cloned();
        match handle {
            Some(seat) => Ok(Some(seat.lock().await.clone())),
            None => Ok(None),
        }
    }

    async fn try_reserve(&self, position: SeatPosition, reservation: &Reservation) -> Result<Option<Seat>> {
        let Some(handle) = self.seats.read().await.get(&position).cloned() else {
            return Ok(None);
        };

        let mut seat = handle.lock().await;
        if seat.reservation.is_some() {
            return Ok(None);
        }
        seat.reservation = Some(reservation.clone());
        seat.updated_at = Utc::now();
        Ok(Some(seat.clone()))
    }

    async fn find_reserved_by(&self, reservation: &Reservation) -> Result<Vec<Seat>> {
        let seats = self
            .snapshot()
            .await
            .into_iter()
            .filter(|seat| seat.is_reserved_by(reservation))
            .collect();
        Ok(seats)
    }

    async fn reset_all(&self) -> Result<usize> {
        let mut changed = 0;
        for handle in self.seat_handles().await {
            let mut seat = handle.lock().await;
            if seat.reservation.take().is_some() {
                seat.updated_at = Utc::now();
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.seats.read().await.len())
    }
}

/// Store whose backend is always down.
#[cfg(test)]
pub(crate) struct UnreachableStore;

#[cfg(test)]
#[async_trait]
impl SeatStore for UnreachableStore {
    async fn seed(&self) -> Result<usize> {
        anyhow::bail!("connection refused")
    }

    async fn list(&self) -> Result<Vec<Seat>> {
        anyhow::bail!("connection refused")
    }

    async fn find(&self, _: SeatPosition) -> Result<Option<Seat>> {
        anyhow::bail!("connection refused")
    }

    async fn try_reserve(&self, _: SeatPosition, _: &Reservation) -> Result<Option<Seat>> {
        anyhow::bail!("connection refused")
    }

    async fn find_reserved_by(&self, _: &Reservation) -> Result<Vec<Seat>> {
        anyhow::bail!("connection refused")
    }

    async fn reset_all(&self) -> Result<usize> {
        anyhow::bail!("connection refused")
    }

    async fn count(&self) -> Result<usize> {
        anyhow::bail!("connection refused")
    }
}

use shared::*;
use std::sync::Arc;
use tracing::{info, warn};
use crate::store::SeatStore;

pub const DEFAULT_FAILURE_RATE: f64 = 0.01;

/// Decides whether a reservation attempt should fail on purpose. Used to
/// simulate contention in demos; tests plug in [`NeverFail`].
pub trait FailureSimulator: Send + Sync {
    fn should_fail(&self) -> bool;
}

pub struct RandomFailure {
    rate: f64,
}

impl RandomFailure {
    pub fn new(rate: f64) -> anyhow::Result<Self> {
        if !(0.0..=1.0).contains(&rate) {
            anyhow::bail!("failure rate must be within [0, 1], got {}", rate);
        }
        Ok(Self { rate })
    }
}

impl FailureSimulator for RandomFailure {
    fn should_fail(&self) -> bool {
        rand::random::<f64>() < self.rate
    }
}

pub struct NeverFail;

impl FailureSimulator for NeverFail {
    fn should_fail(&self) -> bool {
        false
    }
}

/// Raw reserve input, before any validation.
#[derive(Debug, Clone, Default)]
pub struct ReserveCommand {
    pub row: Option<CoordinateInput>,
    pub col: Option<CoordinateInput>,
    pub name: String,
    pub phone: String,
}

#[derive(Clone)]
pub struct ReservationEngine {
    store: Arc<dyn SeatStore>,
    failures: Arc<dyn FailureSimulator>,
}

impl ReservationEngine {
    pub fn new(store: Arc<dyn SeatStore>, failures: Arc<dyn FailureSimulator>) -> Self {
        Self { store, failures }
    }

    pub fn store(&self) -> &Arc<dyn SeatStore> {
        &self.store
    }

    pub async fn reserve(&self, command: ReserveCommand) -> ReservationResult<SeatView> {
        let reservation = validate_identity(&command.name, &command.phone)?;
        let position = parse_position(command.row.as_ref(), command.col.as_ref())?;

        if !position.in_grid() || self.store.find(position).await?.is_none() {
            warn!("Reservation rejected, seat {} does not exist", position);
            return Err(ReservationError::NotFound(position));
        }

        if self.failures.should_fail() {
            warn!("Injected transient failure for seat {}", position);
            return Err(ReservationError::TransientFailure);
        }

        match self.store.try_reserve(position, &reservation).await? {
            Some(seat) => {
                info!("Seat {} reserved", seat.position.seat_code());
                Ok(seat.view())
            }
            None => {
                warn!("Reservation rejected, seat {} is already reserved", position);
                Err(ReservationError::AlreadyReserved(position))
            }
        }
    }

    pub async fn list_seats(&self) -> ReservationResult<Vec<SeatView>> {
        let seats = self.store.list().await?;
        Ok(seats.iter().map(Seat::view).collect())
    }

    /// Seats held by the given identity. An empty result is not an error.
    pub async fn lookup_reservations(&self, name: &str, phone: &str) -> ReservationResult<Vec<SeatView>> {
        let reservation = validate_identity(name, phone)?;
        let seats = self.store.find_reserved_by(&reservation).await?;
        Ok(seats.iter().map(Seat::owner_view).collect())
    }

    pub async fn reset_all(&self) -> ReservationResult<usize> {
        let changed = self.store.reset_all().await?;
        info!("Reset {} reserved seats to available", changed);
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemorySeatStore, UnreachableStore};
    use serde_json::json;

    struct AlwaysFail;

    impl FailureSimulator for AlwaysFail {
        fn should_fail(&self) -> bool {
            true
        }
    }

    fn engine() -> ReservationEngine {
        ReservationEngine::new(Arc::new(MemorySeatStore::with_grid()), Arc::new(NeverFail))
    }

    fn command(row: i32, col: i32, name: &str, phone: &str) -> ReserveCommand {
        ReserveCommand {
            row: Some(row.into()),
            col: Some(col.into()),
            name: name.to_string(),
            phone: phone.to_string(),
        }
    }

    #[tokio::test]
    async fn reserve_on_fresh_grid_succeeds() {
        let engine = engine();
        let view = engine.reserve(command(1, 1, "Hong", "01012345678")).await.unwrap();
        assert_eq!(view.status, SeatStatus::Reserved);
        assert_eq!(view.seat_code, "A1");
        assert!(view.reserver_name.is_none());

        let seats = engine.list_seats().await.unwrap();
        assert_eq!(seats[0].status, SeatStatus::Reserved);
        assert!(seats[1..].iter().all(|s| s.status == SeatStatus::Available));
    }

    #[tokio::test]
    async fn second_reserve_is_rejected() {
        let engine = engine();
        engine.reserve(command(1, 1, "Hong", "01012345678")).await.unwrap();

        let err = engine.reserve(command(1, 1, "Kim", "01099998888")).await.unwrap_err();
        assert!(matches!(err, ReservationError::AlreadyReserved(p) if p == SeatPosition::new(1, 1)));

        // Same person retrying is rejected too.
        let err = engine.reserve(command(1, 1, "Hong", "01012345678")).await.unwrap_err();
        assert!(matches!(err, ReservationError::AlreadyReserved(_)));

        let lookup = engine.lookup_reservations("Hong", "01012345678").await.unwrap();
        assert_eq!(lookup.len(), 1);
    }

    #[tokio::test]
    async fn seat_outside_grid_is_not_found() {
        let err = engine().reserve(command(9, 9, "Hong", "01012345678")).await.unwrap_err();
        assert!(matches!(err, ReservationError::NotFound(p) if p == SeatPosition::new(9, 9)));
    }

    #[tokio::test]
    async fn whole_number_float_coordinates_reserve_the_seat() {
        let view = engine()
            .reserve(ReserveCommand {
                row: Some(serde_json::from_value(json!(1.0)).unwrap()),
                col: Some(serde_json::from_value(json!("2")).unwrap()),
                name: "Hong".to_string(),
                phone: "01012345678".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(view.seat_code, "A2");
    }

    #[tokio::test]
    async fn integer_wider_than_i32_is_not_found() {
        let err = engine()
            .reserve(ReserveCommand {
                row: Some(serde_json::from_value(json!(5_000_000_000i64)).unwrap()),
                col: Some(1.into()),
                name: "Hong".to_string(),
                phone: "01012345678".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ReservationError::NotFound(_)));
    }

    #[tokio::test]
    async fn position_outside_grid_skips_the_store() {
        let engine = ReservationEngine::new(Arc::new(UnreachableStore), Arc::new(NeverFail));
        let err = engine.reserve(command(4, 1, "Hong", "01012345678")).await.unwrap_err();
        assert!(matches!(err, ReservationError::NotFound(_)));

        let err = engine.reserve(command(1, 1, "Hong", "01012345678")).await.unwrap_err();
        assert!(matches!(err, ReservationError::Store(_)));
    }

    #[tokio::test]
    async fn identity_is_validated_before_coordinates() {
        let engine = engine();
        let err = engine
            .reserve(ReserveCommand {
                row: None,
                col: None,
                name: "Hong".to_string(),
                phone: "12345".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ReservationError::Validation(ref m) if m.contains("phone")));

        let err = engine
            .reserve(ReserveCommand {
                row: Some(CoordinateInput::Text("x".to_string())),
                col: Some(1.into()),
                name: "Hong".to_string(),
                phone: "01012345678".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ReservationError::Validation(ref m) if m.contains("integers")));
    }

    #[tokio::test]
    async fn reservation_stores_normalized_phone() {
        let engine = engine();
        engine.reserve(command(2, 3, " Hong ", "+82 10-1234-5678")).await.unwrap();

        let found = engine.lookup_reservations("Hong", "010-1234-5678").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].seat_code, "B3");
        assert_eq!(found[0].reserver_name.as_deref(), Some("Hong"));
        assert_eq!(found[0].reserver_phone.as_deref(), Some("01012345678"));
    }

    #[tokio::test]
    async fn injected_failure_happens_after_existence_check() {
        let engine = ReservationEngine::new(Arc::new(MemorySeatStore::with_grid()), Arc::new(AlwaysFail));

        let err = engine.reserve(command(9, 9, "Hong", "01012345678")).await.unwrap_err();
        assert!(matches!(err, ReservationError::NotFound(_)));

        let err = engine.reserve(command(1, 1, "Hong", "01012345678")).await.unwrap_err();
        assert!(err.is_retryable());
        assert!(engine.list_seats().await.unwrap().iter().all(|s| s.status == SeatStatus::Available));
    }

    #[tokio::test]
    async fn lookup_returns_matching_seats_in_order() {
        let engine = engine();
        engine.reserve(command(3, 1, "Hong", "01012345678")).await.unwrap();
        engine.reserve(command(1, 2, "Hong", "01012345678")).await.unwrap();
        engine.reserve(command(2, 2, "Kim", "01012345678")).await.unwrap();

        let found = engine.lookup_reservations("Hong", "01012345678").await.unwrap();
        let codes: Vec<_> = found.iter().map(|s| s.seat_code.as_str()).collect();
        assert_eq!(codes, vec!["A2", "C1"]);
    }

    #[tokio::test]
    async fn lookup_for_unknown_identity_is_empty() {
        let found = engine().lookup_reservations("Nobody", "01000000000").await.unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn lookup_rejects_bad_phone() {
        let err = engine().lookup_reservations("Hong", "not-a-phone").await.unwrap_err();
        assert!(matches!(err, ReservationError::Validation(_)));
    }

    #[tokio::test]
    async fn reset_clears_reserved_seats() {
        let engine = engine();
        engine.reserve(command(1, 1, "Hong", "01012345678")).await.unwrap();
        engine.reserve(command(2, 1, "Kim", "01099998888")).await.unwrap();

        assert_eq!(engine.reset_all().await.unwrap(), 2);
        assert!(engine.lookup_reservations("Hong", "01012345678").await.unwrap().is_empty());
        assert!(engine.reserve(command(1, 1, "Kim", "01099998888")).await.is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_reserves_on_same_seat_have_one_winner() {
        let engine = engine();

        let attempts = (0..16).map(|i| {
            let engine = engine.clone();
            tokio::spawn(async move { engine.reserve(command(2, 2, &format!("guest{}", i), "01012345678")).await })
        });

        let results: Vec<_> = futures::future::join_all(attempts)
            .await
            .into_iter()
            .map(|joined| joined.unwrap())
            .collect();

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, ReservationError::AlreadyReserved(_))));
    }

    #[test]
    fn failure_rate_is_bounded() {
        assert!(RandomFailure::new(1.5).is_err());
        assert!(RandomFailure::new(-0.1).is_err());
        assert!(!RandomFailure::new(0.0).unwrap().should_fail());
        assert!(RandomFailure::new(1.0).unwrap().should_fail());
    }
}

use serde::{Deserialize, Serialize};

use crate::error::{ReservationError, ReservationResult};
use crate::phone::normalize_phone;
use crate::seat::{Reservation, SeatPosition};

pub const NAME_MAX_CHARS: usize = 50;
pub const PHONE_MAX_CHARS: usize = 20;

/// A row or column as it arrives on the wire. Clients send a JSON number
/// with no fractional part or a string holding an integer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CoordinateInput {
    Integer(i64),
    Float(f64),
    Text(String),
    Other(serde_json::Value),
}

// Integers wider than i32 clamp to the i32 range. The resulting position lies
// outside the grid, so the seat lookup reports it as missing.
fn clamp_to_i32(n: i64) -> i32 {
    n.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

fn parse_integer_text(text: &str) -> Option<i32> {
    if let Ok(n) = text.parse::<i64>() {
        return Some(clamp_to_i32(n));
    }
    let (negative, digits) = match text.strip_prefix('-') {
        Some(digits) => (true, digits),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(if negative { i32::MIN } else { i32::MAX })
}

impl CoordinateInput {
    fn to_i32(&self) -> Option<i32> {
        match self {
            CoordinateInput::Integer(n) => Some(clamp_to_i32(*n)),
            CoordinateInput::Float(f) if f.is_finite() && f.fract() == 0.0 => Some(clamp_to_i32(*f as i64)),
            CoordinateInput::Float(_) => None,
            CoordinateInput::Text(s) => parse_integer_text(s.trim()),
            CoordinateInput::Other(_) => None,
        }
    }
}

impl From<i32> for CoordinateInput {
    fn from(value: i32) -> Self {
        CoordinateInput::Integer(i64::from(value))
    }
}

/// Resolves the raw row/col pair into a position. Existence in the grid is
/// not checked here.
pub fn parse_position(
    row: Option<&CoordinateInput>,
    col: Option<&CoordinateInput>,
) -> ReservationResult<SeatPosition> {
    let (Some(row), Some(col)) = (row, col) else {
        return Err(ReservationError::validation("row and col are required"));
    };
    match (row.to_i32(), col.to_i32()) {
        (Some(row), Some(col)) => Ok(SeatPosition::new(row, col)),
        _ => Err(ReservationError::validation("row and col must be integers")),
    }
}

/// Validates the reserver identity. The returned reservation carries the
/// trimmed name and the normalized phone.
pub fn validate_identity(name: &str, phone: &str) -> ReservationResult<Reservation> {
    if name.contains('\0') || phone.contains('\0') {
        return Err(ReservationError::validation("null characters are not allowed"));
    }

    let name = name.trim();
    if name.is_empty() {
        return Err(ReservationError::validation("name is required"));
    }
    if name.chars().count() > NAME_MAX_CHARS {
        return Err(ReservationError::validation(format!(
            "name must be at most {} characters",
            NAME_MAX_CHARS
        )));
    }

    let raw_phone = phone.trim();
    if raw_phone.is_empty() {
        return Err(ReservationError::validation("phone is required"));
    }
    if raw_phone.chars().count() > PHONE_MAX_CHARS {
        return Err(ReservationError::validation(format!(
            "phone must be at most {} characters",
            PHONE_MAX_CHARS
        )));
    }
    let phone = normalize_phone(raw_phone).map_err(|e| ReservationError::validation(e.to_string()))?;

    Ok(Reservation {
        name: name.to_string(),
        phone,
    })
}

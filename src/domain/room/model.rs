//! Room domain entity

use std::fmt;
use std::str::FromStr;

/// Room category. Ordering is the order types are reported in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RoomType {
    Standard,
    Deluxe,
    Suite,
}

impl RoomType {
    pub const ALL: [RoomType; 3] = [RoomType::Standard, RoomType::Deluxe, RoomType::Suite];

    /// Short code used on the wire (`STD`, `DLX`, `STE`)
    pub fn code(&self) -> &'static str {
        match self {
            Self::Standard => "STD",
            Self::Deluxe => "DLX",
            Self::Suite => "STE",
        }
    }

    /// Display name persisted in the room records
    pub fn name(&self) -> &'static str {
        match self {
            Self::Standard => "Standard",
            Self::Deluxe => "Deluxe",
            Self::Suite => "Suite",
        }
    }
}

impl fmt::Display for RoomType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Accepts either the code or the name, case-insensitively.
impl FromStr for RoomType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        RoomType::ALL
            .into_iter()
            .find(|t| t.code().eq_ignore_ascii_case(s) || t.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| s.to_string())
    }
}

/// A bookable room
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    /// Room number, unique key
    pub number: String,
    pub room_type: RoomType,
    /// Nightly price in currency units
    pub price: i64,
    /// Guests included in the nightly price
    pub capacity: u32,
    pub description: String,
}

impl Room {
    pub fn new(
        number: impl Into<String>,
        room_type: RoomType,
        price: i64,
        capacity: u32,
        description: impl Into<String>,
    ) -> Self {
        Self {
            number: number.into(),
            room_type,
            price,
            capacity,
            description: description.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_type_accepts_codes_and_names() {
        assert_eq!("STD".parse::<RoomType>(), Ok(RoomType::Standard));
        assert_eq!("deluxe".parse::<RoomType>(), Ok(RoomType::Deluxe));
        assert_eq!(" Suite ".parse::<RoomType>(), Ok(RoomType::Suite));
        assert_eq!("Penthouse".parse::<RoomType>(), Err("Penthouse".to_string()));
    }

    #[test]
    fn room_types_sort_by_category() {
        let mut types = vec![RoomType::Suite, RoomType::Standard, RoomType::Deluxe];
        types.sort();
        assert_eq!(types, RoomType::ALL.to_vec());
    }
}

//! Seat identification and per-seat data storage.
//!
//! The game is strictly two-player. `Seat` is a type-safe index (0 or 1) and
//! `SeatMap` stores one value per seat with O(1) access.

use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};

/// One of the two seats at the table.
///
/// Seat indices are 0-based: the dealer's opponent is seat 0 and acts first.
/// The index is range-checked at every construction site, including
/// deserialization of wire-facing types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Seat(u8);

impl Seat {
    /// Create a seat. Panics if `index` is not 0 or 1.
    #[must_use]
    pub const fn new(index: u8) -> Self {
        assert!(index < 2, "seat index must be 0 or 1");
        Self(index)
    }

    /// The raw seat index (0-based).
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// The other seat.
    #[must_use]
    pub const fn opponent(self) -> Seat {
        Seat(1 - self.0)
    }

    /// Both seats, in order.
    pub fn both() -> impl Iterator<Item = Seat> {
        (0..2u8).map(Seat)
    }
}

impl TryFrom<u8> for Seat {
    type Error = String;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        if index < 2 {
            Ok(Seat(index))
        } else {
            Err(format!("seat index {index} out of range"))
        }
    }
}

impl From<Seat> for u8 {
    fn from(seat: Seat) -> u8 {
        seat.0
    }
}

impl std::fmt::Display for Seat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Seat {}", self.0)
    }
}

/// Per-seat data storage.
///
/// ## Example
///
/// ```
/// use cassino_engine::core::{Seat, SeatMap};
///
/// let mut captures: SeatMap<u32> = SeatMap::with_value(0);
/// captures[Seat::new(1)] = 12;
/// assert_eq!(captures[Seat::new(0)], 0);
/// assert_eq!(captures[Seat::new(1)], 12);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeatMap<T> {
    data: [T; 2],
}

impl<T> SeatMap<T> {
    /// Create a map with values from a factory function.
    pub fn new(factory: impl Fn(Seat) -> T) -> Self {
        Self {
            data: [factory(Seat(0)), factory(Seat(1))],
        }
    }

    /// Create a map with both entries set to the same value.
    pub fn with_value(value: T) -> Self
    where
        T: Clone,
    {
        Self::new(|_| value.clone())
    }

    /// Create a map with default values.
    pub fn with_default() -> Self
    where
        T: Default,
    {
        Self::new(|_| T::default())
    }

    /// Get a reference to a seat's entry.
    #[must_use]
    pub fn get(&self, seat: Seat) -> &T {
        &self.data[seat.index()]
    }

    /// Get a mutable reference to a seat's entry.
    pub fn get_mut(&mut self, seat: Seat) -> &mut T {
        &mut self.data[seat.index()]
    }

    /// Iterate over (Seat, &T) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (Seat, &T)> {
        self.data.iter().enumerate().map(|(i, v)| (Seat(i as u8), v))
    }
}

impl<T> Index<Seat> for SeatMap<T> {
    type Output = T;

    fn index(&self, seat: Seat) -> &Self::Output {
        self.get(seat)
    }
}

impl<T> IndexMut<Seat> for SeatMap<T> {
    fn index_mut(&mut self, seat: Seat) -> &mut Self::Output {
        self.get_mut(seat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opponent() {
        assert_eq!(Seat::new(0).opponent(), Seat::new(1));
        assert_eq!(Seat::new(1).opponent(), Seat::new(0));
    }

    #[test]
    fn test_both() {
        let seats: Vec<_> = Seat::both().collect();
        assert_eq!(seats, vec![Seat::new(0), Seat::new(1)]);
    }

    #[test]
    fn test_seat_map_factory() {
        let map: SeatMap<usize> = SeatMap::new(|s| s.index() * 10);
        assert_eq!(map[Seat::new(0)], 0);
        assert_eq!(map[Seat::new(1)], 10);
    }

    #[test]
    fn test_seat_map_mutation() {
        let mut map: SeatMap<Vec<i32>> = SeatMap::with_default();
        map[Seat::new(0)].push(7);
        assert_eq!(map[Seat::new(0)], vec![7]);
        assert!(map[Seat::new(1)].is_empty());
    }

    #[test]
    fn test_seat_map_iter() {
        let map: SeatMap<i32> = SeatMap::new(|s| s.index() as i32 + 1);
        let pairs: Vec<_> = map.iter().collect();
        assert_eq!(pairs, vec![(Seat::new(0), &1), (Seat::new(1), &2)]);
    }

    #[test]
    fn test_serialization() {
        let map: SeatMap<i32> = SeatMap::new(|s| s.index() as i32);
        let json = serde_json::to_string(&map).unwrap();
        let back: SeatMap<i32> = serde_json::from_str(&json).unwrap();
        assert_eq!(map, back);
    }

    #[test]
    #[should_panic(expected = "seat index")]
    fn test_invalid_seat_panics() {
        let _ = Seat::new(2);
    }

    #[test]
    fn test_seat_wire_round_trip() {
        assert_eq!(serde_json::to_string(&Seat::new(1)).unwrap(), "1");
        let seat: Seat = serde_json::from_str("1").unwrap();
        assert_eq!(seat, Seat::new(1));
    }

    #[test]
    fn test_out_of_range_seat_rejected_on_deserialize() {
        assert!(serde_json::from_str::<Seat>("2").is_err());
        assert!(serde_json::from_str::<Seat>("255").is_err());
    }
}

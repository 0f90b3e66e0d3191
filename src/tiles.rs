use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;

use serde::de::Visitor;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ParseError;
use crate::error::ParseError::{BadChar, EmptyString};

/// The location of a single square on the board, ie, file and rank. This struct is only a
/// reference to a location and does not carry any piece information.
///
/// File and rank are 0-based internally; the textual form is algebraic (`a1` is file 0,
/// rank 0). Files run `a..j` and ranks `1..10` on the largest supported board.
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct Square {
    pub file: u8,
    pub rank: u8,
}

impl Square {
    /// Create a new [`Square`] with the given file and rank.
    pub fn new(file: u8, rank: u8) -> Self {
        Self { file, rank }
    }

    /// The coordinates of this square, as signed values suitable for offset arithmetic.
    pub fn coords(&self) -> Coords {
        Coords {
            file: self.file as i16,
            rank: self.rank as i16,
        }
    }

    /// The square reached by applying the given offset, which may be out of bounds of any
    /// particular board (bounds are checked against a board, not here).
    pub fn offset(&self, delta: Delta) -> Coords {
        Coords {
            file: self.file as i16 + delta.file as i16,
            rank: self.rank as i16 + delta.rank as i16,
        }
    }

    /// Chebyshev distance to another square (the number of king steps between them).
    pub fn king_distance(&self, other: Square) -> u8 {
        let df = self.file.abs_diff(other.file);
        let dr = self.rank.abs_diff(other.rank);
        df.max(dr)
    }
}

impl Debug for Square {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Square(file={}, rank={})", self.file, self.rank)
    }
}

impl Display for Square {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", (self.file + b'a') as char, self.rank + 1)
    }
}

impl FromStr for Square {
    type Err = ParseError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let file = if let Some(&byte) = s.as_bytes().first() {
            if !byte.is_ascii_lowercase() {
                return Err(BadChar(byte as char));
            }
            byte - b'a'
        } else {
            return Err(EmptyString);
        };
        let rank = s[1..].parse::<u8>()?;
        if rank == 0 {
            return Err(ParseError::BadString(s.to_string()));
        }
        Ok(Square::new(file, rank - 1))
    }
}

// Squares travel in messages in their algebraic form ("e4"), not as a file/rank pair.

impl Serialize for Square {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.to_string().as_str())
    }
}

struct SquareVisitor;

impl Visitor<'_> for SquareVisitor {
    type Value = Square;
    fn expecting(&self, formatter: &mut Formatter) -> std::fmt::Result {
        formatter.write_str("a square in algebraic notation, eg, 'e4'")
    }

    fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        Square::from_str(value)
            .map_err(|_| E::invalid_value(serde::de::Unexpected::Str(value), &self))
    }
}

impl<'de> Deserialize<'de> for Square {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_str(SquareVisitor)
    }
}

/// A fixed offset between two squares.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct Delta {
    pub file: i8,
    pub rank: i8,
}

impl Delta {
    pub const fn new(file: i8, rank: i8) -> Self {
        Self { file, rank }
    }
}

/// Signed board coordinates, used for offset arithmetic that may leave the board. Convert back
/// to a [`Square`] by bounds-checking against a board.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct Coords {
    pub file: i16,
    pub rank: i16,
}

impl Coords {
    /// Apply a further offset.
    pub fn offset(&self, delta: Delta) -> Coords {
        Coords {
            file: self.file + delta.file as i16,
            rank: self.rank + delta.rank as i16,
        }
    }
}

impl From<Square> for Coords {
    fn from(value: Square) -> Self {
        value.coords()
    }
}

/// The four orthogonal direction vectors.
pub const ORTHOGONAL_DELTAS: [Delta; 4] = [
    Delta::new(0, 1),
    Delta::new(0, -1),
    Delta::new(1, 0),
    Delta::new(-1, 0),
];

/// The four diagonal direction vectors.
pub const DIAGONAL_DELTAS: [Delta; 4] = [
    Delta::new(1, 1),
    Delta::new(1, -1),
    Delta::new(-1, 1),
    Delta::new(-1, -1),
];

/// All eight queen-line direction vectors.
pub const ALL_DELTAS: [Delta; 8] = [
    Delta::new(0, 1),
    Delta::new(0, -1),
    Delta::new(1, 0),
    Delta::new(-1, 0),
    Delta::new(1, 1),
    Delta::new(1, -1),
    Delta::new(-1, 1),
    Delta::new(-1, -1),
];

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Side of the Camelot wheel: `A` is minor, `B` is major
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Mode {
    A,
    B,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::A => f.write_str("A"),
            Mode::B => f.write_str("B"),
        }
    }
}

/// Errors produced while parsing a Camelot key label such as `8A`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyParseError {
    #[error("invalid key format: {0:?}")]
    Format(String),
    #[error("invalid key mode: {0:?}")]
    Mode(String),
    #[error("invalid key number: {0:?}")]
    Number(String),
    #[error("key number out of range: {0}")]
    OutOfRange(u32),
}

/// A position on the Camelot wheel, e.g. `1A` or `12B`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Key {
    pub number: u8,
    pub mode: Mode,
}

impl Key {
    pub fn new(number: u8, mode: Mode) -> Result<Self, KeyParseError> {
        if !(1..=12).contains(&number) {
            return Err(KeyParseError::OutOfRange(u32::from(number)));
        }
        Ok(Self { number, mode })
    }

    /// Forward distance around the wheel from `self` to `other`, in `0..=11`
    pub fn forward_distance(&self, other: &Key) -> u8 {
        (other.number + 12 - self.number) % 12
    }
}

impl FromStr for Key {
    type Err = KeyParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let cleaned = input.trim().to_ascii_uppercase();
        if !(2..=3).contains(&cleaned.len()) || !cleaned.is_ascii() {
            return Err(KeyParseError::Format(input.to_string()));
        }

        let (number_part, mode_part) = cleaned.split_at(cleaned.len() - 1);
        let mode = match mode_part {
            "A" => Mode::A,
            "B" => Mode::B,
            _ => return Err(KeyParseError::Mode(input.to_string())),
        };

        let number: u32 = number_part
            .parse()
            .map_err(|_| KeyParseError::Number(input.to_string()))?;
        if !(1..=12).contains(&number) {
            return Err(KeyParseError::OutOfRange(number));
        }

        Ok(Key {
            number: number as u8,
            mode,
        })
    }
}

impl TryFrom<String> for Key {
    type Error = KeyParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Key> for String {
    fn from(key: Key) -> Self {
        key.to_string()
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.number, self.mode)
    }
}

/// A single track row as read from the input table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub title: String,
    pub artist: String,
    pub bpm: f64,
    pub energy: u8,
    pub key: Key,
}

impl Track {
    pub fn new(title: &str, artist: &str, bpm: f64, energy: u8, key: Key) -> Self {
        Self {
            title: title.to_string(),
            artist: artist.to_string(),
            bpm,
            energy,
            key,
        }
    }
}

//! Core type definitions for rt11dir
//!
//! This module defines the RAD50 short-name codec and the 6.3 file name
//! built on top of it.

use serde::{Serialize, Serializer};
use std::fmt;

/// RAD50 symbol table, indexed by symbol value
pub const RAD50_ALPHABET: [char; 40] = [
    ' ', 'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O', 'P', 'Q', 'R',
    'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z', '$', '.', '%', '0', '1', '2', '3', '4', '5', '6', '7',
    '8', '9',
];

/// Largest value a three-symbol RAD50 word can hold (40^3 - 1)
pub const RAD50_MAX_WORD: u16 = 63_999;

/// Maximum characters in a file base name
pub const MAX_BASE_LEN: usize = 6;

/// Maximum characters in a file extension
pub const MAX_EXT_LEN: usize = 3;

/// Symbol value of a character. Lower case folds to upper case and anything
/// outside the alphabet maps to the space symbol.
#[must_use]
pub fn rad50_index(c: char) -> u16 {
    let c = c.to_ascii_uppercase();
    RAD50_ALPHABET
        .iter()
        .position(|&s| s == c)
        .and_then(|i| u16::try_from(i).ok())
        .unwrap_or(0)
}

/// Encode up to three characters into one word; short input is space padded.
#[must_use]
pub fn encode_rad50(s: &str) -> u16 {
    let mut chars = s.chars();
    let mut word = 0u16;
    for _ in 0..3 {
        let idx = chars.next().map_or(0, rad50_index);
        word = word * 40 + idx;
    }
    word
}

fn rad50_symbol(value: u16) -> char {
    RAD50_ALPHABET.get(usize::from(value)).copied().unwrap_or('?')
}

/// Decode a word into exactly three characters, spaces included.
///
/// Words above [`RAD50_MAX_WORD`] cannot be produced by the encoder; their
/// out-of-range leading symbol decodes as `?`.
#[must_use]
pub fn decode_rad50_raw(word: u16) -> String {
    [
        rad50_symbol(word / 1600),
        rad50_symbol((word % 1600) / 40),
        rad50_symbol(word % 40),
    ]
    .iter()
    .collect()
}

/// Decode a word with space symbols dropped, as names are displayed.
#[must_use]
pub fn decode_rad50(word: u16) -> String {
    decode_rad50_raw(word).chars().filter(|&c| c != ' ').collect()
}

/// A 6.3 file name stored as three RAD50 words
///
/// The words are kept exactly as read from disk so that rewriting an entry
/// never alters a name the codec would not have produced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct FileName {
    words: [u16; 3],
}

impl FileName {
    /// Wrap the raw name words of a directory entry
    #[must_use]
    pub const fn from_words(words: [u16; 3]) -> Self {
        Self { words }
    }

    /// Normalise a host or user supplied name to 6.3 upper case and encode it
    ///
    /// The part before the first `.` is the base name (truncated to six
    /// characters), the part after it the extension (truncated to three).
    pub fn parse(name: &str) -> Result<Self, FileNameError> {
        let (base, ext) = name.split_once('.').unwrap_or((name, ""));
        if base.is_empty() {
            return Err(FileNameError::EmptyBase);
        }

        let base: String = base
            .chars()
            .take(MAX_BASE_LEN)
            .map(|c| c.to_ascii_uppercase())
            .collect();
        let ext: String = ext
            .chars()
            .take(MAX_EXT_LEN)
            .map(|c| c.to_ascii_uppercase())
            .collect();

        let (first, second) = base.split_at(base.char_indices().nth(3).map_or(base.len(), |(i, _)| i));
        let name = Self {
            words: [encode_rad50(first), encode_rad50(second), encode_rad50(&ext)],
        };

        if name.base().is_empty() {
            return Err(FileNameError::NoEncodableCharacters(base));
        }
        Ok(name)
    }

    /// The raw name words (base 1-3, base 4-6, extension)
    #[must_use]
    pub const fn words(&self) -> [u16; 3] {
        self.words
    }

    /// Decoded base name, at most six characters
    #[must_use]
    pub fn base(&self) -> String {
        let mut base = decode_rad50(self.words[0]);
        base.push_str(&decode_rad50(self.words[1]));
        base.truncate(MAX_BASE_LEN);
        base
    }

    /// Decoded extension, at most three characters
    #[must_use]
    pub fn extension(&self) -> String {
        decode_rad50(self.words[2])
    }
}

impl fmt::Display for FileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ext = self.extension();
        if ext.is_empty() {
            write!(f, "{}", self.base())
        } else {
            write!(f, "{}.{}", self.base(), ext)
        }
    }
}

impl Serialize for FileName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Errors that can occur when creating a file name
#[derive(Debug, Clone, thiserror::Error)]
pub enum FileNameError {
    #[error("file name must have a base name")]
    EmptyBase,
    #[error("file name {0:?} has no characters representable in RAD50")]
    NoEncodableCharacters(String),
}

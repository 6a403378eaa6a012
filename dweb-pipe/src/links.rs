//! Numbered link table scraped from dump-mode browser output.
//!
//! Text browsers asked to number their links (w3m's `display_link_num=1`)
//! print a reference list at the bottom of the page:
//!
//! ```text
//! References:
//!
//! [1] https://example.org/
//! [2] https://example.org/about
//! ```
//!
//! [`LinkTable::extract`] picks those lines out so the shell can follow a
//! link by number. Links are kept as raw bytes; pages in legacy encodings
//! carry non-UTF-8 paths that the browser still understands.
use regex::bytes::Regex;
use std::sync::LazyLock;

/// Number of link slots; indices run from `0` to `LINK_CAPACITY - 1`.
pub const LINK_CAPACITY: usize = 512;

// `(?-u)` lets `.` match any byte, not only valid UTF-8.
static LINK_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?-u)^\[([0-9]+)\] (.+)$").expect("link pattern compiles"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LinkLookupError {
    #[error("index out of range")]
    OutOfRange,
    #[error("no such link")]
    NoSuchLink,
}

#[derive(Debug, Clone)]
pub struct LinkTable {
    slots: Box<[Option<Vec<u8>>]>,
}

impl Default for LinkTable {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkTable {
    pub fn new() -> Self {
        Self {
            slots: vec![None; LINK_CAPACITY].into_boxed_slice(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|s| *s = None);
    }

    /// Look up a link by the number the user typed.
    ///
    /// Negative numbers are out of range, like anything past the last slot.
    ///
    /// ```
    /// use dweb_pipe::links::{LinkLookupError, LinkTable};
    ///
    /// let mut links = LinkTable::new();
    /// links.extract(b"[3] https://example.org/\n");
    ///
    /// assert_eq!(links.get(3), Ok(&b"https://example.org/"[..]));
    /// assert_eq!(links.get(4), Err(LinkLookupError::NoSuchLink));
    /// assert_eq!(links.get(-1), Err(LinkLookupError::OutOfRange));
    /// assert_eq!(links.get(512), Err(LinkLookupError::OutOfRange));
    /// ```
    pub fn get(&self, index: i64) -> Result<&[u8], LinkLookupError> {
        let idx = usize::try_from(index).map_err(|_| LinkLookupError::OutOfRange)?;
        self.slots
            .get(idx)
            .ok_or(LinkLookupError::OutOfRange)?
            .as_deref()
            .ok_or(LinkLookupError::NoSuchLink)
    }

    /// Record the link on `line` if it has the form `[<n>] <url>`.
    ///
    /// The line terminator is not part of the URL. Returns the slot that was
    /// written, or `None` when the line is not a link or its index does not
    /// fit the table.
    pub fn extract(&mut self, line: &[u8]) -> Option<usize> {
        let line = line.strip_suffix(b"\n").unwrap_or(line);
        let line = line.strip_suffix(b"\r").unwrap_or(line);

        let caps = LINK_LINE.captures(line)?;
        let idx: usize = std::str::from_utf8(caps.get(1)?.as_bytes())
            .ok()?
            .parse()
            .ok()?;
        let slot = self.slots.get_mut(idx)?;
        *slot = Some(caps.get(2)?.as_bytes().to_vec());
        Some(idx)
    }
}

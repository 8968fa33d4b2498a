// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! STEP entity tokenizer
//!
//! Scans a raw byte buffer for `#id=TYPE(...);` statements without parsing
//! their attributes. Two strategies produce the same `(id, type, line)`
//! sequence:
//!
//! - [`ScanMode::Strict`] tracks parenthesis depth and quoted-string state and
//!   reports the exact byte length of each statement.
//! - [`ScanMode::Fast`] jumps to the next `;` outside a string literal using
//!   SIMD search, ignoring nesting. Callers needing exact attribute boundaries
//!   re-scan that single record in strict mode.
//!
//! Both modes end a record early when a newline inside an open string (or,
//! in strict mode, at non-zero depth) is followed by the head of the next
//! record. A malformed record is still yielded; the extractor reports it as
//! unreadable.

use rustc_hash::FxHashMap;

/// Scanning strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ScanMode {
    /// Exact statement boundaries
    #[default]
    Strict,
    /// Skip to the next top-level `;`
    Fast,
}

/// One `#id=TYPE(...)` statement located in the source buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityRecord<'a> {
    /// Express id (the integer after `#`)
    pub id: u32,
    /// Type name as written in the file
    pub type_name: &'a str,
    /// Byte offset of the leading `#`
    pub offset: usize,
    /// Byte length of the statement, including the `;` when present
    pub length: usize,
    /// 1-based line number of the leading `#`
    pub line: u32,
}

impl<'a> EntityRecord<'a> {
    /// Exclusive end offset
    #[inline]
    pub fn end(&self) -> usize {
        self.offset + self.length
    }

    /// Raw statement bytes
    #[inline]
    pub fn bytes<'b>(&self, buffer: &'b [u8]) -> &'b [u8] {
        &buffer[self.offset..self.end()]
    }
}

/// Create a scanner over `buffer`
#[inline]
pub fn scan(buffer: &[u8], mode: ScanMode) -> EntityScanner<'_> {
    EntityScanner::new(buffer, mode)
}

/// Lazy entity scanner - O(n) single pass over the buffer
pub struct EntityScanner<'a> {
    buffer: &'a [u8],
    mode: ScanMode,
    position: usize,
    line: u32,
    /// Offset up to which newlines have been counted into `line`
    counted_to: usize,
}

/// Parsed `#id = TYPE (` prefix
struct RecordHead<'a> {
    id: u32,
    type_name: &'a str,
    /// Offset of the opening parenthesis
    paren: usize,
}

impl<'a> EntityScanner<'a> {
    /// Create a new scanner
    pub fn new(buffer: &'a [u8], mode: ScanMode) -> Self {
        Self {
            buffer,
            mode,
            position: 0,
            line: 1,
            counted_to: 0,
        }
    }

    /// Strict-mode scanner
    pub fn strict(buffer: &'a [u8]) -> Self {
        Self::new(buffer, ScanMode::Strict)
    }

    /// Fast-mode scanner
    pub fn fast(buffer: &'a [u8]) -> Self {
        Self::new(buffer, ScanMode::Fast)
    }

    /// Scanning strategy in use
    pub fn mode(&self) -> ScanMode {
        self.mode
    }

    /// Current byte position
    #[inline]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Total buffer length
    #[inline]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// True for an empty buffer
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Reset scanner to beginning
    pub fn reset(&mut self) {
        self.position = 0;
        self.line = 1;
        self.counted_to = 0;
    }

    /// Scan for the next entity record
    pub fn next_entity(&mut self) -> Option<EntityRecord<'a>> {
        let bytes = self.buffer;
        let len = bytes.len();

        while self.position < len {
            // Find next '#', comment start or header string using SIMD-accelerated search
            let offset = memchr::memchr3(b'#', b'/', b'\'', &bytes[self.position..])?;
            let start = self.position + offset;

            match bytes[start] {
                b'/' => {
                    self.position = skip_comment(bytes, start);
                    continue;
                }
                b'\'' => {
                    self.position = skip_string(bytes, start);
                    continue;
                }
                _ => {}
            }

            let head = match parse_head(bytes, start) {
                Some(head) => head,
                None => {
                    // Stray '#' - not an entity marker
                    self.position = start + 1;
                    continue;
                }
            };

            let end = match self.mode {
                ScanMode::Strict => strict_end(bytes, head.paren),
                ScanMode::Fast => fast_end(bytes, head.paren),
            };

            self.line += count_newlines(&bytes[self.counted_to..start]);
            self.counted_to = start;
            self.position = end;

            return Some(EntityRecord {
                id: head.id,
                type_name: head.type_name,
                offset: start,
                length: end - start,
                line: self.line,
            });
        }

        None
    }

    /// Find all entities of a specific type
    pub fn find_by_type(&mut self, target_type: &str) -> Vec<EntityRecord<'a>> {
        let mut results = Vec::new();

        while let Some(record) = self.next_entity() {
            if record.type_name.eq_ignore_ascii_case(target_type) {
                results.push(record);
            }
        }

        results
    }

    /// Count entities by type
    pub fn count_by_type(&mut self) -> FxHashMap<&'a str, usize> {
        let mut counts = FxHashMap::default();

        while let Some(record) = self.next_entity() {
            *counts.entry(record.type_name).or_insert(0) += 1;
        }

        counts
    }
}

impl<'a> Iterator for EntityScanner<'a> {
    type Item = EntityRecord<'a>;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.next_entity()
    }
}

#[inline]
fn count_newlines(bytes: &[u8]) -> u32 {
    memchr::memchr_iter(b'\n', bytes).count() as u32
}

#[inline]
fn skip_ws(bytes: &[u8], mut pos: usize) -> usize {
    while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
        pos += 1;
    }
    pos
}

/// Skip a `/* ... */` block starting at `start`; a lone '/' is skipped by one byte
fn skip_comment(bytes: &[u8], start: usize) -> usize {
    if bytes.get(start + 1) != Some(&b'*') {
        return start + 1;
    }
    match memchr::memmem::find(&bytes[start + 2..], b"*/") {
        Some(offset) => start + 2 + offset + 2,
        None => bytes.len(),
    }
}

/// Skip a quoted literal outside any record, such as a header path holding `/*` or `#`.
/// An unterminated literal ends at a newline followed by a record head.
fn skip_string(bytes: &[u8], start: usize) -> usize {
    let len = bytes.len();
    let mut i = start + 1;
    while i < len {
        let offset = match memchr::memchr2(b'\'', b'\n', &bytes[i..]) {
            Some(offset) => offset,
            None => return len,
        };
        i += offset;
        match bytes[i] {
            b'\'' if bytes.get(i + 1) == Some(&b'\'') => i += 2,
            b'\'' => return i + 1,
            _ if is_record_head(bytes, i + 1) => return i + 1,
            _ => i += 1,
        }
    }
    len
}

/// Parse `#<digits> = <TYPENAME> (` starting at a '#'
fn parse_head(bytes: &[u8], start: usize) -> Option<RecordHead<'_>> {
    let len = bytes.len();
    let mut pos = start + 1;

    // Parse entity ID (inline for speed)
    let id_start = pos;
    let mut id: u32 = 0;
    while pos < len && bytes[pos].is_ascii_digit() {
        id = id
            .checked_mul(10)?
            .checked_add((bytes[pos] - b'0') as u32)?;
        pos += 1;
    }
    if pos == id_start {
        return None;
    }

    // Skip whitespace before '=' (handles both `#45=` and `#45 = ` formats)
    pos = skip_ws(bytes, pos);
    if pos >= len || bytes[pos] != b'=' {
        return None;
    }
    pos = skip_ws(bytes, pos + 1);

    // Type name must start with an upper-case letter
    if pos >= len || !bytes[pos].is_ascii_uppercase() {
        return None;
    }
    let type_start = pos;
    while pos < len && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'_') {
        pos += 1;
    }
    let type_end = pos;

    pos = skip_ws(bytes, pos);
    if pos >= len || bytes[pos] != b'(' {
        return None;
    }

    // ASCII-only by construction
    let type_name = std::str::from_utf8(&bytes[type_start..type_end]).ok()?;

    Some(RecordHead {
        id,
        type_name,
        paren: pos,
    })
}

/// Check whether `pos` starts a new record head (`#<digits> =`), after optional blanks
fn is_record_head(bytes: &[u8], pos: usize) -> bool {
    let len = bytes.len();
    let mut i = pos;
    while i < len && matches!(bytes[i], b' ' | b'\t' | b'\r') {
        i += 1;
    }
    if i >= len || bytes[i] != b'#' {
        return false;
    }
    i += 1;
    let digits = i;
    while i < len && bytes[i].is_ascii_digit() {
        i += 1;
    }
    if i == digits {
        return false;
    }
    i = skip_ws(bytes, i);
    i < len && bytes[i] == b'='
}

/// Strict end: track depth and string state from the opening parenthesis
fn strict_end(bytes: &[u8], paren: usize) -> usize {
    let len = bytes.len();
    let mut depth: u32 = 0;
    let mut in_string = false;
    let mut i = paren;

    while i < len {
        let b = bytes[i];
        if in_string {
            match b {
                b'\'' => {
                    // Doubled quote is an escaped quote
                    if i + 1 < len && bytes[i + 1] == b'\'' {
                        i += 2;
                        continue;
                    }
                    in_string = false;
                }
                b'\n' if is_record_head(bytes, i + 1) => return i,
                _ => {}
            }
            i += 1;
            continue;
        }

        match b {
            b'\'' => in_string = true,
            b'(' => depth += 1,
            b')' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    let after = skip_ws(bytes, i + 1);
                    return if after < len && bytes[after] == b';' {
                        after + 1
                    } else {
                        i + 1
                    };
                }
            }
            b';' if depth == 0 => return i + 1,
            b'\n' if depth > 0 && is_record_head(bytes, i + 1) => return i,
            _ => {}
        }
        i += 1;
    }

    len
}

/// Fast end: jump between quotes, semicolons and newlines only
fn fast_end(bytes: &[u8], paren: usize) -> usize {
    let len = bytes.len();
    let mut in_string = false;
    let mut i = paren + 1;

    while i < len {
        let offset = match memchr::memchr3(b'\'', b';', b'\n', &bytes[i..]) {
            Some(offset) => offset,
            None => return len,
        };
        i += offset;

        match bytes[i] {
            b'\'' => {
                if in_string && i + 1 < len && bytes[i + 1] == b'\'' {
                    i += 2;
                    continue;
                }
                in_string = !in_string;
            }
            b';' if !in_string => return i + 1,
            b'\n' if in_string && is_record_head(bytes, i + 1) => return i,
            _ => {}
        }
        i += 1;
    }

    len
}

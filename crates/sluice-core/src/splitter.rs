//! Splitting of script text into independently executable batches.
//!
//! A batch boundary is a line holding nothing but the separator token
//! (compared case-insensitively, surrounding whitespace ignored). The
//! splitter has no lexical awareness: a separator line inside a string
//! literal or block comment still splits the script.

use std::iter::FusedIterator;

/// Separator used when none is configured.
pub const DEFAULT_BATCH_SEPARATOR: &str = "GO";

/// Splits `script` on lines consisting solely of `separator`.
///
/// The returned iterator borrows from `script` and is lazy; clone it (or
/// call this function again) to restart. Each batch keeps its original line
/// terminators. Empty and whitespace-only batches between separators are
/// yielded unchanged; text after the last separator is yielded only when it
/// is non-empty.
///
/// # Examples
///
/// ```rust
/// use sluice_core::splitter::split_sql_script;
///
/// let batches: Vec<_> = split_sql_script("SELECT 1\nGO\nSELECT 2\nGO\n", "GO").collect();
/// assert_eq!(batches, vec!["SELECT 1\n", "SELECT 2\n"]);
/// ```
pub fn split_sql_script<'a>(script: &'a str, separator: &'a str) -> SqlBatches<'a> {
    SqlBatches {
        rest: script,
        separator,
        finished: false,
    }
}

/// Lazy iterator over the batches of a script. See [`split_sql_script`].
#[derive(Debug, Clone)]
pub struct SqlBatches<'a> {
    rest: &'a str,
    separator: &'a str,
    finished: bool,
}

impl<'a> SqlBatches<'a> {
    fn is_separator(&self, line: &str) -> bool {
        line.trim().eq_ignore_ascii_case(self.separator)
    }
}

impl<'a> Iterator for SqlBatches<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        if self.finished {
            return None;
        }

        let mut offset = 0;
        while offset < self.rest.len() {
            let line_end = self.rest[offset..]
                .find('\n')
                .map_or(self.rest.len(), |i| offset + i + 1);

            if self.is_separator(&self.rest[offset..line_end]) {
                let batch = &self.rest[..offset];
                self.rest = &self.rest[line_end..];
                return Some(batch);
            }
            offset = line_end;
        }

        self.finished = true;
        let tail = std::mem::take(&mut self.rest);
        (!tail.is_empty()).then_some(tail)
    }
}

impl FusedIterator for SqlBatches<'_> {}

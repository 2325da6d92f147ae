// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Kernel Command Line Parsing
//!
//! Boot options arrive as one string of space separated `key=value`
//! entries. A key given without `=` is present with an empty value.
//!
//! # Usage
//!
//! ```rust,ignore
//! let cmdline = Cmdline::new("sched.timeslice=8 pmm.thread_limit=0x40 quiet");
//!
//! let slice = cmdline.get_uint32("sched.timeslice", 4);
//! ```

/// ============================================================================
/// Command Line
/// ============================================================================

/// Borrowed view over a kernel command line
#[derive(Debug, Clone, Copy)]
pub struct Cmdline<'a> {
    raw: &'a str,
}

impl<'a> Cmdline<'a> {
    /// Wrap a raw command line string
    pub const fn new(raw: &'a str) -> Self {
        Self { raw }
    }

    /// Iterate over `(key, value)` entries in command line order
    ///
    /// Tabs and newlines separate entries like spaces do.
    pub fn entries(&self) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.raw
            .split_ascii_whitespace()
            .map(|entry| entry.split_once('=').unwrap_or((entry, "")))
    }

    /// Number of entries on the command line
    pub fn count(&self) -> usize {
        self.entries().count()
    }

    /// Get a value from the command line
    ///
    /// # Returns
    ///
    /// The value of the first entry named `key`, or `None` if absent.
    pub fn get(&self, key: &str) -> Option<&'a str> {
        if key.is_empty() {
            return None;
        }

        self.entries().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    /// Get a uint32 value from the command line
    ///
    /// Accepts decimal or `0x` prefixed hex. Empty, malformed and
    /// out of range values yield `default`.
    pub fn get_uint32(&self, key: &str, default: u32) -> u32 {
        match self.get(key) {
            None | Some("") => default,
            Some(v) => parse_uint32(v).unwrap_or(default),
        }
    }
}

fn parse_uint32(value: &str) -> Option<u32> {
    match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => value.parse::<u32>().ok(),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cmdline_empty() {
        let cmdline = Cmdline::new("");
        assert!(cmdline.get("test").is_none());
        assert_eq!(cmdline.count(), 0);
    }

    #[test]
    fn test_cmdline_get_simple() {
        let cmdline = Cmdline::new("test=value other=1");
        assert_eq!(cmdline.get("test"), Some("value"));
        assert_eq!(cmdline.get("other"), Some("1"));
        assert_eq!(cmdline.get("tes"), None);
        assert_eq!(cmdline.count(), 2);
    }

    #[test]
    fn test_cmdline_bare_key_and_whitespace() {
        let cmdline = Cmdline::new("  quiet\tsched.timeslice=8\n");
        assert_eq!(cmdline.get("quiet"), Some(""));
        assert_eq!(cmdline.get("sched.timeslice"), Some("8"));
    }

    #[test]
    fn test_cmdline_first_entry_wins() {
        let cmdline = Cmdline::new("a=1 a=2");
        assert_eq!(cmdline.get("a"), Some("1"));
    }

    #[test]
    fn test_cmdline_get_uint32() {
        let cmdline = Cmdline::new("dec=42 hex=0x1F bad=12z empty= big=4294967296");

        assert_eq!(cmdline.get_uint32("dec", 0), 42);
        assert_eq!(cmdline.get_uint32("hex", 0), 31);
        assert_eq!(cmdline.get_uint32("bad", 7), 7);
        assert_eq!(cmdline.get_uint32("empty", 9), 9);
        assert_eq!(cmdline.get_uint32("big", 3), 3);
        assert_eq!(cmdline.get_uint32("missing", 5), 5);
    }
}

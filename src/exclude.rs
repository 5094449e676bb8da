//! Name patterns hidden from directory and profile listings.
//!
//! The configured exclusion list is a space-separated string such as
//! `".git *.pyc CVS"`. Each pattern is a shell glob matched against an
//! entry's *name* (never its full path):
//!
//! - `*` matches any run of characters, `?` a single character, and
//!   `[abc]` / `[a-z]` / `[!abc]` a character class.
//! - A leading `!` re-includes names matched by an earlier pattern.
//! - A trailing `/` restricts the pattern to directories.
//! - The last matching pattern wins.

use std::str::FromStr;

use crate::error::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Pattern {
    glob: Vec<char>,
    negated: bool,
    dir_only: bool,
}

/// Parsed exclusion list.
///
/// # Example
///
/// ```rust
/// use vost_backend::ExcludeFilter;
///
/// let f = ExcludeFilter::parse(".git *.pyc !keep.pyc");
/// assert!(f.is_excluded(".git", true));
/// assert!(f.is_excluded("mod.pyc", false));
/// assert!(!f.is_excluded("keep.pyc", false));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ExcludeFilter {
    patterns: Vec<Pattern>,
}

impl ExcludeFilter {
    /// A filter that excludes nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a whitespace-separated pattern list.
    pub fn parse(spec: &str) -> Self {
        let mut filter = Self::new();
        for raw in spec.split_whitespace() {
            filter.add(raw);
        }
        filter
    }

    /// Add a single pattern. Empty patterns (after stripping `!` and `/`)
    /// are ignored.
    pub fn add(&mut self, raw: &str) {
        let (negated, rest) = match raw.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, raw),
        };
        let (dir_only, glob) = match rest.strip_suffix('/') {
            Some(glob) => (true, glob),
            None => (false, rest),
        };
        if glob.is_empty() {
            return;
        }
        self.patterns.push(Pattern {
            glob: glob.chars().collect(),
            negated,
            dir_only,
        });
    }

    /// Return `true` if an entry called `name` should be hidden.
    pub fn is_excluded(&self, name: &str, is_dir: bool) -> bool {
        let name: Vec<char> = name.chars().collect();
        let mut excluded = false;
        for p in &self.patterns {
            if p.dir_only && !is_dir {
                continue;
            }
            if fnmatch(&p.glob, &name) {
                excluded = !p.negated;
            }
        }
        excluded
    }

    /// Number of active patterns.
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

impl FromStr for ExcludeFilter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

// ---------------------------------------------------------------------------
// Glob matching
// ---------------------------------------------------------------------------

/// Match `pat` against `name` with `*`, `?` and `[...]` support.
///
/// Backtracks only to the most recent `*`, which is sufficient because a
/// later `*` can always absorb whatever an earlier one would have.
fn fnmatch(pat: &[char], name: &[char]) -> bool {
    let mut pi = 0;
    let mut ni = 0;
    let mut star: Option<(usize, usize)> = None;

    while ni < name.len() {
        if pi < pat.len() {
            match pat[pi] {
                '*' => {
                    star = Some((pi, ni));
                    pi += 1;
                    continue;
                }
                '?' => {
                    pi += 1;
                    ni += 1;
                    continue;
                }
                '[' => {
                    if let Some((matched, next)) = match_class(pat, pi, name[ni]) {
                        if matched {
                            pi = next;
                            ni += 1;
                            continue;
                        }
                    } else if name[ni] == '[' {
                        // Unterminated class: treat `[` literally.
                        pi += 1;
                        ni += 1;
                        continue;
                    }
                }
                c if c == name[ni] => {
                    pi += 1;
                    ni += 1;
                    continue;
                }
                _ => {}
            }
        }
        match star {
            Some((spi, sni)) => {
                pi = spi + 1;
                ni = sni + 1;
                star = Some((spi, sni + 1));
            }
            None => return false,
        }
    }

    pat[pi..].iter().all(|&c| c == '*')
}

/// Evaluate the character class starting at `pat[start] == '['`.
///
/// Returns whether `c` is in the class and the index just past `]`, or
/// `None` if the class is unterminated.
fn match_class(pat: &[char], start: usize, c: char) -> Option<(bool, usize)> {
    let mut i = start + 1;
    let negated = matches!(pat.get(i), Some('!') | Some('^'));
    if negated {
        i += 1;
    }

    let mut matched = false;
    let mut first = true;
    while i < pat.len() {
        if pat[i] == ']' && !first {
            return Some((matched != negated, i + 1));
        }
        first = false;
        if i + 2 < pat.len() && pat[i + 1] == '-' && pat[i + 2] != ']' {
            if pat[i] <= c && c <= pat[i + 2] {
                matched = true;
            }
            i += 3;
        } else {
            if pat[i] == c {
                matched = true;
            }
            i += 1;
        }
    }
    None
}

//! Include/exclude glob matching.
//!
//! Patterns are translated into anchored regular expressions once and kept in
//! a small bounded cache keyed by the raw glob string. Exclusions always win
//! over inclusions, and a path that matches no include pattern is not cached.

use std::borrow::Cow;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, MAIN_SEPARATOR};

use regex::Regex;

use crate::error::CacheError;

/// Maximum number of compiled patterns kept per [`PatternCache`].
pub const PATTERN_CACHE_CAPACITY: usize = 100;

/// A glob string together with its compiled matcher.
#[derive(Debug, Clone)]
pub struct PatternRule {
    raw: String,
    compiled: Regex,
}

impl PatternRule {
    /// Compiles a glob into a rule.
    ///
    /// `**` matches any number of path segments (including none), `*` matches
    /// within a single segment, and every other character is literal.
    pub fn compile(raw: &str) -> Result<Self, CacheError> {
        let compiled = Regex::new(&glob_to_regex(raw)).map_err(|e| CacheError::Pattern {
            pattern: raw.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            raw: raw.to_string(),
            compiled,
        })
    }

    /// Returns the original glob string.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Returns `true` if the whole path matches this rule.
    pub fn is_match(&self, path: &str) -> bool {
        self.compiled.is_match(path)
    }
}

/// Translates a glob into an anchored regular expression source.
fn glob_to_regex(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() * 2 + 2);
    out.push('^');
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '*' {
            let mut buf = [0u8; 4];
            out.push_str(&regex::escape(c.encode_utf8(&mut buf)));
            continue;
        }
        if chars.peek() != Some(&'*') {
            out.push_str("[^/]*");
            continue;
        }
        while chars.peek() == Some(&'*') {
            chars.next();
        }
        if chars.peek() == Some(&'/') {
            chars.next();
            out.push_str("(?:.*/)?");
        } else {
            out.push_str(".*");
        }
    }
    out.push('$');
    out
}

/// Bounded cache of compiled patterns.
///
/// When full, the entry inserted first is dropped (insertion order, not
/// recency). Pattern sets are small and fixed per project, so this only
/// matters for pathological configurations.
#[derive(Debug)]
pub struct PatternCache {
    rules: HashMap<String, PatternRule>,
    order: VecDeque<String>,
    capacity: usize,
}

impl PatternCache {
    /// Creates a cache with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(PATTERN_CACHE_CAPACITY)
    }

    /// Creates a cache holding at most `capacity` compiled patterns.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            rules: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Returns the compiled rule for `raw`, compiling it on first use.
    pub fn get_or_compile(&mut self, raw: &str) -> Result<&PatternRule, CacheError> {
        if !self.rules.contains_key(raw) {
            let rule = PatternRule::compile(raw)?;
            if self.rules.len() >= self.capacity {
                if let Some(oldest) = self.order.pop_front() {
                    self.rules.remove(&oldest);
                }
            }
            self.order.push_back(raw.to_string());
            self.rules.insert(raw.to_string(), rule);
        }
        Ok(&self.rules[raw])
    }

    /// Returns `true` if `raw` is currently compiled and cached.
    pub fn contains(&self, raw: &str) -> bool {
        self.rules.contains_key(raw)
    }

    /// Returns the number of cached patterns.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns `true` if no pattern has been compiled yet.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for PatternCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Decides whether a path is subject to caching.
#[derive(Debug)]
pub struct PatternMatcher {
    include: Vec<String>,
    exclude: Vec<String>,
    cache: PatternCache,
}

impl PatternMatcher {
    /// Creates a matcher from include and exclude glob lists.
    pub fn new(include: Vec<String>, exclude: Vec<String>) -> Self {
        Self {
            include,
            exclude,
            cache: PatternCache::new(),
        }
    }

    /// Returns `true` if `path` matches an include pattern and no exclude pattern.
    pub fn should_cache(&mut self, path: &Path) -> bool {
        let candidate = normalize(path);
        let Self {
            include,
            exclude,
            cache,
        } = self;

        if exclude.iter().any(|p| matches(cache, p, &candidate)) {
            return false;
        }
        include.iter().any(|p| matches(cache, p, &candidate))
    }

    /// Returns the include patterns.
    pub fn include(&self) -> &[String] {
        &self.include
    }

    /// Returns the exclude patterns.
    pub fn exclude(&self) -> &[String] {
        &self.exclude
    }

    /// Returns the compiled-pattern cache.
    pub fn cache(&self) -> &PatternCache {
        &self.cache
    }
}

fn matches(cache: &mut PatternCache, pattern: &str, path: &str) -> bool {
    match cache.get_or_compile(pattern) {
        Ok(rule) => rule.is_match(path),
        Err(err) => {
            tracing::warn!(target: "vek::cache", %err, "ignoring pattern");
            false
        }
    }
}

/// Renders a path with `/` separators for matching.
fn normalize(path: &Path) -> Cow<'_, str> {
    let lossy = path.to_string_lossy();
    if MAIN_SEPARATOR == '/' {
        lossy
    } else {
        Cow::Owned(lossy.replace(MAIN_SEPARATOR, "/"))
    }
}

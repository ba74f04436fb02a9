//! Process-wide caches for compiled regexes and date formatters.
//!
//! Formulas are configured once but evaluated for millions of rows, and many
//! formulas across a process reuse the same patterns. Both caches are keyed
//! by the raw pattern text and hold compiled artefacts behind `Arc` so
//! generators can keep a handle without re-locking per row.

use crate::streamexpr::error::{ExprError, ExprResult};
use chrono::format::{parse, Item, Parsed, StrftimeItems};
use chrono::{TimeZone, Utc};
use chrono_tz::Tz;
use regex::Regex;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex, OnceLock};

static REGEX_CACHE: OnceLock<Mutex<HashMap<String, Arc<Regex>>>> = OnceLock::new();
static FORMATTER_CACHE: OnceLock<Mutex<HashMap<String, Arc<DateFormatter>>>> = OnceLock::new();

/// Get or compile a regex pattern. `function` names the caller for error
/// reporting. Entries live for the process lifetime; cardinality is bounded
/// by the number of distinct patterns authored in formulas, not row volume.
pub fn cached_regex(function: &str, pattern: &str) -> ExprResult<Arc<Regex>> {
    let cache = REGEX_CACHE.get_or_init(|| Mutex::new(HashMap::new()));
    let mut guard = cache.lock().map_err(|_| poisoned())?;

    if let Some(regex) = guard.get(pattern) {
        return Ok(Arc::clone(regex));
    }

    let regex = match Regex::new(pattern) {
        Ok(r) => Arc::new(r),
        Err(e) => {
            return Err(ExprError::configuration(
                function,
                format!("invalid regular expression '{}': {}", pattern, e),
            ));
        }
    };

    log::debug!("compiled regex '{}' (cache size {})", pattern, guard.len() + 1);
    guard.insert(pattern.to_string(), Arc::clone(&regex));
    Ok(regex)
}

/// Get or build a date formatter for a strftime-style pattern and a named
/// time zone.
pub fn cached_formatter(function: &str, pattern: &str, zone: &str) -> ExprResult<Arc<DateFormatter>> {
    let cache = FORMATTER_CACHE.get_or_init(|| Mutex::new(HashMap::new()));
    let key = format!("{}\n{}", pattern, zone);
    let mut guard = cache.lock().map_err(|_| poisoned())?;

    if let Some(formatter) = guard.get(&key) {
        return Ok(Arc::clone(formatter));
    }

    let formatter = Arc::new(DateFormatter::new(function, pattern, zone)?);

    guard.insert(key, Arc::clone(&formatter));
    Ok(formatter)
}

fn poisoned() -> ExprError {
    ExprError::state("cache lock poisoned")
}

/// Resolves a named time zone from the tz database.
pub fn lookup_zone(function: &str, zone: &str) -> ExprResult<Tz> {
    Tz::from_str(zone)
        .map_err(|_| ExprError::configuration(function, format!("unknown time zone '{}'", zone)))
}

/// A validated date pattern bound to a time zone, usable for both parsing
/// and formatting epoch milliseconds.
#[derive(Debug)]
pub struct DateFormatter {
    items: Vec<Item<'static>>,
    tz: Tz,
}

impl DateFormatter {
    fn new(function: &str, pattern: &str, zone: &str) -> ExprResult<Self> {
        let items = StrftimeItems::new(pattern).parse_to_owned().map_err(|e| {
            ExprError::configuration(
                function,
                format!("invalid date pattern '{}': {}", pattern, e),
            )
        })?;
        let tz = lookup_zone(function, zone)?;
        Ok(DateFormatter { items, tz })
    }

    /// Parses `text` to epoch milliseconds. Text carrying its own offset wins
    /// over the configured zone; otherwise the local time is resolved in the
    /// configured zone (earliest instant across DST gaps).
    pub fn parse_millis(&self, text: &str) -> Option<i64> {
        let mut parsed = Parsed::new();
        parse(&mut parsed, text, self.items.iter()).ok()?;
        if let Ok(dt) = parsed.to_datetime() {
            return Some(dt.timestamp_millis());
        }
        let naive = parsed.to_naive_datetime_with_offset(0).ok()?;
        self.tz
            .from_local_datetime(&naive)
            .earliest()
            .map(|dt| dt.timestamp_millis())
    }

    /// Formats epoch milliseconds in the configured zone.
    pub fn format_millis(&self, millis: i64) -> Option<String> {
        let dt = Utc.timestamp_millis_opt(millis).single()?;
        Some(
            dt.with_timezone(&self.tz)
                .format_with_items(self.items.iter())
                .to_string(),
        )
    }
}

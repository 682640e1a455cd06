//! Maven version ordering and version ranges.
//!
//! Ordering follows Maven's rules closely enough for range resolution:
//! numeric segments compare numerically, trailing zero segments are
//! insignificant, and qualifiers sort
//! `alpha < beta < milestone < rc < snapshot < release < sp < anything else`.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Item {
    Number(u64),
    Qualifier(String),
}

const RELEASE_RANK: usize = 5;

fn qualifier_rank(q: &str) -> usize {
    match q {
        "alpha" => 0,
        "beta" => 1,
        "milestone" => 2,
        "rc" => 3,
        "snapshot" => 4,
        "" => RELEASE_RANK,
        "sp" => 6,
        _ => 7,
    }
}

fn normalize_qualifier(q: &str) -> String {
    match q {
        "a" => "alpha".to_string(),
        "b" => "beta".to_string(),
        "m" => "milestone".to_string(),
        "cr" => "rc".to_string(),
        "ga" | "final" | "release" => String::new(),
        other => other.to_string(),
    }
}

/// A parsed, comparable Maven version. Parsing never fails.
#[derive(Debug, Clone)]
pub struct MavenVersion {
    raw: String,
    items: Vec<Item>,
}

impl MavenVersion {
    pub fn parse(raw: &str) -> Self {
        Self {
            raw: raw.trim().to_string(),
            items: tokenize(raw),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn is_snapshot(&self) -> bool {
        self.raw.to_ascii_lowercase().ends_with("snapshot")
    }
}

fn tokenize(raw: &str) -> Vec<Item> {
    let lower = raw.trim().to_ascii_lowercase();
    let mut items = Vec::new();
    let mut current = String::new();
    let mut in_digits = false;

    for c in lower.chars() {
        if matches!(c, '.' | '-' | '_' | '+') {
            push_token(&mut items, &mut current);
            continue;
        }
        let is_digit = c.is_ascii_digit();
        if !current.is_empty() && is_digit != in_digits {
            push_token(&mut items, &mut current);
        }
        in_digits = is_digit;
        current.push(c);
    }
    push_token(&mut items, &mut current);

    while matches!(items.last(), Some(Item::Number(0)))
        || matches!(items.last(), Some(Item::Qualifier(q)) if q.is_empty())
    {
        items.pop();
    }
    items
}

fn push_token(items: &mut Vec<Item>, current: &mut String) {
    if current.is_empty() {
        return;
    }
    let token = std::mem::take(current);
    match token.parse::<u64>() {
        Ok(n) => items.push(Item::Number(n)),
        Err(_) => {
            // "1.0.0-alpha" and "1-alpha" are the same version.
            while matches!(items.last(), Some(Item::Number(0))) {
                items.pop();
            }
            items.push(Item::Qualifier(normalize_qualifier(&token)));
        }
    }
}

fn compare_items(a: Option<&Item>, b: Option<&Item>) -> Ordering {
    use Item::{Number, Qualifier};
    match (a, b) {
        (None, None) => Ordering::Equal,
        (Some(Number(x)), Some(Number(y))) => x.cmp(y),
        (Some(Number(_)), Some(Qualifier(_))) => Ordering::Greater,
        (Some(Qualifier(_)), Some(Number(_))) => Ordering::Less,
        (Some(Qualifier(x)), Some(Qualifier(y))) => qualifier_rank(x)
            .cmp(&qualifier_rank(y))
            .then_with(|| x.cmp(y)),
        (Some(Number(x)), None) => x.cmp(&0),
        (None, Some(Number(y))) => 0.cmp(y),
        (Some(Qualifier(x)), None) => qualifier_rank(x).cmp(&RELEASE_RANK),
        (None, Some(Qualifier(y))) => RELEASE_RANK.cmp(&qualifier_rank(y)),
    }
}

impl Ord for MavenVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.items.len().max(other.items.len());
        for idx in 0..len {
            let ord = compare_items(self.items.get(idx), other.items.get(idx));
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for MavenVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for MavenVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for MavenVersion {}

impl fmt::Display for MavenVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Bound {
    version: MavenVersion,
    inclusive: bool,
}

/// A single Maven version interval such as `[1.0.0, 2.0.0)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
    lower: Option<Bound>,
    upper: Option<Bound>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RangeParseError {
    #[error("version range '{0}' must start with '[' or '(' and end with ']' or ')'")]
    Delimiters(String),

    #[error("version range '{0}' is malformed")]
    Malformed(String),
}

impl VersionRange {
    /// `[lower, upper)`
    pub fn half_open(lower: &str, upper: &str) -> Self {
        Self {
            lower: Some(Bound {
                version: MavenVersion::parse(lower),
                inclusive: true,
            }),
            upper: Some(Bound {
                version: MavenVersion::parse(upper),
                inclusive: false,
            }),
        }
    }

    /// Every release of one major-version series: `[major.0.0, (major+1).0.0)`.
    pub fn for_major(major: u64) -> Self {
        Self::half_open(
            &format!("{major}.0.0"),
            &format!("{}.0.0", major.saturating_add(1)),
        )
    }

    pub fn lower(&self) -> Option<&MavenVersion> {
        self.lower.as_ref().map(|b| &b.version)
    }

    pub fn upper(&self) -> Option<&MavenVersion> {
        self.upper.as_ref().map(|b| &b.version)
    }

    pub fn contains(&self, version: &MavenVersion) -> bool {
        let above_lower = match &self.lower {
            Some(b) if b.inclusive => version >= &b.version,
            Some(b) => version > &b.version,
            None => true,
        };
        let below_upper = match &self.upper {
            Some(b) if b.inclusive => version <= &b.version,
            Some(b) => version < &b.version,
            None => true,
        };
        above_lower && below_upper
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let open = match &self.lower {
            Some(b) if b.inclusive => '[',
            _ => '(',
        };
        let close = match &self.upper {
            Some(b) if b.inclusive => ']',
            _ => ')',
        };
        let lower = self.lower.as_ref().map(|b| b.version.as_str()).unwrap_or("");
        let upper = self.upper.as_ref().map(|b| b.version.as_str()).unwrap_or("");
        write!(f, "{open}{lower}, {upper}{close}")
    }
}

impl FromStr for VersionRange {
    type Err = RangeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let lower_inclusive = match trimmed.chars().next() {
            Some('[') => true,
            Some('(') => false,
            _ => return Err(RangeParseError::Delimiters(s.to_string())),
        };
        let upper_inclusive = match trimmed.chars().last() {
            Some(']') => true,
            Some(')') => false,
            _ => return Err(RangeParseError::Delimiters(s.to_string())),
        };
        if trimmed.len() < 2 {
            return Err(RangeParseError::Delimiters(s.to_string()));
        }
        let inner = &trimmed[1..trimmed.len() - 1];

        let bound = |text: &str, inclusive: bool| {
            let text = text.trim();
            (!text.is_empty()).then(|| Bound {
                version: MavenVersion::parse(text),
                inclusive,
            })
        };

        match inner.split_once(',') {
            Some((lo, hi)) => {
                if hi.contains(',') {
                    return Err(RangeParseError::Malformed(s.to_string()));
                }
                Ok(Self {
                    lower: bound(lo, lower_inclusive),
                    upper: bound(hi, upper_inclusive),
                })
            }
            // `[1.2]` pins exactly one version.
            None if lower_inclusive && upper_inclusive && !inner.trim().is_empty() => Ok(Self {
                lower: bound(inner, true),
                upper: bound(inner, true),
            }),
            None => Err(RangeParseError::Malformed(s.to_string())),
        }
    }
}

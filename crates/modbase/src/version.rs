//! Version strings compared with semantic-version precedence
//!
//! Mods carry free-form version strings, so parsing is lenient: a leading `v`
//! is dropped, any number of numeric components is accepted (missing ones
//! count as zero) and build metadata after `+` is ignored.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{0}' is not a valid version")]
pub struct InvalidVersion(pub String);

#[derive(Debug, Clone)]
pub struct ModVersion {
    numbers: Vec<u64>,
    pre: Vec<String>,
}

impl ModVersion {
    pub fn numbers(&self) -> &[u64] {
        &self.numbers
    }

    pub fn is_prerelease(&self) -> bool {
        !self.pre.is_empty()
    }

    fn number(&self, idx: usize) -> u64 {
        self.numbers.get(idx).copied().unwrap_or(0)
    }
}

impl FromStr for ModVersion {
    type Err = InvalidVersion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidVersion(s.to_string());

        let trimmed = s.trim();
        let trimmed = trimmed
            .strip_prefix('v')
            .or_else(|| trimmed.strip_prefix('V'))
            .unwrap_or(trimmed);
        let without_build = trimmed.split('+').next().unwrap_or_default();
        let (core, pre) = match without_build.split_once('-') {
            Some((core, pre)) => (core, Some(pre)),
            None => (without_build, None),
        };

        if core.is_empty() {
            return Err(invalid());
        }

        let numbers = core
            .split('.')
            .map(|part| part.parse::<u64>().map_err(|_| invalid()))
            .collect::<Result<Vec<_>, _>>()?;

        let pre = match pre {
            Some(pre) if pre.is_empty() || pre.split('.').any(str::is_empty) => {
                return Err(invalid())
            }
            Some(pre) => pre.split('.').map(str::to_string).collect(),
            None => Vec::new(),
        };

        Ok(Self { numbers, pre })
    }
}

impl fmt::Display for ModVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let numbers = self
            .numbers
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(".");
        write!(f, "{}", numbers)?;
        if !self.pre.is_empty() {
            write!(f, "-{}", self.pre.join("."))?;
        }
        Ok(())
    }
}

impl Ord for ModVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.numbers.len().max(other.numbers.len());
        for idx in 0..len {
            match self.number(idx).cmp(&other.number(idx)) {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }

        // A release outranks any of its pre-releases
        match (self.pre.is_empty(), other.pre.is_empty()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => compare_prerelease(&self.pre, &other.pre),
        }
    }
}

impl PartialOrd for ModVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ModVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ModVersion {}

fn compare_prerelease(a: &[String], b: &[String]) -> Ordering {
    for (left, right) in a.iter().zip(b) {
        let ord = match (left.parse::<u64>(), right.parse::<u64>()) {
            (Ok(l), Ok(r)) => l.cmp(&r),
            (Ok(_), Err(_)) => Ordering::Less,
            (Err(_), Ok(_)) => Ordering::Greater,
            (Err(_), Err(_)) => left.cmp(right),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a.len().cmp(&b.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> ModVersion {
        s.parse().unwrap()
    }

    #[test]
    fn test_numeric_ordering() {
        assert!(v("1.3.0") > v("1.2.0"));
        assert!(v("1.10") > v("1.9"));
        assert!(v("2") > v("1.99.99"));
    }

    #[test]
    fn test_missing_components_are_zero() {
        assert_eq!(v("1.2"), v("1.2.0"));
        assert_eq!(v("v1.2.0+build.7"), v("1.2"));
    }

    #[test]
    fn test_prerelease_precedence() {
        assert!(v("1.0.0-alpha") < v("1.0.0"));
        assert!(v("1.0.0-alpha") < v("1.0.0-alpha.1"));
        assert!(v("1.0.0-alpha.1") < v("1.0.0-alpha.beta"));
        assert!(v("1.0.0-beta.2") < v("1.0.0-beta.11"));
        assert!(v("1.0.0-rc.1") < v("1.0.0"));
    }

    #[test]
    fn test_invalid_versions() {
        assert!("".parse::<ModVersion>().is_err());
        assert!("one.two".parse::<ModVersion>().is_err());
        assert!("1..2".parse::<ModVersion>().is_err());
        assert!("1.0-".parse::<ModVersion>().is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(v("v1.2.3-beta.1+abc").to_string(), "1.2.3-beta.1");
    }
}

use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use crate::LedlineError;

/// Inclusive pixel window a step is restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedRange {
    pub start: usize,
    pub end: usize,
}

impl LedRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn as_range(self) -> RangeInclusive<usize> {
        self.start..=self.end
    }
}

/// Accepts `"a-b"` or a single index `"a"`.
impl FromStr for LedRange {
    type Err = LedlineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse = |part: &str| {
            part.trim()
                .parse::<usize>()
                .map_err(|_| LedlineError::decode(format!("invalid led range {s:?}")))
        };
        let range = match s.split_once('-') {
            Some((start, end)) => Self::new(parse(start)?, parse(end)?),
            None => {
                let index = parse(s)?;
                Self::new(index, index)
            }
        };
        if range.start > range.end {
            return Err(LedlineError::decode(format!("led range {s:?} is reversed")));
        }
        Ok(range)
    }
}

impl fmt::Display for LedRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_spans_and_single_indices() {
        assert_eq!("3-7".parse::<LedRange>().unwrap(), LedRange::new(3, 7));
        assert_eq!(" 4 ".parse::<LedRange>().unwrap(), LedRange::new(4, 4));
        assert_eq!("0 - 2".parse::<LedRange>().unwrap().as_range(), 0..=2);
    }

    #[test]
    fn rejects_garbage() {
        assert!("7-3".parse::<LedRange>().is_err());
        assert!("a-b".parse::<LedRange>().is_err());
        assert!("-3".parse::<LedRange>().is_err());
    }
}

//! Bounded line samples and the skip sets that thin them.

use crate::error::{Result, TabError};
use crate::source::LineCursor;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::ops::Range;

/// Line indices left out of a sample or a read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Skips {
    #[default]
    None,
    Lines(BTreeSet<usize>),
    Range(Range<usize>),
}

impl Skips {
    pub fn lines(lines: impl IntoIterator<Item = usize>) -> Self {
        Self::Lines(lines.into_iter().collect())
    }

    pub fn range(range: Range<usize>) -> Self {
        Self::Range(range)
    }

    pub fn contains(&self, line: usize) -> bool {
        match self {
            Self::None => false,
            Self::Lines(set) => set.contains(&line),
            Self::Range(range) => range.contains(&line),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::None => true,
            Self::Lines(set) => set.is_empty(),
            Self::Range(range) => range.is_empty(),
        }
    }
}

impl From<Range<usize>> for Skips {
    fn from(range: Range<usize>) -> Self {
        Self::Range(range)
    }
}

impl From<Vec<usize>> for Skips {
    fn from(lines: Vec<usize>) -> Self {
        Self::lines(lines)
    }
}

/// One raw line together with its index in the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampledLine {
    pub line: usize,
    pub raw: String,
}

/// Up to `amount` raw lines collected from `start`, minus skipped lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    pub start: usize,
    pub amount: usize,
    pub lines: Vec<SampledLine>,
}

impl Sample {
    /// Collect a sample from `cursor`.
    ///
    /// The sample is best-effort: a source that ends early yields fewer lines.
    ///
    /// # Errors
    /// [`TabError::InvalidAmount`] for an empty request; seek and I/O errors
    /// from the cursor.
    pub fn collect(cursor: &mut LineCursor, start: usize, amount: usize, skips: &Skips) -> Result<Self> {
        if amount == 0 {
            return Err(TabError::InvalidAmount(amount));
        }
        cursor.seek(start)?;
        let mut lines = Vec::with_capacity(amount.min(1024));
        while lines.len() < amount {
            let Some((line, raw)) = cursor.next_line()? else {
                log::debug!("source ended after {} of {} sampled lines", lines.len(), amount);
                break;
            };
            if skips.contains(line) {
                continue;
            }
            lines.push(SampledLine { line, raw });
        }
        Ok(Self {
            start,
            amount,
            lines,
        })
    }

    /// Build a sample directly from text lines numbered from `start`.
    pub fn from_lines<S: Into<String>>(start: usize, lines: impl IntoIterator<Item = S>) -> Self {
        let lines: Vec<SampledLine> = lines
            .into_iter()
            .enumerate()
            .map(|(i, raw)| SampledLine {
                line: start + i,
                raw: raw.into(),
            })
            .collect();
        Self {
            start,
            amount: lines.len(),
            lines,
        }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// True when the source supplied every requested line.
    pub fn is_complete(&self) -> bool {
        self.lines.len() == self.amount
    }

    /// Raw text of the sampled lines whose index falls in `range`, newline-joined.
    pub fn text_in(&self, range: &Range<usize>) -> Option<String> {
        let picked: Vec<&str> = self
            .lines
            .iter()
            .filter(|l| range.contains(&l.line))
            .map(|l| l.raw.as_str())
            .collect();
        (!picked.is_empty()).then(|| picked.join("\n"))
    }

    pub fn get(&self, line: usize) -> Option<&SampledLine> {
        self.lines.iter().find(|l| l.line == line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SeekableSource;
    use std::io::Cursor;

    fn cursor(n: usize) -> LineCursor {
        let text: String = (0..n).map(|i| format!("{i}\n")).collect();
        LineCursor::new(SeekableSource::new(Cursor::new(text)))
    }

    #[test]
    fn skipped_lines_do_not_count_toward_amount() {
        let mut c = cursor(20);
        let s = Sample::collect(&mut c, 2, 5, &Skips::lines([3, 4])).unwrap();
        let idx: Vec<usize> = s.lines.iter().map(|l| l.line).collect();
        assert_eq!(idx, vec![2, 5, 6, 7, 8]);
        assert!(s.is_complete());
    }

    #[test]
    fn short_source_gives_partial_sample() {
        let mut c = cursor(3);
        let s = Sample::collect(&mut c, 0, 10, &Skips::None).unwrap();
        assert_eq!(s.len(), 3);
        assert!(!s.is_complete());
    }

    #[test]
    fn zero_amount_is_rejected() {
        let mut c = cursor(3);
        assert!(matches!(
            Sample::collect(&mut c, 0, 0, &Skips::None),
            Err(TabError::InvalidAmount(0))
        ));
    }

    #[test]
    fn range_skips() {
        let skips = Skips::from(10..12);
        assert!(skips.contains(10) && skips.contains(11));
        assert!(!skips.contains(12));
    }
}

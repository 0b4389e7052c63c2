//! Row filters ("tabs") bound to columns, and column projection.
//!
//! Tabs are declared against header names and validated immediately. At read
//! time they are compiled against the column types: operands of equality,
//! membership and comparison tabs are cast to the column's type so that
//! `"3"` matches an int column holding `3`. Regex tabs always see the raw cell
//! text. A row passes when every tab accepts it; projection happens after
//! filtering, so tabs may test columns that are not selected.

use crate::error::{Result, TabError};
use crate::parsing::{self, CellType, CellValue, Formats};
use crate::row::Row;
use crate::sniffer::{ColumnTypes, Header};
use regex::Regex;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Caller-supplied predicate receiving the cell and its full row.
pub type Predicate = Arc<dyn Fn(&CellValue, &Row) -> bool + Send + Sync>;

/// A single-column filter.
#[derive(Clone)]
pub enum Tab {
    /// Cell equals the operand.
    Equality(String),
    /// Cell equals one of the operands.
    Membership(Vec<String>),
    /// Cell satisfies every `op operand` term.
    Comparison(Comparison),
    /// Raw cell text contains a match.
    Regex(Regex),
    /// Predicate returns true.
    Calling(Predicate),
}

impl Tab {
    pub fn equal(value: impl Into<String>) -> Self {
        Tab::Equality(value.into())
    }

    pub fn is_in<S: Into<String>>(values: impl IntoIterator<Item = S>) -> Self {
        Tab::Membership(values.into_iter().map(Into::into).collect())
    }

    /// # Errors
    /// [`TabError::InvalidComparison`] for a malformed expression.
    pub fn compare(expression: &str) -> Result<Self> {
        expression.parse().map(Tab::Comparison)
    }

    /// # Errors
    /// [`TabError::InvalidPattern`] when the pattern does not compile.
    pub fn regex(pattern: &str) -> Result<Self> {
        Ok(Tab::Regex(Regex::new(pattern)?))
    }

    pub fn calling<F>(f: F) -> Self
    where
        F: Fn(&CellValue, &Row) -> bool + Send + Sync + 'static,
    {
        Tab::Calling(Arc::new(f))
    }
}

impl fmt::Debug for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tab::Equality(v) => f.debug_tuple("Equality").field(v).finish(),
            Tab::Membership(v) => f.debug_tuple("Membership").field(v).finish(),
            Tab::Comparison(c) => f.debug_tuple("Comparison").field(&c.expression).finish(),
            Tab::Regex(r) => f.debug_tuple("Regex").field(&r.as_str()).finish(),
            Tab::Calling(_) => f.write_str("Calling(..)"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl Op {
    // two-character operators must be matched first
    const SYMBOLS: [(&'static str, Op); 6] = [
        ("<=", Op::Le),
        (">=", Op::Ge),
        ("==", Op::Eq),
        ("!=", Op::Ne),
        ("<", Op::Lt),
        (">", Op::Gt),
    ];

    fn holds(self, ord: Option<Ordering>) -> bool {
        match (self, ord) {
            (Op::Ne, None) => true,
            (_, None) => false,
            (Op::Lt, Some(o)) => o == Ordering::Less,
            (Op::Le, Some(o)) => o != Ordering::Greater,
            (Op::Gt, Some(o)) => o == Ordering::Greater,
            (Op::Ge, Some(o)) => o != Ordering::Less,
            (Op::Eq, Some(o)) => o == Ordering::Equal,
            (Op::Ne, Some(o)) => o != Ordering::Equal,
        }
    }
}

/// A conjunction of `op operand` terms such as `>= 3 and < 10`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparison {
    expression: String,
    terms: Vec<(Op, String)>,
}

impl Comparison {
    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn terms(&self) -> &[(Op, String)] {
        &self.terms
    }
}

impl FromStr for Comparison {
    type Err = TabError;

    fn from_str(expression: &str) -> Result<Self> {
        let invalid = |reason: &str| TabError::InvalidComparison {
            expression: expression.to_string(),
            reason: reason.to_string(),
        };
        let mut parts: Vec<Vec<&str>> = vec![Vec::new()];
        for word in expression.split_whitespace() {
            if word.eq_ignore_ascii_case("and") {
                parts.push(Vec::new());
            } else if let Some(current) = parts.last_mut() {
                current.push(word);
            }
        }
        let mut terms = Vec::new();
        for words in parts {
            let part = words.join(" ");
            let part = part.as_str();
            let (op, rest) = Op::SYMBOLS
                .iter()
                .find_map(|(sym, op)| part.strip_prefix(*sym).map(|rest| (*op, rest)))
                .ok_or_else(|| invalid(&format!("term '{part}' does not start with <, <=, >, >=, == or !=")))?;
            let operand = rest.trim();
            if operand.is_empty() {
                return Err(invalid(&format!("term '{part}' has no operand")));
            }
            terms.push((op, operand.to_string()));
        }
        if terms.is_empty() {
            return Err(invalid("no terms"));
        }
        Ok(Self {
            expression: expression.to_string(),
            terms,
        })
    }
}

/// A column chosen by name, header position or name pattern.
#[derive(Debug, Clone)]
pub enum ColumnSelect {
    Name(String),
    Index(usize),
    Pattern(Regex),
}

impl From<&str> for ColumnSelect {
    fn from(name: &str) -> Self {
        ColumnSelect::Name(name.to_string())
    }
}

impl From<String> for ColumnSelect {
    fn from(name: String) -> Self {
        ColumnSelect::Name(name)
    }
}

impl From<usize> for ColumnSelect {
    fn from(index: usize) -> Self {
        ColumnSelect::Index(index)
    }
}

impl From<Regex> for ColumnSelect {
    fn from(pattern: Regex) -> Self {
        ColumnSelect::Pattern(pattern)
    }
}

/// Declared tabs and column selection for one header.
#[derive(Debug, Clone, Default)]
pub struct Tabulator {
    names: Vec<String>,
    tabs: Vec<(usize, Tab)>,
    columns: Option<Vec<usize>>,
}

impl Tabulator {
    pub fn new(header: &Header) -> Self {
        Self {
            names: header.names.clone(),
            tabs: Vec::new(),
            columns: None,
        }
    }

    fn resolve(&self, name: &str) -> Result<usize> {
        self.names
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| TabError::UnknownColumn {
                name: name.to_string(),
                available: self.names.clone(),
            })
    }

    /// Bind `tab` to `column`, replacing any tab already bound there.
    ///
    /// # Errors
    /// [`TabError::UnknownColumn`] when `column` is not in the header.
    pub fn tab(&mut self, column: &str, tab: Tab) -> Result<()> {
        let idx = self.resolve(column)?;
        self.insert(idx, tab);
        Ok(())
    }

    /// Bind several tabs at once. Nothing is bound if any column is unknown.
    ///
    /// # Errors
    /// [`TabError::UnknownColumn`] for the first unknown column.
    pub fn tab_all<S: AsRef<str>>(&mut self, tabs: impl IntoIterator<Item = (S, Tab)>) -> Result<()> {
        let resolved = tabs
            .into_iter()
            .map(|(name, tab)| self.resolve(name.as_ref()).map(|i| (i, tab)))
            .collect::<Result<Vec<_>>>()?;
        for (idx, tab) in resolved {
            self.insert(idx, tab);
        }
        Ok(())
    }

    fn insert(&mut self, idx: usize, tab: Tab) {
        match self.tabs.iter_mut().find(|(i, _)| *i == idx) {
            Some(slot) => slot.1 = tab,
            None => {
                self.tabs.push((idx, tab));
                self.tabs.sort_by_key(|(i, _)| *i);
            }
        }
    }

    /// Restrict emitted rows to the chosen columns, kept in header order.
    ///
    /// # Errors
    /// [`TabError::UnknownColumn`] for unknown names or out-of-range indices.
    pub fn select(&mut self, columns: impl IntoIterator<Item = ColumnSelect>) -> Result<()> {
        let mut picked = Vec::new();
        for column in columns {
            match column {
                ColumnSelect::Name(name) => picked.push(self.resolve(&name)?),
                ColumnSelect::Index(i) if i < self.names.len() => picked.push(i),
                ColumnSelect::Index(i) => {
                    return Err(TabError::UnknownColumn {
                        name: format!("#{i}"),
                        available: self.names.clone(),
                    });
                }
                ColumnSelect::Pattern(re) => {
                    let before = picked.len();
                    picked.extend(
                        self.names
                            .iter()
                            .enumerate()
                            .filter(|(_, n)| re.is_match(n))
                            .map(|(i, _)| i),
                    );
                    if picked.len() == before {
                        return Err(TabError::UnknownColumn {
                            name: format!("/{}/", re.as_str()),
                            available: self.names.clone(),
                        });
                    }
                }
            }
        }
        picked.sort_unstable();
        picked.dedup();
        self.columns = Some(picked);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.tabs.clear();
        self.columns = None;
    }

    pub fn clear_tabs(&mut self) {
        self.tabs.clear();
    }

    pub fn clear_columns(&mut self) {
        self.columns = None;
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn tabs(&self) -> impl Iterator<Item = (&str, &Tab)> {
        self.tabs.iter().map(|(i, t)| (self.names[*i].as_str(), t))
    }

    pub fn columns(&self) -> Option<Vec<&str>> {
        self.columns
            .as_ref()
            .map(|cols| cols.iter().map(|&i| self.names[i].as_str()).collect())
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty() && self.columns.is_none()
    }

    /// Cast operands to the column types and fix the projection.
    pub(crate) fn compile(&self, types: &ColumnTypes, formats: &Formats) -> Compiled {
        let operand = |idx: usize, raw: &str| -> CellValue {
            let ty = types.types.get(idx).copied().unwrap_or(CellType::Str);
            if types.is_mixed(idx) {
                return parsing::convert(raw, formats);
            }
            parsing::cast(raw, ty, formats).unwrap_or_else(|failure| {
                log::warn!("tab operand on '{}': {failure}; comparing as text", self.names[idx]);
                CellValue::Str(raw.to_string())
            })
        };
        let filters = self
            .tabs
            .iter()
            .map(|(idx, tab)| {
                let filter = match tab {
                    Tab::Equality(v) => Filter::Equality(operand(*idx, v)),
                    Tab::Membership(vs) => Filter::Membership(vs.iter().map(|v| operand(*idx, v)).collect()),
                    Tab::Comparison(c) => Filter::Comparison(
                        c.terms.iter().map(|(op, v)| (*op, operand(*idx, v))).collect(),
                    ),
                    Tab::Regex(re) => Filter::Regex(re.clone()),
                    Tab::Calling(f) => Filter::Calling(Arc::clone(f)),
                };
                (*idx, filter)
            })
            .collect();
        let projection = self.columns.as_ref().map(|cols| {
            let names: Arc<[String]> = cols.iter().map(|&i| self.names[i].clone()).collect();
            (names, cols.clone())
        });
        Compiled { filters, projection }
    }
}

enum Filter {
    Equality(CellValue),
    Membership(Vec<CellValue>),
    Comparison(Vec<(Op, CellValue)>),
    Regex(Regex),
    Calling(Predicate),
}

/// Tabs ready to run against rows of one read.
pub(crate) struct Compiled {
    filters: Vec<(usize, Filter)>,
    projection: Option<(Arc<[String]>, Vec<usize>)>,
}

impl Compiled {
    /// True when every filter accepts the row. A missing cell fails its filter.
    pub(crate) fn accepts(&self, raw: &[String], row: &Row) -> bool {
        self.filters.iter().all(|(idx, filter)| {
            let Some(value) = row.get_index(*idx) else {
                return false;
            };
            match filter {
                Filter::Equality(v) => value == v,
                Filter::Membership(vs) => vs.iter().any(|v| value == v),
                Filter::Comparison(terms) => terms.iter().all(|(op, v)| op.holds(value.partial_cmp(v))),
                Filter::Regex(re) => raw.get(*idx).is_some_and(|cell| re.is_match(cell)),
                Filter::Calling(f) => f(value, row),
            }
        })
    }

    pub(crate) fn project(&self, row: Row) -> Row {
        match &self.projection {
            Some((names, indices)) => row.project(names, indices),
            None => row,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> Header {
        Header::new(None, &["id", "name", "score"], None)
    }

    fn row(id: i64, name: &str, score: f64) -> (Vec<String>, Row) {
        let raw = vec![id.to_string(), name.to_string(), score.to_string()];
        let row = Row::from_pairs(
            0,
            [
                ("id", CellValue::Int(id)),
                ("name", CellValue::from(name)),
                ("score", CellValue::Float(score)),
            ],
        );
        (raw, row)
    }

    fn types() -> ColumnTypes {
        ColumnTypes {
            types: vec![CellType::Int, CellType::Str, CellType::Float],
            consistent: true,
            mixed: vec![false; 3],
        }
    }

    #[test]
    fn parses_chained_comparison() {
        let c: Comparison = ">= 3 and < 10".parse().unwrap();
        assert_eq!(c.terms(), &[(Op::Ge, "3".to_string()), (Op::Lt, "10".to_string())]);
    }

    #[test]
    fn rejects_bad_comparison() {
        assert!(matches!(Tab::compare("3 <"), Err(TabError::InvalidComparison { .. })));
        assert!(matches!(Tab::compare(">="), Err(TabError::InvalidComparison { .. })));
    }

    #[test]
    fn unknown_column_is_rejected_and_batch_is_atomic() {
        let mut t = Tabulator::new(&header());
        let err = t.tab_all([("id", Tab::equal("1")), ("nope", Tab::equal("x"))]);
        assert!(matches!(err, Err(TabError::UnknownColumn { .. })));
        assert!(t.is_empty());
    }

    #[test]
    fn last_tab_on_a_column_wins() {
        let mut t = Tabulator::new(&header());
        t.tab("id", Tab::equal("1")).unwrap();
        t.tab("id", Tab::equal("2")).unwrap();
        let compiled = t.compile(&types(), &Formats::standard());
        let (raw, r) = row(2, "b", 1.0);
        assert!(compiled.accepts(&raw, &r));
        assert_eq!(t.tabs().count(), 1);
    }

    #[test]
    fn operands_are_cast_to_column_type() {
        let mut t = Tabulator::new(&header());
        t.tab("score", Tab::compare("> 2 and <= 4.5").unwrap()).unwrap();
        let compiled = t.compile(&types(), &Formats::standard());
        let (raw, hit) = row(1, "a", 4.5);
        let (raw2, miss) = row(1, "a", 2.0);
        assert!(compiled.accepts(&raw, &hit));
        assert!(!compiled.accepts(&raw2, &miss));
    }

    #[test]
    fn regex_sees_raw_text_and_calling_sees_row() {
        let mut t = Tabulator::new(&header());
        t.tab("name", Tab::regex("^a").unwrap()).unwrap();
        t.tab(
            "id",
            Tab::calling(|v, row| v.as_i64() == Some(1) && row.get("score").is_some()),
        )
        .unwrap();
        let compiled = t.compile(&types(), &Formats::standard());
        let (raw, r) = row(1, "alpha", 0.5);
        assert!(compiled.accepts(&raw, &r));
        let (raw, r) = row(1, "beta", 0.5);
        assert!(!compiled.accepts(&raw, &r));
    }

    #[test]
    fn selection_keeps_header_order() {
        let mut t = Tabulator::new(&header());
        t.select([ColumnSelect::from("score"), ColumnSelect::from(0usize)]).unwrap();
        assert_eq!(t.columns(), Some(vec!["id", "score"]));
        t.select([ColumnSelect::Pattern(Regex::new("^n").unwrap())]).unwrap();
        assert_eq!(t.columns(), Some(vec!["name"]));
    }
}

//! Rows produced by a read: header names mapped to typed cells, in header order.

use crate::parsing::CellValue;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::sync::Arc;

/// One emitted row.
///
/// Names are shared between every row of a read. A ragged row that is short
/// of cells simply lacks the trailing names.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    line: usize,
    names: Arc<[String]>,
    values: Vec<Option<CellValue>>,
}

impl Row {
    pub fn new(line: usize, names: Arc<[String]>, values: Vec<Option<CellValue>>) -> Self {
        Self {
            line,
            names,
            values,
        }
    }

    /// Build a row from explicit pairs, numbering it `line`.
    pub fn from_pairs<K, V>(line: usize, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<CellValue>,
    {
        let (names, values): (Vec<String>, Vec<Option<CellValue>>) = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), Some(v.into())))
            .unzip();
        Self::new(line, names.into(), values)
    }

    /// Zero-based source line the row was read from.
    pub fn line(&self) -> usize {
        self.line
    }

    pub fn get(&self, name: &str) -> Option<&CellValue> {
        let i = self.names.iter().position(|n| n == name)?;
        self.get_index(i)
    }

    /// Cell at header position `i`.
    pub fn get_index(&self, i: usize) -> Option<&CellValue> {
        self.values.get(i).and_then(Option::as_ref)
    }

    /// Number of cells present.
    pub fn len(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.iter().map(|(n, _)| n)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CellValue)> {
        self.names
            .iter()
            .zip(&self.values)
            .filter_map(|(n, v)| v.as_ref().map(|v| (n.as_str(), v)))
    }

    /// Keep only the cells at `indices`, which must be ascending header positions.
    pub(crate) fn project(self, names: &Arc<[String]>, indices: &[usize]) -> Self {
        let mut values = self.values;
        let kept = indices
            .iter()
            .map(|&i| values.get_mut(i).and_then(Option::take))
            .collect();
        Self::new(self.line, Arc::clone(names), kept)
    }

    pub fn into_pairs(self) -> Vec<(String, CellValue)> {
        self.names
            .iter()
            .zip(self.values)
            .filter_map(|(n, v)| v.map(|v| (n.clone(), v)))
            .collect()
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_rows_lack_trailing_names() {
        let names: Arc<[String]> = vec!["a".to_string(), "b".to_string(), "c".to_string()].into();
        let row = Row::new(3, names, vec![Some(CellValue::Int(1)), Some(CellValue::from("x")), None]);
        assert_eq!(row.len(), 2);
        assert_eq!(row.names().collect::<Vec<_>>(), vec!["a", "b"]);
        assert!(row.get("c").is_none());
    }

    #[test]
    fn serializes_in_header_order() {
        let row = Row::from_pairs(0, [("z", CellValue::Int(1)), ("a", CellValue::from("q"))]);
        assert_eq!(serde_json::to_string(&row).unwrap(), r#"{"z":1,"a":"q"}"#);
    }

    #[test]
    fn projection_keeps_selected_cells() {
        let row = Row::from_pairs(
            0,
            [("a", CellValue::Int(1)), ("b", CellValue::Int(2)), ("c", CellValue::Int(3))],
        );
        let names: Arc<[String]> = vec!["a".to_string(), "c".to_string()].into();
        let projected = row.project(&names, &[0, 2]);
        assert_eq!(projected.get("c"), Some(&CellValue::Int(3)));
        assert_eq!(projected.len(), 2);
    }
}

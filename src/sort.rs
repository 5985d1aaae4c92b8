//! Sort engine: derives a row permutation from one column and applies it.
//!
//! Values are compared as integers, parsed leniently from the front of the
//! text. Anything without a leading integer compares greater than every
//! number, so it ends up at the bottom of an ascending sort. When sorting
//! would not move a single row the order is reversed instead, which makes a
//! repeated sort request on the same column toggle its direction.

use tracing::trace;

use crate::container::RawValue;
use crate::domain::TableError;
use crate::model::Cell;

/// Comparison key of a single cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SortKey {
    Value(i64),
    Unparsable,
}

/// Original row indices in their new order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Permutation(Vec<usize>);

impl Permutation {
    pub fn identity(len: usize) -> Self {
        Self((0..len).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &usize> {
        self.0.iter()
    }

    /// Number of positions that receive a different row than they hold now.
    pub fn changed_count(&self) -> usize {
        self.0
            .iter()
            .enumerate()
            .filter(|(pos, idx)| pos != *idx)
            .count()
    }

    pub fn reversed(&self) -> Self {
        Self(self.0.iter().rev().copied().collect())
    }

    pub fn is_valid_for(&self, len: usize) -> bool {
        self.validate(len).is_ok()
    }

    /// Checks that this is a bijection on `0..len`.
    pub fn validate(&self, len: usize) -> Result<(), TableError> {
        if self.0.len() != len {
            return Err(TableError::InvalidPermutation(format!(
                "{} entries for {} rows",
                self.0.len(),
                len
            )));
        }
        let mut seen = vec![false; len];
        for &idx in &self.0 {
            if idx >= len {
                return Err(TableError::InvalidPermutation(format!(
                    "index {idx} out of range for {len} rows"
                )));
            }
            if std::mem::replace(&mut seen[idx], true) {
                return Err(TableError::InvalidPermutation(format!(
                    "index {idx} appears twice"
                )));
            }
        }
        Ok(())
    }
}

impl From<Vec<usize>> for Permutation {
    fn from(order: Vec<usize>) -> Self {
        Self(order)
    }
}

impl From<Permutation> for Vec<usize> {
    fn from(order: Permutation) -> Self {
        order.0
    }
}

/// Parses the leading integer of `text`: optional whitespace, optional sign,
/// then digits. Saturates at the bounds of `i64`.
fn leading_int(text: &str) -> Option<i64> {
    let text = text.trim_start();
    let sign_len = match text.as_bytes().first() {
        Some(b'-') | Some(b'+') => 1,
        _ => 0,
    };
    let digits = text[sign_len..]
        .bytes()
        .take_while(u8::is_ascii_digit)
        .count();
    if digits == 0 {
        return None;
    }
    let number = &text[..sign_len + digits];
    Some(number.parse::<i64>().unwrap_or(if number.starts_with('-') {
        i64::MIN
    } else {
        i64::MAX
    }))
}

pub fn parse_int(raw: &RawValue) -> Option<i64> {
    match raw {
        RawValue::Text(s) => leading_int(s),
        RawValue::Number(n) => n
            .as_i64()
            .or_else(|| n.as_u64().map(|_| i64::MAX))
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        RawValue::Absent => None,
    }
}

pub fn sort_key(cell: &Cell) -> SortKey {
    parse_int(cell.raw()).map_or(SortKey::Unparsable, SortKey::Value)
}

pub fn sort_keys(cells: &[Cell]) -> Vec<SortKey> {
    cells.iter().map(sort_key).collect()
}

/// Computes the order that sorts `cells` ascending. Equal keys keep their
/// relative order. If the cells are already in that order and
/// `allow_reverse_on_no_change` is set, the reversed order is returned.
pub fn compute_order(cells: &[Cell], allow_reverse_on_no_change: bool) -> Permutation {
    let keys = sort_keys(cells);
    let mut sorted: Vec<usize> = (0..keys.len()).collect();
    sorted.sort_by_key(|&idx| (keys[idx], idx));

    let mut order = Permutation(sorted);
    let changed = order.changed_count();
    trace!("Sort order moves {changed} of {} rows", order.len());
    if changed == 0 && allow_reverse_on_no_change {
        trace!("Nothing changed, reversing order");
        order = order.reversed();
    }
    order
}

/// Returns the entries of `items` rearranged so that position `new` holds the
/// entry that was at `order[new]`.
pub fn apply_order<T: Clone>(items: &[T], order: &Permutation) -> Result<Vec<T>, TableError> {
    order.validate(items.len())?;
    Ok(order.iter().map(|&old| items[old].clone()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn cells(values: &[&str]) -> Vec<Cell> {
        values.iter().map(|&v| Cell::from(v)).collect()
    }

    fn texts(cells: &[Cell]) -> Vec<&str> {
        cells.iter().map(Cell::display).collect()
    }

    #[test]
    fn leading_int_is_lenient() {
        assert_eq!(leading_int("42"), Some(42));
        assert_eq!(leading_int("  -7 units"), Some(-7));
        assert_eq!(leading_int("+3"), Some(3));
        assert_eq!(leading_int("12.9"), Some(12));
        assert_eq!(leading_int("12abc"), Some(12));
        assert_eq!(leading_int("abc"), None);
        assert_eq!(leading_int("-"), None);
        assert_eq!(leading_int(""), None);
        assert_eq!(leading_int("99999999999999999999"), Some(i64::MAX));
        assert_eq!(leading_int("-99999999999999999999"), Some(i64::MIN));
    }

    #[test]
    fn numbers_are_truncated() {
        let raw = RawValue::Number(serde_json::Number::from_f64(-2.7).unwrap());
        assert_eq!(parse_int(&raw), Some(-2));
        assert_eq!(parse_int(&RawValue::from(15_i64)), Some(15));
        assert_eq!(parse_int(&RawValue::Absent), None);
    }

    #[test]
    fn unparsable_sorts_after_any_number() {
        assert!(SortKey::Value(i64::MAX) < SortKey::Unparsable);
    }

    #[test]
    fn non_numeric_values_sink_to_the_end() {
        let order = compute_order(&cells(&["10", "abc", "2"]), true);
        assert_eq!(order.as_slice(), &[2, 0, 1]);
    }

    #[test]
    fn absent_values_sink_to_the_end() {
        let column = vec![Cell::from(RawValue::Absent), Cell::from("5"), Cell::from("1")];
        assert_eq!(compute_order(&column, true).as_slice(), &[2, 1, 0]);
    }

    #[test]
    fn equal_values_keep_their_relative_order() {
        let order = compute_order(&cells(&["3", "1", "3", "1", "x", "y"]), true);
        assert_eq!(order.as_slice(), &[1, 3, 0, 2, 4, 5]);
    }

    #[test]
    fn sorted_column_without_reverse_is_unchanged() {
        let column = cells(&["1", "2", "2", "9"]);
        let order = compute_order(&column, false);
        assert_eq!(order.changed_count(), 0);
        assert_eq!(order, Permutation::identity(4));
    }

    #[test]
    fn sorted_column_with_reverse_flips() {
        let column = cells(&["1", "2", "9"]);
        let order = compute_order(&column, true);
        assert_eq!(order.as_slice(), &[2, 1, 0]);
    }

    #[test]
    fn toggling_alternates_direction() {
        let column = cells(&["5", "1", "3"]);
        let first = compute_order(&column, true);
        let ascending = apply_order(&column, &first).unwrap();
        assert_eq!(texts(&ascending), vec!["1", "3", "5"]);

        let second = compute_order(&ascending, true);
        let descending = apply_order(&ascending, &second).unwrap();
        assert_eq!(texts(&descending), vec!["5", "3", "1"]);

        let third = compute_order(&descending, true);
        let again = apply_order(&descending, &third).unwrap();
        assert_eq!(texts(&again), vec!["1", "3", "5"]);
    }

    #[test]
    fn tie_heavy_column_is_not_reversed_when_something_moves() {
        let column = cells(&["1", "1", "1", "0"]);
        let order = compute_order(&column, true);
        assert_eq!(order.as_slice(), &[3, 0, 1, 2]);
    }

    #[test]
    fn all_ties_reverse_when_allowed() {
        let column = cells(&["4", "4", "4"]);
        assert_eq!(compute_order(&column, true).as_slice(), &[2, 1, 0]);
        assert_eq!(compute_order(&column, false), Permutation::identity(3));
    }

    #[test]
    fn empty_column_gives_empty_order() {
        let order = compute_order(&[], true);
        assert!(order.is_empty());
        assert_eq!(apply_order::<Cell>(&[], &order).unwrap(), vec![]);
    }

    #[test]
    fn apply_order_places_original_rows() {
        let column = cells(&["a", "b", "c"]);
        let applied = apply_order(&column, &Permutation::from(vec![2, 0, 1])).unwrap();
        assert_eq!(texts(&applied), vec!["c", "a", "b"]);
    }

    #[test]
    fn apply_order_rejects_length_mismatch() {
        let column = cells(&["a", "b", "c"]);
        let err = apply_order(&column, &Permutation::from(vec![0, 1])).unwrap_err();
        assert!(matches!(err, TableError::InvalidPermutation(_)));
    }

    #[test]
    fn apply_order_rejects_duplicates_and_out_of_range() {
        let column = cells(&["a", "b", "c"]);
        for bad in [vec![0, 0, 1], vec![0, 1, 3]] {
            let err = apply_order(&column, &Permutation::from(bad)).unwrap_err();
            assert!(matches!(err, TableError::InvalidPermutation(_)));
        }
    }

    fn raw_value() -> impl Strategy<Value = RawValue> {
        prop_oneof![
            any::<i64>().prop_map(RawValue::from),
            "[a-z0-9 -]{0,5}".prop_map(RawValue::from),
            Just(RawValue::Absent),
        ]
    }

    proptest! {
        #[test]
        fn computed_order_is_a_permutation(
            values in prop::collection::vec(raw_value(), 0..40),
            allow_reverse in any::<bool>(),
        ) {
            let column: Vec<Cell> = values.into_iter().map(Cell::from).collect();
            let order = compute_order(&column, allow_reverse);
            prop_assert!(order.is_valid_for(column.len()));
        }

        #[test]
        fn applied_order_is_ascending_and_keeps_cells(
            values in prop::collection::vec(raw_value(), 0..40),
        ) {
            let column: Vec<Cell> = values.into_iter().map(Cell::from).collect();
            let order = compute_order(&column, false);
            let sorted = apply_order(&column, &order).unwrap();

            let keys = sort_keys(&sorted);
            prop_assert!(keys.windows(2).all(|w| w[0] <= w[1]));

            let mut before: Vec<String> = column.iter().map(|c| c.display().to_string()).collect();
            let mut after: Vec<String> = sorted.iter().map(|c| c.display().to_string()).collect();
            before.sort();
            after.sort();
            prop_assert_eq!(before, after);
        }
    }
}

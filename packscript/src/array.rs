use std::fmt::Display;

/// Largest entry count emitted as one flat comparison chain. Longer arrays
/// are split in half until every leaf fits, keeping nesting under the
/// runtime's expression limits.
pub const SPLITTING_THRESHOLD: usize = 50;

/// Encodes array lookups as conditional expressions, since the target
/// runtime has no indexable storage.
///
/// Indices outside the encoded keys fall through to the last entry of
/// whichever leaf chain the comparisons select.
#[derive(Clone, Copy, Debug)]
pub struct ArrayEncoder {
    threshold: usize,
}
impl ArrayEncoder {
    pub fn new(threshold: usize) -> Self {
        ArrayEncoder {
            threshold: threshold.max(1),
        }
    }
    /// `values[index]` with keys `0..values.len()`.
    pub fn array_to_expression<T: Display>(&self, index: &str, values: &[T]) -> String {
        let entries: Vec<(i64, String)> = values
            .iter()
            .enumerate()
            .map(|(key, value)| (key as i64, value.to_string()))
            .collect();
        self.sorted_entries_to_expression(index, &entries)
    }
    /// Lookup over sparse integer keys. Duplicate keys keep their first value.
    pub fn entries_to_expression<T: Display>(&self, index: &str, entries: &[(i64, T)]) -> String {
        let mut entries: Vec<(i64, String)> = entries
            .iter()
            .map(|(key, value)| (*key, value.to_string()))
            .collect();
        entries.sort_by_key(|(key, _)| *key);
        entries.dedup_by_key(|(key, _)| *key);
        self.sorted_entries_to_expression(index, &entries)
    }
    /// `rows[outer][inner]`: each row is encoded on `inner` and the row
    /// expressions are then looked up on `outer`.
    pub fn array_2d_to_expression<T: Display>(
        &self,
        outer: &str,
        inner: &str,
        rows: &[Vec<T>],
    ) -> String {
        let rows: Vec<String> = rows
            .iter()
            .map(|row| format!("({})", self.array_to_expression(inner, row)))
            .collect();
        self.array_to_expression(outer, &rows)
    }
    fn sorted_entries_to_expression(&self, index: &str, entries: &[(i64, String)]) -> String {
        if entries.len() > self.threshold {
            let middle = entries.len() / 2;
            let (lower, upper) = entries.split_at(middle);
            return format!(
                "{index}<{}?({}):({})",
                upper[0].0,
                self.sorted_entries_to_expression(index, lower),
                self.sorted_entries_to_expression(index, upper)
            );
        }
        let Some(((_, last), chained)) = entries.split_last() else {
            return "0".to_string();
        };
        let mut expression = String::new();
        for (position, (key, value)) in chained.iter().enumerate() {
            if position > 0 {
                expression.push('(');
            }
            expression.push_str(&format!("{index}=={key}?{value}:"));
        }
        expression.push_str(last);
        expression.push_str(&")".repeat(chained.len().saturating_sub(1)));
        expression
    }
}
impl Default for ArrayEncoder {
    fn default() -> Self {
        ArrayEncoder::new(SPLITTING_THRESHOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::parse_expression;
    use crate::eval::Evaluator;

    fn evaluate_at(expression: &str, index: i64) -> f64 {
        let mut evaluator = Evaluator::new();
        evaluator.set_number("v.i", index as f64);
        evaluator
            .evaluate_source(expression)
            .unwrap()
            .as_number()
            .unwrap()
    }

    fn nesting_depth(expression: &str) -> usize {
        let mut depth = 0usize;
        let mut deepest = 0;
        for c in expression.chars() {
            match c {
                '(' => {
                    depth += 1;
                    deepest = deepest.max(depth);
                }
                ')' => depth -= 1,
                _ => {}
            }
        }
        deepest
    }

    #[test]
    fn flat_chain_shape() {
        let encoder = ArrayEncoder::default();
        assert_eq!(encoder.array_to_expression::<i32>("v.i", &[]), "0");
        assert_eq!(encoder.array_to_expression("v.i", &[7]), "7");
        assert_eq!(encoder.array_to_expression("v.i", &[7, 8]), "v.i==0?7:8");
        assert_eq!(
            encoder.array_to_expression("v.i", &[7, 8, 9, 10]),
            "v.i==0?7:(v.i==1?8:(v.i==2?9:10))"
        );
    }

    #[test]
    fn every_index_round_trips() {
        let encoder = ArrayEncoder::default();
        for size in 0..=500usize {
            let values: Vec<i64> = (0..size as i64).map(|i| i * 3 - 7).collect();
            let expression = parse_expression(&encoder.array_to_expression("v.i", &values)).unwrap();
            let mut evaluator = Evaluator::new();
            for (index, value) in values.iter().enumerate() {
                evaluator.set_number("v.i", index as f64);
                assert_eq!(
                    evaluator.evaluate(&expression).unwrap().as_number(),
                    Some(*value as f64),
                    "size {size} index {index}"
                );
            }
        }
    }

    #[test]
    fn splits_just_above_threshold() {
        let encoder = ArrayEncoder::default();
        let values = |size: usize| (0..size).collect::<Vec<_>>();
        assert!(!encoder.array_to_expression("v.i", &values(49)).contains('<'));
        assert!(!encoder.array_to_expression("v.i", &values(50)).contains('<'));
        let split = encoder.array_to_expression("v.i", &values(51));
        assert!(split.starts_with("v.i<25?("));
        assert_eq!(split.matches('<').count(), 1);
    }

    #[test]
    fn depth_grows_logarithmically() {
        let encoder = ArrayEncoder::default();
        let flat_depth = nesting_depth(&encoder.array_to_expression("v.i", &(0..50).collect::<Vec<_>>()));
        assert_eq!(flat_depth, 48);
        for (size, levels) in [(100usize, 1usize), (200, 2), (400, 3), (800, 4), (1600, 5)] {
            let expression = encoder.array_to_expression("v.i", &(0..size).collect::<Vec<_>>());
            assert_eq!(expression.matches('<').count(), (1 << levels) - 1, "size {size}");
            assert!(nesting_depth(&expression) <= flat_depth + levels);
        }
    }

    #[test]
    fn out_of_domain_falls_through_to_leaf_tail() {
        let encoder = ArrayEncoder::default();
        let expression = encoder.array_to_expression("v.i", &[10, 20, 30]);
        assert_eq!(evaluate_at(&expression, 3), 30.0);
        assert_eq!(evaluate_at(&expression, -1), 30.0);
        let values: Vec<i64> = (0..100).collect();
        let expression = encoder.array_to_expression("v.i", &values);
        // negative indices take the lower half, large ones the upper half
        assert_eq!(evaluate_at(&expression, -5), 49.0);
        assert_eq!(evaluate_at(&expression, 1000), 99.0);
    }

    #[test]
    fn sparse_entries_and_rows() {
        let encoder = ArrayEncoder::new(2);
        let expression = encoder.entries_to_expression("v.i", &[(9, 3), (2, 1), (5, 2)]);
        assert_eq!(expression, "v.i<5?(1):(v.i==5?2:3)");
        assert_eq!(evaluate_at(&expression, 2), 1.0);
        assert_eq!(evaluate_at(&expression, 5), 2.0);
        assert_eq!(evaluate_at(&expression, 9), 3.0);

        let rows = vec![vec![1, 2], vec![3, 4, 5]];
        let expression = ArrayEncoder::default().array_2d_to_expression("v.r", "v.c", &rows);
        for (row, values) in rows.iter().enumerate() {
            for (column, value) in values.iter().enumerate() {
                let mut evaluator = Evaluator::new();
                evaluator.set_number("v.r", row as f64);
                evaluator.set_number("v.c", column as f64);
                let result = evaluator.evaluate_source(&expression).unwrap();
                assert_eq!(result.as_number(), Some(*value as f64));
            }
        }
    }
}

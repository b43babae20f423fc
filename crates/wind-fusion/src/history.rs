//! Bounded history of past wind fields.

use std::collections::VecDeque;

use wind_common::WindField;

/// Fixed-capacity ring of fields, oldest evicted first.
#[derive(Debug, Clone)]
pub struct FieldHistory {
    entries: VecDeque<WindField>,
    capacity: usize,
}

impl FieldHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a field, evicting the oldest entry when full.
    pub fn push(&mut self, field: WindField) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(field);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Most recently pushed field.
    pub fn latest(&self) -> Option<&WindField> {
        self.entries.back()
    }

    /// Fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &WindField> {
        self.entries.iter()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use wind_common::{BoundingBox, GridSpec};

    fn field(minute: i64) -> WindField {
        let grid = GridSpec::square(BoundingBox::default(), 2);
        WindField::uniform(&grid, Utc::now() + Duration::minutes(minute), 0.0, 1.0, 1.0)
    }

    #[test]
    fn test_evicts_oldest() {
        let mut history = FieldHistory::new(3);
        let fields: Vec<WindField> = (0..5).map(field).collect();
        for f in &fields {
            history.push(f.clone());
        }
        assert_eq!(history.len(), 3);
        let kept: Vec<_> = history.iter().map(|f| f.time).collect();
        assert_eq!(kept, vec![fields[2].time, fields[3].time, fields[4].time]);
        assert_eq!(history.latest().map(|f| f.time), Some(fields[4].time));
    }

    #[test]
    fn test_zero_capacity_holds_one() {
        let mut history = FieldHistory::new(0);
        history.push(field(0));
        history.push(field(1));
        assert_eq!(history.capacity(), 1);
        assert_eq!(history.len(), 1);
    }
}

//! Formula result cache with dependency tracking.

use std::collections::{HashMap, HashSet};

use super::{AreaEval, ValueEval};

/// Address of a cell in a workbook, sheets by index.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct CellId {
    pub sheet: usize,
    pub row: u16,
    pub col: u16,
}

impl CellId {
    pub fn new(sheet: usize, row: u16, col: u16) -> Self {
        Self { sheet, row, col }
    }
}

/// Cached formula results plus, for every cell that was read during an
/// evaluation, the formula cells that read it.
///
/// Areas are tracked as a whole as well, so a cell that gains a value
/// inside a range someone summed still reaches the reader.
#[derive(Debug, Default)]
pub(crate) struct EvaluationCache {
    values: HashMap<CellId, ValueEval>,
    dependents: HashMap<CellId, HashSet<CellId>>,
    area_readers: HashMap<AreaEval, HashSet<CellId>>,
}

impl EvaluationCache {
    pub fn get(&self, id: &CellId) -> Option<&ValueEval> {
        self.values.get(id)
    }

    pub fn insert(&mut self, id: CellId, value: ValueEval) {
        self.values.insert(id, value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Record that evaluating `dependent` read `precedent`.
    pub fn add_dependency(&mut self, precedent: CellId, dependent: CellId) {
        if precedent != dependent {
            self.dependents.entry(precedent).or_default().insert(dependent);
        }
    }

    /// Record that evaluating `dependent` read the whole of `area`.
    pub fn add_area_dependency(&mut self, area: AreaEval, dependent: CellId) {
        self.area_readers.entry(area).or_default().insert(dependent);
    }

    /// Drop the result of `id` and of every formula that depends on it,
    /// directly or through other formulas. Returns how many results were
    /// dropped.
    pub fn invalidate(&mut self, id: CellId) -> usize {
        let mut dropped = 0;
        let mut seen = HashSet::new();
        let mut pending = vec![id];
        while let Some(cell) = pending.pop() {
            if !seen.insert(cell) {
                continue;
            }
            if self.values.remove(&cell).is_some() {
                dropped += 1;
            }
            if let Some(dependents) = self.dependents.remove(&cell) {
                pending.extend(dependents);
            }
            let covering: Vec<AreaEval> = self
                .area_readers
                .keys()
                .filter(|area| area.contains(cell.sheet, cell.row, cell.col))
                .copied()
                .collect();
            for area in covering {
                if let Some(readers) = self.area_readers.remove(&area) {
                    pending.extend(readers);
                }
            }
        }
        dropped
    }

    pub fn invalidate_all(&mut self) {
        self.values.clear();
        self.dependents.clear();
        self.area_readers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalidation_follows_dependents() {
        let a1 = CellId::new(0, 0, 0);
        let b1 = CellId::new(0, 0, 1);
        let c1 = CellId::new(0, 0, 2);
        let d1 = CellId::new(0, 0, 3);

        let mut cache = EvaluationCache::default();
        cache.insert(b1, ValueEval::Number(1.0));
        cache.insert(c1, ValueEval::Number(2.0));
        cache.insert(d1, ValueEval::Number(3.0));
        // B1 reads A1, C1 reads B1. D1 is independent.
        cache.add_dependency(a1, b1);
        cache.add_dependency(b1, c1);

        assert_eq!(cache.invalidate(a1), 2);
        assert!(cache.get(&b1).is_none());
        assert!(cache.get(&c1).is_none());
        assert_eq!(cache.get(&d1), Some(&ValueEval::Number(3.0)));
    }

    #[test]
    fn test_area_readers_see_cells_never_read() {
        let a1 = CellId::new(0, 0, 0);
        let c1 = CellId::new(0, 0, 2);
        let mut cache = EvaluationCache::default();
        cache.insert(a1, ValueEval::Number(1.0));
        cache.insert(c1, ValueEval::Number(1.0));
        // A1 summed B1:B10 while only B1 had a value.
        cache.add_dependency(CellId::new(0, 0, 1), a1);
        cache.add_area_dependency(AreaEval::new(0, 0, 1, 9, 1), a1);

        assert_eq!(cache.invalidate(CellId::new(1, 4, 1)), 0);
        assert_eq!(cache.invalidate(CellId::new(0, 4, 1)), 1);
        assert!(cache.get(&a1).is_none());
        assert_eq!(cache.get(&c1), Some(&ValueEval::Number(1.0)));
    }

    #[test]
    fn test_cycles_terminate() {
        let a1 = CellId::new(0, 0, 0);
        let b1 = CellId::new(0, 0, 1);
        let mut cache = EvaluationCache::default();
        cache.insert(a1, ValueEval::Blank);
        cache.insert(b1, ValueEval::Blank);
        cache.add_dependency(a1, b1);
        cache.add_dependency(b1, a1);
        assert_eq!(cache.invalidate(a1), 2);
        assert_eq!(cache.len(), 0);
    }
}

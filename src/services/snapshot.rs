use std::collections::HashSet;

use super::record::{sort_newest_first, Record};

/// In-memory copy of a collection, kept newest-first.
///
/// `complete` is set once the whole collection has been loaded; until then
/// the snapshot only holds slices from filtered lists and own writes.
#[derive(Debug, Clone)]
pub struct Snapshot<R> {
    rows: Vec<R>,
    complete: bool,
}

impl<R> Default for Snapshot<R> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            complete: false,
        }
    }
}

impl<R: Record> Snapshot<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Replace everything with a full listing.
    pub fn replace(&mut self, mut rows: Vec<R>) {
        sort_newest_first(&mut rows);
        self.rows = rows;
        self.complete = true;
    }

    /// Replace the slice selected by `filter` with `rows`, leaving rows outside
    /// the filter alone. Returns the ids that were in the slice but are gone now.
    pub fn merge_slice(&mut self, filter: &R::Filter, rows: Vec<R>) -> Vec<i64> {
        let incoming: HashSet<i64> = rows.iter().map(Record::id).collect();
        let vanished: Vec<i64> = self
            .rows
            .iter()
            .filter(|r| r.matches(filter) && !incoming.contains(&r.id()))
            .map(Record::id)
            .collect();

        self.rows
            .retain(|r| !r.matches(filter) && !incoming.contains(&r.id()));
        self.rows.extend(rows);
        sort_newest_first(&mut self.rows);

        vanished
    }

    pub fn find(&self, id: i64) -> Option<&R> {
        self.rows.iter().find(|r| r.id() == id)
    }

    /// Put a freshly created record in front.
    pub fn prepend(&mut self, record: R) {
        self.rows.retain(|r| r.id() != record.id());
        self.rows.insert(0, record);
    }

    /// Replace the record with the same id in place, or prepend it.
    pub fn upsert(&mut self, record: R) {
        match self.rows.iter_mut().find(|r| r.id() == record.id()) {
            Some(slot) => *slot = record,
            None => self.rows.insert(0, record),
        }
    }

    pub fn remove(&mut self, id: i64) -> bool {
        let before = self.rows.len();
        self.rows.retain(|r| r.id() != id);
        self.rows.len() != before
    }

    /// Drop every record matching `pred`, returning their ids.
    pub fn remove_where(&mut self, pred: impl Fn(&R) -> bool) -> Vec<i64> {
        let removed: Vec<i64> = self
            .rows
            .iter()
            .filter(|r| pred(*r))
            .map(Record::id)
            .collect();
        self.rows.retain(|r| !pred(r));
        removed
    }

    pub fn max_id(&self) -> i64 {
        self.rows.iter().map(Record::id).max().unwrap_or(0)
    }

    pub fn filtered(&self, filter: &R::Filter) -> Vec<R> {
        self.rows
            .iter()
            .filter(|r| r.matches(filter))
            .cloned()
            .collect()
    }
}

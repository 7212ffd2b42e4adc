use chrono::Utc;

/// Issues ids for records created in local-only mode.
///
/// Ids are wall-clock milliseconds, bumped past the last id issued and past
/// any id already known to exist, so two creates in the same millisecond (or
/// a clock step backwards) never collide.
#[derive(Debug, Clone, Default)]
pub struct LocalIdGenerator {
    last: i64,
}

impl LocalIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next id strictly greater than both `floor` and every id issued so far.
    pub fn next(&mut self, floor: i64) -> i64 {
        let now = Utc::now().timestamp_millis();
        let id = now.max(self.last + 1).max(floor + 1);
        self.last = id;
        id
    }
}

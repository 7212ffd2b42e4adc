use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::{json, Value};

use super::normalize::{
    coerce_decimal, coerce_i64, coerce_string, coerce_timestamp, decimal_to_json, decode_events,
    encode_events, field, format_timestamp,
};
use crate::db::Collection;
use crate::models::{combined_coef, Bet, BetFilter, BetKind, BetStatus, Profile};
use crate::models::profile::{DEFAULT_PROFILE_COLOR, DEFAULT_PROFILE_ICON};
use crate::remote::Filters;

/// An entity the tracker persists in both backends.
///
/// The wire shape (`to_wire`/`from_wire`) is shared by the remote backend and
/// the local store, so one normalization path serves every read.
pub trait Record: Clone + fmt::Debug + Send + Sync + 'static {
    type Filter: Copy + Default + fmt::Debug + Send + Sync;

    const COLLECTION: Collection;

    /// Wire fields that must never be sent on update.
    const IMMUTABLE_FIELDS: &'static [&'static str];

    fn id(&self) -> i64;
    fn set_id(&mut self, id: i64);

    /// Creation time, used for newest-first ordering.
    fn timestamp(&self) -> DateTime<Utc>;

    fn to_wire(&self) -> Value;

    /// Normalize a stored or remote row. `None` only when the row has no
    /// usable id.
    fn from_wire(row: &Value) -> Option<Self>;

    fn matches(&self, filter: &Self::Filter) -> bool;
    fn remote_filters(filter: &Self::Filter) -> Filters;
    fn is_unfiltered(filter: &Self::Filter) -> bool;
}

/// Normalize many rows, dropping (and logging) the unusable ones.
pub fn normalize_rows<R: Record>(rows: Vec<Value>) -> Vec<R> {
    let total = rows.len();
    let records: Vec<R> = rows.iter().filter_map(R::from_wire).collect();
    if records.len() < total {
        tracing::warn!(
            collection = %R::COLLECTION,
            dropped = total - records.len(),
            "Dropped rows without a usable id"
        );
    }
    records
}

/// Newest first; ties broken by id so the order is stable across backends.
pub fn sort_newest_first<R: Record>(rows: &mut [R]) {
    rows.sort_by(|a, b| {
        b.timestamp()
            .cmp(&a.timestamp())
            .then_with(|| b.id().cmp(&a.id()))
    });
}

// ---------------------------------------------------------------------------
// Bet
// ---------------------------------------------------------------------------
//
// | wire field    | domain field | type            | default                      |
// |---------------|--------------|-----------------|------------------------------|
// | id            | id           | integer         | row dropped                  |
// | events        | events       | array / JSON    | empty                        |
// | total_coef    | total_coef   | decimal         | product of events, else 0    |
//   (the stored value is only read when there are no events)
// | amount        | amount       | decimal         | 0                            |
// | status        | status       | enum            | pending                      |
// | type          | kind         | enum            | derived from event count     |
// | profile_id    | profile_id   | integer or null | null                         |
// | date          | date         | timestamp       | created_at, else epoch       |
// | image         | image        | string or null  | null                         |

impl Record for Bet {
    type Filter = BetFilter;

    const COLLECTION: Collection = Collection::Bets;
    const IMMUTABLE_FIELDS: &'static [&'static str] = &["date", "created_at"];

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.date
    }

    fn to_wire(&self) -> Value {
        json!({
            "id": self.id,
            "events": encode_events(&self.events),
            "total_coef": decimal_to_json(self.total_coef),
            "amount": decimal_to_json(self.amount),
            "status": self.status.as_str(),
            "type": self.kind.as_str(),
            "profile_id": self.profile_id,
            "date": format_timestamp(&self.date),
            "image": self.image,
        })
    }

    fn from_wire(row: &Value) -> Option<Self> {
        let id = coerce_i64(field(row, &["id"]))?;
        let events = decode_events(field(row, &["events"]));

        // The stored total went through f64 on the wire; the product of the
        // legs is exact, so it wins whenever there are legs.
        let total_coef = Some(&events)
            .filter(|events| !events.is_empty())
            .and_then(|events| combined_coef(events))
            .or_else(|| coerce_decimal(field(row, &["total_coef", "totalCoef"])))
            .unwrap_or(Decimal::ZERO);

        let status = field(row, &["status"])
            .and_then(Value::as_str)
            .and_then(BetStatus::from_str)
            .unwrap_or_default();

        let kind = field(row, &["type", "kind"])
            .and_then(Value::as_str)
            .and_then(BetKind::from_str)
            .unwrap_or_else(|| BetKind::for_event_count(events.len()));

        Some(Bet {
            id,
            total_coef,
            amount: coerce_decimal(field(row, &["amount"])).unwrap_or(Decimal::ZERO),
            status,
            kind,
            profile_id: coerce_i64(field(row, &["profile_id", "profileId"])),
            date: coerce_timestamp(field(row, &["date", "created_at"])).unwrap_or_default(),
            image: coerce_string(field(row, &["image"])).filter(|s| !s.is_empty()),
            events,
        })
    }

    fn matches(&self, filter: &BetFilter) -> bool {
        filter.matches(self)
    }

    fn remote_filters(filter: &BetFilter) -> Filters {
        Filters::new()
            .eq("status", filter.status)
            .eq("profile_id", filter.profile)
    }

    fn is_unfiltered(filter: &BetFilter) -> bool {
        filter.is_unfiltered()
    }
}

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

impl Record for Profile {
    type Filter = ();

    const COLLECTION: Collection = Collection::Profiles;
    const IMMUTABLE_FIELDS: &'static [&'static str] = &["created_at"];

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn to_wire(&self) -> Value {
        json!({
            "id": self.id,
            "name": self.name,
            "description": self.description,
            "color": self.color,
            "icon": self.icon,
            "created_at": format_timestamp(&self.created_at),
        })
    }

    fn from_wire(row: &Value) -> Option<Self> {
        let id = coerce_i64(field(row, &["id"]))?;
        Some(Profile {
            id,
            name: coerce_string(field(row, &["name"])).unwrap_or_default(),
            description: coerce_string(field(row, &["description"])).unwrap_or_default(),
            color: coerce_string(field(row, &["color"]))
                .unwrap_or_else(|| DEFAULT_PROFILE_COLOR.into()),
            icon: coerce_string(field(row, &["icon"]))
                .unwrap_or_else(|| DEFAULT_PROFILE_ICON.into()),
            created_at: coerce_timestamp(field(row, &["created_at"])).unwrap_or_default(),
        })
    }

    fn matches(&self, _filter: &()) -> bool {
        true
    }

    fn remote_filters(_filter: &()) -> Filters {
        Filters::new()
    }

    fn is_unfiltered(_filter: &()) -> bool {
        true
    }
}

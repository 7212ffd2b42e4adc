use metrics::counter;

pub const REMOTE_FAILURES: &str = "remote_failures_total";
pub const CACHE_FALLBACKS: &str = "cache_fallbacks_total";
pub const MIRROR_WRITE_FAILURES: &str = "mirror_write_failures_total";

/// Register all tracker counters at zero so they appear before the first
/// increment. Installing a recorder is left to the embedding application;
/// without one every counter is a no-op.
pub fn register_metrics() {
    counter!(REMOTE_FAILURES, "op" => "list").absolute(0);
    counter!(REMOTE_FAILURES, "op" => "get").absolute(0);
    counter!(REMOTE_FAILURES, "op" => "write").absolute(0);
    counter!(CACHE_FALLBACKS, "collection" => "bets").absolute(0);
    counter!(CACHE_FALLBACKS, "collection" => "profiles").absolute(0);
    counter!(MIRROR_WRITE_FAILURES).absolute(0);
}

pub(crate) fn remote_failure(op: &'static str) {
    counter!(REMOTE_FAILURES, "op" => op).increment(1);
}

pub(crate) fn cache_fallback(collection: &'static str) {
    counter!(CACHE_FALLBACKS, "collection" => collection).increment(1);
}

pub(crate) fn mirror_write_failure() {
    counter!(MIRROR_WRITE_FAILURES).increment(1);
}

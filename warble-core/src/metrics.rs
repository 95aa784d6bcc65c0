// ABOUTME: Counter helpers for runtime observability.
// ABOUTME: Thin wrappers over the metrics crate; exporters are wired by the embedding binary.

/// Record a routed command invocation by name.
pub fn record_command(name: &str) {
    metrics::counter!("warble_commands_total", "command" => name.to_string()).increment(1);
}

/// Record a routing outcome (completed, not_found, rejected, failed).
pub fn record_route_outcome(outcome: &'static str) {
    metrics::counter!("warble_route_outcomes_total", "outcome" => outcome).increment(1);
}

/// Record a continuation lifecycle event (registered, resolved, expired).
pub fn record_continuation(event: &'static str) {
    metrics::counter!("warble_continuations_total", "event" => event).increment(1);
}

/// Record a presence transition (entered, left, moved).
pub fn record_presence(change: &'static str) {
    metrics::counter!("warble_presence_transitions_total", "change" => change).increment(1);
}

/// Record a dispatched gateway event by kind.
pub fn record_event(kind: &'static str) {
    metrics::counter!("warble_events_total", "kind" => kind).increment(1);
}

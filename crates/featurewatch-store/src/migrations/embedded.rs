//! Embedded SQL migrations, compiled into the binary via `include_str!`.

/// A single migration's identity and SQL body.
pub struct Migration {
    pub id: &'static str,
    pub sql: &'static str,
}

/// All embedded migrations, in application order.
pub fn get_migrations() -> Vec<Migration> {
    vec![Migration {
        id: "001_locks_and_events",
        sql: include_str!("../../migrations/001_locks_and_events.sql"),
    }]
}

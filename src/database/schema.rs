// Database schema definitions and migrations

pub const PENDING_MERGES_SCHEMA: &str = include_str!("../../migrations/001_pending_merges.sql");

//! SQL schema for the rollcall SQLite store.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    name           TEXT NOT NULL,
    email          TEXT NOT NULL UNIQUE,
    phone          TEXT,
    role           TEXT NOT NULL,   -- 'student' | 'teacher' | 'staff'
    guardian_phone TEXT,            -- only meaningful for students
    badge_number   TEXT UNIQUE,
    created_at     TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS attendance (
    id        INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id   INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    check_in  TEXT NOT NULL,        -- RFC 3339 UTC, millisecond precision
    check_out TEXT,
    status    TEXT NOT NULL         -- 'present' | 'late' | 'absent'
);

-- At most one open interval per person.
CREATE UNIQUE INDEX IF NOT EXISTS attendance_open_idx
    ON attendance(user_id) WHERE check_out IS NULL;
CREATE INDEX IF NOT EXISTS attendance_user_check_in_idx
    ON attendance(user_id, check_in);

-- Append-only audit of decided punches.
CREATE TABLE IF NOT EXISTS transaction_logs (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    emp_code   TEXT NOT NULL,
    punch_time TEXT NOT NULL,
    action     TEXT,                -- 'check-in' | 'check-out' | NULL
    status     TEXT NOT NULL,       -- 'success' | 'rejected'
    reason     TEXT,
    device_sn  TEXT NOT NULL DEFAULT 'unknown',
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS transaction_logs_emp_code_idx ON transaction_logs(emp_code);
CREATE INDEX IF NOT EXISTS transaction_logs_time_idx     ON transaction_logs(punch_time);

-- Newest row wins.
CREATE TABLE IF NOT EXISTS device_config (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    base_url   TEXT NOT NULL,
    username   TEXT NOT NULL,
    password   TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

PRAGMA user_version = 1;
";

//! # Brandkit
//!
//! `brandkit` is a single-tenant tracker for marketing brands and the work
//! that orbits them: tasks, photo/video shoots, and content-calendar items.
//! The whole application sits behind one shared master password.
//!
//! ## Access Model
//!
//! There are no user accounts. A single credential row gates everything:
//!
//! - **First run:** `/setup` creates the master password (strength-checked).
//! - **Login:** `/login` verifies the password, rate limited per source
//!   address (5 failed attempts per 15 minutes).
//! - **Sessions:** cookie-backed, server-side, expiring after 8 hours of
//!   inactivity. Every protected route passes through the session guard.
//!
//! ## Storage
//!
//! SQLite via `sqlx`. Login attempts are an append-only ledger used only by
//! the rate limiter; brands cascade-delete their tasks, shoots, and content
//! items.

pub mod api;
pub mod cli;

//! Domain services used by HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own business logic so route handlers can stay focused on
//! validation and protocol translation.

pub mod chat;
pub mod sweeper;

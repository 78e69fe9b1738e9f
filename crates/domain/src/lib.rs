//! `tether-domain`: configuration, errors and trace events shared by every
//! Tether crate.

pub mod config;
pub mod error;
pub mod trace;

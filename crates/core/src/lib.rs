//! Core engine for the inkview e-ink display service.
//!
//! Owns the configuration store, the content renderer and the sync
//! scheduler. The HTTP client and the panel hardware live behind seams in
//! their own crates ([`inkview_api`], [`inkview_panel`]).

pub mod config;
pub mod render;
pub mod sync;

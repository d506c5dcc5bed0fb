#![doc = "doc-sync-core: core logic library for doc-sync."]

//! This crate holds the change-list parsing, planning, translation and markdown
//! transformation logic for doc-sync. It has no network client of its own:
//! callers supply a [`contract::CompletionProvider`].
//!
//! # Usage
//! Parse a change-list with [`diff::DiffRecordParser`], then hand the resulting
//! [`diff::DiffSet`] to [`synchronise::synchronise`] together with a
//! [`config::SyncConfig`] and a provider.

pub mod config;
pub mod contract;
pub mod diff;
pub mod error;
pub mod gate;
pub mod persist;
pub mod plan;
pub mod synchronise;
pub mod transform;
pub mod translate;

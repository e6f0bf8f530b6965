//! Core types and rules for the Boukir commercial backend.
//!
//! This crate holds everything about stock reconciliation that does not touch a database:
//!
//! - **Identifiers**: `ProductId`, `VariantId`, `UnitId`, `DocumentId`, `UserId`
//! - **Line items**: `LineItem` with lenient numeric parsing of upstream form data
//! - **Deltas**: `DeltaKey`, `DeltaMap`, `Direction`
//! - **Documents**: `DocumentKind`, `Statut`, `Document`, `DocumentDraft`
//! - **Policy**: the per-kind `StockPolicy` table
//! - **Lifecycle**: which deltas a create/update/status change/delete produces
//! - **Access**: role rules for drivers, managers and the PDG
//!
//! # Stock effect of a document
//!
//! A document whose `statut` is `Annulé` never affects stock. Any other status applies its
//! items in the direction given by the kind's policy. Credit notes ("avoirs") add their
//! quantities back to stock while active.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod access;
pub mod delta;
pub mod document;
pub mod error;
pub mod ids;
pub mod item;
pub mod lenient;
pub mod lifecycle;
pub mod mouvement;
pub mod policy;

pub use access::{Actor, Role};
pub use delta::{DeltaKey, DeltaMap, Deltas, Direction, SnapshotDeltas, StockKey};
pub use document::{Document, DocumentDraft, DocumentHeader, DocumentKind, Statut};
pub use error::{CoreError, Result};
pub use ids::{DocumentId, IdError, ProductId, SnapshotId, UnitId, UserId, VariantId};
pub use item::LineItem;
pub use lifecycle::{StockEffect, Transition};
pub use mouvement::MouvementCalc;
pub use policy::{policy, StockColumn, StockPolicy};

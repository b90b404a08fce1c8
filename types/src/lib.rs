//! Relational model entities for quarry
//!
//! This crate holds the in-memory physical schema a mapping run produces:
//!
//! - [`Table`], [`Column`], [`Formula`] and [`Selectable`]
//! - Keys: [`PrimaryKey`], [`ForeignKey`], [`UniqueKey`], [`Index`]
//! - [`Database`], the arena that owns every table and hands out [`TableId`]s
//! - [`Identifier`], which carries quoting state from binding through DDL
//! - [`Dialect`], the narrow slice of SQL dialect behavior the model needs
//!
//! # Features
//!
//! - `serde` - Enable serde serialization/deserialization (enabled by default)

mod column;
mod constraint;
mod database;
mod dialect;
mod error;
mod identifier;
pub mod naming;
mod sql;
mod table;

pub use column::{Column, DEFAULT_LENGTH, Formula, Selectable};
pub use constraint::{CheckConstraint, ForeignKey, Index, PrimaryKey, ReferentialAction, UniqueKey};
pub use database::{Database, TableId};
pub use dialect::Dialect;
pub use error::{Result, TypesError};
pub use identifier::{Identifier, QuotedIdentifierTarget};
pub use table::Table;

/// Prelude module for commonly used types
pub mod prelude {
    pub use crate::{
        Column, Database, Dialect, ForeignKey, Formula, Identifier, PrimaryKey, Selectable, Table,
        TableId,
    };
}

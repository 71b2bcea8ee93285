//! Nexus OGM - Object-Graph Mapping over Cypher results
//!
//! This crate turns the rows of a Cypher query into domain objects:
//! - Class registry mapping label sets and relationship types to classes
//! - Identity-preserving hydration (one instance per store id per result)
//! - Relationship wiring into declared fields, including relationship entities
//! - Generic node/relationship models for anything unregistered
//! - Scalar coercion with lossless widening and typed errors
//! - Cardinality checks for single-object requests
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                 Session                      │
//! │   (read/write classification, statistics)   │
//! └──────────────┬──────────────────────────────┘
//!                │ StatementRequest / RawResult
//! ┌──────────────┴──────────────────────────────┐
//! │            QueryExecutor (seam)              │
//! └──────────────┬──────────────────────────────┘
//!                │ wire rows (JSON)
//! ┌──────────────┴──────────────────────────────┐
//! │       Codec → Hydrator → Projection          │
//! │  (decode, materialize, wire, coerce, map)   │
//! └──────────────┬──────────────────────────────┘
//!                │
//! ┌──────────────┴──────────────────────────────┐
//! │      QueryResult / Mapped<T> (lazy)          │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use nexus_ogm::testing::ScriptedExecutor;
//! use nexus_ogm::{domain_class, ClassInfo, DomainClass, MetaData, Parameters, SessionFactory};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! domain_class! {
//!     pub struct User => "cineasts::User";
//! }
//!
//! # fn main() {
//! # let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
//! # rt.block_on(async {
//! let metadata = MetaData::builder()
//!     .register(ClassInfo::node("cineasts::User"))
//!     .build()?;
//! let executor = Arc::new(ScriptedExecutor::new());
//! executor.respond(
//!     "MATCH (u:User) RETURN u",
//!     &["u"],
//!     vec![vec![json!({"_nexus_id": 1, "_nexus_labels": ["User"], "name": "Vince"})]],
//! );
//!
//! let session = SessionFactory::new(metadata, executor).open_session();
//! let user = session
//!     .query_for_object::<User>("MATCH (u:User) RETURN u", Parameters::new())
//!     .await?
//!     .expect("one user");
//! assert_eq!(user.property::<String>("name")?, "Vince");
//! # Ok::<(), nexus_ogm::OgmError>(())
//! # }).unwrap();
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cardinality;
pub mod classify;
pub mod codec;
pub mod coerce;
pub mod config;
pub mod domain;
pub mod error;
pub mod executor;
pub mod graph;
mod hydrate;
pub mod metadata;
pub mod result;
pub mod session;
pub mod testing;
pub mod value;

pub use cardinality::Cardinality;
pub use classify::{classify, is_write, StatementKind};
pub use coerce::{FromMapped, MappedValue, Number, Scalar, ScalarArray, Target};
pub use config::OgmConfig;
pub use domain::DomainClass;
pub use error::{OgmError, Result};
pub use executor::{
    Parameters, QueryExecutor, QueryStatistics, RawResult, RowStream, StatementRequest,
};
pub use graph::{EntityRef, MappedPath, NodeModel, RelationshipModel};
pub use metadata::{ClassInfo, ClassKind, Direction, MetaData, RelationshipField};
pub use result::{Mapped, QueryResult, RowMap};
pub use session::{READ_ONLY_WRITE_WARNING, Session, SessionFactory};

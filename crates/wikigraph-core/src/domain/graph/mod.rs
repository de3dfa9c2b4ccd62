//! Knowledge graph domain module
//!
//! Typed content nodes, typed edges, the graph store contract, and the
//! builder that shapes one page's extracted content into a valid batch.
//!
//! ## Data Model
//!
//! - **Node**: a unit of content with a stable logical ID
//! - **Relationship**: a directed PARENT / SOURCE / NEXT / PREVIOUS edge
//! - **PhysicalId**: the graph store's own row identifier
//!
//! ## Usage
//!
//! ```rust,ignore
//! use wikigraph_core::domain::graph::{NodeKind, PageGraphBuilder};
//!
//! let mut builder = PageGraphBuilder::new("Squirrel", page_text).with_summary(summary);
//! let diet = builder.add_section("Diet", diet_text);
//! builder.add_chunks(&diet, chunks)?;
//! let nodes = builder.build();
//! ```

mod builder;
mod node;
mod relationship;
mod store;

pub use builder::PageGraphBuilder;
pub use node::{Node, NodeKind};
pub use relationship::{Relationship, RelationshipKind};
pub use store::{GraphStore, PhysicalId};

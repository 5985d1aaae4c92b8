//! Product comparison table: columns built from flat records, re-sorted by
//! one column at a time with every other column following along.

pub mod container;
pub mod controller;
pub mod diagnostics;
pub mod domain;
pub mod loader;
pub mod model;
pub mod render;
pub mod sort;
pub mod ui;

pub use container::{Keyed, RawValue, Record};
pub use domain::{Field, TableConfig, TableError};
pub use model::{Cell, Column, Status, TableModel};
pub use sort::{Permutation, apply_order, compute_order};

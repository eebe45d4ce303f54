//! Minimal TON cell library for the Tonhub connector.
//!
//! This crate exposes:
//! - immutable `Cell`s with the standard representation hash,
//! - a bit-level `CellBuilder` with coin, address, and snake helpers,
//! - a `CellSlice` reader,
//! - a single-root bag-of-cells codec (`boc`).

pub mod boc;
pub mod builder;
pub mod cell;
pub mod error;
pub mod slice;

pub use builder::CellBuilder;
pub use cell::{Cell, MAX_BITS, MAX_REFS};
pub use error::CellError;
pub use slice::{read_snake_bytes, CellSlice};

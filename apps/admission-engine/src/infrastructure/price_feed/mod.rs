//! Price Feed Adapters
//!
//! Implementations of `ReferencePriceSource`.

pub mod quote_book;

pub use quote_book::QuoteBook;

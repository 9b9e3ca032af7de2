//! A RAM-backed callback chain.
//!
//! `MemoryChain` speaks the callback convention natively and emits the
//! built-in chain events. Nothing is persisted; dropping the last handle drops
//! the data.
//!
//! # Example
//!
//! ```rust
//! use unichain_chain::{CallbackChain, ChainInfo, ValueEncoding};
//! use unichain_memory::{ChainOptions, MemoryChain};
//!
//! let chain = MemoryChain::new(ChainOptions::default().value_encoding(ValueEncoding::Utf8));
//! chain.append("hello".into(), Box::new(|seq| assert_eq!(seq, Ok(0))));
//! assert_eq!(chain.len(), 1);
//! ```

mod chain;
mod options;
mod waiter;

pub use chain::MemoryChain;
pub use options::ChainOptions;

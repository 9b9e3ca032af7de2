//! Unichain Promisifier: calling-convention adapters
//!
//! Chains come in two calling conventions. A `CallbackChain` completes each
//! asynchronous operation through a callback; a `PromiseChain` returns an
//! in-flight `Request` to await. This crate converts between the two without
//! touching the chain's behavior, identity, or events:
//!
//! - `CallbackToPromise`: a `PromiseChain` over a callback chain
//! - `PromiseToCallback`: a `CallbackChain` over a promise chain
//! - `to_promises` / `to_callbacks`: wrap only when the convention differs
//! - `unwrap`: recover the chain an adapter wraps
//!
//! Both adapters forward property reads live and proxy listener registration
//! straight onto the wrapped chain, so listeners see the chain's own events.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use unichain_chain::{Block, GetOptions, PromiseChain, Unichain, ValueEncoding};
//! use unichain_memory::MemoryChain;
//! use unichain_promisifier::{to_promises, unwrap};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), unichain_chain::ChainError> {
//! let chain = Unichain::from_callbacks(Arc::new(MemoryChain::with_encoding(ValueEncoding::Utf8)));
//! let wrapper = to_promises(chain.clone());
//!
//! wrapper.ready().await?;
//! wrapper.append("hello world".into()).await?;
//! let block = wrapper.get(0, GetOptions::default()).await?;
//! assert_eq!(block, Block::Text("hello world".to_string()));
//!
//! assert!(unwrap(wrapper).ptr_eq(&chain));
//! # Ok(())
//! # }
//! ```

mod callback_to_promise;
mod factory;
mod maybe;
mod operation;
mod promise_to_callback;
#[cfg(test)]
mod testing;
mod wrapper;

pub use callback_to_promise::CallbackToPromise;
pub use factory::{to_callbacks, to_promises, unwrap};
pub use maybe::{maybe, maybe_quiet};
pub use operation::Operation;
pub use promise_to_callback::PromiseToCallback;
pub use wrapper::ChainWrapper;

// Re-export the contract for convenience
pub use unichain_chain::{
    CallbackChain, ChainError, ChainInfo, Convention, PromiseChain, Request, Unichain,
};

//! Convention conversion entry points.
//!
//! `to_promises` and `to_callbacks` wrap only when the chain's convention
//! differs from the one asked for; a chain that already speaks it is returned
//! as is. Wrapping an adapter in the opposite adapter stacks a second layer
//! rather than peeling the first, so `unwrap` always strips exactly one.

use std::sync::Arc;

use tracing::trace;
use unichain_chain::{CallbackChain, PromiseChain, Unichain};

use crate::{CallbackToPromise, PromiseToCallback};

/// Get a promise-convention view of `chain`.
pub fn to_promises(chain: impl Into<Unichain>) -> Arc<dyn PromiseChain> {
    match chain.into() {
        Unichain::Promises(chain) => {
            trace!("chain already speaks promises");
            chain
        }
        Unichain::Callbacks(chain) => Arc::new(CallbackToPromise::new(chain)),
    }
}

/// Get a callback-convention view of `chain`.
pub fn to_callbacks(chain: impl Into<Unichain>) -> Arc<dyn CallbackChain> {
    match chain.into() {
        Unichain::Callbacks(chain) => {
            trace!("chain already speaks callbacks");
            chain
        }
        Unichain::Promises(chain) => Arc::new(PromiseToCallback::new(chain)),
    }
}

/// The chain an adapter wraps, or `chain` itself if it is not an adapter.
pub fn unwrap(chain: impl Into<Unichain>) -> Unichain {
    let chain = chain.into();
    chain.wrapped().unwrap_or(chain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use unichain_chain::{Convention, ValueEncoding};
    use unichain_memory::MemoryChain;

    fn memory() -> Unichain {
        Unichain::from_callbacks(Arc::new(MemoryChain::with_encoding(ValueEncoding::Utf8)))
    }

    #[test]
    fn callback_chains_convert_to_promises() {
        let chain = memory();
        let promises = to_promises(chain.clone());
        let tagged = Unichain::from(promises);
        assert_eq!(tagged.convention(), Convention::Promises);
        assert!(tagged.wrapped().unwrap().ptr_eq(&chain));
    }

    #[test]
    fn converting_to_the_native_convention_is_identity() {
        let chain = memory();
        let callbacks = to_callbacks(chain.clone());
        assert!(Unichain::from(callbacks).ptr_eq(&chain));

        let promises = to_promises(chain);
        let again = to_promises(promises.clone());
        assert!(Arc::ptr_eq(&promises, &again));
    }

    #[test]
    fn unwrap_recovers_the_wrapped_chain() {
        let chain = memory();
        assert!(unwrap(to_promises(chain.clone())).ptr_eq(&chain));
        assert!(unwrap(chain.clone()).ptr_eq(&chain));
    }

    #[test]
    fn unwrap_strips_one_layer() {
        let chain = memory();
        let promises = to_promises(chain.clone());
        let callbacks = to_callbacks(promises.clone());

        let once = unwrap(callbacks);
        assert_eq!(once.convention(), Convention::Promises);
        assert!(once.ptr_eq(&Unichain::from(promises)));
        assert!(unwrap(once).ptr_eq(&chain));
    }

    #[test]
    fn stacked_adapters_still_read_the_same_chain() {
        let chain = memory();
        let callbacks = to_callbacks(to_promises(chain.clone()));
        assert_eq!(callbacks.value_encoding(), ValueEncoding::Utf8);
        assert!(callbacks.writable());
    }
}

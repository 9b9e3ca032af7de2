//! The shared base of both adapters.
//!
//! `ChainWrapper` holds the wrapped chain and forwards everything that does
//! not depend on the calling convention: the property reads, listener
//! registration, and `Debug`. Nothing is cached, so a property read through
//! the wrapper always reflects the chain's current state.
//!
//! Listener registration is a proxy, not a re-emission. A listener added
//! through the wrapper is registered on the wrapped chain itself, so
//! `remove_listener` on either side finds it.

use std::fmt;
use std::sync::Arc;

use unichain_chain::{ChainInfo, Events, Key, Listener, Peer, ValueEncoding};

/// Forwards properties and listeners to a wrapped chain.
pub struct ChainWrapper<C: ?Sized> {
    chain: Arc<C>,
}

impl<C: ?Sized> ChainWrapper<C> {
    pub fn new(chain: Arc<C>) -> Self {
        Self { chain }
    }

    /// The wrapped chain.
    pub fn chain(&self) -> &Arc<C> {
        &self.chain
    }

    pub fn into_chain(self) -> Arc<C> {
        self.chain
    }
}

impl<C: ?Sized> Clone for ChainWrapper<C> {
    fn clone(&self) -> Self {
        Self {
            chain: Arc::clone(&self.chain),
        }
    }
}

impl<C: ChainInfo + ?Sized> ChainInfo for ChainWrapper<C> {
    fn key(&self) -> Option<Key> {
        self.chain.key()
    }

    fn discovery_key(&self) -> Option<Key> {
        self.chain.discovery_key()
    }

    fn len(&self) -> u64 {
        self.chain.len()
    }

    fn byte_length(&self) -> u64 {
        self.chain.byte_length()
    }

    fn writable(&self) -> bool {
        self.chain.writable()
    }

    fn sparse(&self) -> bool {
        self.chain.sparse()
    }

    fn peers(&self) -> Vec<Peer> {
        self.chain.peers()
    }

    fn value_encoding(&self) -> ValueEncoding {
        self.chain.value_encoding()
    }

    fn weak(&self) -> bool {
        self.chain.weak()
    }

    fn lazy(&self) -> bool {
        self.chain.lazy()
    }
}

impl<C: Events + ?Sized> Events for ChainWrapper<C> {
    fn on(&self, event: &str, listener: Listener) {
        self.chain.on(event, listener);
    }

    fn remove_listener(&self, event: &str, listener: &Listener) {
        self.chain.remove_listener(event, listener);
    }

    fn listener_count(&self, event: &str) -> usize {
        self.chain.listener_count(event)
    }
}

impl<C: fmt::Debug + ?Sized> fmt::Debug for ChainWrapper<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.chain, f)
    }
}

/// Implement `ChainInfo`, `Events` and `Debug` for an adapter by forwarding
/// to its `base: ChainWrapper<_>` field.
macro_rules! delegate_base {
    ($adapter:ty) => {
        impl unichain_chain::ChainInfo for $adapter {
            fn key(&self) -> Option<unichain_chain::Key> {
                unichain_chain::ChainInfo::key(&self.base)
            }

            fn discovery_key(&self) -> Option<unichain_chain::Key> {
                unichain_chain::ChainInfo::discovery_key(&self.base)
            }

            fn len(&self) -> u64 {
                unichain_chain::ChainInfo::len(&self.base)
            }

            fn byte_length(&self) -> u64 {
                unichain_chain::ChainInfo::byte_length(&self.base)
            }

            fn writable(&self) -> bool {
                unichain_chain::ChainInfo::writable(&self.base)
            }

            fn sparse(&self) -> bool {
                unichain_chain::ChainInfo::sparse(&self.base)
            }

            fn peers(&self) -> Vec<unichain_chain::Peer> {
                unichain_chain::ChainInfo::peers(&self.base)
            }

            fn value_encoding(&self) -> unichain_chain::ValueEncoding {
                unichain_chain::ChainInfo::value_encoding(&self.base)
            }

            fn weak(&self) -> bool {
                unichain_chain::ChainInfo::weak(&self.base)
            }

            fn lazy(&self) -> bool {
                unichain_chain::ChainInfo::lazy(&self.base)
            }
        }

        impl unichain_chain::Events for $adapter {
            fn on(&self, event: &str, listener: unichain_chain::Listener) {
                unichain_chain::Events::on(&self.base, event, listener)
            }

            fn remove_listener(&self, event: &str, listener: &unichain_chain::Listener) {
                unichain_chain::Events::remove_listener(&self.base, event, listener)
            }

            fn listener_count(&self, event: &str) -> usize {
                unichain_chain::Events::listener_count(&self.base, event)
            }
        }

        impl std::fmt::Debug for $adapter {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                std::fmt::Debug::fmt(&self.base, f)
            }
        }
    };
}

pub(crate) use delegate_base;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::oneshot;
use tracing_subscriber::EnvFilter;

use unichain_chain::{
    names, Batch, Block, Callback, ChainError, ChainInfo, DownloadRange, Event, Events,
    ExtensionHandlers, GetOptions, Listener, Peer, ReadStreamOptions, SeekOptions, SeekPosition,
    Unichain, ValueEncoding, WriteStreamOptions,
};
use unichain_memory::{ChainOptions, MemoryChain};
use unichain_promisifier::{to_callbacks, to_promises, unwrap, PromiseToCallback};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn memory() -> Arc<MemoryChain> {
    init_tracing();
    Arc::new(MemoryChain::with_encoding(ValueEncoding::Utf8))
}

fn counter() -> (Arc<AtomicUsize>, Listener) {
    let count = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&count);
    let listener = Listener::new(move |_| {
        seen.fetch_add(1, Ordering::SeqCst);
    });
    (count, listener)
}

fn callback<T: Send + 'static>() -> (Callback<T>, oneshot::Receiver<Result<T, ChainError>>) {
    let (tx, rx) = oneshot::channel();
    let cb: Callback<T> = Box::new(move |result| {
        let _ = tx.send(result);
    });
    (cb, rx)
}

#[tokio::test]
async fn test_hello_world() {
    let chain = memory();
    let wrapper = to_promises(Unichain::from_callbacks(chain.clone()));

    wrapper.ready().await.unwrap();
    wrapper.append("hello world".into()).await.unwrap();
    let block = wrapper.get(0, GetOptions::default()).await.unwrap();

    assert_eq!(block, Block::Text("hello world".to_string()));
    assert_eq!(wrapper.len(), 1);
    assert_eq!(chain.len(), 1);
}

#[tokio::test]
async fn test_events_fire_through_a_double_wrap() {
    let chain = memory();
    let wrapper = to_promises(to_callbacks(to_promises(Unichain::from_callbacks(
        chain.clone(),
    ))));

    let (ready, on_ready) = counter();
    let (appended, on_append) = counter();
    wrapper.on(names::READY, on_ready);
    wrapper.on(names::APPEND, on_append);
    assert_eq!(chain.listener_count(names::READY), 1);

    wrapper.ready().await.unwrap();
    wrapper.append(Batch::from("a")).await.unwrap();
    wrapper.append(Batch::from("b")).await.unwrap();

    assert_eq!(ready.load(Ordering::SeqCst), 1);
    assert_eq!(appended.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_can_unwrap() {
    let chain = Unichain::from_callbacks(memory());
    let wrapper = to_promises(chain.clone());

    assert!(unwrap(wrapper).ptr_eq(&chain));
    assert!(unwrap(chain.clone()).ptr_eq(&chain));
}

#[tokio::test]
async fn test_custom_events_and_listener_removal() {
    let chain = memory();
    let wrapper = to_promises(Unichain::from_callbacks(chain.clone()));
    let (hellos, listener) = counter();

    wrapper.on("hello", listener.clone());
    chain.emit(&Event::Custom {
        name: "hello".to_string(),
        payload: serde_json::json!("world"),
    });
    assert_eq!(hellos.load(Ordering::SeqCst), 1);

    wrapper.remove_listener("hello", &listener);
    assert_eq!(chain.listener_count("hello"), 0);
    chain.emit(&Event::Custom {
        name: "hello".to_string(),
        payload: serde_json::Value::Null,
    });
    assert_eq!(hellos.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_cancel_through_the_request() {
    let chain = memory();
    let wrapper = to_promises(Unichain::from_callbacks(chain.clone()));

    let request = wrapper.download(DownloadRange::new(0, 10));
    let handle = request.handle().unwrap();
    wrapper.cancel(&request);

    assert_eq!(chain.cancellations(), vec![handle]);
    assert_eq!(request.await, Err(ChainError::Cancelled));
}

#[tokio::test]
async fn test_errors_pass_through() {
    init_tracing();
    let read_only = Arc::new(MemoryChain::new(
        ChainOptions::default()
            .value_encoding(ValueEncoding::Utf8)
            .writable(false),
    ));
    let wrapper = to_promises(Unichain::from_callbacks(read_only));

    assert_eq!(
        wrapper.append("nope".into()).await,
        Err(ChainError::NotWritable)
    );
    assert!(!wrapper.has(0, None).await.unwrap());
}

#[tokio::test]
async fn test_callbacks_over_promises_over_callbacks() {
    let chain = memory();
    let callbacks = to_callbacks(to_promises(Unichain::from_callbacks(chain.clone())));

    let (cb, rx) = callback();
    callbacks.append(Batch::new(vec!["x".into(), "y".into()]), cb);
    assert_eq!(rx.await.unwrap(), Ok(0));

    let (cb, rx) = callback();
    callbacks.get(1, GetOptions::default(), cb);
    assert_eq!(rx.await.unwrap(), Ok(Block::Text("y".to_string())));

    let (cb, rx) = callback();
    let handle = callbacks.get(9, GetOptions::default(), cb);
    callbacks.cancel(handle);
    assert_eq!(rx.await.unwrap(), Err(ChainError::Cancelled));
    assert_eq!(chain.cancellations(), vec![handle]);
}

#[test]
fn test_callbacks_over_promises_without_a_runtime() {
    let chain = memory();
    let callbacks = to_callbacks(to_promises(Unichain::from_callbacks(chain.clone())));

    let (cb, mut rx) = callback();
    callbacks.ready(cb);
    assert_eq!(rx.try_recv().unwrap(), Ok(()));

    let (cb, mut rx) = callback();
    let parked = callbacks.get(1, GetOptions::default(), cb);
    assert_ne!(parked, Default::default());

    let (appended, mut appended_rx) = callback();
    callbacks.append(Batch::new(vec!["ab".into(), "cd".into()]), appended);
    assert_eq!(appended_rx.try_recv().unwrap(), Ok(0));
    assert_eq!(rx.try_recv().unwrap(), Ok(Block::Text("cd".to_string())));

    let (cb, mut rx) = callback();
    callbacks.has(0, Some(2), cb);
    assert_eq!(rx.try_recv().unwrap(), Ok(true));

    let (cb, mut rx) = callback();
    callbacks.seek(3, SeekOptions::default(), cb);
    assert_eq!(
        rx.try_recv().unwrap(),
        Ok(SeekPosition {
            index: 1,
            relative_offset: 1
        })
    );

    let (cb, mut rx) = callback();
    callbacks.close(cb);
    assert_eq!(rx.try_recv().unwrap(), Ok(()));
    assert!(chain.is_closed());
}

#[tokio::test]
async fn test_promise_native_chain_through_callbacks() {
    let promises = to_promises(Unichain::from_callbacks(memory()));
    let callbacks = PromiseToCallback::new(promises.clone());

    let request = callbacks.append_with("first".into(), None).unwrap();
    assert_eq!(request.await, Ok(0));

    let (cb, rx) = callback();
    assert!(callbacks
        .get_with(0, GetOptions::default(), Some(cb))
        .is_none());
    assert_eq!(rx.await.unwrap(), Ok(Block::Text("first".to_string())));
    assert_eq!(promises.len(), 1);
}

#[tokio::test]
async fn test_streams_pass_through() {
    let wrapper = to_promises(Unichain::from_callbacks(memory()));

    let mut writer = wrapper.create_write_stream(WriteStreamOptions::default());
    writer.write("one").unwrap();
    writer.write("two").unwrap();
    assert_eq!(writer.written(), 2);

    let blocks = wrapper
        .create_read_stream(ReadStreamOptions {
            start: 1,
            ..Default::default()
        })
        .collect()
        .await
        .unwrap();
    assert_eq!(blocks, vec![Block::Text("two".to_string())]);
}

#[tokio::test]
async fn test_replication_and_extensions_pass_through() {
    let chain = memory();
    let wrapper = to_callbacks(to_promises(Unichain::from_callbacks(chain.clone())));

    let (peers, on_peer) = counter();
    wrapper.on(names::PEER_ADD, on_peer);
    let session = wrapper.replicate(true, Default::default());
    assert_eq!(peers.load(Ordering::SeqCst), 1);
    assert_eq!(wrapper.peers(), vec![session.peer().clone()]);

    let received = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&received);
    let handlers = ExtensionHandlers {
        on_message: Some(Arc::new(move |_: &Bytes, _: &Peer| {
            seen.fetch_add(1, Ordering::SeqCst);
        })),
        ..Default::default()
    };
    let ext = wrapper.register_extension("ping", handlers);
    assert_eq!(ext.name(), "ping");
    assert!(chain.receive_extension_message("ping", Bytes::from_static(b"hi"), session.peer()));
    assert_eq!(received.load(Ordering::SeqCst), 1);
}

#[test]
fn test_debug_shows_the_wrapped_chain() {
    let chain = memory();
    let wrapper = to_promises(Unichain::from_callbacks(chain.clone()));
    assert_eq!(format!("{wrapper:?}"), format!("{chain:?}"));
}

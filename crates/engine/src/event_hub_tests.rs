// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use parking_lot::Mutex;
use tether_core::StreamTag;

fn recorder() -> (Arc<Mutex<Vec<BridgeEvent>>>, impl Fn(&BridgeEvent) + Send + Sync + 'static) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    (seen, move |event: &BridgeEvent| sink.lock().push(event.clone()))
}

fn log(text: &str) -> BridgeEvent {
    BridgeEvent::log(StreamTag::Stdout, text)
}

#[test]
fn every_subscriber_sees_every_event_in_order() {
    let hub = EventHub::new();
    let (a, listen_a) = recorder();
    let (b, listen_b) = recorder();
    let _sa = hub.subscribe(listen_a);
    let _sb = hub.subscribe(listen_b);

    hub.emit(&log("1"));
    hub.emit(&log("2"));

    let expected = vec![log("1"), log("2")];
    assert_eq!(*a.lock(), expected);
    assert_eq!(*b.lock(), expected);
}

#[test]
fn kind_filter_skips_other_events() {
    let hub = EventHub::new();
    let (seen, listen) = recorder();
    let _sub = hub.subscribe_kind(EventKind::AgentError, listen);

    hub.emit(&log("ignored"));
    hub.emit(&BridgeEvent::AgentError {
        message: "boom".into(),
    });

    assert_eq!(
        *seen.lock(),
        vec![BridgeEvent::AgentError {
            message: "boom".into()
        }]
    );
}

#[test]
fn dropping_subscription_unsubscribes() {
    let hub = EventHub::new();
    let (seen, listen) = recorder();
    let sub = hub.subscribe(listen);
    hub.emit(&log("before"));
    drop(sub);
    hub.emit(&log("after"));

    assert_eq!(*seen.lock(), vec![log("before")]);
    assert_eq!(hub.subscriber_count(), 0);
}

#[test]
fn unsubscribe_leaves_other_subscribers() {
    let hub = EventHub::new();
    let (a, listen_a) = recorder();
    let (b, listen_b) = recorder();
    let sa = hub.subscribe(listen_a);
    let _sb = hub.subscribe(listen_b);

    sa.unsubscribe();
    hub.emit(&log("x"));

    assert!(a.lock().is_empty());
    assert_eq!(b.lock().len(), 1);
}

#[test]
fn subscription_outliving_hub_is_harmless() {
    let hub = EventHub::new();
    let (_seen, listen) = recorder();
    let sub = hub.subscribe(listen);
    drop(hub);
    drop(sub);
}

#[test]
fn listener_may_emit_reentrantly() {
    let hub = EventHub::new();
    let (seen, listen) = recorder();
    let _record = hub.subscribe(listen);
    let echo_hub = hub.clone();
    let _echo = hub.subscribe_kind(EventKind::ExitAttempt, move |_| {
        echo_hub.emit(&BridgeEvent::AgentError {
            message: "echo".into(),
        });
    });

    hub.emit(&BridgeEvent::ExitAttempt { code: 130 });

    let kinds: Vec<EventKind> = seen.lock().iter().map(BridgeEvent::kind).collect();
    assert!(kinds.contains(&EventKind::ExitAttempt));
    assert!(kinds.contains(&EventKind::AgentError));
}

#[test]
fn concurrent_emitters_are_seen_in_one_order() {
    let hub = EventHub::new();
    let (a, listen_a) = recorder();
    let (b, listen_b) = recorder();
    let _sa = hub.subscribe(listen_a);
    let _sb = hub.subscribe(listen_b);

    let threads: Vec<_> = (0..4)
        .map(|t| {
            let hub = hub.clone();
            std::thread::spawn(move || {
                for i in 0..50 {
                    hub.emit(&log(&format!("{t}-{i}")));
                }
            })
        })
        .collect();
    for t in threads {
        t.join().unwrap();
    }

    assert_eq!(a.lock().len(), 200);
    assert_eq!(*a.lock(), *b.lock());
}

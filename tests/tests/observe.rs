mod common;

use std::time::Duration;

use anyhow::Result;
use common::{StateWatcher, paced, settle};
use futures::{FutureExt, StreamExt};
use mergeflow::{ActivationPolicy, Container, Phase, Scope, StateContext, Subscribe, Wait};

#[tokio::test]
async fn test_new_observer_starts_from_current_state() -> Result<()> {
    let scope = Scope::current()?;
    let container = Container::new(0u32, ActivationPolicy::Eager, vec![], &scope)?;
    container.update(|n| n + 5);

    let mut states = container.observe();
    assert_eq!(states.next().await, Some(container.state()));
    // nothing else is queued until a real update happens
    assert!(states.next().now_or_never().is_none());

    container.update(|n| n + 1);
    assert_eq!(states.next().await, Some(6));
    assert!(states.next().now_or_never().is_none());
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_attaching_mid_stream_skips_and_repeats_nothing() -> Result<()> {
    let scope = Scope::current()?;
    let container = Container::new(0u64, ActivationPolicy::Eager, vec![], &scope)?;

    let writer = {
        let container = container.clone();
        std::thread::spawn(move || {
            for _ in 0..20_000 {
                container.update(|n| n + 1);
            }
        })
    };

    let mut observers = Vec::new();
    while container.state() < 20_000 && observers.len() < 50 {
        observers.push(container.observe());
        tokio::task::yield_now().await;
    }
    writer.join().expect("writer thread panicked");

    for mut states in observers {
        let mut last = states.next().await.expect("replayed value");
        while last < 20_000 {
            let next = states.next().await.expect("stream is live");
            assert_eq!(next, last + 1);
            last = next;
        }
        assert!(states.next().now_or_never().is_none());
    }
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_subscribe_replays_then_follows() -> Result<()> {
    let scope = Scope::current()?;
    let container = Container::new(String::from("hello"), ActivationPolicy::default(), vec![], &scope)?;
    let watcher = StateWatcher::new();

    let guard = container.subscribe(watcher.listener());
    assert_eq!(container.subscriber_count(), 1);
    assert_eq!(watcher.take_when(1).await, vec!["hello".to_owned()]);

    container.update(|s| format!("{s}, world"));
    assert_eq!(watcher.take_when(1).await, vec!["hello, world".to_owned()]);

    drop(guard);
    settle().await;
    assert_eq!(container.subscriber_count(), 0);
    container.update(|_| "gone".to_owned());
    assert_eq!(watcher.quiesce().await, 0);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_waiting_is_a_real_subscriber() -> Result<()> {
    let scope = Scope::current()?;
    let container = Container::builder(0u32)
        .policy(ActivationPolicy::Lazy)
        .producer(|cx: StateContext<u32>| cx.on_each_to_state(paced(1..=5u32, Duration::from_millis(100)), |n, total| total + n))
        .build(&scope)?;

    // without the waiter attaching, a lazy container would never reach 15
    container.wait_value(15).await;
    settle().await;
    assert_eq!(container.subscriber_count(), 0);
    assert_eq!(container.phase(), Phase::Completed);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_activation_phases_are_observable() -> Result<()> {
    let scope = Scope::current()?;
    let container = Container::builder(0u64)
        .policy(ActivationPolicy::while_subscribed(Duration::from_millis(100)))
        .producer(|cx: StateContext<u64>| cx.on_each_to_state(common::ticker(Duration::from_millis(30)), |_, n| n + 1))
        .build(&scope)?;
    let phases = StateWatcher::new();
    let _guard = container.activation().subscribe(phases.listener());

    let states = container.observe();
    settle().await;
    drop(states);
    settle().await;
    let states = container.observe();
    settle().await;
    drop(states);
    tokio::time::sleep(Duration::from_millis(150)).await;

    assert_eq!(phases.drain(), vec![Phase::Active, Phase::PendingStop, Phase::Active, Phase::PendingStop, Phase::Idle]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_phase_listener_can_read_the_container() -> Result<()> {
    let scope = Scope::current()?;
    let container = Container::builder(0u64)
        .policy(ActivationPolicy::while_subscribed(Duration::from_millis(100)))
        .producer(|cx: StateContext<u64>| cx.on_each_to_state(common::ticker(Duration::from_millis(30)), |_, n| n + 1))
        .build(&scope)?;
    let seen = StateWatcher::new();
    let guard = {
        let reader = container.clone();
        let activation = container.activation();
        let notify = seen.listener();
        container.activation().subscribe(move |phase: Phase| notify((phase, reader.phase(), activation.peek())))
    };

    let states = container.observe();
    settle().await;
    drop(states);
    tokio::time::sleep(Duration::from_millis(150)).await;

    assert_eq!(
        seen.drain(),
        vec![(Phase::Active, Phase::Active, Phase::Active), (Phase::PendingStop, Phase::PendingStop, Phase::PendingStop), (Phase::Idle, Phase::Idle, Phase::Idle)]
    );
    drop(guard);
    Ok(())
}

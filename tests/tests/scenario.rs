mod common;

use std::time::Duration;

use anyhow::Result;
use futures::{Stream, StreamExt, stream};
use mergeflow::{ActivationPolicy, Container, Phase, Scope, StateContext, StateStream, Wait};

#[derive(Debug, Clone, Default, PartialEq)]
struct FooBar {
    foo: String,
    bar: u32,
}

#[tokio::test(start_paused = true)]
async fn test_two_eager_producers_fold_into_one_state() -> Result<()> {
    let scope = Scope::current()?;
    let container = Container::builder(FooBar::default())
        .policy(ActivationPolicy::Eager)
        .producer(|cx: StateContext<FooBar>| cx.on_each_to_state(stream::iter(["1", "2", "3"]), |foo, s| FooBar { foo: foo.to_string(), ..s.clone() }))
        .producer(|cx: StateContext<FooBar>| cx.on_each_to_state(stream::iter([1u32, 2, 3]), |bar, s| FooBar { bar: *bar, ..s.clone() }))
        .build(&scope)?;

    // attached before the producers get to run, so every intermediate state is seen
    let states = container.observe();
    let activation = container.activation();
    activation.wait_value(Phase::Completed).await;
    assert_eq!(container.state(), FooBar { foo: "3".into(), bar: 3 });

    let seen: Vec<FooBar> = states.take(7).collect().await;
    assert_eq!(seen.first(), Some(&FooBar::default()));
    assert_eq!(seen.last(), Some(&container.state()));
    for pair in seen.windows(2) {
        let (before, after) = (&pair[0], &pair[1]);
        // exactly one field moves per commit, and never backwards
        assert_ne!(before.foo != after.foo, before.bar != after.bar, "{before:?} -> {after:?}");
        assert!(after.foo >= before.foo);
        assert!(after.bar >= before.bar);
    }
    Ok(())
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Greeting {
    foo: String,
    bar: i32,
}

/// Fifty strings, 100ms apart, after a five second warm-up
fn foo_use_case() -> impl Stream<Item = String> + Send + 'static {
    stream::iter(0..50).then(|i| async move {
        let pause = if i == 0 { 5_000 } else { 100 };
        tokio::time::sleep(Duration::from_millis(pause)).await;
        i.to_string()
    })
}

/// A hundred numbers, the first right away, then every 100ms
fn bar_use_case() -> impl Stream<Item = i32> + Send + 'static {
    stream::iter(0..100).then(|i| async move {
        if i > 0 {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        i
    })
}

/// Screen state backed by a container that only works while the screen is visible
struct GreetingViewModel {
    state: Container<Greeting>,
}

impl GreetingViewModel {
    fn new(scope: &Scope) -> Result<Self> {
        let state = Container::builder(Greeting::default())
            .name("greeting")
            .policy(ActivationPolicy::while_subscribed(Duration::from_millis(1_000)))
            .producer(|cx: StateContext<Greeting>| cx.on_each_to_state(foo_use_case(), |foo, state| Greeting { foo: foo.clone(), ..state.clone() }))
            // folding by hand through the context works the same way
            .producer(|cx: StateContext<Greeting>| {
                bar_use_case().inspect(move |bar| {
                    cx.update(|state| Greeting { bar: *bar, ..state.clone() });
                })
            })
            .build(scope)?;
        Ok(Self { state })
    }

    fn state(&self) -> StateStream<Greeting> { self.state.observe() }

    fn update_foo(&self, foo: &str) { self.state.update(|state| Greeting { foo: foo.to_owned(), ..state.clone() }); }
}

#[tokio::test(start_paused = true)]
async fn test_greeting_screen_lifecycle() -> Result<()> {
    let scope = Scope::current()?;
    let view_model = GreetingViewModel::new(&scope)?;
    let container = &view_model.state;
    assert_eq!(container.phase(), Phase::Idle);

    // the screen becomes visible
    let mut screen = view_model.state();
    assert_eq!(screen.next().await, Some(Greeting::default()));
    container.wait_for(|greeting: &Greeting| greeting.bar >= 10).await;
    assert_eq!(container.state().foo, "");

    // a user edit lands between producer emissions
    view_model.update_foo("hello");
    assert_eq!(container.state().foo, "hello");
    container.wait_for(|greeting: &Greeting| greeting.foo == "0").await;
    assert!(container.state().bar >= 49);

    // the screen goes away; producers stop a second later and the state freezes
    drop(screen);
    let activation = container.activation();
    activation.wait_value(Phase::Idle).await;
    let frozen = container.state();
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(container.state(), frozen);

    // coming back resumes from the frozen state, with producers started over
    let mut screen = view_model.state();
    assert_eq!(screen.next().await, Some(frozen.clone()));
    container.wait_for(|greeting: &Greeting| greeting.bar < 5).await;
    assert_eq!(container.state().foo, frozen.foo);
    drop(screen);
    Ok(())
}

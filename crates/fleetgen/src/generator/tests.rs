use crate::factory::{AIRBAG_COUNT, BODY_VOLUME, WHEEL_COUNT};
use crate::{
    Category, ChildRecord, FleetGenerator, GenerationOutcome, GeneratorConfig, ParentRecord,
    SleepProvider, TokioSleep, TokioYield,
};
use core::time::Duration;
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;

trait GenerationOutcomeExt {
    fn unwrap_ready(self) -> Vec<ChildRecord>;
    fn unwrap_cancelled(self) -> f64;
}

impl GenerationOutcomeExt for GenerationOutcome {
    fn unwrap_ready(self) -> Vec<ChildRecord> {
        match self {
            GenerationOutcome::Ready { children } => children,
            GenerationOutcome::Cancelled { progress } => {
                panic!("unexpected cancellation (progress: {progress})")
            }
        }
    }

    fn unwrap_cancelled(self) -> f64 {
        match self {
            GenerationOutcome::Ready { children } => {
                panic!("unexpected completion ({} children)", children.len())
            }
            GenerationOutcome::Cancelled { progress } => progress,
        }
    }
}

fn passenger() -> ParentRecord {
    ParentRecord::new("Toyota", "Classic", 180, 210, Category::Passenger)
}

fn truck() -> ParentRecord {
    ParentRecord::new("Mercedes", "Premium", 450, 160, Category::Truck)
}

fn timed() -> FleetGenerator<TokioSleep> {
    FleetGenerator::new(GeneratorConfig::default())
}

fn instant() -> FleetGenerator<TokioYield> {
    FleetGenerator::with_sleep_provider(GeneratorConfig::default())
}

/// Polls until the generator reports some progress for an in-flight run.
async fn wait_for_progress<S: SleepProvider>(generator: &FleetGenerator<S>) -> f64 {
    loop {
        let progress = generator.progress();
        if progress > 0.0 {
            return progress;
        }
        sleep(Duration::from_millis(5)).await;
    }
}

fn assert_children_match(children: &[ChildRecord], category: Category) {
    assert!((10..=20).contains(&children.len()), "{}", children.len());
    for child in children {
        assert_eq!(child.category(), category);
        match child {
            ChildRecord::Passenger(details) => {
                assert!(AIRBAG_COUNT.contains(&details.airbag_count()));
            }
            ChildRecord::Truck(details) => {
                assert!(WHEEL_COUNT.contains(&details.wheel_count()));
                assert!(BODY_VOLUME.contains(&details.body_volume()));
                let tenths = details.body_volume() * 10.0;
                assert!((tenths - tenths.round()).abs() < 1e-9);
            }
        }
    }
}

#[tokio::test]
async fn children_match_parent_category() {
    let generator = instant();
    let token = CancellationToken::new();

    for _ in 0..25 {
        for parent in [passenger(), truck()] {
            let children = generator.generate(&parent, &token).await.unwrap_ready();
            assert_children_match(&children, parent.category);
        }
    }
    assert_eq!(generator.cached_len(), 50);
}

#[tokio::test(start_paused = true)]
async fn cache_hit_is_exact_and_immediate() {
    let generator = timed();
    let token = CancellationToken::new();
    let parent = truck();

    let start = Instant::now();
    let first = generator.generate(&parent, &token).await.unwrap_ready();
    assert!(start.elapsed() > Duration::ZERO);
    assert_eq!(generator.progress(), 1.0);

    let start = Instant::now();
    let second = generator.generate(&parent, &token).await.unwrap_ready();
    assert_eq!(start.elapsed(), Duration::ZERO);
    assert_eq!(first, second);
    assert_eq!(generator.progress(), 1.0);
    assert_eq!(generator.cached(parent.id()), Some(first));
}

#[tokio::test(start_paused = true)]
async fn progress_is_monotonic_within_a_run() {
    let generator = timed();
    let parent = passenger();

    let handle = tokio::spawn({
        let generator = generator.clone();
        let parent = parent.clone();
        async move {
            generator
                .generate(&parent, &CancellationToken::new())
                .await
        }
    });

    let mut samples = Vec::new();
    while !handle.is_finished() {
        samples.push(generator.progress());
        sleep(Duration::from_millis(10)).await;
    }
    handle.await.unwrap().unwrap_ready();
    samples.push(generator.progress());

    assert!(samples.iter().all(|p| (0.0..=1.0).contains(p)));
    assert!(samples.windows(2).all(|w| w[0] <= w[1]), "{samples:?}");
    assert_eq!(samples.last(), Some(&1.0));
    assert!(samples.first().is_some_and(|p| *p < 1.0));
}

#[tokio::test(start_paused = true)]
async fn older_run_stops_publishing_once_a_newer_run_starts() {
    let generator = timed();

    let older = tokio::spawn({
        let generator = generator.clone();
        async move { generator.generate(&passenger(), &CancellationToken::new()).await }
    });
    wait_for_progress(&generator).await;

    let newer = tokio::spawn({
        let generator = generator.clone();
        async move { generator.generate(&truck(), &CancellationToken::new()).await }
    });

    let mut samples = Vec::new();
    while !(older.is_finished() && newer.is_finished()) {
        samples.push(generator.progress());
        sleep(Duration::from_millis(5)).await;
    }
    samples.push(generator.progress());
    older.await.unwrap().unwrap_ready();
    newer.await.unwrap().unwrap_ready();

    // The only drop allowed is the reset when the newer run starts.
    let drops = samples.windows(2).filter(|w| w[1] < w[0]).count();
    assert!(drops <= 1, "{samples:?}");
    assert_eq!(samples.last(), Some(&1.0));
    assert_eq!(generator.cached_len(), 2);
}

#[tokio::test(start_paused = true)]
async fn dropped_run_releases_its_bookkeeping() {
    let generator = timed();
    let parent = truck();

    let handle = tokio::spawn({
        let generator = generator.clone();
        let parent = parent.clone();
        async move { generator.generate(&parent, &CancellationToken::new()).await }
    });
    wait_for_progress(&generator).await;
    assert_eq!(generator.bookkeeping_len(), (1, 1));

    handle.abort();
    assert!(handle.await.unwrap_err().is_cancelled());
    assert_eq!(generator.bookkeeping_len(), (0, 0));
    assert!(generator.cached(parent.id()).is_none());

    generator
        .generate(&parent, &CancellationToken::new())
        .await
        .unwrap_ready();
    assert_eq!(generator.bookkeeping_len(), (0, 0));
    assert!(generator.cached(parent.id()).is_some());
}

#[tokio::test(start_paused = true)]
async fn invalidate_forces_regeneration() {
    let generator = timed();
    let token = CancellationToken::new();
    let mut parent = passenger();

    generator.generate(&parent, &token).await.unwrap_ready();
    assert!(generator.invalidate(parent.id()));
    assert!(!generator.invalidate(parent.id()));
    assert!(generator.cached(parent.id()).is_none());

    // The category change that motivated the invalidation reshapes children.
    parent.category = Category::Truck;
    let handle = tokio::spawn({
        let generator = generator.clone();
        let parent = parent.clone();
        async move { generator.generate(&parent, &CancellationToken::new()).await }
    });
    sleep(Duration::from_millis(1)).await;
    assert!(generator.progress() < 1.0);

    let children = handle.await.unwrap().unwrap_ready();
    assert_children_match(&children, Category::Truck);
    assert_eq!(generator.cached(parent.id()), Some(children));
}

#[tokio::test(start_paused = true)]
async fn cancellation_leaves_no_entry_and_freezes_progress() {
    let generator = timed();
    let parent = truck();
    let token = CancellationToken::new();

    let handle = tokio::spawn({
        let generator = generator.clone();
        let parent = parent.clone();
        let token = token.clone();
        async move { generator.generate(&parent, &token).await }
    });

    wait_for_progress(&generator).await;
    token.cancel();
    let progress = handle.await.unwrap().unwrap_cancelled();

    assert!(progress > 0.0 && progress < 1.0, "{progress}");
    assert_eq!(generator.progress(), progress);
    assert!(generator.cached(parent.id()).is_none());

    // The next call is a miss and pays the generation delay again.
    let start = Instant::now();
    generator
        .generate(&parent, &CancellationToken::new())
        .await
        .unwrap_ready();
    assert!(start.elapsed() > Duration::ZERO);
}

#[tokio::test]
async fn cancelled_token_short_circuits_a_miss() {
    let generator = instant();
    let token = CancellationToken::new();
    token.cancel();

    let progress = generator.generate(&truck(), &token).await.unwrap_cancelled();
    assert_eq!(progress, 0.0);
    assert_eq!(generator.cached_len(), 0);
}

#[tokio::test(start_paused = true)]
async fn same_identity_runs_are_serialized() {
    let generator = timed();
    let parent = passenger();
    let token = CancellationToken::new();

    let (first, second) = tokio::join!(
        generator.generate(&parent, &token),
        generator.generate(&parent, &token),
    );

    assert_eq!(first.unwrap_ready(), second.unwrap_ready());
    assert_eq!(generator.cached_len(), 1);
}

#[tokio::test(start_paused = true)]
async fn waiting_caller_can_cancel() {
    let generator = timed();
    let parent = passenger();

    let running = tokio::spawn({
        let generator = generator.clone();
        let parent = parent.clone();
        async move { generator.generate(&parent, &CancellationToken::new()).await }
    });
    wait_for_progress(&generator).await;

    let waiting = CancellationToken::new();
    let waiter = tokio::spawn({
        let generator = generator.clone();
        let parent = parent.clone();
        let waiting = waiting.clone();
        async move { generator.generate(&parent, &waiting).await }
    });
    sleep(Duration::from_millis(1)).await;
    waiting.cancel();

    assert!(waiter.await.unwrap().is_cancelled());
    let children = running.await.unwrap().unwrap_ready();
    assert_eq!(generator.cached(parent.id()), Some(children));
}

#[tokio::test(start_paused = true)]
async fn invalidate_during_run_blocks_commit() {
    let generator = timed();
    let parent = truck();

    let handle = tokio::spawn({
        let generator = generator.clone();
        let parent = parent.clone();
        async move { generator.generate(&parent, &CancellationToken::new()).await }
    });
    wait_for_progress(&generator).await;
    assert!(!generator.invalidate(parent.id()));

    let children = handle.await.unwrap().unwrap_ready();
    assert_children_match(&children, Category::Truck);
    assert!(generator.cached(parent.id()).is_none());
}

#[tokio::test]
async fn clear_all_resets_cache_and_progress() {
    let generator = instant();
    let token = CancellationToken::new();
    let parents = [passenger(), truck(), passenger()];

    for parent in &parents {
        generator.generate(parent, &token).await.unwrap_ready();
    }
    assert_eq!(generator.cached_len(), 3);
    assert_eq!(generator.progress(), 1.0);

    generator.clear_all();
    assert_eq!(generator.cached_len(), 0);
    assert_eq!(generator.progress(), 0.0);
    assert!(parents.iter().all(|p| generator.cached(p.id()).is_none()));
}

#[tokio::test]
async fn equal_fields_do_not_share_cache_entries() {
    let generator = instant();
    let token = CancellationToken::new();
    let a = passenger();
    let b = passenger();

    generator.generate(&a, &token).await.unwrap_ready();
    assert!(generator.cached(a.id()).is_some());
    assert!(generator.cached(b.id()).is_none());
}

#[tokio::test]
async fn custom_child_count_is_honored() {
    let generator = FleetGenerator::<TokioYield>::with_sleep_provider(
        GeneratorConfig::default().with_child_count(3..=3),
    );
    let children = generator
        .generate(&truck(), &CancellationToken::new())
        .await
        .unwrap_ready();
    assert_eq!(children.len(), 3);
}

#[test]
#[should_panic(expected = "child count range")]
fn empty_child_count_is_rejected() {
    #[allow(clippy::reversed_empty_ranges)]
    let _ = GeneratorConfig::default().with_child_count(5..=4);
}

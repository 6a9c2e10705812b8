use core::time::Duration;

/// A trait that abstracts over how a generation run waits out its simulated
/// per-item latency.
///
/// This allows the generator to run against the real timer in production and
/// against a yield-only provider in benches and fast tests.
pub trait SleepProvider: 'static {
    /// We require `Send` so that generation runs can be spawned onto a
    /// multi-threaded runtime.
    fn sleep_for(dur: Duration) -> impl Future<Output = ()> + Send;
}

/// An implementation of [`SleepProvider`] using Tokio's timer.
///
/// This is the default provider and honors the configured delay.
pub struct TokioSleep;

impl SleepProvider for TokioSleep {
    fn sleep_for(dur: Duration) -> impl Future<Output = ()> + Send {
        tokio::time::sleep(dur)
    }
}

/// An implementation of [`SleepProvider`] using Tokio's yield.
///
/// Skips the simulated latency entirely but still gives the scheduler a
/// chance to run other tasks (and observe cancellation) between items.
pub struct TokioYield;

impl SleepProvider for TokioYield {
    fn sleep_for(_dur: Duration) -> impl Future<Output = ()> + Send {
        tokio::task::yield_now()
    }
}

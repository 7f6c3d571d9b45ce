use std::{
    panic::{self, AssertUnwindSafe},
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
};

use tracing::{error, trace};

use crate::{
    shared::{Clock, Distance, SystemClock},
    tracking::{Estimator, LocationFix, Outcome, ShapeMatch, TrackerConfig, TrackingPhase},
    trip::{Stop, StopTime, TripDetails, TripStatus},
};

/// Called on the worker after every settled computation. A panic here is
/// caught and logged; the tracker keeps accepting fixes.
pub trait TripStatusComputedListener: Send + Sync {
    fn on_trip_status_computed(&self, tracker: &TripTracker);
}

impl<F> TripStatusComputedListener for F
where
    F: Fn(&TripTracker) + Send + Sync,
{
    fn on_trip_status_computed(&self, tracker: &TripTracker) {
        self(tracker)
    }
}

pub trait CloseToStopListener: Send + Sync {
    fn on_close_to_stop(&self, stop: &Stop, stop_time: &StopTime, shape_match: &ShapeMatch);
}

impl<F> CloseToStopListener for F
where
    F: Fn(&Stop, &StopTime, &ShapeMatch) + Send + Sync,
{
    fn on_close_to_stop(&self, stop: &Stop, stop_time: &StopTime, shape_match: &ShapeMatch) {
        self(stop, stop_time, shape_match)
    }
}

/// Optional receivers of the tracker's events.
#[derive(Clone, Default)]
pub struct Listeners {
    pub status_computed: Option<Arc<dyn TripStatusComputedListener>>,
    pub close_to_stop: Option<Arc<dyn CloseToStopListener>>,
}

impl Listeners {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn on_status_computed<L>(mut self, listener: L) -> Self
    where
        L: TripStatusComputedListener + 'static,
    {
        self.status_computed = Some(Arc::new(listener));
        self
    }

    pub fn on_close_to_stop<L>(mut self, listener: L) -> Self
    where
        L: CloseToStopListener + 'static,
    {
        self.close_to_stop = Some(Arc::new(listener));
        self
    }
}

struct Inner {
    estimator: Mutex<Estimator>,
    listeners: Mutex<Listeners>,
    clock: Box<dyn Clock>,
    in_flight: AtomicBool,
    cancelled: AtomicBool,
}

/// Tracks one trip, computing each fix on rayon's thread pool.
///
/// At most one computation runs at a time. Fixes that arrive while one is
/// running are dropped, so the tracker always works on the freshest fix it
/// was free to accept. Dropping the tracker destroys it.
pub struct TripTracker {
    inner: Arc<Inner>,
    owner: bool,
}

impl TripTracker {
    pub fn new(starting_stop: Option<&Stop>, details: TripDetails, listeners: Listeners) -> Self {
        Self::with_config(
            starting_stop,
            details,
            listeners,
            TrackerConfig::default(),
            SystemClock,
        )
    }

    /// Builds the tracker and submits the first computation, placed on
    /// `starting_stop`. Untrackable trips end right away.
    pub fn with_config<C>(
        starting_stop: Option<&Stop>,
        details: TripDetails,
        listeners: Listeners,
        config: TrackerConfig,
        clock: C,
    ) -> Self
    where
        C: Clock + 'static,
    {
        let estimator = Estimator::new(starting_stop, details, config);
        let ended = estimator.has_trip_ended();
        let tracker = Self {
            inner: Arc::new(Inner {
                estimator: Mutex::new(estimator),
                listeners: Mutex::new(listeners),
                clock: Box::new(clock),
                in_flight: AtomicBool::new(false),
                cancelled: AtomicBool::new(false),
            }),
            owner: true,
        };
        if let Some(stop) = starting_stop
            && !ended
        {
            tracker.compute_trip_status_at_stop(stop);
        }
        tracker
    }

    pub fn compute_trip_status(&self, fix: LocationFix) {
        self.compute_in_background(fix);
    }

    pub fn compute_trip_status_at_stop(&self, stop: &Stop) {
        let fix = LocationFix::at_stop(stop, self.inner.clock.now_millis());
        self.compute_in_background(fix);
    }

    fn compute_in_background(&self, fix: LocationFix) {
        if self.inner.cancelled.load(Ordering::Acquire) {
            return;
        }
        if self
            .inner
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            trace!("Computation in flight, dropping fix at {}", fix.coordinate);
            return;
        }

        let worker = Self {
            inner: self.inner.clone(),
            owner: false,
        };
        rayon::spawn(move || {
            // A panicking listener must not leave the tracker stuck in flight
            if panic::catch_unwind(AssertUnwindSafe(|| worker.run(&fix))).is_err() {
                error!("Computing trip status panicked, fix at {} dropped", fix.coordinate);
            }
            worker.inner.in_flight.store(false, Ordering::Release);
        });
    }

    fn run(&self, fix: &LocationFix) {
        if self.is_destroyed() {
            return;
        }

        let close_to_stop = {
            let mut estimator = self.estimator();
            let now = self.inner.clock.now_millis();
            match estimator.update(fix, now) {
                Outcome::Matched {
                    shape_match,
                    close_to_stop: Some(_),
                } => match (estimator.next_stop(), estimator.next_stop_time()) {
                    (Some(stop), Some(stop_time)) => {
                        Some((stop.clone(), stop_time.clone(), shape_match))
                    }
                    _ => None,
                },
                _ => None,
            }
        };

        let listeners = self.listeners();
        if self.is_destroyed() {
            return;
        }
        if let (Some(listener), Some((stop, stop_time, shape_match))) =
            (&listeners.close_to_stop, close_to_stop)
        {
            listener.on_close_to_stop(&stop, &stop_time, &shape_match);
        }
        if let Some(listener) = &listeners.status_computed
            && !self.is_destroyed()
        {
            listener.on_trip_status_computed(self);
        }
    }

    /// Cancels pending work and detaches both listeners.
    pub fn destroy(&self) {
        self.inner.cancelled.store(true, Ordering::Release);
        *self
            .inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Listeners::default();
    }

    fn is_destroyed(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    fn estimator(&self) -> MutexGuard<'_, Estimator> {
        self.inner
            .estimator
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn listeners(&self) -> Listeners {
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// True while a computation has been accepted and not yet settled.
    pub fn is_computing(&self) -> bool {
        self.inner.in_flight.load(Ordering::Acquire)
    }

    pub fn current_stop(&self) -> Option<Stop> {
        self.estimator().current_stop().cloned()
    }

    pub fn next_stop(&self) -> Option<Stop> {
        self.estimator().next_stop().cloned()
    }

    pub fn current_stop_time(&self) -> Option<StopTime> {
        self.estimator().current_stop_time().cloned()
    }

    pub fn next_stop_time(&self) -> Option<StopTime> {
        self.estimator().next_stop_time().cloned()
    }

    pub fn current_stop_index(&self) -> usize {
        self.estimator().current_stop_index()
    }

    pub fn next_stop_index(&self) -> usize {
        self.estimator().next_stop_index()
    }

    /// Distance to the next stop in whole meters.
    pub fn distance_to_next_stop(&self) -> u32 {
        self.estimator().distance_to_next_stop()
    }

    /// Estimated speed in km/h.
    pub fn speed(&self) -> f64 {
        self.estimator().speed()
    }

    pub fn trip_status(&self) -> TripStatus {
        self.estimator().trip_status().clone()
    }

    pub fn has_trip_ended(&self) -> bool {
        self.estimator().has_trip_ended()
    }

    pub fn phase(&self) -> TrackingPhase {
        self.estimator().phase()
    }

    pub fn total_trip_length(&self) -> Distance {
        self.estimator().total_trip_length()
    }

    pub fn distance_travelled(&self) -> Distance {
        self.estimator().distance_travelled()
    }
}

impl Drop for TripTracker {
    fn drop(&mut self) {
        if self.owner {
            self.destroy();
        }
    }
}

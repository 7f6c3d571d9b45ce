mod common;

use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
        mpsc,
    },
    thread,
    time::{Duration, Instant},
};

use common::{at, east, stop, straight_trip};
use ontime::prelude::*;

fn settle(tracker: &TripTracker) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while tracker.is_computing() {
        assert!(Instant::now() < deadline, "computation never settled");
        thread::sleep(Duration::from_millis(1));
    }
}

fn counting(count: &Arc<AtomicUsize>) -> impl Fn(&TripTracker) + Send + Sync + 'static {
    let count = count.clone();
    move |_: &TripTracker| {
        count.fetch_add(1, Ordering::SeqCst);
    }
}

/// Starts 15 m short of its second stop, so the first computation is
/// already close to a stop.
fn short_hop_trip() -> TripDetails {
    let stops = [
        Stop::new("a", "A", east(0.0)),
        Stop::new("b", "B", east(15.0)),
        Stop::new("c", "C", east(300.0)),
    ];
    let stop_times = stops
        .iter()
        .zip([0.0, 15.0, 300.0])
        .map(|(stop, meters)| {
            StopTime::new(&stop.id, Time::from_seconds(8 * 3600), Distance::from_meters(meters))
        })
        .collect();
    TripDetails::new("hop", common::SERVICE_DATE)
        .with_stops(stops)
        .with_schedule(TripSchedule::new(stop_times))
}

#[test]
fn status_computed_after_every_computation() {
    let details = straight_trip(3);
    let first = stop(&details, 0);
    let clock = Arc::new(ManualClock::new(at(28_800)));
    let count = Arc::new(AtomicUsize::new(0));
    let listeners = Listeners::new().on_status_computed(counting(&count));

    let tracker = TripTracker::with_config(
        Some(&first),
        details,
        listeners,
        TrackerConfig::default(),
        clock.clone(),
    );
    settle(&tracker);
    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert_eq!(tracker.next_stop_index(), 1);
    assert_eq!(tracker.distance_to_next_stop(), 300);

    clock.set(at(28_810));
    tracker.compute_trip_status(LocationFix::new(east(100.0), at(28_810)));
    settle(&tracker);
    assert_eq!(count.load(Ordering::SeqCst), 2);
    assert_eq!(tracker.distance_to_next_stop(), 200);
    assert_eq!(tracker.phase(), TrackingPhase::Tracking);

    // Off the trip: nothing changes, but the caller still hears about it
    clock.set(at(28_820));
    tracker.compute_trip_status(LocationFix::new(Coordinate::new(59.2, 18.0), at(28_820)));
    settle(&tracker);
    assert_eq!(count.load(Ordering::SeqCst), 3);
    assert_eq!(tracker.distance_to_next_stop(), 200);
    assert_eq!(tracker.trip_status().last_location_update_time, Some(at(28_810)));
}

#[test]
fn close_to_stop_and_end_of_trip() {
    let details = straight_trip(3);
    let first = stop(&details, 0);
    let clock = Arc::new(ManualClock::new(at(28_800)));
    let reached = Arc::new(Mutex::new(Vec::new()));
    let listeners = {
        let reached = reached.clone();
        Listeners::new().on_close_to_stop(
            move |stop: &Stop, stop_time: &StopTime, _: &ShapeMatch| {
                assert_eq!(stop.id, stop_time.stop_id);
                reached.lock().unwrap().push(stop.id.to_string());
            },
        )
    };

    let tracker = TripTracker::with_config(
        Some(&first),
        details,
        listeners,
        TrackerConfig::default(),
        clock.clone(),
    );
    settle(&tracker);

    for (seconds, meters) in [(28_830, 290.0), (28_835, 295.0), (28_900, 600.0)] {
        clock.set(at(seconds));
        tracker.compute_trip_status(LocationFix::new(east(meters), at(seconds)));
        settle(&tracker);
    }

    assert_eq!(*reached.lock().unwrap(), vec!["s1", "s2"]);
    assert!(tracker.has_trip_ended());
    assert_eq!(tracker.current_stop().unwrap().id.as_ref(), "s2");
    assert_eq!(tracker.next_stop().unwrap().id.as_ref(), "s2");
    assert!(tracker.distance_travelled() > Distance::from_meters(590.0));
}

#[test]
fn fixes_arriving_mid_computation_are_dropped() {
    let details = straight_trip(3);
    let first = stop(&details, 0);
    let clock = Arc::new(ManualClock::new(at(28_800)));
    let count = Arc::new(AtomicUsize::new(0));
    let (gate, gate_rx) = mpsc::channel::<()>();
    let listeners = {
        let count = count.clone();
        let gate_rx = Mutex::new(gate_rx);
        Listeners::new().on_status_computed(move |_: &TripTracker| {
            count.fetch_add(1, Ordering::SeqCst);
            let _ = gate_rx.lock().unwrap().recv();
        })
    };

    let tracker = TripTracker::with_config(
        Some(&first),
        details,
        listeners,
        TrackerConfig::default(),
        clock.clone(),
    );
    assert!(tracker.is_computing());

    clock.set(at(28_810));
    tracker.compute_trip_status(LocationFix::new(east(100.0), at(28_810)));
    gate.send(()).unwrap();
    settle(&tracker);
    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert_eq!(tracker.distance_to_next_stop(), 300);

    gate.send(()).unwrap();
    tracker.compute_trip_status(LocationFix::new(east(100.0), at(28_810)));
    settle(&tracker);
    assert_eq!(count.load(Ordering::SeqCst), 2);
    assert_eq!(tracker.distance_to_next_stop(), 200);
}

#[test]
fn destroy_silences_listeners() {
    let details = short_hop_trip();
    let first = details.stop_by_id("a").cloned().unwrap();
    let count = Arc::new(AtomicUsize::new(0));
    let (entered, entered_rx) = mpsc::channel::<()>();
    let (gate, gate_rx) = mpsc::channel::<()>();
    let listeners = {
        let entered = Mutex::new(entered);
        let gate_rx = Mutex::new(gate_rx);
        Listeners::new()
            .on_close_to_stop(move |_: &Stop, _: &StopTime, _: &ShapeMatch| {
                let _ = entered.lock().unwrap().send(());
                let _ = gate_rx.lock().unwrap().recv();
            })
            .on_status_computed(counting(&count))
    };

    let tracker = TripTracker::with_config(
        Some(&first),
        details,
        listeners,
        TrackerConfig::default(),
        ManualClock::new(at(28_800)),
    );
    entered_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    tracker.destroy();
    gate.send(()).unwrap();
    settle(&tracker);
    assert_eq!(count.load(Ordering::SeqCst), 0);

    tracker.compute_trip_status(LocationFix::new(east(100.0), at(28_810)));
    assert!(!tracker.is_computing());
    assert_eq!(count.load(Ordering::SeqCst), 0);
}

#[test]
fn dropping_the_tracker_destroys_it() {
    let details = short_hop_trip();
    let first = details.stop_by_id("a").cloned().unwrap();
    let count = Arc::new(AtomicUsize::new(0));
    let (entered, entered_rx) = mpsc::channel::<()>();
    let (gate, gate_rx) = mpsc::channel::<()>();
    let listeners = {
        let entered = Mutex::new(entered);
        let gate_rx = Mutex::new(gate_rx);
        Listeners::new()
            .on_close_to_stop(move |_: &Stop, _: &StopTime, _: &ShapeMatch| {
                let _ = entered.lock().unwrap().send(());
                let _ = gate_rx.lock().unwrap().recv();
            })
            .on_status_computed(counting(&count))
    };

    let tracker = TripTracker::with_config(
        Some(&first),
        details,
        listeners,
        TrackerConfig::default(),
        ManualClock::new(at(28_800)),
    );
    entered_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    drop(tracker);
    gate.send(()).unwrap();
    thread::sleep(Duration::from_millis(100));
    assert_eq!(count.load(Ordering::SeqCst), 0);
}

#[test]
fn panicking_listener_does_not_stall_tracker() {
    let details = straight_trip(3);
    let first = stop(&details, 0);
    let clock = Arc::new(ManualClock::new(at(28_800)));
    let count = Arc::new(AtomicUsize::new(0));
    let listeners = {
        let count = count.clone();
        Listeners::new().on_status_computed(move |_: &TripTracker| {
            if count.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("listener failed");
            }
        })
    };

    let tracker = TripTracker::with_config(
        Some(&first),
        details,
        listeners,
        TrackerConfig::default(),
        clock.clone(),
    );
    settle(&tracker);
    assert_eq!(count.load(Ordering::SeqCst), 1);

    clock.set(at(28_810));
    tracker.compute_trip_status(LocationFix::new(east(100.0), at(28_810)));
    settle(&tracker);
    assert_eq!(count.load(Ordering::SeqCst), 2);
    assert_eq!(tracker.distance_to_next_stop(), 200);
}

#[test]
fn untrackable_trip_never_starts() {
    let count = Arc::new(AtomicUsize::new(0));
    let listeners = Listeners::new().on_status_computed(counting(&count));
    let tracker = TripTracker::new(None, straight_trip(3), listeners);

    assert!(!tracker.is_computing());
    assert!(tracker.has_trip_ended());
    assert_eq!(tracker.phase(), TrackingPhase::Ended);
    assert_eq!(tracker.current_stop(), None);
    assert_eq!(count.load(Ordering::SeqCst), 0);
}

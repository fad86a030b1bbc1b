use checkin_estimator::{BackendKind, CheckinTracker, EstimatorStore, StoreConfig};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = StoreConfig::new().with_backend(BackendKind::Atomic);
    let tracker = CheckinTracker::new(EstimatorStore::new(config).unwrap());

    for email in ["a@x.com", "b@x.com", "a@x.com"] {
        let body = tracker.check_in("epcot", email);
        println!("{} checked in at epcot: {:?}", email, body);
    }
    println!("magic-kingdom = {:?}", tracker.check_in("magic-kingdom", "c@x.com"));

    for i in 0..10_000 {
        tracker.check_in("animal-kingdom", &format!("visitor{}@x.com", i));
    }
    println!("animal-kingdom = {:?}", tracker.location("animal-kingdom"));

    match tracker.multi_location("epcot+magic-kingdom+animal-kingdom") {
        Ok(total) => println!("union = {:?}", total),
        Err(e) => eprintln!("union failed: {}", e),
    }
    println!("locations = {:?}", tracker.locations());
}

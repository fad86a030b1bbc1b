#![no_main]

use checkin_estimator::{EstimatorStore, StoreConfig, StoreSnapshot};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(snapshot) = serde_json::from_slice::<StoreSnapshot>(data) {
        let config = StoreConfig::new().with_precision(snapshot.precision);
        if let Ok(store) = EstimatorStore::restore(config, snapshot) {
            store.add_to_key("epcot", b"a@x.com");
            assert!(store.count_key("epcot") > 0);
        }
    }
});

#![no_main]

use checkin_estimator::union::union;
use checkin_estimator::{EstimatorStore, StoreConfig};
use libfuzzer_sys::fuzz_target;
use wyhash::wyhash;

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    let split_index = wyhash(data, 0) as usize % data.len();
    let (first_half, second_half) = data.split_at(split_index);

    let store = EstimatorStore::new(StoreConfig::new().with_precision(8)).unwrap();
    for chunk in first_half.chunks(4) {
        store.add_to_key("lhs", chunk);
        assert!(store.count_key("lhs") > 0);
    }
    for chunk in second_half.chunks(4) {
        store.add_to_key("rhs", chunk);
        assert!(store.count_key("rhs") > 0);
    }

    let merged = store.union_registers(["lhs", "rhs"]).unwrap();
    if let (Some(lhs), Some(rhs)) = (store.registers("lhs"), store.registers("rhs")) {
        assert_eq!(merged, union([&rhs, &lhs]).unwrap());
    }
});

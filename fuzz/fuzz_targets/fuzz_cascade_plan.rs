#![no_main]

use fitment::core::CascadeQuery;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };
    let mut parts = s.splitn(4, '|').map(|p| (!p.is_empty()).then(|| p.to_string()));
    let query = CascadeQuery {
        year: parts.next().flatten(),
        make: parts.next().flatten(),
        model: parts.next().flatten(),
        style: parts.next().flatten(),
    };
    let _ = fitment::resolve::plan(&query);
    let _ = fitment::resolve::applied_selection(&query);
    let _ = fitment::core::normalize_vin(s);
});

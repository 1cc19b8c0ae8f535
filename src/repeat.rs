/// Calls `callback` `times` times.
pub fn repeat(times: u64, mut callback: impl FnMut()) {
    for _ in 0..times {
        callback();
    }
}

/// Calls `callback` with every index in `0..times`.
pub fn repeat_indexed(times: u64, callback: impl FnMut(u64)) {
    (0..times).for_each(callback);
}

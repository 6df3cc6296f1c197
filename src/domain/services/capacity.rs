/// Available capacity after total capacity moves from `old_total` to `new_total`,
/// keeping the units already consumed (`old_total - old_available`).
///
/// The result is clamped to `0..=new_total`. A negative `new_total` is treated as zero.
pub fn recompute_available(old_total: i32, old_available: i32, new_total: i32) -> i32 {
    let new_total = new_total.max(0);
    let consumed = (old_total - old_available).max(0);
    (new_total - consumed).clamp(0, new_total)
}

/// True when a slot with this state cannot be shrunk to `new_total` without
/// dropping below what is already reserved.
pub fn would_undercut_consumed(old_total: i32, old_available: i32, new_total: i32) -> bool {
    new_total < (old_total - old_available).max(0)
}

//! In-place Shell sort carrying payload and weight arrays.

/// Sorts `keys[..n]` ascending, applying every move to `payload` and
/// `weights` as well. The gap sequence is 3h+1 truncated by `n / 9`; the
/// sort is not stable and allocates nothing.
///
/// The payload is generic so class codes and regression responses share one
/// implementation.
pub fn shell_sort<T: Copy>(keys: &mut [f64], payload: &mut [T], weights: &mut [f64]) {
    let n = keys.len();
    debug_assert_eq!(n, payload.len());
    debug_assert_eq!(n, weights.len());
    let mut h = 1usize;
    while h <= n / 9 {
        h = 3 * h + 1;
    }
    while h > 0 {
        for i in h..n {
            let v = keys[i];
            let p = payload[i];
            let wt = weights[i];
            let mut j = i;
            while j >= h && keys[j - h] > v {
                keys[j] = keys[j - h];
                payload[j] = payload[j - h];
                weights[j] = weights[j - h];
                j -= h;
            }
            keys[j] = v;
            payload[j] = p;
            weights[j] = wt;
        }
        h /= 3;
    }
}

use crate::range::DateInterval;

/// Returns true if `inner` lies entirely within `outer`
///
/// Equal intervals contain each other. An empty `inner` is contained as long
/// as its anchor date falls within `outer`'s bounds.
pub fn contains(outer: &DateInterval, inner: &DateInterval) -> bool {
    outer.start() <= inner.start() && inner.end() <= outer.end()
}

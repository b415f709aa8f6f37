use crate::registry::Registry;

pub(super) const RELATIVE: &str = "relative";
pub(super) const MEDIA: &str = "media";

/// `relative`: seconds since the last reset. `media`: the external media position in
/// seconds. A non-zero explicit time is passed through by both.
pub(super) fn install(registry: &mut Registry) {
    registry.add_time_getter(RELATIVE, |engine, explicit| {
        if let Some(t) = explicit.filter(|t| *t != 0.0) {
            return t;
        }
        let base = engine.base_time(RELATIVE).unwrap_or(0.0);
        (engine.clock().now_ms() - base) / 1000.0
    });
    registry.add_time_getter(MEDIA, |engine, explicit| {
        if let Some(t) = explicit.filter(|t| *t != 0.0) {
            return t;
        }
        match engine.media_position_ms() {
            Some(ms) => ms / 1000.0,
            None => {
                tracing::warn!("no media position set");
                0.0
            }
        }
    });
    registry.add_initialiser("time", |engine, _| {
        engine.clear_base_times();
        Ok(())
    });
    registry.add_resetter("relativeTime", |engine, _| {
        let now = engine.clock().now_ms();
        engine.set_base_time(RELATIVE, now);
        Ok(())
    });
}

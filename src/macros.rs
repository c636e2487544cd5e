/// Emit an engine trace event at `info` when the block asked for logging,
/// `debug` otherwise.
macro_rules! engine_log {
    ($enabled:expr, $($arg:tt)+) => {
        if $enabled {
            ::tracing::info!($($arg)+)
        } else {
            ::tracing::debug!($($arg)+)
        }
    };
}

mod logging;
mod maths_utils;
mod time_utils;

pub use logging::init_log;
pub use time_utils::{
    TimeUtils, epoch_ms_to_date_string, epoch_ms_to_datetime, format_duration, now_utc,
    parse_date,
};

pub(crate) use maths_utils::{mean, sample_stddev, trailing_mean};

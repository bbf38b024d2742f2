use menucast_core::config::LrScheduleConfig;

/// Learning rate to use for the epoch after `epoch`.
///
/// ```
/// use menucast_core::config::LrScheduleConfig;
/// use menucast_trainer::schedule::lr_after_epoch;
///
/// let schedule = LrScheduleConfig::default();
/// assert_eq!(lr_after_epoch(0.01, 8, &schedule), 0.005);
/// assert_eq!(lr_after_epoch(0.01, 7, &schedule), 0.01);
/// ```
pub fn lr_after_epoch(lr: f64, epoch: usize, schedule: &LrScheduleConfig) -> f64 {
    if epoch > schedule.halve_until {
        schedule.floor
    } else if epoch % schedule.halve_every.max(1) == 0 {
        lr / 2.0
    } else {
        lr
    }
}

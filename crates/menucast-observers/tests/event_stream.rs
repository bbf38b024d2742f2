use menucast_core::error::ForecastError;
use menucast_observers::{
    read_events, read_series, tags, EventFileWriter, MemoryObserver, ObserverSet, ScalarObserver,
    EVENTS_FILE_NAME,
};

#[test]
fn test_write_then_read_events() {
    let dir = tempfile::tempdir().unwrap();
    {
        let mut writer = EventFileWriter::create(dir.path()).unwrap();
        writer.record(tags::LOSS_TRAIN, 0.5, 1).unwrap();
        writer.record(tags::LOSS_VALIDATION, 0.75, 1).unwrap();
        writer.record(tags::LOSS_TRAIN, 0.25, 2).unwrap();
        writer.flush().unwrap();
    }

    let events = read_events(dir.path()).unwrap();
    assert_eq!(events.len(), 3);
    assert_eq!(events[1].tag, tags::LOSS_VALIDATION);
    assert_eq!(events[1].value, 0.75);

    let train = read_series(dir.path(), tags::LOSS_TRAIN).unwrap();
    assert_eq!(train, vec![(1, 0.5), (2, 0.25)]);
}

#[test]
fn test_reopening_appends() {
    let dir = tempfile::tempdir().unwrap();
    {
        let mut writer = EventFileWriter::create(dir.path()).unwrap();
        writer.record(tags::MIN_RMSE, 3.0, 1).unwrap();
    }
    {
        let mut writer = EventFileWriter::create(dir.path()).unwrap();
        writer.record(tags::MIN_RMSE, 2.0, 2).unwrap();
    }
    let series = read_series(dir.path(), tags::MIN_RMSE).unwrap();
    assert_eq!(series, vec![(1, 3.0), (2, 2.0)]);
}

#[test]
fn test_non_finite_values_read_back_as_nan() {
    let dir = tempfile::tempdir().unwrap();
    {
        let mut writer = EventFileWriter::create(dir.path()).unwrap();
        writer.record(tags::LOSS_TRAIN, f64::NAN, 1).unwrap();
    }
    let events = read_events(dir.path()).unwrap();
    assert!(events[0].value.is_nan());
}

#[test]
fn test_malformed_line_is_a_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(EVENTS_FILE_NAME), "{\"tag\": 1}\n").unwrap();
    assert!(matches!(
        read_events(dir.path()),
        Err(ForecastError::Parse { .. })
    ));
}

#[test]
fn test_missing_stream_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(read_events(dir.path()), Err(ForecastError::Io { .. })));
}

#[test]
fn test_observer_set_fans_out() {
    let dir = tempfile::tempdir().unwrap();
    let mut set = ObserverSet::new();
    set.attach(Box::new(EventFileWriter::create(dir.path()).unwrap()));
    set.attach(Box::new(MemoryObserver::new()));
    assert_eq!(set.len(), 2);

    set.record(tags::MAE_VALIDATION, 1.25, 4).unwrap();
    set.flush().unwrap();

    let series = read_series(dir.path(), tags::MAE_VALIDATION).unwrap();
    assert_eq!(series, vec![(4, 1.25)]);
}

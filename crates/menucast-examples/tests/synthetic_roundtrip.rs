use menucast_core::backend::CpuTrainBackend;
use menucast_core::config::TrainerConfig;
use menucast_examples::{dictionary_paths, generate, load_or_generate, SyntheticConfig};
use menucast_trainer::report::{load_dictionary, ERRORS_FILE};
use menucast_trainer::{ForecastDataset, GraphForecastPipeline};

fn small() -> SyntheticConfig {
    SyntheticConfig {
        num_entities: 4,
        num_days: 30,
        window: 5,
        horizon: 2,
        ..Default::default()
    }
}

#[test]
fn test_saved_dataset_loads_back() {
    let dir = tempfile::tempdir().unwrap();
    let demand = generate(&small()).unwrap();
    demand.save(dir.path()).unwrap();

    let loaded = ForecastDataset::load_dir(dir.path()).unwrap();
    assert_eq!(loaded.train.data, demand.dataset.train.data);
    assert_eq!(loaded.adjacency, demand.dataset.adjacency);

    let (entities, dates) = dictionary_paths(dir.path());
    assert_eq!(load_dictionary(&entities).unwrap(), demand.entities);
    assert_eq!(load_dictionary(&dates).unwrap(), demand.dates);
}

#[test]
fn test_generate_then_train_and_report() {
    let data_dir = tempfile::tempdir().unwrap();
    let work_dir = tempfile::tempdir().unwrap();
    let dataset = load_or_generate(data_dir.path(), &small()).unwrap();
    let demand = generate(&small()).unwrap();

    let (entities, dates) = dictionary_paths(data_dir.path());
    let config = TrainerConfig::default()
        .with_work_dir(work_dir.path())
        .with_dictionaries(entities, dates)
        .with_epochs(3)
        .with_node_batch_size(2)
        .with_seed(3);
    let mut pipeline =
        GraphForecastPipeline::<CpuTrainBackend>::new(config, &dataset, Default::default()).unwrap();
    let report = pipeline.train().unwrap();
    assert_eq!(report.epochs.len(), 2);

    let forecast = pipeline.test(demand.test_start, None, 30).unwrap();
    assert_eq!(forecast.entities.len(), 4);
    assert!(report.run_dir.join(ERRORS_FILE).is_file());
}

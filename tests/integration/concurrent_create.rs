use nbcontents::config::{CheckpointBackend, ContentsConfig, StorageBackend};
use nbcontents::ContentsService;
use std::collections::HashSet;
use std::fs;
use std::sync::{Arc, Barrier};
use std::thread;
use tempfile::TempDir;

const THREADS: usize = 8;

/// Start every thread at once and collect the names they were handed.
fn race<F>(service: Arc<ContentsService>, action: F) -> Vec<String>
where
    F: Fn(&ContentsService) -> String + Send + Sync + 'static,
{
    let barrier = Arc::new(Barrier::new(THREADS));
    let action = Arc::new(action);
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let service = service.clone();
            let barrier = barrier.clone();
            let action = action.clone();
            thread::spawn(move || {
                barrier.wait();
                action(&service)
            })
        })
        .collect();
    handles.into_iter().map(|h| h.join().unwrap()).collect()
}

fn filesystem_service(temp: &TempDir) -> Arc<ContentsService> {
    let mut config = ContentsConfig::default();
    config.storage.root_dir = temp.path().to_path_buf();
    config.checkpoints.backend = CheckpointBackend::None;
    Arc::new(ContentsService::from_config(&config).unwrap())
}

fn assert_distinct(names: &[String]) {
    let unique: HashSet<&String> = names.iter().collect();
    assert_eq!(unique.len(), names.len(), "duplicate names: {:?}", names);
}

#[test]
fn concurrent_create_notebook_never_collides_on_disk() {
    for _ in 0..5 {
        let temp = TempDir::new().unwrap();
        let service = filesystem_service(&temp);

        let names = race(service, |service| service.create_notebook("/").unwrap().name);
        assert_distinct(&names);

        let on_disk = fs::read_dir(temp.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| !entry.file_name().to_string_lossy().starts_with('.'))
            .count();
        assert_eq!(on_disk, THREADS);
    }
}

#[test]
fn concurrent_copy_notebook_never_collides_in_memory() {
    let mut config = ContentsConfig::default();
    config.storage.root_dir = "/mem".into();
    config.storage.backend = StorageBackend::Memory;
    config.checkpoints.backend = CheckpointBackend::Memory;
    let service = Arc::new(ContentsService::from_config(&config).unwrap());
    service.create_notebook("work").unwrap();

    let names = race(service.clone(), |service| {
        service
            .copy_notebook("work", "Untitled0.ipynb")
            .unwrap()
            .name
    });
    assert_distinct(&names);
    assert_eq!(service.list("work").unwrap().len(), THREADS + 1);
}

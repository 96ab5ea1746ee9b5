//! End-to-end loading through the executor and controller queue.

use std::fs;
use std::sync::Mutex;

use tripaint_config::LoaderConfig;
use tripaint_loading::{
    ControllerQueue, Executor, LoadError, LoadOutcome, LoadSource, LoadVerdict, LoadingPipeline,
    SourceFormat, Stage, Task, WorkerPool, save_project,
};
use tripaint_mesh::{ColorIndex, Palette, TriangleId};

/// Holds tasks until the test decides to run them
#[derive(Default)]
struct ManualExecutor {
    tasks: Mutex<Vec<Task>>,
}

impl ManualExecutor {
    fn run_all(&self) -> usize {
        let tasks: Vec<Task> = self.tasks.lock().unwrap().drain(..).collect();
        let count = tasks.len();
        for task in tasks {
            task();
        }
        count
    }
}

impl Executor for ManualExecutor {
    fn enqueue(&self, task: Task) {
        self.tasks.lock().unwrap().push(task);
    }

    fn worker_count(&self) -> usize {
        2
    }
}

fn pipeline() -> LoadingPipeline {
    let palette = Palette::new(vec![[1.0; 4], [1.0, 0.0, 0.0, 1.0]]).unwrap();
    LoadingPipeline::new(LoaderConfig::default(), palette)
}

fn obj(name: &str, text: &str) -> LoadSource {
    LoadSource::Bytes {
        name: name.to_string(),
        format: SourceFormat::Obj,
        data: text.as_bytes().to_vec(),
    }
}

const TRIANGLE: &str = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";

/// Three triangles around the edge (v0, v1)
const THREE_WAY_EDGE: &str = "v 0 0 0
v 1 0 0
v 0.5 1 0
v 0.5 -1 0
v 0.5 0 1
f 1 2 3
f 2 1 4
f 2 1 5
";

/// Load with the manual executor and return the delivered outcome
fn load(pipeline: &mut LoadingPipeline, source: LoadSource) -> LoadOutcome {
    let executor = ManualExecutor::default();
    let mut queue: ControllerQueue<Vec<LoadOutcome>> = ControllerQueue::new();
    pipeline
        .begin_load(source, &executor, &queue.handle(), |done, outcome| {
            done.push(outcome)
        })
        .unwrap();
    assert_eq!(executor.run_all(), 1);

    let mut delivered = Vec::new();
    assert_eq!(queue.pump(&mut delivered), 1);
    delivered.pop().unwrap()
}

#[test]
fn test_single_triangle_succeeds() {
    let mut pipeline = pipeline();
    let outcome = load(&mut pipeline, obj("triangle.obj", TRIANGLE));

    assert_eq!(outcome.verdict(), LoadVerdict::Complete);
    for stage in Stage::ALL {
        assert_eq!(outcome.progress.get(stage), 1.0);
    }
    let loaded = outcome.result.unwrap();
    assert!(loaded.store.capabilities().solid);
    assert!(!pipeline.is_loading());
}

#[test]
fn test_empty_input_fails_first_stage() {
    let mut pipeline = pipeline();
    let outcome = load(&mut pipeline, obj("points.obj", "v 0 0 0\nv 1 0 0\n"));

    assert!(outcome.progress.get(Stage::ParseRender) < 1.0);
    assert_eq!(outcome.verdict(), LoadVerdict::Failed(Stage::ParseRender));
    assert!(matches!(outcome.result, Err(LoadError::EmptyMesh)));
}

#[test]
fn test_three_way_edge_degrades() {
    let mut pipeline = pipeline();
    let outcome = load(&mut pipeline, obj("fin.obj", THREE_WAY_EDGE));

    assert_eq!(outcome.progress.get(Stage::ParseRender), 1.0);
    assert_eq!(outcome.progress.get(Stage::Compute), 1.0);
    assert_eq!(outcome.progress.get(Stage::Spatial), 1.0);
    assert!(outcome.progress.get(Stage::Manifold) < 1.0);
    assert_eq!(outcome.verdict(), LoadVerdict::Degraded);
    assert!(matches!(outcome.warning(), Some(LoadError::Manifold(_))));

    let loaded = outcome.result.unwrap();
    assert!(!loaded.store.capabilities().solid);
    assert_eq!(loaded.store.adjacency().non_manifold_edges().len(), 1);
}

#[test]
fn test_second_load_rejected_while_in_flight() {
    let mut pipeline = pipeline();
    let executor = ManualExecutor::default();
    let mut queue: ControllerQueue<Vec<LoadOutcome>> = ControllerQueue::new();
    let handle = queue.handle();

    let first = pipeline
        .begin_load(obj("first.obj", TRIANGLE), &executor, &handle, |done, o| done.push(o))
        .unwrap();
    assert!(pipeline.is_loading());

    let second = pipeline.begin_load(obj("second.obj", THREE_WAY_EDGE), &executor, &handle, |done, o| {
        done.push(o)
    });
    assert!(matches!(second, Err(LoadError::Busy)));

    // Still busy after the worker finished, until the continuation runs
    assert_eq!(executor.run_all(), 1);
    assert!(pipeline.is_loading());

    let mut delivered = Vec::new();
    assert_eq!(queue.pump(&mut delivered), 1);
    assert!(!pipeline.is_loading());
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].ticket, first);
    assert_eq!(delivered[0].source, "first.obj");

    // The slot is free again
    assert!(
        pipeline
            .begin_load(obj("third.obj", TRIANGLE), &executor, &handle, |done, o| done.push(o))
            .is_ok()
    );
}

#[test]
fn test_progress_visible_while_running() {
    let mut pipeline = pipeline();
    let executor = ManualExecutor::default();
    let queue: ControllerQueue<Vec<LoadOutcome>> = ControllerQueue::new();
    pipeline
        .begin_load(obj("a.obj", TRIANGLE), &executor, &queue.handle(), |done, o| done.push(o))
        .unwrap();
    assert_eq!(pipeline.progress().overall(), 0.0);

    let poller = pipeline.progress_handle();
    executor.run_all();
    assert_eq!(poller.snapshot().overall(), 1.0);
}

#[test]
fn test_corrupt_project_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.p3d");
    fs::write(&path, b"definitely not a project").unwrap();

    let mut pipeline = pipeline();
    let outcome = load(&mut pipeline, LoadSource::Path(path.clone()));
    assert!(matches!(outcome.result, Err(LoadError::CorruptProject(_))));
    assert_eq!(outcome.verdict(), LoadVerdict::Failed(Stage::ParseRender));
    assert_eq!(outcome.path, Some(path));
}

#[test]
fn test_missing_file_and_unknown_extension() {
    let dir = tempfile::tempdir().unwrap();
    let mut pipeline = pipeline();

    let outcome = load(&mut pipeline, LoadSource::Path(dir.path().join("missing.obj")));
    assert!(matches!(outcome.result, Err(LoadError::Format(_))));

    let outcome = load(&mut pipeline, LoadSource::Path(dir.path().join("model.fbx")));
    assert!(matches!(outcome.result, Err(LoadError::Format(_))));
}

#[test]
fn test_project_round_trip_on_worker_pool() {
    let dir = tempfile::tempdir().unwrap();
    let mesh_path = dir.path().join("quad.obj");
    fs::write(&mesh_path, "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n").unwrap();

    let pool = WorkerPool::new(2).unwrap();
    let mut queue: ControllerQueue<Vec<LoadOutcome>> = ControllerQueue::new();
    let mut pipeline = pipeline();

    let mut wait_for = |pipeline: &mut LoadingPipeline, source: LoadSource| {
        pipeline
            .begin_load(source, &pool, &queue.handle(), |done, o| done.push(o))
            .unwrap();
        let mut delivered = Vec::new();
        for task in queue.wait_pending() {
            task(&mut delivered);
        }
        delivered.pop().unwrap()
    };

    let mut store = wait_for(&mut pipeline, LoadSource::Path(mesh_path))
        .result
        .unwrap()
        .store;
    store.set_color(TriangleId(1), ColorIndex(1)).unwrap();

    let project_path = dir.path().join("quad.p3d");
    save_project(&store, &project_path).unwrap();

    let reloaded = wait_for(&mut pipeline, LoadSource::Path(project_path)).result.unwrap();
    assert!(reloaded.from_project);
    assert_eq!(reloaded.store.colors(), store.colors());
    assert_eq!(reloaded.store.vertices(), store.vertices());
    assert_eq!(reloaded.store.triangles(), store.triangles());
    assert_eq!(reloaded.store.palette(), store.palette());
}

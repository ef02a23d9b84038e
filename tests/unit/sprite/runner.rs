use std::time::Duration;

use image::RgbaImage;

use super::*;
use crate::sprite::atlas::CapturedFrame;

fn job() -> FlattenJob {
    FlattenJob::new(
        ContentKey { hi: 0, lo: 1 },
        SceneNode::group("empty"),
        FlattenOptions {
            resolution: 2,
            frame_count: 1,
            animation_states: vec![AnimationState::Idle],
            directions: vec![Direction::Left, Direction::Right],
        },
    )
}

/// Packs blank frames, reporting progress per direction.
struct BlankGenerator;

impl AtlasGenerator for BlankGenerator {
    fn generate(
        &self,
        job: &FlattenJob,
        progress: &mut dyn FnMut(FlattenProgress),
    ) -> ForgeResult<SpriteAtlas> {
        let mut caps = Vec::new();
        for (i, &direction) in job.options.directions.iter().enumerate() {
            caps.push(CapturedFrame {
                state: AnimationState::Idle,
                direction,
                frame_index: 0,
                image: RgbaImage::new(2, 2),
            });
            progress(FlattenProgress {
                completed: i + 1,
                total: job.options.directions.len(),
                state: AnimationState::Idle,
                direction,
            });
        }
        SpriteAtlas::pack(job.key, 2, 2, &caps)
    }
}

struct FailingGenerator;

impl AtlasGenerator for FailingGenerator {
    fn generate(&self, _: &FlattenJob, _: &mut dyn FnMut(FlattenProgress)) -> ForgeResult<SpriteAtlas> {
        Err(ForgeError::sprite("context lost"))
    }
}

struct PanickingGenerator;

impl AtlasGenerator for PanickingGenerator {
    fn generate(&self, _: &FlattenJob, _: &mut dyn FnMut(FlattenProgress)) -> ForgeResult<SpriteAtlas> {
        panic!("boom");
    }
}

/// Spins until cancelled.
struct StubbornGenerator;

impl AtlasGenerator for StubbornGenerator {
    fn generate(&self, job: &FlattenJob, _: &mut dyn FnMut(FlattenProgress)) -> ForgeResult<SpriteAtlas> {
        while !job.is_cancelled() {
            std::thread::sleep(Duration::from_millis(1));
        }
        Err(ForgeError::sprite("flatten job cancelled"))
    }
}

#[test]
fn sync_runner_reports_progress_inline() {
    let mut seen = Vec::new();
    let atlas = SyncTaskRunner
        .run(Arc::new(BlankGenerator), job(), &mut |p| seen.push(p.completed))
        .unwrap();
    assert_eq!(atlas.frames().len(), 2);
    assert_eq!(seen, vec![1, 2]);
}

#[test]
fn worker_runner_forwards_progress_and_result() {
    let mut seen = Vec::new();
    let atlas = WorkerTaskRunner
        .run(Arc::new(BlankGenerator), job(), &mut |p| seen.push(p.direction))
        .unwrap();
    assert_eq!(atlas.frames().len(), 2);
    assert_eq!(seen, vec![Direction::Left, Direction::Right]);
}

#[test]
fn generator_errors_pass_through_the_worker() {
    let err = WorkerTaskRunner
        .run(Arc::new(FailingGenerator), job(), &mut |_| {})
        .unwrap_err();
    assert!(matches!(err, ForgeError::SpriteGeneration(_)));
}

#[test]
fn worker_panics_become_channel_failures() {
    let err = WorkerTaskRunner
        .run(Arc::new(PanickingGenerator), job(), &mut |_| {})
        .unwrap_err();
    match err {
        ForgeError::WorkerChannel(msg) => assert!(msg.contains("boom")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn terminate_stops_a_running_worker() {
    let handle = WorkerTaskRunner
        .spawn(Arc::new(StubbornGenerator), job())
        .unwrap();
    std::thread::sleep(Duration::from_millis(5));
    assert!(!handle.is_finished());
    handle.terminate();
}

#[test]
fn dropping_the_handle_cancels_the_job() {
    let j = job();
    let probe = j.clone();
    let handle = WorkerTaskRunner.spawn(Arc::new(StubbornGenerator), j).unwrap();
    drop(handle);
    assert!(probe.is_cancelled());
}

#[test]
fn runner_kind_resolution() {
    assert_ne!(TaskRunnerKind::detect(), TaskRunnerKind::Auto);
    assert_eq!(TaskRunnerKind::Sync.resolve(), TaskRunnerKind::Sync);
    assert_eq!(TaskRunnerKind::Auto.resolve(), TaskRunnerKind::detect());
    assert_eq!(
        serde_json::from_str::<TaskRunnerKind>("\"worker\"").unwrap(),
        TaskRunnerKind::Worker
    );
    let atlas = TaskRunnerKind::Sync
        .runner()
        .run(Arc::new(BlankGenerator), job(), &mut |_| {})
        .unwrap();
    assert_eq!(atlas.frames().len(), 2);
}

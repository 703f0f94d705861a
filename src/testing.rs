//! Test doubles for the landscape collaborators.

use crate::{
    config::LandscapeConfig,
    generator::{MeshGenerator, PatchReply, PatchRequest, PatchResult},
    node::LandscapeContext,
    patch::{MeshPatch, PatchError, PatchId, RawPatch},
    procedural::grid_patch,
    scene::LandscapeScene,
};
use bevy::{math::Vec3, utils::HashSet};
use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

/// A small landscape, where the root nodes subdivide exactly once.
pub(crate) fn test_config() -> LandscapeConfig {
    LandscapeConfig {
        view_distance: 1,
        cells_per_chunk: 4,
        section_width: 1000.0,
        lod_distance: 500.0,
        max_lod: 2,
        follow_viewer: false,
    }
}

/// A patch without any relief.
pub(crate) fn flat_patch(request: &PatchRequest) -> RawPatch {
    grid_patch(request, |_, _| 0.0, |_| [0.5; 3])
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SceneEvent {
    Attach(PatchId),
    Detach(PatchId),
    Release(PatchId),
}

/// Records all scene calls and rejects unbalanced ones.
#[derive(Default)]
pub(crate) struct RecordingScene {
    pub(crate) events: Vec<SceneEvent>,
    attached: HashSet<PatchId>,
}

impl RecordingScene {
    pub(crate) fn attached(&self) -> &HashSet<PatchId> {
        &self.attached
    }

    pub(crate) fn is_attached(&self, patch: PatchId) -> bool {
        self.attached.contains(&patch)
    }
}

impl LandscapeScene for RecordingScene {
    fn attach(&mut self, patch: &MeshPatch) {
        assert!(
            self.attached.insert(patch.id()),
            "{:?} attached twice",
            patch.id()
        );
        self.events.push(SceneEvent::Attach(patch.id()));
    }

    fn detach(&mut self, patch: &MeshPatch) {
        assert!(
            self.attached.remove(&patch.id()),
            "{:?} detached while not attached",
            patch.id()
        );
        self.events.push(SceneEvent::Detach(patch.id()));
    }

    fn release(&mut self, patch: &MeshPatch) {
        assert!(
            !self.attached.contains(&patch.id()),
            "{:?} released while attached",
            patch.id()
        );
        self.events.push(SceneEvent::Release(patch.id()));
    }
}

#[derive(Default)]
struct ManualState {
    history: Vec<PatchRequest>,
    outstanding: VecDeque<(PatchRequest, PatchReply)>,
}

/// A generator that only answers when told to, in request order.
#[derive(Clone, Default)]
pub(crate) struct ManualGenerator {
    state: Arc<Mutex<ManualState>>,
}

impl ManualGenerator {
    /// All requests received so far.
    pub(crate) fn requests(&self) -> Vec<PatchRequest> {
        self.state.lock().unwrap().history.clone()
    }

    pub(crate) fn outstanding(&self) -> usize {
        self.state.lock().unwrap().outstanding.len()
    }

    /// Answers the next request, returns whether the requesting node still existed.
    pub(crate) fn reply_next(&self, result: PatchResult) -> bool {
        let next = self.state.lock().unwrap().outstanding.pop_front();

        next.is_some_and(|(_, reply)| reply.send(result))
    }

    /// Answers the next `count` requests with flat patches.
    /// Returns the number of answers that were still wanted.
    pub(crate) fn resolve(&self, count: usize) -> usize {
        self.answer(count, |request| Ok(flat_patch(request)))
    }

    pub(crate) fn resolve_all(&self) -> usize {
        self.resolve(usize::MAX)
    }

    pub(crate) fn fail(&self, count: usize) -> usize {
        self.answer(count, |_| {
            Err(PatchError::Generator {
                message: "out of memory".to_string(),
            })
        })
    }

    fn answer(&self, count: usize, result: impl Fn(&PatchRequest) -> PatchResult) -> usize {
        let answers = {
            let mut state = self.state.lock().unwrap();
            let count = count.min(state.outstanding.len());
            state.outstanding.drain(..count).collect::<Vec<_>>()
        };

        answers
            .into_iter()
            .map(|(request, reply)| reply.send(result(&request)))
            .filter(|&delivered| delivered)
            .count()
    }
}

impl MeshGenerator for ManualGenerator {
    fn request(&self, request: PatchRequest, reply: PatchReply) {
        let mut state = self.state.lock().unwrap();
        state.history.push(request);
        state.outstanding.push_back((request, reply));
    }
}

/// A generator answering every request before it returns.
#[derive(Clone, Copy, Default)]
pub(crate) struct ImmediateGenerator;

impl MeshGenerator for ImmediateGenerator {
    fn request(&self, request: PatchRequest, reply: PatchReply) {
        reply.send(Ok(flat_patch(&request)));
    }
}

/// Owns everything a [`LandscapeContext`] borrows.
pub(crate) struct Harness {
    pub(crate) config: LandscapeConfig,
    pub(crate) generator: ManualGenerator,
    pub(crate) scene: RecordingScene,
    next_patch: u64,
}

impl Default for Harness {
    fn default() -> Self {
        Self {
            config: test_config(),
            generator: ManualGenerator::default(),
            scene: RecordingScene::default(),
            next_patch: 0,
        }
    }
}

impl Harness {
    pub(crate) fn context(&mut self, viewer: Vec3) -> LandscapeContext<'_> {
        LandscapeContext {
            config: &self.config,
            generator: &self.generator,
            scene: &mut self.scene,
            viewer,
            next_patch: &mut self.next_patch,
        }
    }
}

//! Pairing of queued scenes into (pre, post) comparisons
//!
//! The queue is walked as a stack from its end. The first scene popped is the
//! `post` candidate; every following pop is a `pre` candidate:
//!
//! * same tile as `post`: the pair is emitted, then `pre` becomes the next
//!   `post`, so consecutive acquisitions of one tile chain into consecutive
//!   comparisons.
//! * different tile: the `pre` candidate is dropped and `post` is kept.
//!
//! Dropping on a tile change means a scene whose tile differs from the current
//! `post` is never compared, even if a later pop would have matched it.

use crate::types::{BurnError, BurnResult, SceneRecord, ScenePair};

/// States of the pairing walk
#[derive(Debug, Clone, PartialEq)]
pub enum PairingState {
    AwaitingPost,
    AwaitingPre { post: SceneRecord },
    PairReady { pre: SceneRecord, post: SceneRecord },
    DrainMismatch { pre: SceneRecord, post: SceneRecord },
    Done,
}

/// Stack walker producing scene pairs one at a time
#[derive(Debug, Clone)]
pub struct PairingMachine {
    stack: Vec<SceneRecord>,
    state: PairingState,
    checklist: Vec<SceneRecord>,
    dropped: Vec<SceneRecord>,
}

impl PairingMachine {
    /// Set up the walk over a tile/date sorted queue.
    ///
    /// Scenes of `min_size_gib` or less are partial-coverage acquisitions and
    /// are removed first. Fewer than two remaining scenes is fatal.
    pub fn new(queue: Vec<SceneRecord>, min_size_gib: f64) -> BurnResult<Self> {
        let stack: Vec<SceneRecord> = queue
            .into_iter()
            .filter(|record| {
                let full = record.size_gib > min_size_gib;
                if !full {
                    log::debug!(
                        "Skipping partial scene {} ({:.3} GiB)",
                        record.file_name,
                        record.size_gib
                    );
                }
                full
            })
            .collect();

        if stack.len() < 2 {
            log::error!("Too few images supplied for processing");
            return Err(BurnError::TooFewScenes { found: stack.len() });
        }

        Ok(Self {
            checklist: stack.clone(),
            stack,
            state: PairingState::AwaitingPost,
            dropped: Vec::new(),
        })
    }

    pub fn state(&self) -> &PairingState {
        &self.state
    }

    /// Every size-filtered scene taking part in this walk, in queue order
    pub fn checklist(&self) -> &[SceneRecord] {
        &self.checklist
    }

    /// Scenes to record as processed at the end of the run.
    ///
    /// The first `post` candidate (the newest scene of the last tile) is left
    /// out so the next run offers it again as a partner for newer scenes.
    pub fn history_records(&self) -> &[SceneRecord] {
        let keep = self.checklist.len().saturating_sub(1);
        &self.checklist[..keep]
    }

    /// Scenes dropped because their tile differed from the current `post`
    pub fn dropped(&self) -> &[SceneRecord] {
        &self.dropped
    }

    pub fn is_done(&self) -> bool {
        self.state == PairingState::Done
    }

    /// Perform one transition. Returns false once the walk is done.
    pub fn step(&mut self) -> bool {
        let state = std::mem::replace(&mut self.state, PairingState::Done);
        self.state = match state {
            PairingState::AwaitingPost => match self.stack.pop() {
                Some(post) => {
                    log::debug!("Post candidate: {}", post.file_name);
                    PairingState::AwaitingPre { post }
                }
                None => PairingState::Done,
            },
            PairingState::AwaitingPre { post } => match self.stack.pop() {
                Some(pre) if pre.tile_id == post.tile_id => PairingState::PairReady { pre, post },
                Some(pre) => PairingState::DrainMismatch { pre, post },
                None => PairingState::Done,
            },
            // the pair has been handed out; its pre scene is the next post
            PairingState::PairReady { pre, .. } => PairingState::AwaitingPre { post: pre },
            PairingState::DrainMismatch { pre, post } => {
                log::warn!(
                    "Dropping {}: tile {} does not match post scene tile {}",
                    pre.file_name,
                    pre.tile_id,
                    post.tile_id
                );
                self.dropped.push(pre);
                PairingState::AwaitingPre { post }
            }
            PairingState::Done => PairingState::Done,
        };
        !self.is_done()
    }
}

impl Iterator for PairingMachine {
    type Item = ScenePair;

    /// Advance to the next pair. The previous pair must be fully processed
    /// before calling again, since its `pre` scene is carried forward.
    fn next(&mut self) -> Option<ScenePair> {
        while self.step() {
            if let PairingState::PairReady { pre, post } = &self.state {
                return Some(ScenePair {
                    pre: pre.clone(),
                    post: post.clone(),
                });
            }
        }
        None
    }
}

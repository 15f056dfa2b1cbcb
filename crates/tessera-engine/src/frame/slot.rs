use crate::device::{RenderDevice, SubmissionId};
use crate::render::FramePlan;
use crate::resources::Retired;

/// Lifecycle of one frame slot.
///
/// `Idle → Recording → Submitted → Complete → Idle`
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SlotState {
    Idle,
    Recording,
    Submitted,
    Complete,
}

pub struct FrameSlot<D: RenderDevice> {
    index: usize,
    state: SlotState,
    submission: Option<SubmissionId>,
    plan: Option<FramePlan<D>>,
    retired: Vec<Retired<D>>,
}

impl<D: RenderDevice> FrameSlot<D> {
    pub(super) fn new(index: usize) -> Self {
        Self {
            index,
            state: SlotState::Idle,
            submission: None,
            plan: None,
            retired: Vec::new(),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn state(&self) -> SlotState {
        self.state
    }

    pub fn submission(&self) -> Option<SubmissionId> {
        self.submission
    }

    pub(super) fn begin_recording(&mut self) {
        debug_assert_eq!(self.state, SlotState::Idle);
        self.state = SlotState::Recording;
    }

    /// Recording failed before anything reached the GPU.
    pub(super) fn abort_recording(&mut self) {
        debug_assert_eq!(self.state, SlotState::Recording);
        self.state = SlotState::Idle;
    }

    pub(super) fn mark_submitted(
        &mut self,
        submission: SubmissionId,
        plan: FramePlan<D>,
        retired: Vec<Retired<D>>,
    ) {
        debug_assert_eq!(self.state, SlotState::Recording);
        self.state = SlotState::Submitted;
        self.submission = Some(submission);
        self.plan = Some(plan);
        self.retired = retired;
    }

    /// Completes the slot: drops its plan, then releases its retire list.
    ///
    /// Returns the number of versions handed back to the device.
    pub(super) fn complete(&mut self, device: &mut D) -> usize {
        debug_assert_eq!(self.state, SlotState::Submitted);
        self.state = SlotState::Complete;
        self.plan = None;
        let released = self
            .retired
            .drain(..)
            .map(|r| r.release(device))
            .filter(|&ok| ok)
            .count();
        self.submission = None;
        self.state = SlotState::Idle;
        released
    }

    /// Drops everything without talking to the device.
    pub(super) fn abandon(&mut self) {
        self.plan = None;
        self.retired.clear();
        self.submission = None;
        self.state = SlotState::Idle;
    }
}

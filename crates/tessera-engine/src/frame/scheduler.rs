use std::collections::VecDeque;

use super::slot::{FrameSlot, SlotState};
use crate::config::MAX_FRAMES_IN_FLIGHT;
use crate::device::{RenderDevice, SubmissionId};
use crate::error::Result;
use crate::render::FramePlan;
use crate::resources::Retired;

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub frames_submitted: u64,
    pub frames_completed: u64,
    /// `acquire` calls that had to block on the oldest frame.
    pub backpressure_waits: u64,
    pub resources_released: u64,
    pub in_flight: usize,
}

/// Fixed pool of frame slots plus the pending-release list.
pub struct FrameScheduler<D: RenderDevice> {
    slots: Vec<FrameSlot<D>>,
    /// Submitted slot indices, oldest first.
    in_flight: VecDeque<usize>,
    /// Retired versions not yet attached to a submission.
    pending: Vec<Retired<D>>,
    next_frame: u64,
    stats: FrameStats,
}

impl<D: RenderDevice> FrameScheduler<D> {
    pub fn new(slot_count: usize) -> Self {
        let n = slot_count.clamp(1, MAX_FRAMES_IN_FLIGHT);
        Self {
            slots: (0..n).map(FrameSlot::new).collect(),
            in_flight: VecDeque::with_capacity(n),
            pending: Vec::new(),
            next_frame: 0,
            stats: FrameStats::default(),
        }
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn slot_state(&self, slot: usize) -> Option<SlotState> {
        self.slots.get(slot).map(FrameSlot::state)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn pending_releases(&self) -> usize {
        self.pending.len()
    }

    pub fn stats(&self) -> FrameStats {
        FrameStats {
            in_flight: self.in_flight.len(),
            ..self.stats
        }
    }

    /// Index the next recorded frame gets.
    pub fn next_frame_index(&self) -> u64 {
        self.next_frame
    }

    /// Claims a slot for recording.
    ///
    /// Completed frames are reaped first. If every slot is still in flight this blocks on
    /// the oldest submission only.
    pub fn acquire(&mut self, device: &mut D) -> Result<usize> {
        self.reap(device)?;

        if let Some(idle) = self.slots.iter().position(|s| s.state() == SlotState::Idle) {
            self.slots[idle].begin_recording();
            return Ok(idle);
        }

        let Some(&oldest) = self.in_flight.front() else {
            // every slot was left recording by an abandoned render
            log::warn!("reclaiming slot 0 from an abandoned recording");
            self.slots[0].abort_recording();
            self.slots[0].begin_recording();
            return Ok(0);
        };
        let submission = self.submission_of(oldest);
        log::debug!("all {} slots busy; waiting on {submission:?}", self.slots.len());
        self.stats.backpressure_waits += 1;
        device.wait(submission)?;
        self.complete_oldest(device);

        self.slots[oldest].begin_recording();
        Ok(oldest)
    }

    /// Submits `plan` from a recording slot.
    ///
    /// The slot takes ownership of the plan and every pending release. On failure the slot
    /// returns to idle and pending releases stay queued.
    pub fn submit(&mut self, slot: usize, plan: FramePlan<D>, device: &mut D) -> Result<SubmissionId> {
        let submission = match device.submit(slot, &plan) {
            Ok(id) => id,
            Err(e) => {
                self.slots[slot].abort_recording();
                return Err(e.into());
            }
        };

        let retired = std::mem::take(&mut self.pending);
        log::trace!(
            "frame {} submitted on slot {slot} as {submission:?} ({} pending releases)",
            plan.frame_index,
            retired.len()
        );
        self.slots[slot].mark_submitted(submission, plan, retired);
        self.in_flight.push_back(slot);
        self.next_frame += 1;
        self.stats.frames_submitted += 1;
        Ok(submission)
    }

    /// Queues superseded versions for release once the GPU can no longer read them.
    ///
    /// With nothing in flight no reader can exist, so they are released immediately.
    pub fn defer(&mut self, retired: Vec<Retired<D>>, device: &mut D) {
        if retired.is_empty() {
            return;
        }
        if self.in_flight.is_empty() {
            self.release(retired, device);
        } else {
            self.pending.extend(retired);
        }
    }

    /// Completes every finished frame, oldest first, stopping at the first unfinished one.
    pub fn reap(&mut self, device: &mut D) -> Result<()> {
        while let Some(&oldest) = self.in_flight.front() {
            if !device.poll(self.submission_of(oldest))? {
                break;
            }
            self.complete_oldest(device);
        }
        if self.in_flight.is_empty() && !self.pending.is_empty() {
            let pending = std::mem::take(&mut self.pending);
            self.release(pending, device);
        }
        Ok(())
    }

    /// Waits for every submitted frame in order, then releases everything pending.
    pub fn synchronize(&mut self, device: &mut D) -> Result<()> {
        while let Some(&oldest) = self.in_flight.front() {
            device.wait(self.submission_of(oldest))?;
            self.complete_oldest(device);
        }
        let pending = std::mem::take(&mut self.pending);
        self.release(pending, device);
        Ok(())
    }

    /// Drops all frame state without device calls. Used once the device is gone.
    pub fn abandon(&mut self) {
        for slot in &mut self.slots {
            slot.abandon();
        }
        self.in_flight.clear();
        self.pending.clear();
    }

    fn submission_of(&self, slot: usize) -> SubmissionId {
        self.slots[slot].submission().unwrap_or(SubmissionId(0))
    }

    fn complete_oldest(&mut self, device: &mut D) {
        if let Some(slot) = self.in_flight.pop_front() {
            let released = self.slots[slot].complete(device);
            self.stats.frames_completed += 1;
            self.stats.resources_released += released as u64;
        }
    }

    fn release(&mut self, retired: Vec<Retired<D>>, device: &mut D) {
        let released = retired.into_iter().map(|r| r.release(device)).filter(|&ok| ok).count();
        self.stats.resources_released += released as u64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::mock::{MockDevice, MockKind};
    use crate::device::SurfaceSize;
    use crate::render::FrameView;
    use crate::resources::ResourceTable;
    use crate::scene::{CameraView3D, IDENTITY, Instance3D, MeshData3D, Vertex3D};

    struct Rig {
        dev: MockDevice,
        table: ResourceTable<MockDevice>,
        sched: FrameScheduler<MockDevice>,
    }

    impl Rig {
        fn new(slots: usize) -> Self {
            let mut dev = MockDevice::new();
            let table = ResourceTable::new(&mut dev).unwrap();
            Self {
                dev,
                table,
                sched: FrameScheduler::new(slots),
            }
        }

        fn set_mesh(&mut self, id: u32) {
            let v = [Vertex3D::default(); 3];
            self.table
                .set_mesh_3d(&mut self.dev, id, MeshData3D { vertices: &v, indices: &[] })
                .unwrap();
            self.table
                .set_instances_3d(&mut self.dev, id, &[Instance3D::new(IDENTITY, 0)])
                .unwrap();
            let retired = self.table.drain_retired();
            self.sched.defer(retired, &mut self.dev);
        }

        fn frame(&mut self) -> SubmissionId {
            let slot = self.sched.acquire(&mut self.dev).unwrap();
            let view = FrameView {
                matrix_2d: IDENTITY,
                camera: CameraView3D::default(),
                surface: SurfaceSize::new(64, 64, 1.0),
                clear_color: [0.0; 4],
                light_direction: [0.0, -1.0, 0.0],
            };
            let plan = FramePlan::build(self.sched.next_frame_index(), slot, self.table.snapshot(), &view);
            self.sched.submit(slot, plan, &mut self.dev).unwrap()
        }
    }

    #[test]
    fn slot_count_is_clamped() {
        assert_eq!(FrameScheduler::<MockDevice>::new(0).slot_count(), 1);
        assert_eq!(FrameScheduler::<MockDevice>::new(9).slot_count(), MAX_FRAMES_IN_FLIGHT);
    }

    // ── backpressure ──────────────────────────────────────────────────────

    #[test]
    fn acquire_waits_only_when_pool_is_full_and_only_on_oldest() {
        let mut rig = Rig::new(2);
        let f1 = rig.frame();
        let f2 = rig.frame();
        assert!(rig.dev.waits.is_empty());
        assert_eq!(rig.sched.in_flight(), 2);

        let f3 = rig.frame();
        assert_eq!(rig.dev.waits, vec![f1]);
        assert_eq!(rig.sched.stats().backpressure_waits, 1);
        assert!(f2 < f3);

        // GPU catches up: no further waiting
        rig.dev.complete_through(f3);
        rig.frame();
        rig.frame();
        assert_eq!(rig.dev.waits, vec![f1]);
    }

    #[test]
    fn slots_cycle_through_states() {
        let mut rig = Rig::new(1);
        assert_eq!(rig.sched.slot_state(0), Some(SlotState::Idle));

        let id = rig.frame();
        assert_eq!(rig.sched.slot_state(0), Some(SlotState::Submitted));
        rig.dev.complete_through(id);
        rig.sched.reap(&mut rig.dev).unwrap();
        assert_eq!(rig.sched.slot_state(0), Some(SlotState::Idle));
        assert_eq!(rig.sched.stats().frames_completed, 1);
    }

    // ── deferred release ──────────────────────────────────────────────────

    #[test]
    fn superseded_mesh_survives_until_all_in_flight_frames_complete() {
        let mut rig = Rig::new(3);
        rig.set_mesh(1);
        let old = *rig.table.snapshot().meshes_3d[&1].gpu();

        let f1 = rig.frame();
        let f2 = rig.frame();
        rig.set_mesh(1); // supersede while two frames read the old version
        assert!(rig.dev.is_live(old));

        let f3 = rig.frame(); // carries the retire list
        rig.dev.complete_through(f1);
        rig.sched.reap(&mut rig.dev).unwrap();
        assert!(rig.dev.is_live(old));
        rig.dev.complete_through(f2);
        rig.sched.reap(&mut rig.dev).unwrap();
        assert!(rig.dev.is_live(old));
        rig.dev.complete_through(f3);
        rig.sched.reap(&mut rig.dev).unwrap();
        assert!(!rig.dev.is_live(old));
    }

    #[test]
    fn pending_releases_flush_once_gpu_goes_idle() {
        let mut rig = Rig::new(2);
        rig.set_mesh(1);
        let f1 = rig.frame();
        rig.set_mesh(1);
        assert_eq!(rig.sched.pending_releases(), 2);

        rig.dev.complete_through(f1);
        rig.sched.reap(&mut rig.dev).unwrap();
        assert_eq!(rig.sched.pending_releases(), 0);
        assert_eq!(rig.sched.stats().resources_released, 2);
    }

    #[test]
    fn defer_with_nothing_in_flight_releases_immediately() {
        let mut rig = Rig::new(2);
        rig.set_mesh(1);
        rig.set_mesh(1);
        assert_eq!(rig.sched.pending_releases(), 0);
        assert_eq!(rig.dev.released.len(), 2);
    }

    // ── synchronize ───────────────────────────────────────────────────────

    #[test]
    fn synchronize_drains_in_order() {
        let mut rig = Rig::new(3);
        rig.set_mesh(1);
        let f1 = rig.frame();
        let f2 = rig.frame();
        rig.set_mesh(1);
        rig.sched.synchronize(&mut rig.dev).unwrap();
        assert_eq!(rig.dev.waits, vec![f1, f2]);
        assert_eq!(rig.sched.in_flight(), 0);
        assert_eq!(rig.sched.pending_releases(), 0);
        assert_eq!(rig.dev.uploads_of(MockKind::Mesh), 2);
        assert_eq!(rig.dev.released.len(), 2);
    }

    #[test]
    fn synchronize_with_nothing_in_flight_is_immediate() {
        let mut rig = Rig::new(2);
        rig.sched.synchronize(&mut rig.dev).unwrap();
        assert!(rig.dev.waits.is_empty());
    }

    // ── failures ──────────────────────────────────────────────────────────

    #[test]
    fn failed_submit_returns_slot_and_keeps_pending() {
        let mut rig = Rig::new(2);
        rig.set_mesh(1);
        let _f1 = rig.frame();
        rig.set_mesh(1);
        rig.dev.lose("reset");

        let slot = rig.sched.acquire(&mut rig.dev);
        assert!(slot.is_err());
        assert_eq!(rig.sched.pending_releases(), 2);
        rig.sched.abandon();
        assert_eq!(rig.sched.in_flight(), 0);
    }

    #[test]
    fn submit_error_is_reported_as_device_error() {
        let mut rig = Rig::new(2);
        let slot = rig.sched.acquire(&mut rig.dev).unwrap();
        let view = FrameView {
            matrix_2d: IDENTITY,
            camera: CameraView3D::default(),
            surface: SurfaceSize::new(64, 64, 1.0),
            clear_color: [0.0; 4],
            light_direction: [0.0, -1.0, 0.0],
        };
        let plan = FramePlan::build(0, slot, rig.table.snapshot(), &view);
        rig.dev.lose("hung");
        let err = rig.sched.submit(slot, plan, &mut rig.dev).unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(rig.sched.slot_state(slot), Some(SlotState::Idle));
    }
}

//! Audio-thread executor for compiled routes.
//!
//! [`RouteProcessor`] loads the currently published [`CompiledRoute`] once per
//! call to [`process_block()`](RouteProcessor::process_block) and runs it to
//! completion, so a commit that lands mid-block takes effect on the next
//! block. Inputs arriving at the same channel are summed.
//!
//! After each block the processor records the revision it rendered with, so
//! the control side knows when no audio thread can still be running an older
//! route.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arc_swap::ArcSwap;

use super::buffer::StereoBuffer;
use super::route::{ChannelSource, CompiledRoute, RouteStep};

/// Executes published routes on the audio thread.
pub struct RouteProcessor {
    route: Arc<ArcSwap<CompiledRoute>>,
    pool: Vec<StereoBuffer>,
    scratch: StereoBuffer,
    deinterleaved: StereoBuffer,
    rendered: StereoBuffer,
    block_size: usize,
    last_revision: u64,
    finished: Arc<AtomicU64>,
}

impl RouteProcessor {
    /// `pool_size` buffers are allocated up front; `finished` receives the
    /// revision of every completed block.
    pub(crate) fn new(
        route: Arc<ArcSwap<CompiledRoute>>,
        block_size: usize,
        pool_size: usize,
        finished: Arc<AtomicU64>,
    ) -> Self {
        let block_size = block_size.max(1);
        Self {
            route,
            pool: (0..pool_size).map(|_| StereoBuffer::new(block_size)).collect(),
            scratch: StereoBuffer::new(block_size),
            deinterleaved: StereoBuffer::new(block_size),
            rendered: StereoBuffer::new(block_size),
            block_size,
            last_revision: 0,
            finished,
        }
    }

    /// Revision of the route used by the most recent block.
    pub fn last_revision(&self) -> u64 {
        self.last_revision
    }

    /// Process a stereo block through the current route.
    ///
    /// Blocks longer than the engine's block size are split internally. Output
    /// is silent before the first commit, and frames beyond the shortest input
    /// are always silenced.
    pub fn process_block(
        &mut self,
        left_in: &[f32],
        right_in: &[f32],
        left_out: &mut [f32],
        right_out: &mut [f32],
    ) {
        let frames = left_in
            .len()
            .min(right_in.len())
            .min(left_out.len())
            .min(right_out.len());
        let route = self.route.load();
        self.last_revision = route.revision;

        left_out.fill(0.0);
        right_out.fill(0.0);

        // Only reached when the graph outgrew the headroom at creation.
        if self.pool.len() < route.buffer_count {
            let block_size = self.block_size;
            self.pool
                .resize_with(route.buffer_count, || StereoBuffer::new(block_size));
        }

        let mut offset = 0;
        while offset < frames {
            let n = (frames - offset).min(self.block_size);
            let range = offset..offset + n;
            self.run(
                &route,
                &left_in[range.clone()],
                &right_in[range.clone()],
                &mut left_out[range.clone()],
                &mut right_out[range],
            );
            offset += n;
        }

        self.finished.store(route.revision, Ordering::Release);
    }

    /// Buffers currently allocated for node outputs.
    pub fn pool_size(&self) -> usize {
        self.pool.len()
    }

    /// Process interleaved stereo frames (`[L0, R0, L1, R1, ...]`) in place.
    pub fn process_interleaved(&mut self, frames: &mut [f32]) {
        let mut input = std::mem::take(&mut self.deinterleaved);
        let mut output = std::mem::take(&mut self.rendered);
        for chunk in frames.chunks_mut(self.block_size * 2) {
            let n = chunk.len() / 2;
            for (i, pair) in chunk.chunks_exact(2).enumerate() {
                input.left[i] = pair[0];
                input.right[i] = pair[1];
            }
            self.process_block(
                &input.left[..n],
                &input.right[..n],
                &mut output.left[..n],
                &mut output.right[..n],
            );
            for (i, pair) in chunk.chunks_exact_mut(2).enumerate() {
                pair[0] = output.left[i];
                pair[1] = output.right[i];
            }
        }
        self.deinterleaved = input;
        self.rendered = output;
    }

    fn run(
        &mut self,
        route: &CompiledRoute,
        left_in: &[f32],
        right_in: &[f32],
        left_out: &mut [f32],
        right_out: &mut [f32],
    ) {
        let n = left_in.len();
        for step in &route.steps {
            match step {
                RouteStep::WriteInput { buffer } => {
                    let slot = &mut self.pool[*buffer];
                    slot.left[..n].copy_from_slice(left_in);
                    slot.right[..n].copy_from_slice(right_in);
                }
                RouteStep::Process {
                    node,
                    inputs,
                    output,
                    ..
                } => {
                    let left = &mut self.scratch.left[..n];
                    let right = &mut self.scratch.right[..n];
                    gather(&self.pool, &inputs[0], left);
                    gather(&self.pool, &inputs[1], right);
                    // A dropped or busy node passes its input through.
                    node.try_process(left, right);
                    let slot = &mut self.pool[*output];
                    slot.left[..n].copy_from_slice(left);
                    slot.right[..n].copy_from_slice(right);
                }
                RouteStep::ReadOutput { inputs } => {
                    gather(&self.pool, &inputs[0], left_out);
                    gather(&self.pool, &inputs[1], right_out);
                }
            }
        }
    }
}

/// Sum the listed source channels into `dest`, or write silence if none.
fn gather(pool: &[StereoBuffer], sources: &[ChannelSource], dest: &mut [f32]) {
    dest.fill(0.0);
    let n = dest.len();
    for source in sources {
        let channel = &pool[source.buffer].channel(source.channel)[..n];
        for (d, s) in dest.iter_mut().zip(channel) {
            *d += *s;
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::graph::{Connection, RoutingEngine};
    use crate::node::{AudioNode, NodeHandle};

    struct Scale(f32);

    impl AudioNode for Scale {
        fn name(&self) -> &str {
            "Scale"
        }
        fn prepare(&mut self, _sample_rate: f32, _block_size: usize) {}
        fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
            for s in left.iter_mut().chain(right.iter_mut()) {
                *s *= self.0;
            }
        }
        fn reset(&mut self) {}
    }

    #[test]
    fn test_silence_before_first_commit() {
        let engine = RoutingEngine::new(48000.0, 8);
        let mut proc = engine.processor();
        let mut l = [1.0; 8];
        let mut r = [1.0; 8];
        proc.process_block(&[0.5; 8], &[0.5; 8], &mut l, &mut r);
        assert!(l.iter().chain(r.iter()).all(|&s| s == 0.0));
        assert_eq!(proc.last_revision(), 0);

        let mut frames = [0.7; 6];
        proc.process_interleaved(&mut frames);
        assert_eq!(frames, [0.0; 6]);
    }

    #[test]
    fn test_pool_is_sized_before_the_first_block() {
        let mut engine = RoutingEngine::new(48000.0, 8);
        let handles: Vec<_> = (0..4).map(|_| NodeHandle::new(Box::new(Scale(1.0)))).collect();
        let mut prev = engine.input();
        for h in &handles {
            let n = engine.add_node(h);
            engine.add_connection(Connection::new(prev, 0, n, 0)).unwrap();
            prev = n;
        }
        engine.add_connection(Connection::new(prev, 0, engine.output(), 0)).unwrap();
        let route = engine.commit().unwrap();

        let mut proc = engine.processor();
        let before = proc.pool_size();
        assert!(before >= route.buffer_count());
        proc.process_block(&[1.0; 8], &[1.0; 8], &mut [0.0; 8], &mut [0.0; 8]);
        assert_eq!(proc.pool_size(), before);
    }

    #[test]
    fn test_completed_block_reports_its_revision() {
        let mut engine = RoutingEngine::new(48000.0, 8);
        let (i, o) = (engine.input(), engine.output());
        engine.add_connection(Connection::new(i, 0, o, 0)).unwrap();
        engine.commit().unwrap();
        let mut proc = engine.processor();
        assert_eq!(engine.settled_revision(), 1);

        engine.commit().unwrap();
        assert_eq!(engine.settled_revision(), 1);
        proc.process_block(&[0.0; 8], &[0.0; 8], &mut [0.0; 8], &mut [0.0; 8]);
        assert_eq!(engine.settled_revision(), 2);

        drop(proc);
        engine.commit().unwrap();
        assert_eq!(engine.settled_revision(), 3);
    }

    #[test]
    fn test_direct_route_and_fan_in_sum() {
        let mut engine = RoutingEngine::new(48000.0, 8);
        let (i, o) = (engine.input(), engine.output());
        engine.add_connection(Connection::new(i, 0, o, 0)).unwrap();
        engine.add_connection(Connection::new(i, 1, o, 0)).unwrap();
        engine.add_connection(Connection::new(i, 1, o, 1)).unwrap();
        engine.commit().unwrap();

        let mut proc = engine.processor();
        let mut l = [0.0; 4];
        let mut r = [0.0; 4];
        proc.process_block(&[0.25; 4], &[0.5; 4], &mut l, &mut r);
        assert_eq!(l, [0.75; 4]);
        assert_eq!(r, [0.5; 4]);
    }

    #[test]
    fn test_node_processing_and_long_blocks() {
        let mut engine = RoutingEngine::new(48000.0, 4);
        let h = NodeHandle::new(Box::new(Scale(2.0)));
        let n = engine.add_node(&h);
        let (i, o) = (engine.input(), engine.output());
        for ch in 0..2 {
            engine.add_connection(Connection::new(i, ch, n, ch)).unwrap();
            engine.add_connection(Connection::new(n, ch, o, ch)).unwrap();
        }
        engine.commit().unwrap();

        let mut proc = engine.processor();
        let left_in: Vec<f32> = (0..10).map(|x| x as f32).collect();
        let right_in = vec![1.0; 10];
        let mut l = vec![0.0; 12];
        let mut r = vec![9.0; 12];
        proc.process_block(&left_in, &right_in, &mut l, &mut r);
        for k in 0..10 {
            assert_eq!(l[k], 2.0 * k as f32);
            assert_eq!(r[k], 2.0);
        }
        assert_eq!(&r[10..], &[0.0, 0.0]);
    }

    #[test]
    fn test_dropped_node_passes_through() {
        let mut engine = RoutingEngine::new(48000.0, 4);
        let h = NodeHandle::new(Box::new(Scale(0.0)));
        let n = engine.add_node(&h);
        let (i, o) = (engine.input(), engine.output());
        engine.add_connection(Connection::new(i, 0, n, 0)).unwrap();
        engine.add_connection(Connection::new(n, 0, o, 0)).unwrap();
        engine.commit().unwrap();
        drop(h);

        let mut proc = engine.processor();
        let mut l = [0.0; 4];
        let mut r = [0.0; 4];
        proc.process_block(&[1.0; 4], &[1.0; 4], &mut l, &mut r);
        assert_eq!(l, [1.0; 4]);
    }

    #[test]
    fn test_interleaved() {
        let mut engine = RoutingEngine::new(48000.0, 3);
        let (i, o) = (engine.input(), engine.output());
        // swap channels
        engine.add_connection(Connection::new(i, 0, o, 1)).unwrap();
        engine.add_connection(Connection::new(i, 1, o, 0)).unwrap();
        engine.commit().unwrap();

        let mut proc = engine.processor();
        let mut frames = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
        proc.process_interleaved(&mut frames);
        assert_eq!(frames, [2.0, 1.0, 4.0, 3.0, 6.0, 5.0, 8.0, 7.0]);
    }
}

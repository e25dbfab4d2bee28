//! Integration tests for the rack-core chain.
//!
//! Covers the concrete routing scenarios end to end through
//! [`ChainController`] and verifies the rendered audio: bypass is transparent,
//! forced mono duplicates the left channel, master gain scales and silences,
//! and routes switch atomically between blocks.

use rack_core::{
    AudioNode, ChainCommand, ChainController, Connection, InsertPosition, MASTER_MIN_DB,
    NodeFactory, ParamDescriptor, PluginDescriptor, PluginError, PreparedNode, RoutingMode,
    db_to_gain,
};

const SAMPLE_RATE: f32 = 48000.0;
const BLOCK_SIZE: usize = 64;

/// Multiplies both channels by a constant factor.
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

/// Adds a constant offset, with one parameter so it has an editor.
struct Offset {
    amount: f32,
}

const OFFSET_PARAM: ParamDescriptor = ParamDescriptor::plain("Amount", "amount", -1.0, 1.0, 0.0);

impl AudioNode for Offset {
    fn name(&self) -> &str {
        "Offset"
    }
    fn prepare(&mut self, _sample_rate: f32, _block_size: usize) {}
    fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        for s in left.iter_mut().chain(right.iter_mut()) {
            *s += self.amount;
        }
    }
    fn reset(&mut self) {}
    fn param_count(&self) -> usize {
        1
    }
    fn param_info(&self, index: usize) -> Option<ParamDescriptor> {
        (index == 0).then_some(OFFSET_PARAM)
    }
    fn get_param(&self, index: usize) -> Option<f32> {
        (index == 0).then_some(self.amount)
    }
    fn set_param(&mut self, index: usize, value: f32) -> bool {
        if index != 0 {
            return false;
        }
        self.amount = OFFSET_PARAM.clamp(value);
        true
    }
}

struct OffsetFactory;

impl NodeFactory for OffsetFactory {
    fn instantiate(
        &self,
        descriptor: &PluginDescriptor,
        _sample_rate: f32,
        _block_size: usize,
    ) -> Result<Box<dyn AudioNode>, PluginError> {
        match descriptor.uid.as_str() {
            "offset" => Ok(Box::new(Offset { amount: 0.25 })),
            other => Err(PluginError::UnknownPlugin(other.to_string())),
        }
    }
}

fn offset_descriptor() -> PluginDescriptor {
    PluginDescriptor {
        uid: "offset".into(),
        name: "DC Offset".into(),
        format: "test".into(),
        category: "Utility".into(),
        description: "Adds a constant".into(),
        location: None,
    }
}

fn controller() -> ChainController {
    ChainController::new(SAMPLE_RATE, BLOCK_SIZE).unwrap()
}

fn render(chain: &ChainController, left: f32, right: f32, frames: usize) -> (Vec<f32>, Vec<f32>) {
    let mut processor = chain.processor();
    let mut l = vec![0.0; frames];
    let mut r = vec![0.0; frames];
    processor.process_block(&vec![left; frames], &vec![right; frames], &mut l, &mut r);
    (l, r)
}

fn assert_all(buf: &[f32], expected: f32) {
    for (i, &s) in buf.iter().enumerate() {
        assert!((s - expected).abs() < 1e-5, "sample {i}: {s} != {expected}");
    }
}

// ============================================================================
// Routing scenarios
// ============================================================================

#[test]
fn empty_stereo_chain_routes_input_to_master_gain() {
    let chain = controller();
    let ep = chain.endpoints();
    let mut expected = vec![
        Connection::new(ep.input, 0, ep.master_gain, 0),
        Connection::new(ep.input, 1, ep.master_gain, 1),
        Connection::new(ep.master_gain, 0, ep.output, 0),
        Connection::new(ep.master_gain, 1, ep.output, 1),
    ];
    expected.sort();
    assert_eq!(chain.connections(), expected);
}

#[test]
fn single_entry_forced_mono() {
    let mut chain = ChainController::with_settings(SAMPLE_RATE, BLOCK_SIZE, RoutingMode::ForcedMono, 0.0)
        .unwrap();
    chain
        .insert_node(Box::new(Scale(1.0)), InsertPosition::Append)
        .unwrap();
    let ep = chain.endpoints();
    let e = chain.entry_node_id(0).unwrap();
    let mut expected = vec![
        Connection::new(ep.input, 0, e, 0),
        Connection::new(ep.input, 0, e, 1),
        Connection::new(e, 0, ep.master_gain, 0),
        Connection::new(e, 1, ep.master_gain, 1),
        Connection::new(ep.master_gain, 0, ep.output, 0),
        Connection::new(ep.master_gain, 1, ep.output, 1),
    ];
    expected.sort();
    assert_eq!(chain.connections(), expected);
}

#[test]
fn bypassed_middle_entry_is_skipped() {
    let mut chain = controller();
    for _ in 0..3 {
        chain
            .insert_node(Box::new(Scale(1.0)), InsertPosition::Append)
            .unwrap();
    }
    chain.set_bypass(1, true).unwrap();
    let ep = chain.endpoints();
    let [a, b, c] = [0, 1, 2].map(|i| chain.entry_node_id(i).unwrap());
    let connections = chain.connections();

    let has = |s, d| {
        connections.contains(&Connection::new(s, 0, d, 0))
            && connections.contains(&Connection::new(s, 1, d, 1))
    };
    assert!(has(ep.input, a));
    assert!(has(a, c));
    assert!(has(c, ep.master_gain));
    assert!(connections.iter().all(|conn| !conn.touches(b)));
    assert_eq!(connections.len(), 8);
}

// ============================================================================
// Rendered audio
// ============================================================================

#[test]
fn chain_order_determines_processing_order() {
    let mut chain = controller();
    chain
        .insert_node(Box::new(Scale(2.0)), InsertPosition::Append)
        .unwrap();
    chain
        .insert_plugin(&OffsetFactory, &offset_descriptor(), InsertPosition::Append)
        .unwrap();

    // (x * 2) + 0.25
    let (l, r) = render(&chain, 0.5, -0.5, 128);
    assert_all(&l, 1.25);
    assert_all(&r, -0.75);

    chain.move_up(1).unwrap();
    // (x + 0.25) * 2
    let (l, _) = render(&chain, 0.5, -0.5, 128);
    assert_all(&l, 1.5);
}

#[test]
fn bypass_is_transparent_in_audio() {
    let mut chain = controller();
    chain
        .insert_node(Box::new(Scale(2.0)), InsertPosition::Append)
        .unwrap();
    chain
        .insert_node(Box::new(Scale(3.0)), InsertPosition::Append)
        .unwrap();
    chain.set_bypass(1, true).unwrap();
    let (l, r) = render(&chain, 0.1, 0.2, 100);
    assert_all(&l, 0.2);
    assert_all(&r, 0.4);

    chain.set_bypass(0, true).unwrap();
    let (l, r) = render(&chain, 0.1, 0.2, 100);
    assert_all(&l, 0.1);
    assert_all(&r, 0.2);
}

#[test]
fn forced_mono_duplicates_left_channel() {
    let mut chain = controller();
    chain
        .insert_node(Box::new(Scale(1.0)), InsertPosition::Append)
        .unwrap();
    chain.set_routing_mode(RoutingMode::ForcedMono).unwrap();
    let (l, r) = render(&chain, 0.7, -0.3, 64);
    assert_all(&l, 0.7);
    assert_all(&r, 0.7);

    chain.set_bypass(0, true).unwrap();
    let (_, r) = render(&chain, 0.7, -0.3, 64);
    assert_all(&r, 0.7);
}

#[test]
fn master_gain_scales_and_silences() {
    let mut chain = ChainController::with_settings(SAMPLE_RATE, BLOCK_SIZE, RoutingMode::Stereo, -6.0)
        .unwrap();
    let (l, _) = render(&chain, 1.0, 1.0, 32);
    assert_all(&l, db_to_gain(-6.0));

    chain.set_master_gain_db(MASTER_MIN_DB);
    let mut processor = chain.processor();
    let frames = 4800;
    let mut l = vec![0.0; frames];
    let mut r = vec![0.0; frames];
    processor.process_block(&vec![1.0; frames], &vec![1.0; frames], &mut l, &mut r);
    assert!(l[0] > 0.4, "gain change should ramp, not jump");
    assert!(l[frames - 1].abs() < 1e-3);
}

#[test]
fn processor_picks_up_commits_between_blocks() {
    let mut chain = controller();
    let mut processor = chain.processor();
    let mut l = [0.0; 16];
    let mut r = [0.0; 16];
    processor.process_block(&[1.0; 16], &[1.0; 16], &mut l, &mut r);
    assert_eq!(l, [1.0; 16]);
    let first = processor.last_revision();

    chain
        .insert_node(Box::new(Scale(0.5)), InsertPosition::Append)
        .unwrap();
    processor.process_block(&[1.0; 16], &[1.0; 16], &mut l, &mut r);
    assert_eq!(l, [0.5; 16]);
    assert_eq!(processor.last_revision(), first + 1);
}

#[test]
fn locked_node_passes_signal_through() {
    let mut chain = controller();
    chain
        .insert_node(Box::new(Scale(0.0)), InsertPosition::Append)
        .unwrap();
    let guard = chain.entry(0).unwrap().node().lock();
    let (l, _) = render(&chain, 0.3, 0.3, 16);
    assert_all(&l, 0.3);
    drop(guard);
    let (l, _) = render(&chain, 0.3, 0.3, 16);
    assert_all(&l, 0.0);
}

#[test]
fn removed_node_is_gone_from_audio() {
    let mut chain = controller();
    chain
        .insert_node(Box::new(Scale(0.0)), InsertPosition::Append)
        .unwrap();
    let mut processor = chain.processor();
    chain.apply(ChainCommand::Remove { index: 0 }).unwrap();
    let mut l = [0.0; 8];
    let mut r = [0.0; 8];
    processor.process_block(&[0.9; 8], &[0.9; 8], &mut l, &mut r);
    assert_eq!(l, [0.9; 8]);
}

// ============================================================================
// Plugins and snapshots
// ============================================================================

#[test]
fn snapshot_reports_entry_state() {
    let mut chain = controller();
    chain
        .insert_plugin(&OffsetFactory, &offset_descriptor(), InsertPosition::Append)
        .unwrap();
    chain
        .apply(ChainCommand::Insert {
            plugin: PreparedNode::local(Box::new(Scale(1.0))),
            position: InsertPosition::At(0),
        })
        .unwrap();
    chain.set_bypass(0, true).unwrap();

    let snapshot = chain.snapshot();
    assert_eq!(snapshot.entries.len(), 2);
    assert_eq!(snapshot.entries[0].name, "Scale");
    assert!(snapshot.entries[0].bypassed);
    assert!(!snapshot.entries[0].external);
    assert!(!snapshot.entries[0].has_editor);
    assert_eq!(snapshot.entries[1].name, "DC Offset");
    assert!(snapshot.entries[1].external);
    assert!(snapshot.entries[1].has_editor);
    assert_eq!(snapshot.entries[1].index, 1);
    assert_eq!(snapshot.revision, chain.revision());
    assert_ne!(snapshot.entries[0].id, snapshot.entries[1].id);
}

#[test]
fn set_param_reaches_the_node() {
    let mut chain = controller();
    chain
        .insert_plugin(&OffsetFactory, &offset_descriptor(), InsertPosition::Append)
        .unwrap();
    let revision = chain.revision();
    assert_eq!(chain.set_param(0, "amount", 5.0).unwrap(), 1.0);
    assert_eq!(chain.revision(), revision);
    let (l, _) = render(&chain, 0.0, 0.0, 8);
    assert_all(&l, 1.0);
}

#[test]
fn unknown_plugin_leaves_chain_untouched() {
    let mut chain = controller();
    let revision = chain.revision();
    let mut descriptor = offset_descriptor();
    descriptor.uid = "nope".into();
    let err = chain
        .insert_plugin(&OffsetFactory, &descriptor, InsertPosition::Append)
        .unwrap_err();
    assert!(err.to_string().contains("nope"));
    assert!(chain.is_empty());
    assert_eq!(chain.revision(), revision);
}

//! Offline rendering of whole files through a route.

use rack_core::RouteProcessor;

use crate::StereoSamples;

/// Render `input` through `processor` in blocks of `block_size` frames.
///
/// `on_block` is called after each block with the number of frames rendered
/// so far; use it to drive a progress indicator or to apply chain commands
/// between blocks. The last block may be shorter.
pub fn render_offline<F>(
    processor: &mut RouteProcessor,
    input: &StereoSamples,
    block_size: usize,
    mut on_block: F,
) -> StereoSamples
where
    F: FnMut(usize),
{
    let block_size = block_size.max(1);
    let mut output = StereoSamples::silence(input.len());

    let blocks = input
        .left
        .chunks(block_size)
        .zip(input.right.chunks(block_size))
        .zip(
            output
                .left
                .chunks_mut(block_size)
                .zip(output.right.chunks_mut(block_size)),
        );

    let mut done = 0;
    for ((left_in, right_in), (left_out, right_out)) in blocks {
        processor.process_block(left_in, right_in, left_out, right_out);
        done += left_in.len();
        on_block(done);
    }

    tracing::debug!(
        frames = done,
        revision = processor.last_revision(),
        "offline render finished"
    );
    output
}

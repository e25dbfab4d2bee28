//! Per-node stereo work buffers.

/// A block of stereo audio, one `Vec` per channel.
#[derive(Default)]
pub struct StereoBuffer {
    /// Left channel samples.
    pub left: Vec<f32>,
    /// Right channel samples.
    pub right: Vec<f32>,
}

impl StereoBuffer {
    /// Zeroed buffer of `block_size` frames.
    pub fn new(block_size: usize) -> Self {
        Self {
            left: vec![0.0; block_size],
            right: vec![0.0; block_size],
        }
    }

    /// Frames per channel.
    pub fn len(&self) -> usize {
        self.left.len()
    }

    /// Whether the buffer holds no frames.
    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    /// Channel by index: 0 = left, anything else = right.
    #[inline]
    pub fn channel(&self, index: usize) -> &[f32] {
        if index == 0 { &self.left } else { &self.right }
    }

    /// Fill both channels with silence.
    pub fn clear(&mut self) {
        self.left.fill(0.0);
        self.right.fill(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_selects_side() {
        let mut buf = StereoBuffer::new(4);
        buf.left[0] = 1.0;
        buf.right[0] = -1.0;
        assert_eq!(buf.channel(0)[0], 1.0);
        assert_eq!(buf.channel(1)[0], -1.0);
        buf.clear();
        assert_eq!(buf.channel(0)[0], 0.0);
        assert_eq!(buf.len(), 4);
        assert!(!buf.is_empty());
    }
}

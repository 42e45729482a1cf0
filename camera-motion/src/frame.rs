//! Frame source and sink boundary
//!
//! Camera capture and display are external. The pacer pulls raw RGBA frames
//! from a [`FrameSource`] and pushes processed frames to a [`FrameSink`].

/// Producer of raw RGBA frames
pub trait FrameSource {
    /// Frame size in pixels
    fn dimensions(&self) -> (u32, u32);

    /// Capture the next frame, `None` if nothing is available yet
    fn capture(&mut self) -> Option<&[u8]>;
}

/// Consumer of processed RGBA frames
pub trait FrameSink {
    fn present(&mut self, frame: &[u8], width: u32, height: u32);
}

/// Synthetic source drawing a scrolling gradient
#[derive(Debug)]
pub struct TestPatternSource {
    width: u32,
    height: u32,
    buffer: Vec<u8>,
    offset: u32,
}

impl TestPatternSource {
    pub fn new(width: u32, height: u32) -> Self {
        let len = (width as usize) * (height as usize) * 4;
        Self {
            width,
            height,
            buffer: vec![0; len],
            offset: 0,
        }
    }

    fn draw(&mut self) {
        let width = self.width.max(1);
        for (i, pixel) in self.buffer.chunks_exact_mut(4).enumerate() {
            let x = (i as u32) % width;
            let y = (i as u32) / width;
            let shade = (x.wrapping_add(self.offset) & 0xff) as u8;
            pixel.copy_from_slice(&[shade, (y & 0xff) as u8, shade ^ 0x80, 0xff]);
        }
        self.offset = self.offset.wrapping_add(3);
    }
}

impl FrameSource for TestPatternSource {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn capture(&mut self) -> Option<&[u8]> {
        self.draw();
        Some(&self.buffer)
    }
}

/// Sink that drops frames, counting them
#[derive(Debug, Default)]
pub struct DiscardSink {
    frames: u64,
}

impl DiscardSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of frames presented
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl FrameSink for DiscardSink {
    fn present(&mut self, _frame: &[u8], _width: u32, _height: u32) {
        self.frames += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_scrolls() {
        let mut source = TestPatternSource::new(8, 2);
        assert_eq!(source.dimensions(), (8, 2));
        let first = source.capture().map(<[u8]>::to_vec).unwrap();
        assert_eq!(first.len(), 64);
        assert!(first.chunks_exact(4).all(|p| p[3] == 0xff));
        let second = source.capture().map(<[u8]>::to_vec).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_discard_sink_counts() {
        let mut sink = DiscardSink::new();
        sink.present(&[0; 4], 1, 1);
        sink.present(&[0; 4], 1, 1);
        assert_eq!(sink.frames(), 2);
    }
}

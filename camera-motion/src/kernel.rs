//! Kernel boundary
//!
//! The pixel kernel turns the current RGBA frame plus the live parameters
//! into an output frame, caching the previous frame internally. Only the
//! interface lives here; the pass-through kernel lets the orchestration run
//! without the motion math.

use thiserror::Error;

use crate::params::ParameterSet;

/// Kernel-related errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KernelError {
    #[error("invalid frame dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("buffer size mismatch: expected {expected} bytes, got {actual}")]
    BufferSize { expected: usize, actual: usize },
    #[error("kernel processing failed: {0}")]
    Processing(String),
}

/// A frame-processing kernel sized for one resolution
///
/// Dropping the kernel releases its resources.
pub trait MotionKernel {
    /// Process `current` into `output` using `params`
    fn process_frame(
        &mut self,
        current: &[u8],
        output: &mut [u8],
        params: &ParameterSet,
    ) -> Result<(), KernelError>;

    /// Forget the cached previous frame
    fn reset_state(&mut self);

    /// Length in bytes of every frame buffer this kernel accepts
    fn buffer_size(&self) -> usize;
}

/// Creates a kernel for a `width` x `height` session
pub type KernelFactory = Box<dyn FnMut(u32, u32) -> Result<Box<dyn MotionKernel>, KernelError>>;

/// Byte length of an RGBA frame, `None` for empty or overflowing sizes
pub fn rgba_buffer_size(width: u32, height: u32) -> Option<usize> {
    if width == 0 || height == 0 {
        return None;
    }
    (width as usize)
        .checked_mul(height as usize)?
        .checked_mul(4)
}

/// Kernel that copies the current frame through unchanged
#[derive(Debug)]
pub struct PassthroughKernel {
    previous: Vec<u8>,
    has_previous: bool,
}

impl PassthroughKernel {
    pub fn new(width: u32, height: u32) -> Result<Self, KernelError> {
        let size =
            rgba_buffer_size(width, height).ok_or(KernelError::InvalidDimensions { width, height })?;
        Ok(Self {
            previous: vec![0; size],
            has_previous: false,
        })
    }

    /// Factory producing pass-through kernels
    pub fn factory() -> KernelFactory {
        Box::new(|width, height| {
            Self::new(width, height).map(|k| Box::new(k) as Box<dyn MotionKernel>)
        })
    }

    /// Check if a previous frame is cached
    pub fn has_previous(&self) -> bool {
        self.has_previous
    }
}

impl MotionKernel for PassthroughKernel {
    fn process_frame(
        &mut self,
        current: &[u8],
        output: &mut [u8],
        _params: &ParameterSet,
    ) -> Result<(), KernelError> {
        let expected = self.previous.len();
        for actual in [current.len(), output.len()] {
            if actual != expected {
                return Err(KernelError::BufferSize { expected, actual });
            }
        }
        output.copy_from_slice(current);
        self.previous.copy_from_slice(current);
        self.has_previous = true;
        Ok(())
    }

    fn reset_state(&mut self) {
        self.previous.fill(0);
        self.has_previous = false;
    }

    fn buffer_size(&self) -> usize {
        self.previous.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_size() {
        assert_eq!(rgba_buffer_size(4, 2), Some(32));
        assert_eq!(rgba_buffer_size(0, 2), None);
        assert_eq!(rgba_buffer_size(u32::MAX, u32::MAX), None);
    }

    #[test]
    fn test_passthrough_copies_and_caches() {
        let mut kernel = PassthroughKernel::new(2, 1).unwrap();
        assert_eq!(kernel.buffer_size(), 8);
        let current = [1, 2, 3, 4, 5, 6, 7, 8];
        let mut output = [0u8; 8];
        kernel
            .process_frame(&current, &mut output, &ParameterSet::default())
            .unwrap();
        assert_eq!(output, current);
        assert!(kernel.has_previous());
        kernel.reset_state();
        assert!(!kernel.has_previous());
    }

    #[test]
    fn test_passthrough_rejects_wrong_sizes() {
        let mut kernel = PassthroughKernel::new(2, 1).unwrap();
        let mut output = [0u8; 8];
        assert_eq!(
            kernel.process_frame(&[0; 4], &mut output, &ParameterSet::default()),
            Err(KernelError::BufferSize {
                expected: 8,
                actual: 4
            })
        );
        assert!(matches!(
            PassthroughKernel::new(0, 10),
            Err(KernelError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn test_factory() {
        let mut factory = PassthroughKernel::factory();
        let kernel = factory(3, 3).unwrap();
        assert_eq!(kernel.buffer_size(), 36);
        assert!(factory(0, 0).is_err());
    }
}

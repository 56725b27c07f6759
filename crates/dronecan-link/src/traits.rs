use crate::error::Result;
use crate::frame::CanFrame;

/// The outbound half of a CAN link.
///
/// Implementations hand one frame to the medium per call. Ordering of frames
/// written through the same `Link` must be preserved: the transfer layer relies
/// on in-order delivery within a stream.
pub trait Link {
    /// Write one frame to the medium.
    fn write(&mut self, frame: CanFrame) -> Result<()>;
}

impl<L: Link + ?Sized> Link for &mut L {
    fn write(&mut self, frame: CanFrame) -> Result<()> {
        (**self).write(frame)
    }
}

impl<L: Link + ?Sized> Link for Box<L> {
    fn write(&mut self, frame: CanFrame) -> Result<()> {
        (**self).write(frame)
    }
}

/// Capture sink: frames are appended in write order.
impl Link for Vec<CanFrame> {
    fn write(&mut self, frame: CanFrame) -> Result<()> {
        self.push(frame);
        Ok(())
    }
}

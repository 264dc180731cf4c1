mod cursor;
mod frame_poller;

pub use cursor::PollCursor;
pub use frame_poller::{FramePoller, PollerState, ResultSink};

pub mod sample;
pub mod timeline;

pub use sample::{ActivitySample, WindowEvent, NO_WINDOW};
pub use timeline::{SessionTimeline, TickRange, TitleInterval, WindowIntervals};

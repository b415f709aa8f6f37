pub mod clock;
pub mod pipeline;
pub(crate) mod timer;

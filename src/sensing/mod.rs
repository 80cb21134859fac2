pub mod controller;
pub mod loop_worker;
pub mod sampler;

pub use controller::SensingController;
pub use sampler::ActivitySampler;

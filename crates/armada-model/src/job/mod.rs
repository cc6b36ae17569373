mod descriptor;
pub use descriptor::JobDescriptor;

mod handle;
pub use handle::JobHandle;

mod outcome;
pub use outcome::Outcome;

mod status;
pub use status::JobStatus;

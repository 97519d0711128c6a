mod instance;
mod model_type;
mod spec;

pub use instance::ModelInstance;
pub use model_type::ModelType;
pub use spec::{InitFn, ModelSpec, VirtualFn};

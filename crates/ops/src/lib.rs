mod compare;
mod math;
mod match_subset;

pub use compare::{compare, CompareOp};
pub use math::execute_math;
pub use match_subset::match_subset;

//! Matrix memory-layout tracking: major-axis classification, the
//! inefficient-access policy, and the relayout engine.

pub mod efficiency;
pub mod major_axis;
pub mod relayout;

pub use efficiency::{
    check_efficient_action, default_inefficient_action_handler, set_inefficient_action_handler,
    InefficientActionHandler,
};
pub use major_axis::{major_axis, MajorAxis};
pub use relayout::{relayout, relayout_into, relayout_named};

// Decision-to-order pipeline: position belief, order planning, cycle loop
pub mod planner;
pub mod position;
pub mod trader;

pub use planner::{decimals_for_step, quantize, OrderPlanner, PlanError};
pub use position::Position;
pub use trader::Trader;

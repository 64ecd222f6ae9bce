//! 成就级联
//!
//! 预约、出勤、训练记录和积分购买提交后触发，在事务之外异步执行：
//!
//! - `streak` - 连续打卡的日期推进规则
//! - `criteria` - 成就条件的统一判定
//! - `evaluator` - 单次级联处理
//! - `queue` - 有界队列与 worker 池

mod criteria;
mod dto;
mod evaluator;
mod queue;
mod streak;

pub use criteria::is_met;
pub use dto::{CascadeOutcome, CascadeTrigger, TriggerKind};
pub use evaluator::AchievementCascade;
pub use queue::{CascadeDispatcher, CascadeQueue};
pub use streak::{StreakChange, advance_streak};

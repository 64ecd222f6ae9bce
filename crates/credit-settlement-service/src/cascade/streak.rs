//! 连续打卡计算
//!
//! 以自然日比较：同一天不变，恰好前一天 +1，其他情况重置为 1。

use chrono::NaiveDate;

use crate::models::StreakState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreakChange {
    /// 今天已经记过
    Unchanged,
    Extended,
    /// 首次活动或中断后重新开始
    Restarted,
}

/// 根据今天的活动推进打卡状态，返回新状态和变化类型
pub fn advance_streak(state: &StreakState, today: NaiveDate) -> (StreakState, StreakChange) {
    let (current, change) = match state.last_activity_date {
        Some(last) if last == today => return (state.clone(), StreakChange::Unchanged),
        Some(last) if last.succ_opt() == Some(today) => {
            (state.current_streak.saturating_add(1), StreakChange::Extended)
        }
        // 包括 last_activity_date 在未来的异常数据
        _ => (1, StreakChange::Restarted),
    };

    let next = StreakState {
        user_id: state.user_id.clone(),
        current_streak: current,
        longest_streak: state.longest_streak.max(current),
        last_activity_date: Some(today),
    };

    (next, change)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn state(current: i32, longest: i32, last: Option<NaiveDate>) -> StreakState {
        StreakState {
            user_id: "user-1".to_string(),
            current_streak: current,
            longest_streak: longest,
            last_activity_date: last,
        }
    }

    #[test]
    fn test_yesterday_extends() {
        let today = date(2024, 1, 10);
        let (next, change) = advance_streak(&state(4, 6, Some(date(2024, 1, 9))), today);

        assert_eq!(change, StreakChange::Extended);
        assert_eq!(next.current_streak, 5);
        assert_eq!(next.longest_streak, 6);
        assert_eq!(next.last_activity_date, Some(today));
    }

    #[test]
    fn test_gap_resets_to_one() {
        let today = date(2024, 1, 10);
        let (next, change) = advance_streak(&state(4, 6, Some(date(2024, 1, 7))), today);

        assert_eq!(change, StreakChange::Restarted);
        assert_eq!(next.current_streak, 1);
        assert_eq!(next.longest_streak, 6);
    }

    #[test]
    fn test_same_day_is_noop() {
        let today = date(2024, 1, 10);
        let before = state(3, 3, Some(today));
        let (next, change) = advance_streak(&before, today);

        assert_eq!(change, StreakChange::Unchanged);
        assert_eq!(next, before);
    }

    #[test]
    fn test_first_activity_starts_streak() {
        let (next, change) = advance_streak(&StreakState::empty("user-1"), date(2024, 3, 1));

        assert_eq!(change, StreakChange::Restarted);
        assert_eq!(next.current_streak, 1);
        assert_eq!(next.longest_streak, 1);
    }

    #[test]
    fn test_longest_follows_current() {
        let today = date(2024, 1, 10);
        let (next, _) = advance_streak(&state(6, 6, Some(date(2024, 1, 9))), today);
        assert_eq!(next.longest_streak, 7);
    }

    #[test]
    fn test_month_boundary() {
        let (next, change) = advance_streak(
            &state(2, 2, Some(date(2024, 2, 29))),
            date(2024, 3, 1),
        );
        assert_eq!(change, StreakChange::Extended);
        assert_eq!(next.current_streak, 3);
    }
}

//! 成就条件判定
//!
//! 每种条件类型对应快照中的一个指标，统一在 `metric_value` 里穷举分发。

use crate::models::{AchievementDefinition, ActivitySnapshot, CriteriaType};

impl CriteriaType {
    pub fn metric_value(&self, snapshot: &ActivitySnapshot) -> f64 {
        let stats = &snapshot.stats;
        match self {
            Self::TotalWorkouts => stats.total_workouts as f64,
            Self::TotalAttendance => stats.total_attendance as f64,
            Self::MaxWeight => stats.max_weight,
            Self::MaxVolume => stats.max_volume,
            Self::DailyStreak => f64::from(snapshot.current_streak),
            Self::LongestStreak => f64::from(snapshot.longest_streak),
            Self::PurchasedCredits => stats.purchased_credits as f64,
            Self::BookingsCount => stats.bookings_count as f64,
        }
    }
}

/// 阈值小于等于观测值即达成
pub fn is_met(definition: &AchievementDefinition, snapshot: &ActivitySnapshot) -> bool {
    definition.threshold as f64 <= definition.criteria_type.metric_value(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ActivityStats;

    fn snapshot() -> ActivitySnapshot {
        ActivitySnapshot {
            stats: ActivityStats {
                total_workouts: 12,
                total_attendance: 4,
                max_weight: 102.5,
                max_volume: 820.0,
                purchased_credits: 30,
                bookings_count: 5,
            },
            current_streak: 3,
            longest_streak: 9,
        }
    }

    fn definition(criteria_type: CriteriaType, threshold: i64) -> AchievementDefinition {
        AchievementDefinition {
            id: 1,
            code: "test".to_string(),
            name: "test".to_string(),
            description: None,
            criteria_type,
            threshold,
        }
    }

    #[test]
    fn test_every_criteria_maps_to_a_metric() {
        let snap = snapshot();
        let expected = [
            (CriteriaType::TotalWorkouts, 12.0),
            (CriteriaType::TotalAttendance, 4.0),
            (CriteriaType::MaxWeight, 102.5),
            (CriteriaType::MaxVolume, 820.0),
            (CriteriaType::DailyStreak, 3.0),
            (CriteriaType::LongestStreak, 9.0),
            (CriteriaType::PurchasedCredits, 30.0),
            (CriteriaType::BookingsCount, 5.0),
        ];

        assert_eq!(expected.len(), CriteriaType::ALL.len());
        for (criteria, value) in expected {
            assert_eq!(criteria.metric_value(&snap), value, "{criteria:?}");
        }
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let snap = snapshot();
        assert!(is_met(&definition(CriteriaType::TotalWorkouts, 12), &snap));
        assert!(!is_met(&definition(CriteriaType::TotalWorkouts, 13), &snap));
        assert!(is_met(&definition(CriteriaType::MaxWeight, 100), &snap));
        assert!(!is_met(&definition(CriteriaType::MaxVolume, 1000), &snap));
    }

    #[test]
    fn test_zero_threshold_always_met() {
        let empty = ActivitySnapshot::default();
        assert!(is_met(&definition(CriteriaType::BookingsCount, 0), &empty));
    }
}

//! 通知类型

use serde::{Deserialize, Serialize};

use crate::models::AchievementDefinition;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "varchar", rename_all = "snake_case")]
pub enum NotificationKind {
    AchievementEarned,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub user_id: String,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
}

impl Notification {
    pub fn achievement_earned(user_id: &str, achievement: &AchievementDefinition) -> Self {
        let message = match &achievement.description {
            Some(desc) if !desc.is_empty() => format!("恭喜获得成就「{}」：{}", achievement.name, desc),
            _ => format!("恭喜获得成就「{}」", achievement.name),
        };

        Self {
            user_id: user_id.to_string(),
            kind: NotificationKind::AchievementEarned,
            title: "获得新成就".to_string(),
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CriteriaType;

    #[test]
    fn test_achievement_message() {
        let def = AchievementDefinition {
            id: 1,
            code: "streak_7".to_string(),
            name: "七日坚持".to_string(),
            description: Some("连续 7 天保持训练".to_string()),
            criteria_type: CriteriaType::DailyStreak,
            threshold: 7,
        };

        let n = Notification::achievement_earned("user-1", &def);
        assert_eq!(n.kind, NotificationKind::AchievementEarned);
        assert!(n.message.contains("七日坚持"));
        assert!(n.message.contains("连续 7 天"));
    }
}

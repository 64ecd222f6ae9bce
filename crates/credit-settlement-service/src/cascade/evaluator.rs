//! 成就级联评估器
//!
//! 触发后依次：推进连续打卡 -> 聚合活动统计 -> 判定未获得的成就 -> 幂等插入并通知。
//! 整个过程可以重复执行：同一天的打卡不会再变化，已获得的成就不会重复插入。

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::{debug, info, instrument};

use studio_shared::observability::metrics;

use super::criteria::is_met;
use super::dto::{CascadeOutcome, CascadeTrigger};
use super::streak::{StreakChange, advance_streak};
use crate::error::Result;
use crate::models::{ActivitySnapshot, StreakState};
use crate::notification::NotificationSender;
use crate::repository::{
    AchievementRepositoryTrait, ActivityStatsRepositoryTrait, StreakRepositoryTrait,
};

pub struct AchievementCascade {
    stats_repo: Arc<dyn ActivityStatsRepositoryTrait>,
    streak_repo: Arc<dyn StreakRepositoryTrait>,
    achievement_repo: Arc<dyn AchievementRepositoryTrait>,
    notifier: NotificationSender,
}

impl AchievementCascade {
    pub fn new(
        stats_repo: Arc<dyn ActivityStatsRepositoryTrait>,
        streak_repo: Arc<dyn StreakRepositoryTrait>,
        achievement_repo: Arc<dyn AchievementRepositoryTrait>,
        notifier: NotificationSender,
    ) -> Self {
        Self {
            stats_repo,
            streak_repo,
            achievement_repo,
            notifier,
        }
    }

    /// 以当前 UTC 日期处理触发事件
    pub async fn process(&self, trigger: &CascadeTrigger) -> Result<CascadeOutcome> {
        self.process_on(trigger, Utc::now().date_naive()).await
    }

    #[instrument(skip(self, trigger), fields(user_id = %trigger.user_id, kind = trigger.kind.as_str()))]
    pub async fn process_on(
        &self,
        trigger: &CascadeTrigger,
        today: NaiveDate,
    ) -> Result<CascadeOutcome> {
        let user_id = trigger.user_id.as_str();

        // 1. 连续打卡
        let streak = self.update_streak(trigger, today).await?;

        // 2. 活动统计
        let mut stats = self.stats_repo.load_stats(user_id).await?;
        if let Some(credits) = trigger.kind.purchased_credits() {
            stats.purchased_credits = stats.purchased_credits.max(credits);
        }
        let snapshot = ActivitySnapshot {
            stats,
            current_streak: streak.current_streak,
            longest_streak: streak.longest_streak,
        };

        // 3. 待判定的成就
        let definitions = self.achievement_repo.list_active_definitions().await?;
        let already_awarded: HashSet<i64> = self
            .achievement_repo
            .list_awarded_ids(user_id)
            .await?
            .into_iter()
            .collect();

        // 4. 幂等插入，只有真正新插入的才通知
        let mut newly_awarded = Vec::new();
        for definition in definitions
            .into_iter()
            .filter(|d| !already_awarded.contains(&d.id) && is_met(d, &snapshot))
        {
            if self.achievement_repo.insert_award(user_id, definition.id).await? {
                info!(
                    user_id = %user_id,
                    achievement_id = definition.id,
                    code = %definition.code,
                    "用户获得新成就"
                );
                self.notifier.send_achievement_earned(user_id, &definition);
                newly_awarded.push(definition);
            } else {
                debug!(achievement_id = definition.id, "成就已由其他级联插入");
            }
        }

        metrics::record_achievements_awarded(newly_awarded.len());

        Ok(CascadeOutcome {
            streak,
            newly_awarded,
        })
    }

    // ==================== 私有方法 ====================

    /// 只有活动类触发才推进打卡；当天已记录时不写库
    async fn update_streak(&self, trigger: &CascadeTrigger, today: NaiveDate) -> Result<StreakState> {
        let current = self
            .streak_repo
            .get_streak(&trigger.user_id)
            .await?
            .unwrap_or_else(|| StreakState::empty(trigger.user_id.clone()));

        if !trigger.kind.advances_streak() {
            return Ok(current);
        }

        let (next, change) = advance_streak(&current, today);
        if change != StreakChange::Unchanged {
            self.streak_repo.save_streak(&next).await?;
            debug!(
                user_id = %trigger.user_id,
                current_streak = next.current_streak,
                longest_streak = next.longest_streak,
                change = ?change,
                "连续打卡已更新"
            );
        }

        Ok(next)
    }
}

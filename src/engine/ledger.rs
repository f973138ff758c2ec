// ==========================================
// 工序排产求解核心 - 产能台账
// ==========================================
// 记账单元: (工作中心, 日期) = 一个维护窗口
// 红线: 任意时刻 0 ≤ consumed ≤ capacity
// 并发: 每个窗口一个原子计数器, compare-and-swap 重试,
//       不存在第二把锁, 因而没有加锁顺序问题
// ==========================================

use crate::domain::work_center::MaintenanceWindow;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use tracing::warn;

/// 单个窗口的账户
#[derive(Debug)]
struct WindowAccount {
    work_center_id: String,
    date: NaiveDate,
    capacity: i64,
    reserved: i64,
    consumed: AtomicI64,
}

/// 产能台账（可跨移动线程共享: Send + Sync）
#[derive(Debug, Default)]
pub struct CapacityLedger {
    accounts: HashMap<String, WindowAccount>,
}

impl CapacityLedger {
    /// 以窗口的预占用分钟数初始化台账
    pub fn from_windows(windows: &[MaintenanceWindow]) -> Self {
        let mut accounts = HashMap::with_capacity(windows.len());
        for window in windows {
            let capacity = window.capacity_minutes.max(0);
            let reserved = if window.reserved_minutes > capacity {
                warn!(
                    window_id = %window.id,
                    reserved = window.reserved_minutes,
                    capacity,
                    "预占用超过窗口产能, 按产能截断"
                );
                capacity
            } else {
                window.reserved_minutes.max(0)
            };

            accounts.insert(
                window.id.clone(),
                WindowAccount {
                    work_center_id: window.work_center_id.clone(),
                    date: window.date,
                    capacity,
                    reserved,
                    consumed: AtomicI64::new(reserved),
                },
            );
        }
        Self { accounts }
    }

    /// 分配产能
    ///
    /// # 返回
    /// - `true`: 分配成功
    /// - `false`: consumed + minutes > capacity 或窗口未知, 台账不变
    pub fn allocate(&self, window_id: &str, minutes: i64) -> bool {
        let Some(account) = self.accounts.get(window_id) else {
            warn!(window_id, minutes, "台账中不存在该窗口, 分配被拒绝");
            return false;
        };
        if minutes <= 0 {
            return true;
        }

        let result = account
            .consumed
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |consumed| {
                let next = consumed + minutes;
                (next <= account.capacity).then_some(next)
            });

        match result {
            Ok(_) => true,
            Err(consumed) => {
                warn!(
                    window_id,
                    work_center_id = %account.work_center_id,
                    date = %account.date,
                    consumed,
                    minutes,
                    capacity = account.capacity,
                    "产能不足, 分配被拒绝"
                );
                false
            }
        }
    }

    /// 释放产能（总是成功, 下限截断为 0）
    pub fn release(&self, window_id: &str, minutes: i64) {
        let Some(account) = self.accounts.get(window_id) else {
            warn!(window_id, minutes, "台账中不存在该窗口, 忽略释放");
            return;
        };
        if minutes <= 0 {
            return;
        }

        // 闭包总返回 Some, fetch_update 不会失败
        let _ = account
            .consumed
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |consumed| {
                Some((consumed - minutes).max(0))
            });
    }

    /// 已消耗分钟数
    pub fn consumed(&self, window_id: &str) -> Option<i64> {
        self.accounts
            .get(window_id)
            .map(|a| a.consumed.load(Ordering::Acquire))
    }

    /// 剩余分钟数
    pub fn remaining(&self, window_id: &str) -> Option<i64> {
        self.accounts
            .get(window_id)
            .map(|a| (a.capacity - a.consumed.load(Ordering::Acquire)).max(0))
    }

    pub fn capacity(&self, window_id: &str) -> Option<i64> {
        self.accounts.get(window_id).map(|a| a.capacity)
    }

    /// 恢复到初始预占用状态（全量重算前调用）
    pub fn reset(&self) {
        for account in self.accounts.values() {
            account.consumed.store(account.reserved, Ordering::Release);
        }
    }

    /// 把台账数值回写到窗口实体
    pub fn write_back(&self, windows: &mut [MaintenanceWindow]) {
        for window in windows.iter_mut() {
            if let Some(consumed) = self.consumed(&window.id) {
                window.consumed_minutes = consumed;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

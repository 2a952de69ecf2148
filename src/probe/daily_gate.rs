//! 每日门控
//!
//! 限制开销较大的检测（域名到期）每个自然日只执行一次

use chrono::{Local, NaiveDate};

/// 门控判定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// 今天尚未执行，放行
    Run,
    /// 今天已执行，跳过
    Skip,
}

/// 每日门控
///
/// 作用于整个探针进程而非单个端点：同一天内只有第一个到达的域名检测会被放行
#[derive(Debug, Default)]
pub struct DailyGate {
    last_run: Option<NaiveDate>,
}

impl DailyGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// 按本地日期判定，并在放行时记录日期
    pub fn should_run_and_mark(&mut self) -> GateDecision {
        self.should_run_and_mark_on(Local::now().date_naive())
    }

    /// 按指定日期判定，并在放行时记录日期
    pub fn should_run_and_mark_on(&mut self, today: NaiveDate) -> GateDecision {
        if self.last_run == Some(today) {
            return GateDecision::Skip;
        }

        self.last_run = Some(today);
        GateDecision::Run
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_same_day_runs_once() {
        let mut gate = DailyGate::new();
        let today = date(2026, 10, 16);

        assert_eq!(gate.should_run_and_mark_on(today), GateDecision::Run);
        assert_eq!(gate.should_run_and_mark_on(today), GateDecision::Skip);
        assert_eq!(gate.should_run_and_mark_on(today), GateDecision::Skip);
        assert_eq!(gate.last_run, Some(today));
    }

    #[test]
    fn test_consecutive_days_each_run() {
        let mut gate = DailyGate::new();
        let start = date(2026, 12, 29);

        let runs = (0..7)
            .map(|offset| gate.should_run_and_mark_on(start + Duration::days(offset)))
            .filter(|decision| *decision == GateDecision::Run)
            .count();

        assert_eq!(runs, 7);
    }

    #[test]
    fn test_uninitialized_gate_runs() {
        let mut gate = DailyGate::new();
        assert!(gate.last_run.is_none());
        assert_eq!(gate.should_run_and_mark(), GateDecision::Run);
        assert_eq!(gate.should_run_and_mark(), GateDecision::Skip);
    }
}

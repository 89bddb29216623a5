use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// 時刻取得の抽象化
///
/// デバウンス判定や履歴タイムスタンプが壁時計に直接依存しないよう、
/// コンポーネントはこのトレイト経由で now() を読む。
pub trait Clock {
    fn now(&self) -> Instant;
}

/// 実時間クロック
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// テスト用の手動クロック
///
/// Clone したハンドルは同じ時刻を共有する（シングルスレッド前提）。
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Rc<Cell<Instant>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Rc::new(Cell::new(Instant::now())),
        }
    }

    /// 時刻を dt だけ進める
    pub fn advance(&self, dt: Duration) {
        self.now.set(self.now.get() + dt);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.now.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advances() {
        let clock = ManualClock::new();
        let t0 = clock.now();
        clock.advance(Duration::from_millis(500));
        assert_eq!(clock.now() - t0, Duration::from_millis(500));
    }

    #[test]
    fn test_manual_clock_handles_share_time() {
        let clock = ManualClock::new();
        let handle = clock.clone();
        clock.advance(Duration::from_secs(2));
        assert_eq!(handle.now(), clock.now());
    }

    #[test]
    fn test_system_clock_monotonic() {
        let clock = SystemClock;
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}

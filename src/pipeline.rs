use std::time::{Duration, Instant};

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::pose::Pose;
use crate::rep::{ExerciseKind, RepCounter, RepState};
use crate::stabilizer::Stabilizer;

/// 1フレーム分の処理結果
#[derive(Debug, Clone)]
pub struct FrameOutput {
    /// 安定化済みポーズ列（描画用）
    pub poses: Vec<Pose>,
    /// 現在のレップ状態（UI用）
    pub rep: RepState,
}

/// 検出ループ1周期分の処理をまとめたパイプライン
///
/// 呼び出し側が固定周期のループから process() を同期的に呼ぶ。
/// 生ポーズ → 安定化 → レップ判定 の順で流れる。
/// シングルスレッド・単一所有前提で、内部に共有状態は持たない。
pub struct Pipeline<C: Clock = SystemClock> {
    stabilizer: Stabilizer<C>,
    counter: RepCounter<C>,
}

impl Pipeline<SystemClock> {
    pub fn new(alpha: f32, exercise: ExerciseKind) -> Self {
        Self::with_clock(alpha, exercise, SystemClock)
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.stabilizer.alpha, config.rep.exercise)
    }
}

impl<C: Clock + Clone> Pipeline<C> {
    pub fn with_clock(alpha: f32, exercise: ExerciseKind, clock: C) -> Self {
        Self {
            stabilizer: Stabilizer::with_clock(alpha, clock.clone()),
            counter: RepCounter::with_clock(exercise, clock),
        }
    }
}

impl<C: Clock> Pipeline<C> {
    /// 1フレーム処理する。ポーズ無し（推論スロットル・被写体なし）も
    /// 正常な入力として扱われ、レップ状態は変化しない
    pub fn process(&mut self, poses: &[Pose]) -> FrameOutput {
        let stabilized = self.stabilizer.stabilize(poses);
        let rep = self.counter.update(&stabilized);
        FrameOutput {
            poses: stabilized,
            rep,
        }
    }

    pub fn rep_state(&self) -> RepState {
        self.counter.state()
    }

    pub fn set_alpha(&mut self, alpha: f32) {
        self.stabilizer.set_alpha(alpha);
    }

    /// 種目切り替え。レップ状態は破棄される
    pub fn set_exercise(&mut self, exercise: ExerciseKind) {
        self.counter.set_exercise(exercise);
    }

    /// セッション再開時に呼ぶ。キーポイント履歴とレップ状態を両方捨てる
    pub fn reset(&mut self) {
        self.stabilizer.reset();
        self.counter.reset();
    }
}

/// 固定周期の処理ゲート
///
/// カメラのフレームレートや描画リフレッシュとは独立に、処理周波数を
/// 目標値で頭打ちにするためのもの。呼び出し側のループが毎回 ready() を
/// 聞き、true のときだけ process() を呼ぶ。
pub struct Ticker {
    interval: Duration,
    last: Option<Instant>,
}

impl Ticker {
    pub fn new(hz: f32) -> Self {
        let hz = if hz > 0.0 { hz } else { 1.0 };
        Self {
            interval: Duration::from_secs_f32(1.0 / hz),
            last: None,
        }
    }

    /// 前回の実行から1周期以上経過していれば true を返し、実行時刻を記録する
    pub fn ready(&mut self, now: Instant) -> bool {
        match self.last {
            Some(last) if now.duration_since(last) < self.interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::pose::{Keypoint, KeypointIndex};
    use crate::rep::Phase;

    /// 指定した膝角度（度）で両脚のポーズを作る
    fn squat_pose(knee_angle_deg: f32) -> Pose {
        let mut pose = Pose::default();
        let theta = knee_angle_deg.to_radians();
        for (hip, knee, ankle, bx) in [
            (
                KeypointIndex::LeftHip,
                KeypointIndex::LeftKnee,
                KeypointIndex::LeftAnkle,
                200.0_f32,
            ),
            (
                KeypointIndex::RightHip,
                KeypointIndex::RightKnee,
                KeypointIndex::RightAnkle,
                260.0_f32,
            ),
        ] {
            let by = 300.0;
            pose.keypoints[knee as usize] = Keypoint::new(bx, by, 0.9);
            pose.keypoints[hip as usize] = Keypoint::new(bx, by - 100.0, 0.9);
            pose.keypoints[ankle as usize] =
                Keypoint::new(bx + 100.0 * theta.sin(), by - 100.0 * theta.cos(), 0.9);
        }
        pose
    }

    fn run(pipeline: &mut Pipeline<ManualClock>, clock: &ManualClock, angles: &[f32]) -> RepState {
        let mut rep = pipeline.rep_state();
        for &angle in angles {
            clock.advance(Duration::from_millis(50));
            rep = pipeline.process(&[squat_pose(angle)]).rep;
        }
        rep
    }

    /// 立位 → しゃがみ → 立位 をキーポイント外れ値ゲートに掛からない
    /// 緩やかな角度遷移で1往復分生成する
    fn squat_cycle() -> Vec<f32> {
        let mut angles = vec![170.0; 8];
        angles.extend([155.0, 140.0, 125.0, 110.0, 95.0]);
        angles.extend([80.0; 6]);
        angles.extend([95.0, 110.0, 125.0, 140.0, 155.0]);
        angles.extend([170.0; 8]);
        angles
    }

    #[test]
    fn test_full_squat_cycle_counts_one_rep() {
        let clock = ManualClock::new();
        let mut pipeline = Pipeline::with_clock(0.5, ExerciseKind::Squat, clock.clone());
        let rep = run(&mut pipeline, &clock, &squat_cycle());
        assert_eq!(rep.count, 1, "one full cycle must count exactly one rep");
        assert_eq!(rep.phase, Phase::Up);
    }

    #[test]
    fn test_two_spaced_cycles_count_two_reps() {
        let clock = ManualClock::new();
        let mut pipeline = Pipeline::with_clock(0.5, ExerciseKind::Squat, clock.clone());
        run(&mut pipeline, &clock, &squat_cycle());
        clock.advance(Duration::from_secs(2));
        let rep = run(&mut pipeline, &clock, &squat_cycle());
        assert_eq!(rep.count, 2);
    }

    #[test]
    fn test_empty_frames_do_not_disturb_state() {
        let clock = ManualClock::new();
        let mut pipeline = Pipeline::with_clock(0.5, ExerciseKind::Squat, clock.clone());
        let rep = run(&mut pipeline, &clock, &squat_cycle());

        // Throttled/failed inference ticks yield zero poses
        for _ in 0..10 {
            clock.advance(Duration::from_millis(50));
            let out = pipeline.process(&[]);
            assert!(out.poses.is_empty());
            assert_eq!(out.rep, rep);
        }
    }

    #[test]
    fn test_stabilized_output_exposes_gated_joints() {
        let clock = ManualClock::new();
        let mut pipeline = Pipeline::with_clock(0.5, ExerciseKind::Squat, clock.clone());
        let out = pipeline.process(&[squat_pose(170.0)]);
        // First frame: joints present in the output but gated to zero confidence
        let knee = out.poses[0].get(KeypointIndex::LeftKnee);
        assert_eq!(knee.confidence, 0.0);
        assert!(knee.x > 0.0, "gated joints keep their coordinates");
    }

    #[test]
    fn test_reset_clears_both_components() {
        let clock = ManualClock::new();
        let mut pipeline = Pipeline::with_clock(0.5, ExerciseKind::Squat, clock.clone());
        run(&mut pipeline, &clock, &squat_cycle());
        assert_eq!(pipeline.rep_state().count, 1);

        pipeline.reset();
        let rep = pipeline.rep_state();
        assert_eq!(rep.count, 0);
        assert_eq!(rep.phase, Phase::Idle);

        // Stabilizer history is gone too: next frame is gated again
        let out = pipeline.process(&[squat_pose(170.0)]);
        assert_eq!(out.poses[0].get(KeypointIndex::LeftKnee).confidence, 0.0);
    }

    #[test]
    fn test_from_config_defaults() {
        let config = Config::default();
        let mut pipeline = Pipeline::from_config(&config);
        let out = pipeline.process(&[]);
        assert_eq!(out.rep.count, 0);
    }

    #[test]
    fn test_ticker_caps_rate() {
        let clock = ManualClock::new();
        let mut ticker = Ticker::new(20.0); // 50ms period
        assert!(ticker.ready(clock.now()), "first tick always runs");

        clock.advance(Duration::from_millis(10));
        assert!(!ticker.ready(clock.now()));

        clock.advance(Duration::from_millis(40));
        assert!(ticker.ready(clock.now()));
    }

    #[test]
    fn test_ticker_reset() {
        let clock = ManualClock::new();
        let mut ticker = Ticker::new(20.0);
        assert!(ticker.ready(clock.now()));
        ticker.reset();
        assert!(ticker.ready(clock.now()), "reset re-arms the ticker");
    }
}

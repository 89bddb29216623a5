use std::time::{Duration, Instant};

use crate::clock::{Clock, SystemClock};
use crate::pose::Pose;

use super::angle::{joint_angle, AngleWindow};
use super::exercise::ExerciseKind;

/// レップ二重カウント防止のデバウンス窓
const DEBOUNCE: Duration = Duration::from_millis(1000);
/// 角度移動平均の窓サイズ（フレーム）
const ANGLE_WINDOW: usize = 5;
/// 角度計算に使う関節の最低信頼度
///
/// 安定化フィルタの描画閾値と同値。ゲートで抑制された関節（信頼度0）は
/// ここで弾かれるため、カウンタは表示に耐える関節しか信用しない。
const JOINT_MIN_CONFIDENCE: f32 = 0.3;

/// レップ状態機械のフェーズ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Up,
    Down,
}

/// レップカウントの現在値
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RepState {
    /// 累計レップ数（単調増加、reset でのみ0に戻る）
    pub count: u32,
    /// 直近の平滑化済み角度（度、四捨五入）
    pub angle: f32,
    pub phase: Phase,
    /// 最後にカウントが増えた時刻
    pub last_rep_time: Option<Instant>,
}

impl RepState {
    fn idle() -> Self {
        Self {
            count: 0,
            angle: 0.0,
            phase: Phase::Idle,
            last_rep_time: None,
        }
    }
}

/// 安定化済みポーズ列からレップ数を数えるカウンタ
///
/// 種目ごとの関節角度を移動平均で平滑化し、deep/shallow の
/// 2閾値クロス検出＋デバウンスで count を単調に増やす。
/// 必要な関節が欠けたフレームはカウント判定に使わない（no-op）。
pub struct RepCounter<C: Clock = SystemClock> {
    exercise: ExerciseKind,
    window: AngleWindow,
    state: RepState,
    clock: C,
}

impl RepCounter<SystemClock> {
    pub fn new(exercise: ExerciseKind) -> Self {
        Self::with_clock(exercise, SystemClock)
    }
}

impl<C: Clock> RepCounter<C> {
    pub fn with_clock(exercise: ExerciseKind, clock: C) -> Self {
        Self {
            exercise,
            window: AngleWindow::new(ANGLE_WINDOW),
            state: RepState::idle(),
            clock,
        }
    }

    pub fn exercise(&self) -> ExerciseKind {
        self.exercise
    }

    pub fn state(&self) -> RepState {
        self.state
    }

    /// 種目を切り替える。進行中のレップ状態は破棄される
    pub fn set_exercise(&mut self, exercise: ExerciseKind) {
        self.exercise = exercise;
        self.reset();
    }

    /// カウント・角度履歴・フェーズをすべて初期化する
    pub fn reset(&mut self) {
        self.window.clear();
        self.state = RepState::idle();
    }

    /// 1フレーム分を処理して現在のレップ状態を返す
    ///
    /// ポーズが無い、または必要な関節の角度が計算できないフレームは
    /// 状態を変えずにそのまま返す。
    pub fn update(&mut self, poses: &[Pose]) -> RepState {
        let Some(pose) = poses.first() else {
            return self.state;
        };
        let Some(raw_angle) = self.measure_angle(pose) else {
            return self.state;
        };

        let smoothed = self.window.push(raw_angle);
        self.state.angle = smoothed.round();

        let thresholds = self.exercise.thresholds();
        if smoothed < thresholds.deep && self.state.phase != Phase::Down {
            self.state.phase = Phase::Down;
        } else if self.state.phase == Phase::Down && smoothed > thresholds.shallow {
            let now = self.clock.now();
            let debounced = self
                .state
                .last_rep_time
                .map_or(true, |t| now.duration_since(t) >= DEBOUNCE);
            if debounced {
                self.state.count += 1;
                self.state.phase = Phase::Up;
                self.state.last_rep_time = Some(now);
            }
        }

        self.state
    }

    /// 種目の関節角度（度）。左右両側が有効なら平均、片側のみならその値
    fn measure_angle(&self, pose: &Pose) -> Option<f32> {
        let mut sum = 0.0;
        let mut sides = 0;
        for (first, vertex, last) in self.exercise.sides() {
            let a = pose.get(first);
            let b = pose.get(vertex);
            let c = pose.get(last);
            if !a.is_valid(JOINT_MIN_CONFIDENCE)
                || !b.is_valid(JOINT_MIN_CONFIDENCE)
                || !c.is_valid(JOINT_MIN_CONFIDENCE)
            {
                continue;
            }
            sum += joint_angle((a.x, a.y), (b.x, b.y), (c.x, c.y));
            sides += 1;
        }
        if sides == 0 {
            None
        } else {
            Some(sum / sides as f32)
        }
    }
}

use std::time::Instant;

use crate::clock::{Clock, SystemClock};
use crate::pose::{Keypoint, KeypointIndex, Pose};

/// これ未満の信頼度の検出は信用しない
const MIN_CONFIDENCE: f32 = 0.2;
/// 描画に使ってよい安定化後の最低信頼度
const RENDER_CONFIDENCE: f32 = 0.3;
/// 関節を表示対象とみなすまでの連続検出フレーム数
const STABILITY_THRESHOLD: u32 = 3;
/// stability カウントの上限
const STABILITY_CAP: u32 = 30;
/// 1フレームで許容する最大移動量（ピクセル）。超えたら外れ値として棄却
const MAX_DISPLACEMENT: f32 = 80.0;
/// 短時間ドロップアウト時の信頼度減衰係数
const DROPOUT_DECAY: f32 = 0.7;
/// ジャンプ棄却時の信頼度減衰係数（ドロップアウトより緩やか）
const JUMP_DECAY: f32 = 0.9;
/// このカットオフを超える信頼度なら設定 alpha をそのまま使う
const HIGH_CONFIDENCE: f32 = 0.6;
/// 低信頼度時の alpha 縮小率
const LOW_CONFIDENCE_ALPHA_SCALE: f32 = 0.5;
/// 信頼度ブレンドにおける現フレームの重み
const CONFIDENCE_BLEND: f32 = 0.7;

const ALPHA_MIN: f32 = 0.1;
const ALPHA_MAX: f32 = 1.0;

/// 関節ごとの受理履歴
struct JointHistory {
    /// 最後に受理した（平滑化済み）キーポイント
    point: Keypoint,
    /// 受理時刻
    updated_at: Instant,
    /// 最低信頼度以上で連続受理したフレーム数（上限あり）
    stability: u32,
}

/// キーポイント安定化フィルタ
///
/// 検出器の生出力に対して、関節ごとに
/// 1. 低信頼度・物理的にありえないジャンプの棄却
/// 2. 信頼度適応のEMA平滑化
/// 3. stability ゲート（連続検出されるまで信頼度を0に抑制）
/// を適用する。ゲートで抑制された関節も配列からは取り除かず、
/// 信頼度0で出力する（描画側は score でフィルタする契約）。
pub struct Stabilizer<C: Clock = SystemClock> {
    alpha: f32,
    history: [Option<JointHistory>; KeypointIndex::COUNT],
    clock: C,
}

impl Stabilizer<SystemClock> {
    pub fn new(alpha: f32) -> Self {
        Self::with_clock(alpha, SystemClock)
    }
}

impl<C: Clock> Stabilizer<C> {
    pub fn with_clock(alpha: f32, clock: C) -> Self {
        Self {
            alpha: alpha.clamp(ALPHA_MIN, ALPHA_MAX),
            history: std::array::from_fn(|_| None),
            clock,
        }
    }

    /// 平滑化係数。範囲外はクランプ（拒否しない）
    pub fn set_alpha(&mut self, alpha: f32) {
        self.alpha = alpha.clamp(ALPHA_MIN, ALPHA_MAX);
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    /// 指定関節が最後に受理された時刻（トラッキングロスト表示用）
    ///
    /// ドロップアウトやジャンプ棄却で保持だけされたフレームでは更新されない
    pub fn last_accepted_at(&self, index: KeypointIndex) -> Option<Instant> {
        self.history[index as usize].as_ref().map(|h| h.updated_at)
    }

    /// 全履歴をクリアする（カメラ停止・再開時に呼ぶ）
    pub fn reset(&mut self) {
        self.history = std::array::from_fn(|_| None);
    }

    /// 1フレーム分のポーズ列を安定化する
    ///
    /// 先頭のポーズ（主被写体）のみフィルタし、残りはそのまま通す。
    /// 空入力は空のまま返る。
    pub fn stabilize(&mut self, poses: &[Pose]) -> Vec<Pose> {
        let now = self.clock.now();
        poses
            .iter()
            .enumerate()
            .map(|(i, pose)| {
                if i > 0 {
                    return pose.clone();
                }
                let mut out = pose.clone();
                for idx in 0..KeypointIndex::COUNT {
                    out.keypoints[idx] = self.step(idx, pose.keypoints[idx], now);
                }
                out
            })
            .collect()
    }

    /// 関節1つ分の更新
    fn step(&mut self, idx: usize, raw: Keypoint, now: Instant) -> Keypoint {
        if raw.confidence < MIN_CONFIDENCE {
            // 低信頼度: 直前値が描画水準なら減衰させつつ保持し、短い
            // ドロップアウトを跨いで関節を生かしておく
            return match &mut self.history[idx] {
                Some(hist) if hist.point.confidence >= RENDER_CONFIDENCE => {
                    hist.point.confidence *= DROPOUT_DECAY;
                    Self::gate(hist)
                }
                _ => Keypoint::new(raw.x, raw.y, 0.0),
            };
        }

        match &mut self.history[idx] {
            None => {
                // 初検出: 生値をそのまま受理。stability はまだ閾値未満なので
                // 出力は信頼度0（ゲート通過前の関節は描画に出さない）
                let hist = JointHistory {
                    point: raw,
                    updated_at: now,
                    stability: 1,
                };
                let emitted = Self::gate(&hist);
                self.history[idx] = Some(hist);
                emitted
            }
            Some(hist) if raw.distance_to(&hist.point) > MAX_DISPLACEMENT => {
                // 単発の瞬間移動は誤検出とみなし直前値を保持する。
                // 棄却が続くと保持値の信頼度が最低閾値を割り、その時点で
                // 新しい検出に履歴ごと置き換える（本当に移動していた場合の脱出路）
                hist.point.confidence *= JUMP_DECAY;
                if hist.point.confidence < MIN_CONFIDENCE {
                    let replaced = JointHistory {
                        point: raw,
                        updated_at: now,
                        stability: 1,
                    };
                    let emitted = Self::gate(&replaced);
                    self.history[idx] = Some(replaced);
                    emitted
                } else {
                    Self::gate(hist)
                }
            }
            Some(hist) => {
                // 信頼度適応EMA: 高信頼度なら設定 alpha、低めなら縮小 alpha
                let adaptive = if raw.confidence > HIGH_CONFIDENCE {
                    self.alpha
                } else {
                    self.alpha * LOW_CONFIDENCE_ALPHA_SCALE
                };
                let x = adaptive * raw.x + (1.0 - adaptive) * hist.point.x;
                let y = adaptive * raw.y + (1.0 - adaptive) * hist.point.y;
                let confidence = CONFIDENCE_BLEND * raw.confidence
                    + (1.0 - CONFIDENCE_BLEND) * hist.point.confidence;

                hist.point = Keypoint::new(x, y, confidence);
                hist.updated_at = now;
                hist.stability = (hist.stability + 1).min(STABILITY_CAP);
                Self::gate(hist)
            }
        }
    }

    /// 最終ゲート: stability と描画閾値を満たさない関節は信頼度0で出力
    fn gate(hist: &JointHistory) -> Keypoint {
        if hist.stability >= STABILITY_THRESHOLD && hist.point.confidence >= RENDER_CONFIDENCE {
            hist.point
        } else {
            Keypoint::new(hist.point.x, hist.point.y, 0.0)
        }
    }
}

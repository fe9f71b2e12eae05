//! Модуль планирования синхронизации
//!
//! Для каждого сегмента сравнивается фактическая длительность
//! синтезированного клипа с целевым окном и выбирается действие:
//! использовать как есть, дополнить тишиной, обрезать или изменить темп.
//! Эластичный режим дополнительно переносит накопленный дрейф на цели
//! ближайших сегментов; его состояние хранится в явной структуре
//! [`ElasticState`] и принадлежит только последовательному циклу
//! планирования.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::config::SyncMode;

/// Порог накопленного дрейфа, после которого он перераспределяется, сек
pub const DRIFT_REDISTRIBUTE_THRESHOLD: f64 = 0.5;

/// Максимальное число будущих сегментов, принимающих компенсацию дрейфа
pub const DRIFT_LOOKAHEAD: usize = 5;

/// Действие синхронизации для одного сегмента
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncAction {
    /// Клип используется без изменений
    Pass,
    /// Дополнение тишиной до целевой длительности с последующей обрезкой
    Pad,
    /// Изменение темпа с последующей обрезкой до целевой длительности
    Stretch,
    /// Обрезка до целевой длительности
    Trim,
}

impl SyncAction {
    /// Получить строковое представление действия
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Pad => "pad",
            Self::Stretch => "stretch",
            Self::Trim => "trim",
        }
    }
}

/// Решение синхронизации по одному финальному сегменту
///
/// Создается ровно один раз на сегмент и после записи не меняется.
#[derive(Debug, Clone, Serialize)]
pub struct SyncDecision {
    /// Индекс сегмента
    pub segment_index: usize,
    /// Целевая длительность (после эластичной корректировки, если была), сек
    pub target_seconds: f64,
    /// Фактическая длительность синтезированного клипа, сек
    pub actual_seconds: f64,
    /// Примененный коэффициент темпа (1.0, если темп не менялся)
    pub applied_ratio: f64,
    /// Выбранное действие
    pub action: SyncAction,
}

/// Выбрать действие синхронизации для одного сегмента
///
/// Возвращает действие и коэффициент темпа. Граница допуска:
/// `[target*(1-tolerance), target*(1+tolerance)]`. Нулевая или
/// отрицательная фактическая длительность означает сбой измерения;
/// в этом случае клип безусловно проходит без изменений - выводить
/// коэффициент из нулевого замера нельзя.
pub fn decide(
    mode: SyncMode,
    target: f64,
    actual: f64,
    tolerance: f64,
    max_stretch: f64,
) -> (SyncAction, f64) {
    if actual <= 0.0 {
        return (SyncAction::Pass, 1.0);
    }

    match mode {
        SyncMode::None => (SyncAction::Pass, 1.0),
        SyncMode::Pad => {
            if actual >= target {
                (SyncAction::Trim, 1.0)
            } else {
                (SyncAction::Pad, 1.0)
            }
        }
        SyncMode::Stretch => {
            let within_tolerance = (target - actual).abs() <= target * tolerance;
            if within_tolerance {
                // Внутри допуска выравниваем до точной цели без смены темпа
                if actual <= target {
                    (SyncAction::Pad, 1.0)
                } else {
                    (SyncAction::Trim, 1.0)
                }
            } else {
                (SyncAction::Stretch, clamp_ratio(actual / target, max_stretch))
            }
        }
        SyncMode::Smart | SyncMode::Elastic => {
            let low = target * (1.0 - tolerance);
            let high = target * (1.0 + tolerance);
            if actual < low {
                (SyncAction::Pad, 1.0)
            } else if actual > high {
                (SyncAction::Stretch, clamp_ratio(actual / target, max_stretch))
            } else {
                (SyncAction::Pass, 1.0)
            }
        }
    }
}

fn clamp_ratio(ratio: f64, max_stretch: f64) -> f64 {
    ratio.clamp(1.0 / max_stretch, max_stretch)
}

/// Состояние эластичной синхронизации
///
/// Накапливает невязки `(actual - target)` по сегментам в строго
/// хронологическом порядке. Как только модуль накопленного дрейфа
/// превышает порог, дрейф поровну распределяется как компенсация по
/// ограниченному окну будущих сегментов (меньше пяти, если
/// последовательность заканчивается), и аккумулятор обнуляется.
#[derive(Debug)]
pub struct ElasticState {
    /// Накопленный дрейф, сек
    accumulator: f64,
    /// Компенсации, вычитаемые из целей ближайших сегментов
    pending: VecDeque<f64>,
    /// Порог перераспределения, сек
    threshold: f64,
    /// Размер окна перераспределения
    lookahead: usize,
}

impl ElasticState {
    /// Создать состояние со стандартными порогом и окном
    pub fn new() -> Self {
        Self::with_params(DRIFT_REDISTRIBUTE_THRESHOLD, DRIFT_LOOKAHEAD)
    }

    /// Создать состояние с заданными порогом и окном
    pub fn with_params(threshold: f64, lookahead: usize) -> Self {
        Self {
            accumulator: 0.0,
            pending: VecDeque::new(),
            threshold,
            lookahead: lookahead.max(1),
        }
    }

    /// Целевая длительность сегмента с учетом накопленной компенсации
    pub fn adjusted_target(&mut self, raw_target: f64) -> f64 {
        raw_target - self.pending.pop_front().unwrap_or(0.0)
    }

    /// Учесть невязку сегмента и при необходимости перераспределить дрейф
    ///
    /// `remaining` - число сегментов после текущего; на последнем сегменте
    /// перераспределять уже некуда, и дрейф остается в аккумуляторе.
    pub fn absorb(&mut self, actual: f64, adjusted_target: f64, remaining: usize) {
        self.accumulator += actual - adjusted_target;

        if self.accumulator.abs() > self.threshold && remaining > 0 {
            let window = self.lookahead.min(remaining);
            let per_segment = self.accumulator / window as f64;

            if self.pending.len() < window {
                self.pending.resize(window, 0.0);
            }
            for slot in self.pending.iter_mut().take(window) {
                *slot += per_segment;
            }

            self.accumulator = 0.0;
        }
    }

    /// Текущее значение аккумулятора дрейфа
    pub fn accumulator(&self) -> f64 {
        self.accumulator
    }
}

impl Default for ElasticState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pad_when_below_tolerance_band() {
        // target=2.0, actual=1.2, tolerance=0.15: low=1.7, high=2.3
        let (action, ratio) = decide(SyncMode::Smart, 2.0, 1.2, 0.15, 1.35);
        assert_eq!(action, SyncAction::Pad);
        assert_eq!(ratio, 1.0);
    }

    #[test]
    fn test_stretch_ratio_clamped_by_max_stretch() {
        // Желаемый коэффициент 3.5/2.0 = 1.75, ограничен 1.35
        let (action, ratio) = decide(SyncMode::Smart, 2.0, 3.5, 0.15, 1.35);
        assert_eq!(action, SyncAction::Stretch);
        assert!((ratio - 1.35).abs() < 1e-9);
    }

    #[test]
    fn test_pass_inside_tolerance_band() {
        let (action, ratio) = decide(SyncMode::Smart, 2.0, 2.1, 0.15, 1.35);
        assert_eq!(action, SyncAction::Pass);
        assert_eq!(ratio, 1.0);
    }

    #[test]
    fn test_probe_failure_always_passes() {
        for mode in [
            SyncMode::None,
            SyncMode::Pad,
            SyncMode::Stretch,
            SyncMode::Smart,
            SyncMode::Elastic,
        ] {
            let (action, ratio) = decide(mode, 3.0, 0.0, 0.15, 1.35);
            assert_eq!(action, SyncAction::Pass);
            assert_eq!(ratio, 1.0);
        }
    }

    #[test]
    fn test_pad_mode_trims_long_clip() {
        let (action, _) = decide(SyncMode::Pad, 2.0, 2.5, 0.15, 1.35);
        assert_eq!(action, SyncAction::Trim);

        let (action, _) = decide(SyncMode::Pad, 2.0, 1.0, 0.15, 1.35);
        assert_eq!(action, SyncAction::Pad);
    }

    #[test]
    fn test_stretch_mode_aligns_inside_tolerance() {
        let (action, ratio) = decide(SyncMode::Stretch, 2.0, 1.9, 0.15, 1.35);
        assert_eq!(action, SyncAction::Pad);
        assert_eq!(ratio, 1.0);

        let (action, ratio) = decide(SyncMode::Stretch, 2.0, 2.2, 0.15, 1.35);
        assert_eq!(action, SyncAction::Trim);
        assert_eq!(ratio, 1.0);

        let (action, ratio) = decide(SyncMode::Stretch, 2.0, 3.0, 0.15, 1.35);
        assert_eq!(action, SyncAction::Stretch);
        assert!((ratio - 1.35).abs() < 1e-9);
    }

    #[test]
    fn test_speedup_clamp_lower_bound() {
        // Слишком короткий клип в режиме stretch: 1.0/2.0 = 0.5 -> 1/1.35
        let (action, ratio) = decide(SyncMode::Stretch, 2.0, 1.0, 0.15, 1.35);
        assert_eq!(action, SyncAction::Stretch);
        assert!((ratio - 1.0 / 1.35).abs() < 1e-9);
    }

    #[test]
    fn test_elastic_accumulates_below_threshold() {
        let mut state = ElasticState::new();

        let target = state.adjusted_target(2.0);
        assert_eq!(target, 2.0);
        state.absorb(2.3, target, 4);
        assert!((state.accumulator() - 0.3).abs() < 1e-9);

        // Цель следующего сегмента не меняется, пока порог не превышен
        let target = state.adjusted_target(2.0);
        assert_eq!(target, 2.0);
    }

    #[test]
    fn test_elastic_redistributes_and_resets() {
        let mut state = ElasticState::new();

        let target = state.adjusted_target(2.0);
        state.absorb(2.9, target, 10); // дрейф 0.9 > 0.5

        assert_eq!(state.accumulator(), 0.0);

        // Компенсация 0.9/5 = 0.18 на каждый из пяти будущих сегментов
        for _ in 0..5 {
            let adjusted = state.adjusted_target(2.0);
            assert!((adjusted - (2.0 - 0.18)).abs() < 1e-9);
        }

        // Шестой сегмент компенсацию уже не получает
        let adjusted = state.adjusted_target(2.0);
        assert_eq!(adjusted, 2.0);
    }

    #[test]
    fn test_elastic_lookahead_bounded_near_end() {
        let mut state = ElasticState::new();

        let target = state.adjusted_target(2.0);
        state.absorb(2.8, target, 2); // осталось только два сегмента

        // 0.8/2 = 0.4 на каждый из двух
        for _ in 0..2 {
            let adjusted = state.adjusted_target(2.0);
            assert!((adjusted - 1.6).abs() < 1e-9);
        }
    }

    #[test]
    fn test_elastic_negative_drift() {
        let mut state = ElasticState::new();

        let target = state.adjusted_target(3.0);
        state.absorb(2.0, target, 5); // дрейф -1.0

        assert_eq!(state.accumulator(), 0.0);
        let adjusted = state.adjusted_target(3.0);
        // Отрицательная компенсация удлиняет будущие цели
        assert!((adjusted - 3.2).abs() < 1e-9);
    }

    #[test]
    fn test_elastic_no_redistribution_on_last_segment() {
        let mut state = ElasticState::new();

        let target = state.adjusted_target(2.0);
        state.absorb(3.5, target, 0);

        // Перераспределять некуда, дрейф остается в аккумуляторе
        assert!((state.accumulator() - 1.5).abs() < 1e-9);
    }
}

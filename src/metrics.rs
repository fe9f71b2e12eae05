//! Модуль метрик качества синхронизации
//!
//! Чистая агрегация решений по сегментам в один отчет. Без побочных
//! эффектов: повторный вызов на том же наборе решений дает идентичный
//! результат.

use serde::{Deserialize, Serialize};

use crate::sync::planner::SyncDecision;

/// Порог тревоги по абсолютному смещению сегмента, сек
pub const OFFSET_ALARM_THRESHOLD: f64 = 0.5;

/// Коэффициент, выше которого сегмент считается сжатым
pub const COMPRESSED_RATIO_THRESHOLD: f64 = 1.1;

/// Коэффициент, ниже которого сегмент считается растянутым
pub const EXPANDED_RATIO_THRESHOLD: f64 = 0.9;

/// Сводные метрики качества синхронизации
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncMetrics {
    /// Общее количество сегментов
    pub total_segments: usize,
    /// Среднее смещение `actual - target`, сек
    pub avg_offset: f64,
    /// Максимальное абсолютное смещение, сек
    pub max_offset: f64,
    /// Стандартное отклонение смещений, сек
    pub std_offset: f64,
    /// Средний коэффициент темпа
    pub avg_speed_ratio: f64,
    /// Максимальный коэффициент темпа
    pub max_speed_ratio: f64,
    /// Количество сегментов с абсолютным смещением выше порога тревоги
    pub segments_over_tolerance: usize,
    /// Количество сжатых сегментов (коэффициент > 1.1)
    pub segments_compressed: usize,
    /// Количество растянутых сегментов (коэффициент < 0.9)
    pub segments_expanded: usize,
}

impl SyncMetrics {
    fn empty() -> Self {
        Self {
            total_segments: 0,
            avg_offset: 0.0,
            max_offset: 0.0,
            std_offset: 0.0,
            avg_speed_ratio: 0.0,
            max_speed_ratio: 0.0,
            segments_over_tolerance: 0,
            segments_compressed: 0,
            segments_expanded: 0,
        }
    }
}

/// Подсчитать метрики качества по набору решений
pub fn summarize(decisions: &[SyncDecision]) -> SyncMetrics {
    if decisions.is_empty() {
        return SyncMetrics::empty();
    }

    let n = decisions.len() as f64;

    let offsets: Vec<f64> = decisions
        .iter()
        .map(|d| d.actual_seconds - d.target_seconds)
        .collect();
    let ratios: Vec<f64> = decisions.iter().map(|d| d.applied_ratio).collect();

    let avg_offset = offsets.iter().sum::<f64>() / n;
    let max_offset = offsets.iter().fold(0.0f64, |acc, o| acc.max(o.abs()));
    let variance = offsets
        .iter()
        .map(|o| (o - avg_offset).powi(2))
        .sum::<f64>()
        / n;
    let std_offset = variance.max(0.0).sqrt();

    let avg_speed_ratio = ratios.iter().sum::<f64>() / n;
    let max_speed_ratio = ratios.iter().fold(f64::MIN, |acc, r| acc.max(*r));

    SyncMetrics {
        total_segments: decisions.len(),
        avg_offset,
        max_offset,
        std_offset,
        avg_speed_ratio,
        max_speed_ratio,
        segments_over_tolerance: offsets
            .iter()
            .filter(|o| o.abs() > OFFSET_ALARM_THRESHOLD)
            .count(),
        segments_compressed: ratios
            .iter()
            .filter(|r| **r > COMPRESSED_RATIO_THRESHOLD)
            .count(),
        segments_expanded: ratios
            .iter()
            .filter(|r| **r < EXPANDED_RATIO_THRESHOLD)
            .count(),
    }
}

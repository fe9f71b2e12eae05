//! Модуль для загрузки сегментов транскрипции
//!
//! Источник сегментов - внешний: JSON-массив записей `{start, end, text}`,
//! по одной на исходную реплику. Здесь же проверяются инварианты
//! последовательности.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DubSyncError, Result};

/// Способ, которым сегмент был получен при разбиении
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitMethod {
    /// Сегмент не разбивался
    None,
    /// Разбиение по естественным паузам
    Pause,
    /// Разбиение по пунктуации
    Punctuation,
}

impl Default for SplitMethod {
    fn default() -> Self {
        Self::None
    }
}

/// Сегмент исходной дорожки с привязкой ко времени
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    /// Начальное время в секундах
    pub start: f64,
    /// Конечное время в секундах
    pub end: f64,
    /// Текст сегмента (уже переведенный, если перевод применялся)
    pub text: String,
    /// Происхождение сегмента; используется только для диагностики
    #[serde(default)]
    pub split_method: SplitMethod,
}

impl Segment {
    /// Создать новый сегмент без пометки о разбиении
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
            split_method: SplitMethod::None,
        }
    }

    /// Длительность сегмента в секундах
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Количество слов в тексте сегмента
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

/// Интервал тишины, найденный внешним детектором (VAD) в исходном аудио
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PauseWindow {
    /// Начало паузы в секундах
    pub start: f64,
    /// Конец паузы в секундах
    pub end: f64,
}

/// Разобрать сегменты из строки JSON
pub fn parse_segments(json: &str) -> Result<Vec<Segment>> {
    let segments: Vec<Segment> = serde_json::from_str(json)?;
    validate_segments(&segments)?;
    Ok(segments)
}

/// Загрузить сегменты из JSON-файла
pub fn load_segments<P: AsRef<Path>>(path: P) -> Result<Vec<Segment>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(DubSyncError::FileNotFound(format!(
            "segment source not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path)?;
    parse_segments(&contents)
}

/// Проверить инварианты последовательности сегментов
///
/// Длительность каждого сегмента должна быть положительной. Промежутки
/// между сегментами допустимы и значимы; перекрытия - ошибка вызывающей
/// стороны.
pub fn validate_segments(segments: &[Segment]) -> Result<()> {
    for (i, segment) in segments.iter().enumerate() {
        if !(segment.end > segment.start) {
            return Err(DubSyncError::SegmentValidation(format!(
                "segment {} has non-positive duration: start {:.3}, end {:.3}",
                i, segment.start, segment.end
            )));
        }
    }

    for i in 1..segments.len() {
        if segments[i].start < segments[i - 1].end {
            return Err(DubSyncError::SegmentValidation(format!(
                "segment {} overlaps previous one: starts at {:.3} before {:.3}",
                i,
                segments[i].start,
                segments[i - 1].end
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_segments() {
        let json = r#"[
            {"start": 0.0, "end": 2.5, "text": "Первая реплика"},
            {"start": 3.0, "end": 5.0, "text": "Вторая реплика"}
        ]"#;

        let segments = parse_segments(json).unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "Первая реплика");
        assert_eq!(segments[0].split_method, SplitMethod::None);
        assert_eq!(segments[1].start, 3.0);
    }

    #[test]
    fn test_gaps_are_allowed() {
        let segments = vec![
            Segment::new(0.0, 1.0, "a"),
            Segment::new(5.0, 6.0, "b"),
        ];
        assert!(validate_segments(&segments).is_ok());
    }

    #[test]
    fn test_overlap_rejected() {
        let segments = vec![
            Segment::new(0.0, 2.0, "a"),
            Segment::new(1.5, 3.0, "b"),
        ];
        assert!(validate_segments(&segments).is_err());
    }

    #[test]
    fn test_non_positive_duration_rejected() {
        let segments = vec![Segment::new(2.0, 2.0, "a")];
        assert!(validate_segments(&segments).is_err());
    }

    #[test]
    fn test_load_segments_missing_file() {
        let result = load_segments("/nonexistent/segments.json");
        assert!(matches!(result, Err(DubSyncError::FileNotFound(_))));
    }
}

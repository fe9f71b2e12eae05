//! Модуль конфигурации библиотеки dub-sync
//!
//! Этот модуль содержит структуры и перечисления для настройки библиотеки.
//! Все значения приходят уже разобранными: парсинг аргументов командной
//! строки остается на стороне вызывающего кода.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{DubSyncError, Result};

/// Режим синхронизации сегментов
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// Без коррекции: клипы используются как есть
    None,
    /// Дополнение тишиной до целевого окна (или обрезка, если клип длиннее)
    Pad,
    /// Растяжение/сжатие темпа до целевого окна
    Stretch,
    /// Выбор действия по допуску: pad / stretch / pass
    Smart,
    /// Smart с переносом накопленного дрейфа на следующие сегменты
    Elastic,
}

impl Default for SyncMode {
    fn default() -> Self {
        Self::Smart
    }
}

impl SyncMode {
    /// Получить строковое представление режима
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Pad => "pad",
            Self::Stretch => "stretch",
            Self::Smart => "smart",
            Self::Elastic => "elastic",
        }
    }
}

/// Конфигурация разбиения длинных сегментов
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitterConfig {
    /// Минимальное количество слов, при котором сегмент вообще разбивается
    pub min_words_for_split: usize,
    /// Минимальная длительность речевой части кандидата на разбиение, сек
    pub min_part_duration: f64,
    /// Минимальная длительность последней (хвостовой) части, сек
    pub min_tail_duration: f64,
    /// Нижняя граница оценочной скорости речи, символов в секунду
    pub min_chars_per_second: f64,
    /// Минимум буквенно-цифровых символов для самостоятельного куска текста
    pub min_alnum_per_piece: usize,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            min_words_for_split: 16,
            min_part_duration: 1.0,
            min_tail_duration: 0.5,
            min_chars_per_second: 8.0,
            min_alnum_per_piece: 3,
        }
    }
}

lazy_static::lazy_static! {
    /// Средние коэффициенты расширения текста относительно английского
    static ref DEFAULT_EXPANSION_FACTORS: HashMap<String, f64> = {
        let mut m = HashMap::new();
        m.insert("pt".to_string(), 1.20);
        m.insert("pt-br".to_string(), 1.20);
        m.insert("es".to_string(), 1.15);
        m.insert("fr".to_string(), 1.18);
        m.insert("de".to_string(), 0.95);
        m.insert("it".to_string(), 1.12);
        m.insert("en".to_string(), 1.00);
        m.insert("ja".to_string(), 0.80);
        m.insert("zh".to_string(), 0.75);
        m.insert("ru".to_string(), 1.05);
        m
    };
}

/// Конфигурация оценки языковой плотности
///
/// Передается явно в оценщик длительности; таблица коэффициентов
/// неизменяема после создания.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DensityConfig {
    /// Коэффициенты расширения текста по языкам (базовая линия - английский)
    pub expansion_factors: HashMap<String, f64>,
    /// Слов в секунду для нормальной разговорной речи
    pub base_words_per_second: f64,
    /// Максимальное ускорение, при котором речь остается разборчивой
    pub max_speed_factor: f64,
}

impl Default for DensityConfig {
    fn default() -> Self {
        Self {
            expansion_factors: DEFAULT_EXPANSION_FACTORS.clone(),
            base_words_per_second: 2.5,
            max_speed_factor: 1.8,
        }
    }
}

/// Конфигурация библиотеки
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DubSyncConfig {
    /// Режим синхронизации
    pub sync_mode: SyncMode,
    /// Допуск отклонения длительности от целевой (доля, 0..1)
    pub tolerance: f64,
    /// Максимальный коэффициент изменения темпа
    pub max_stretch: f64,
    /// Максимальная длительность сегмента, сек (0 отключает разбиение)
    pub max_segment_duration: f64,
    /// Вставлять тишину в паузы исходной дорожки
    pub preserve_gaps: bool,
    /// Минимальная пауза, которую стоит сохранять, сек
    pub gap_min_seconds: f64,
    /// Частота дискретизации производных клипов
    pub sample_rate: u32,
    /// Количество каналов производных клипов
    pub channels: u16,
    /// Удалять временные файлы после завершения
    pub cleanup_temp_files: bool,
    /// Настройки разбиения сегментов
    pub splitter: SplitterConfig,
    /// Настройки оценки языковой плотности
    pub density: DensityConfig,
}

impl Default for DubSyncConfig {
    fn default() -> Self {
        Self {
            sync_mode: SyncMode::default(),
            tolerance: 0.15,
            max_stretch: 1.35,
            max_segment_duration: 10.0,
            preserve_gaps: false,
            gap_min_seconds: 0.20,
            sample_rate: 24000,
            channels: 1,
            cleanup_temp_files: true,
            splitter: SplitterConfig::default(),
            density: DensityConfig::default(),
        }
    }
}

impl DubSyncConfig {
    /// Проверить конфигурацию на допустимость значений
    pub fn validate(&self) -> Result<()> {
        if !(self.tolerance > 0.0 && self.tolerance < 1.0) {
            return Err(DubSyncError::Configuration(format!(
                "tolerance must be in (0, 1), got {}",
                self.tolerance
            )));
        }
        if self.max_stretch < 1.0 {
            return Err(DubSyncError::Configuration(format!(
                "max_stretch must be >= 1, got {}",
                self.max_stretch
            )));
        }
        if self.max_segment_duration < 0.0 {
            return Err(DubSyncError::Configuration(format!(
                "max_segment_duration must be >= 0, got {}",
                self.max_segment_duration
            )));
        }
        if self.gap_min_seconds < 0.0 {
            return Err(DubSyncError::Configuration(format!(
                "gap_min_seconds must be >= 0, got {}",
                self.gap_min_seconds
            )));
        }
        if self.sample_rate == 0 {
            return Err(DubSyncError::Configuration(
                "sample_rate must be positive".to_string(),
            ));
        }
        if self.channels == 0 {
            return Err(DubSyncError::Configuration(
                "channels must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

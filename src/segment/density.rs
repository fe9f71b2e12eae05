//! Модуль оценки языковой плотности
//!
//! Оценивает плотность символов и слов в секунду и ожидаемую длительность
//! синтезированной речи до обращения к синтезатору. Коэффициенты расширения
//! текста между языками приходят из [`DensityConfig`] и не меняются во время
//! работы.

use crate::config::DensityConfig;
use crate::segment::parser::Segment;

/// Результат анализа плотности одного сегмента
#[derive(Debug, Clone)]
pub struct SegmentDensity {
    /// Индекс сегмента в исходном списке
    pub index: usize,
    /// Количество слов
    pub word_count: usize,
    /// Длительность в секундах
    pub duration: f64,
    /// Слов в секунду
    pub words_per_second: f64,
    /// Требуемый коэффициент ускорения относительно комфортной скорости
    pub required_speed_factor: f64,
    /// Критичность проблемы (0-10)
    pub severity: u8,
}

/// Коэффициент расширения текста при переходе от `src_lang` к `tgt_lang`
///
/// Для неизвестных языков используется 1.0 (базовая линия).
pub fn expansion_factor(config: &DensityConfig, src_lang: &str, tgt_lang: &str) -> f64 {
    let src = config
        .expansion_factors
        .get(&src_lang.to_lowercase())
        .copied()
        .unwrap_or(1.0);
    let tgt = config
        .expansion_factors
        .get(&tgt_lang.to_lowercase())
        .copied()
        .unwrap_or(1.0);
    tgt / src
}

/// Ожидаемая длительность перевода по длительности оригинала
pub fn estimate_translated_duration(
    config: &DensityConfig,
    reference_duration: f64,
    src_lang: &str,
    tgt_lang: &str,
) -> f64 {
    reference_duration * expansion_factor(config, src_lang, tgt_lang)
}

/// Символов в секунду (пробелы не учитываются)
pub fn chars_per_second(text: &str, duration: f64) -> f64 {
    let chars = text.chars().filter(|c| !c.is_whitespace()).count();
    chars as f64 / duration.max(0.1)
}

/// Слов в секунду
pub fn words_per_second(text: &str, duration: f64) -> f64 {
    let words = text.split_whitespace().count();
    words as f64 / duration.max(0.1)
}

/// Оценка длительности синтезированной речи до генерации аудио
///
/// Скорость речи корректируется по языку, пунктуация добавляет паузы.
/// Результат не бывает короче 0.5 с.
pub fn estimate_speech_duration(config: &DensityConfig, text: &str, lang: &str) -> f64 {
    let words = text.split_whitespace().count();

    let speed_factor = match lang.to_lowercase().as_str() {
        "en" => 1.1,
        "es" => 0.95,
        "fr" => 0.90,
        _ => 1.0,
    };
    let adjusted_wps = config.base_words_per_second * speed_factor;

    let duration = words as f64 / adjusted_wps;

    // Паузы на знаках препинания
    let count = |c: char| text.chars().filter(|&x| x == c).count() as f64;
    let pauses = count('.') * 0.3 + count(',') * 0.15 + count('?') * 0.3 + count('!') * 0.3;

    (duration + pauses).max(0.5)
}

/// Проанализировать сегменты на избыток текста в отведенном окне
///
/// Сегменты, которые потребуют ускорения выше комфортного, получают
/// ненулевую критичность; такие окна почти наверняка не вместят
/// синтезированную речь без коррекции.
pub fn analyze_segments(segments: &[Segment], config: &DensityConfig) -> Vec<SegmentDensity> {
    let mut results = Vec::with_capacity(segments.len());

    for (i, segment) in segments.iter().enumerate() {
        let duration = segment.duration();
        let word_count = segment.word_count();

        let wps = if duration > 0.0 {
            word_count as f64 / duration
        } else {
            0.0
        };
        let required_speed_factor = wps / config.base_words_per_second;

        let severity = if required_speed_factor <= 1.0 {
            0
        } else {
            let severity_factor =
                (required_speed_factor - 1.0) / (config.max_speed_factor - 1.0);
            (severity_factor * 10.0).min(10.0) as u8
        };

        results.push(SegmentDensity {
            index: i,
            word_count,
            duration,
            words_per_second: wps,
            required_speed_factor,
            severity,
        });
    }

    results
}

//! Модуль разбиения длинных сегментов
//!
//! Слишком длинный сегмент дробится на части, чтобы синтезатор речи не
//! получал реплики, которые заведомо не уложатся в окно. Предпочтение
//! отдается естественным паузам (интервалам тишины от внешнего VAD);
//! если их нет - разбиение идет по пунктуации с оценкой скорости речи.
//! Части получают новые временные метки, при этом конец последней части
//! всегда совпадает с концом исходного сегмента, чтобы ошибка округления
//! не выходила за его границу.

use lazy_static::lazy_static;
use log::{info, warn};
use regex::Regex;

use crate::config::SplitterConfig;
use crate::segment::parser::{PauseWindow, Segment, SplitMethod};

lazy_static! {
    /// Знаки конца предложения и разделители клауз
    static ref CLAUSE_PUNCT: Regex = Regex::new(r"[.!?:;,…]").unwrap();
}

/// Разбить длинные сегменты последовательности
///
/// Сегменты короче `max_duration` или с числом слов меньше порога остаются
/// нетронутыми: дробление коротких и плотных реплик рвет смысл. Нулевой
/// `max_duration` отключает разбиение целиком.
pub fn split_long_segments(
    segments: &[Segment],
    max_duration: f64,
    pauses: &[PauseWindow],
    config: &SplitterConfig,
) -> Vec<Segment> {
    if max_duration <= 0.0 {
        info!("Разбиение сегментов отключено");
        return segments.to_vec();
    }

    let mut out = Vec::with_capacity(segments.len());

    for segment in segments {
        let duration = segment.duration().max(0.001);

        if duration <= max_duration || segment.word_count() < config.min_words_for_split {
            out.push(segment.clone());
            continue;
        }

        // Паузы, начинающиеся внутри интервала сегмента
        let segment_pauses: Vec<PauseWindow> = pauses
            .iter()
            .filter(|p| segment.start <= p.start && p.start < segment.end)
            .copied()
            .collect();

        if let Some(parts) = split_by_pauses(segment, &segment_pauses, config) {
            out.extend(parts);
            continue;
        }

        match split_by_punctuation(segment, max_duration, config) {
            Some(parts) => out.extend(parts),
            None => {
                warn!(
                    "Сегмент [{:.2}s - {:.2}s] не удалось разбить: нет пригодных пауз и пунктуации",
                    segment.start, segment.end
                );
                out.push(segment.clone());
            }
        }
    }

    info!(
        "После разбиения: {} сегментов (исходно {})",
        out.len(),
        segments.len()
    );
    out
}

/// Разбиение по естественным паузам
///
/// Точки разреза - концы пауз (ограниченные концом сегмента), поэтому части
/// покрывают исходный интервал без зазоров: время самой паузы остается
/// хвостовым запасом предыдущей части и позже заполняется тишиной. Кандидат
/// принимается, когда его речевая часть не короче `min_part_duration`;
/// хвост может быть короче, вплоть до `min_tail_duration`.
fn split_by_pauses(
    segment: &Segment,
    pauses: &[PauseWindow],
    config: &SplitterConfig,
) -> Option<Vec<Segment>> {
    if pauses.is_empty() {
        return None;
    }

    let mut bounds: Vec<(f64, f64)> = Vec::new();
    let mut current_start = segment.start;

    for pause in pauses {
        let pause_end = pause.end.min(segment.end);
        if pause.start - current_start >= config.min_part_duration && pause_end > current_start {
            bounds.push((current_start, pause_end));
            current_start = pause_end;
        }
    }

    if segment.end - current_start >= config.min_tail_duration {
        bounds.push((current_start, segment.end));
    } else if let Some(last) = bounds.last_mut() {
        // Слишком короткий хвост присоединяется к последней части
        last.1 = segment.end;
    }

    // Одна часть означает, что пауз, пригодных для разреза, не нашлось
    if bounds.len() < 2 {
        return None;
    }

    let words: Vec<&str> = segment.text.split_whitespace().collect();
    if words.len() < bounds.len() {
        return None;
    }

    let total_duration: f64 = bounds.iter().map(|(s, e)| e - s).sum();
    let shares: Vec<f64> = bounds
        .iter()
        .map(|(s, e)| (e - s) / total_duration)
        .collect();

    let texts = distribute_words_by_chars(&words, &shares);

    let mut parts = Vec::with_capacity(bounds.len());
    for (i, ((start, end), text)) in bounds.iter().zip(texts).enumerate() {
        let end = if i == bounds.len() - 1 {
            segment.end
        } else {
            *end
        };
        parts.push(Segment {
            start: *start,
            end,
            text,
            split_method: SplitMethod::Pause,
        });
    }

    Some(parts)
}

/// Распределить слова по частям пропорционально долям длительности
///
/// Доля каждой части переводится в целевое число символов; слова
/// назначаются целиком, остаток уходит в последнюю часть. Каждая часть,
/// кроме последней, получает хотя бы одно слово.
fn distribute_words_by_chars(words: &[&str], shares: &[f64]) -> Vec<String> {
    let n = shares.len();
    let total_chars: usize = words.iter().map(|w| w.chars().count()).sum();

    let mut result = Vec::with_capacity(n);
    let mut idx = 0usize;
    let mut taken_chars = 0usize;
    let mut cumulative_share = 0.0f64;

    for i in 0..n - 1 {
        cumulative_share += shares[i];
        let target = total_chars as f64 * cumulative_share;
        let reserve = n - 1 - i;

        let mut piece: Vec<&str> = Vec::new();
        while idx + reserve < words.len() {
            if !piece.is_empty() && taken_chars as f64 >= target {
                break;
            }
            taken_chars += words[idx].chars().count();
            piece.push(words[idx]);
            idx += 1;
        }
        result.push(piece.join(" "));
    }

    result.push(words[idx..].join(" "));
    result
}

/// Разбиение по пунктуации
///
/// Скорость речи оценивается как `len(text)/duration` с нижней границей
/// `min_chars_per_second`. Токены накапливаются в буфер; как только
/// оценочная длительность буфера превышает `max_duration`, буфер
/// закрывается как отдельный кусок. Кусок без минимального числа
/// буквенно-цифровых символов самостоятельным не считается и вливается
/// в следующий буфер. Временные метки распределяются пропорционально
/// доле символов каждого куска.
fn split_by_punctuation(
    segment: &Segment,
    max_duration: f64,
    config: &SplitterConfig,
) -> Option<Vec<Segment>> {
    let text = segment.text.trim();
    let duration = segment.duration().max(0.001);
    let cps = (text.chars().count() as f64 / duration).max(config.min_chars_per_second);

    let is_good = |t: &str| {
        t.chars().filter(|c| c.is_alphanumeric()).count() >= config.min_alnum_per_piece
    };

    let mut pieces: Vec<String> = Vec::new();
    let mut buf = String::new();

    for token in tokenize_with_punct(text) {
        let candidate = format!("{}{}", buf, token).trim().to_string();
        let estimated = candidate.chars().count() as f64 / cps;

        if !candidate.is_empty() && estimated > max_duration && is_good(&buf) {
            pieces.push(buf.trim().to_string());
            buf = token.trim().to_string();
        } else {
            buf = candidate;
        }
    }
    if is_good(&buf) {
        pieces.push(buf.trim().to_string());
    }

    if pieces.is_empty() {
        return None;
    }

    // Метки времени по доле символов каждого куска
    let total_chars: usize = pieces.iter().map(|p| p.chars().count()).sum();
    let mut parts = Vec::with_capacity(pieces.len());
    let mut cursor = segment.start;

    for (i, piece) in pieces.iter().enumerate() {
        let share = piece.chars().count() as f64 / total_chars as f64;
        let end = if i == pieces.len() - 1 {
            segment.end
        } else {
            cursor + duration * share
        };
        parts.push(Segment {
            start: cursor,
            end,
            text: piece.clone(),
            split_method: SplitMethod::Punctuation,
        });
        cursor = end;
    }

    Some(parts)
}

/// Разбить текст на токены, сохраняя знаки препинания отдельными токенами
fn tokenize_with_punct(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut prev = 0usize;

    for m in CLAUSE_PUNCT.find_iter(text) {
        if m.start() > prev {
            tokens.push(text[prev..m.start()].to_string());
        }
        tokens.push(m.as_str().to_string());
        prev = m.end();
    }
    if prev < text.len() {
        tokens.push(text[prev..].to_string());
    }

    tokens
}

//! Модуль разложения коэффициента изменения темпа
//!
//! Примитив изменения темпа принимает коэффициент только в диапазоне
//! [0.5, 2.0] за одно применение, поэтому общий коэффициент раскладывается
//! на цепочку ступеней. Произведение ступеней равно исходному коэффициенту
//! с точностью до погрешности плавающей точки.

/// Минимальный допустимый коэффициент одной ступени
pub const MIN_STAGE_FACTOR: f64 = 0.5;

/// Максимальный допустимый коэффициент одной ступени
pub const MAX_STAGE_FACTOR: f64 = 2.0;

/// Разложить общий коэффициент темпа на цепочку допустимых ступеней
///
/// Коэффициент больше единицы ускоряет воспроизведение (укорачивает клип),
/// меньше единицы - замедляет. Коэффициент ровно 1.0 дает одну ступень
/// `[1.0]`: пропуск обработки при коэффициенте около единицы - решение
/// планировщика синхронизации, не этого модуля.
pub fn plan_stages(ratio: f64) -> Vec<f64> {
    if !ratio.is_finite() || ratio <= 0.0 {
        log::warn!("Недопустимый коэффициент темпа {}, ступени не строятся", ratio);
        return vec![1.0];
    }

    let mut stages = Vec::new();
    let mut remaining = ratio;

    while remaining < MIN_STAGE_FACTOR {
        stages.push(MIN_STAGE_FACTOR);
        remaining /= MIN_STAGE_FACTOR;
    }
    while remaining > MAX_STAGE_FACTOR {
        stages.push(MAX_STAGE_FACTOR);
        remaining /= MAX_STAGE_FACTOR;
    }
    stages.push(remaining);

    stages
}

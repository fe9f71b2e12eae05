//! Модуль измерения длительности аудиоклипов
//!
//! Измерение - чистый запрос без побочных эффектов. Любой сбой чтения
//! длительности превращается в 0.0: планировщик трактует неположительную
//! длительность как «длительность неизвестна» и пропускает клип без
//! изменений.

use std::path::Path;
use std::process::Command;

use log::warn;

/// Зонд длительности аудиоклипа
pub trait DurationProbe {
    /// Длительность клипа в секундах
    ///
    /// Возвращает 0.0 при любом сбое; никогда не возвращает отрицательное
    /// значение и никогда не завершается ошибкой.
    fn probe(&self, path: &Path) -> f64;
}

/// Зонд длительности на основе ffprobe
pub struct FfprobeDurationProbe;

impl FfprobeDurationProbe {
    /// Создать новый экземпляр зонда
    pub fn new() -> Self {
        Self
    }
}

impl Default for FfprobeDurationProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl DurationProbe for FfprobeDurationProbe {
    fn probe(&self, path: &Path) -> f64 {
        let output = Command::new("ffprobe")
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(path)
            .output();

        let output = match output {
            Ok(output) if output.status.success() => output,
            Ok(output) => {
                warn!(
                    "ffprobe завершился со статусом {} для {}",
                    output.status,
                    path.display()
                );
                return 0.0;
            }
            Err(e) => {
                warn!("Не удалось запустить ffprobe для {}: {}", path.display(), e);
                return 0.0;
            }
        };

        let duration_str = String::from_utf8_lossy(&output.stdout);
        match duration_str.trim().parse::<f64>() {
            Ok(duration) => duration.max(0.0),
            Err(_) => {
                warn!(
                    "Не удалось разобрать длительность '{}' для {}",
                    duration_str.trim(),
                    path.display()
                );
                0.0
            }
        }
    }
}

//! Модуль обработки ошибок библиотеки dub-sync
//!
//! Этот модуль содержит типы ошибок, которые могут возникнуть при работе библиотеки.

use thiserror::Error;

/// Ошибки библиотеки dub-sync
#[derive(Debug, Error)]
pub enum DubSyncError {
    /// Ошибка ввода-вывода
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Ошибка сериализации/десериализации JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Файл не найден
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// Ошибка валидации сегментов
    #[error("Segment validation error: {0}")]
    SegmentValidation(String),

    /// Ошибка конфигурации
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Ошибка внешнего исполнителя фильтров: прерывает весь прогон,
    /// так как отсутствующий клип сегмента нарушил бы итоговую склейку
    #[error("Filter executor failed for segment {segment_index} (action {action}): {message}")]
    Executor {
        /// Индекс сегмента, на котором произошла ошибка
        segment_index: usize,
        /// Действие, которое пытались применить
        action: String,
        /// Сообщение внешнего исполнителя
        message: String,
    },

    /// Другая ошибка
    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl From<&str> for DubSyncError {
    fn from(s: &str) -> Self {
        DubSyncError::Other(anyhow::anyhow!(s.to_string()))
    }
}

impl From<String> for DubSyncError {
    fn from(s: String) -> Self {
        DubSyncError::Other(anyhow::anyhow!(s))
    }
}

/// Тип Result для библиотеки dub-sync
pub type Result<T> = std::result::Result<T, DubSyncError>;

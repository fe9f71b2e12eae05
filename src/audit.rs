//! Модуль журнала аудита
//!
//! По одной записи на финальный сегмент; записи сериализуются для
//! последующего разбора внешними инструментами. Схема только расширяется:
//! существующие поля не переименовываются и не удаляются между версиями.

use std::fs::File;
use std::path::Path;

use serde::Serialize;

use crate::error::Result;
use crate::metrics::SyncMetrics;
use crate::segment::parser::Segment;
use crate::sync::planner::{SyncAction, SyncDecision};

/// Запись журнала аудита по одному сегменту
#[derive(Debug, Clone, Serialize)]
pub struct AuditRecord {
    /// Индекс сегмента
    pub index: usize,
    /// Целевая длительность, сек
    pub target_seconds: f64,
    /// Фактическая длительность синтезированного клипа, сек
    pub actual_seconds: f64,
    /// Выбранное действие
    pub action: SyncAction,
    /// Примененный коэффициент темпа
    pub applied_ratio: f64,
    /// Текст сегмента
    pub text: String,
}

/// Журнал аудита прогона целиком
#[derive(Debug, Clone, Serialize)]
pub struct AuditLog {
    /// Отметка времени создания журнала (RFC 3339)
    pub generated_at: String,
    /// Режим синхронизации прогона
    pub sync_mode: String,
    /// Записи по сегментам
    pub records: Vec<AuditRecord>,
    /// Сводные метрики качества
    pub metrics: SyncMetrics,
}

impl AuditLog {
    /// Собрать журнал из решений и исходных сегментов
    pub fn build(
        sync_mode: &str,
        decisions: &[SyncDecision],
        segments: &[Segment],
        metrics: SyncMetrics,
    ) -> Self {
        let records = decisions
            .iter()
            .map(|d| AuditRecord {
                index: d.segment_index,
                target_seconds: d.target_seconds,
                actual_seconds: d.actual_seconds,
                action: d.action,
                applied_ratio: d.applied_ratio,
                text: segments
                    .get(d.segment_index)
                    .map(|s| s.text.clone())
                    .unwrap_or_default(),
            })
            .collect();

        Self {
            generated_at: chrono::Utc::now().to_rfc3339(),
            sync_mode: sync_mode.to_string(),
            records,
            metrics,
        }
    }

    /// Записать журнал в JSON-файл
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path.as_ref())?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }
}

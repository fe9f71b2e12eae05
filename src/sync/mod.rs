//! # Синхронизация сегментов
//!
//! Модуль выбора стратегии синхронизации: сравнение фактической длительности
//! синтезированного клипа с целевым окном, разложение коэффициента темпа на
//! допустимые ступени и перенос накопленного дрейфа между сегментами.

pub mod planner;
pub mod stretch;

pub use planner::{decide, ElasticState, SyncAction, SyncDecision};
pub use stretch::plan_stages;

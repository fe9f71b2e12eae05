//! # Вспомогательные утилиты
//!
//! Утилиты для работы с рабочей директорией прогона.

pub mod temp;

pub use temp::WorkDir;

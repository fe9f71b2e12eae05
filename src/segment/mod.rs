//! # Сегменты исходной дорожки
//!
//! Модуль для работы с сегментами транскрипции: типы данных, загрузка
//! из JSON, оценка языковой плотности и разбиение длинных сегментов.

pub mod density;
pub mod parser;
pub mod splitter;

pub use density::{analyze_segments, SegmentDensity};
pub use parser::{load_segments, parse_segments, validate_segments, PauseWindow, Segment, SplitMethod};
pub use splitter::split_long_segments;

//! # Работа с медиа через внешние инструменты
//!
//! Модуль адаптеров к внешним коллабораторам: измерение длительности
//! клипов через ffprobe, выполнение аудио-фильтров через ffmpeg и сборка
//! итогового списка клипов для конкатенации. Сам движок никогда не пишет
//! аудиосемплы - все производные клипы создает внешний исполнитель.

pub mod concat;
pub mod filter;
pub mod probe;

pub use concat::{assemble_track, write_concat_list};
pub use filter::{FfmpegFilterExecutor, FilterAtom, FilterExecutor, FilterSpec};
pub use probe::{DurationProbe, FfprobeDurationProbe};

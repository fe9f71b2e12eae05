//! Модуль спецификаций аудио-фильтров и их исполнителя
//!
//! Спецификация фильтра собирается из небольшого словаря операций:
//! ограниченная ступень темпа `scale=<f>`, дополнение тишиной `pad=<s>`,
//! обрезка `trim=<s>` и генерация тишины `silence(rate, s)`. Исполнитель -
//! внешний сервис без состояния: один запрос (входной клип, спецификация,
//! частота и число каналов) дает один выходной клип. Сбой исполнителя не
//! перезапускается движком и фатален для прогона.

use std::path::Path;
use std::process::Command;

use crate::error::{DubSyncError, Result};
use crate::sync::stretch::{MAX_STAGE_FACTOR, MIN_STAGE_FACTOR};

/// Одна операция словаря фильтров
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterAtom {
    /// Ступень изменения темпа; коэффициент в пределах [0.5, 2.0]
    Scale(f64),
    /// Дополнение тишиной заданной длительности, сек
    Pad(f64),
    /// Обрезка до заданной длительности, сек
    Trim(f64),
}

impl FilterAtom {
    /// Записать операцию в словарной нотации
    pub fn render(&self) -> String {
        match self {
            Self::Scale(f) => format!("scale={:.6}", f),
            Self::Pad(d) => format!("pad={:.6}", d),
            Self::Trim(d) => format!("trim={:.6}", d),
        }
    }
}

/// Спецификация запроса к исполнителю фильтров
#[derive(Debug, Clone, PartialEq)]
pub enum FilterSpec {
    /// Цепочка операций над входным клипом
    Chain(Vec<FilterAtom>),
    /// Генерация клипа тишины; входной клип не требуется
    Silence {
        /// Частота дискретизации
        sample_rate: u32,
        /// Длительность тишины, сек
        seconds: f64,
    },
}

impl FilterSpec {
    /// Дополнить тишиной до целевой длительности и обрезать точно в цель
    ///
    /// Обрезка после дополнения защищает от выхода за цель на величину
    /// погрешности.
    pub fn pad_to(target: f64, actual: f64) -> Self {
        Self::Chain(vec![
            FilterAtom::Pad((target - actual).max(0.0)),
            FilterAtom::Trim(target),
        ])
    }

    /// Обрезать до целевой длительности
    pub fn trim_to(target: f64) -> Self {
        Self::Chain(vec![FilterAtom::Trim(target)])
    }

    /// Цепочка ступеней темпа с финальной обрезкой точно в цель
    ///
    /// Обрезка поглощает остаточную погрешность дискретной цепочки ступеней.
    pub fn stretch_to(stages: &[f64], target: f64) -> Self {
        let mut atoms: Vec<FilterAtom> = stages.iter().map(|f| FilterAtom::Scale(*f)).collect();
        atoms.push(FilterAtom::Trim(target));
        Self::Chain(atoms)
    }

    /// Клип тишины заданной длительности
    pub fn silence(sample_rate: u32, seconds: f64) -> Self {
        Self::Silence {
            sample_rate,
            seconds,
        }
    }

    /// Записать спецификацию в словарной нотации (для журнала аудита)
    pub fn render(&self) -> String {
        match self {
            Self::Chain(atoms) => atoms
                .iter()
                .map(FilterAtom::render)
                .collect::<Vec<_>>()
                .join(","),
            Self::Silence {
                sample_rate,
                seconds,
            } => format!("silence({}, {:.6})", sample_rate, seconds),
        }
    }

    /// Проверить, что все ступени темпа лежат в допустимом диапазоне
    pub fn validate(&self) -> Result<()> {
        if let Self::Chain(atoms) = self {
            for atom in atoms {
                if let FilterAtom::Scale(f) = atom {
                    if *f < MIN_STAGE_FACTOR || *f > MAX_STAGE_FACTOR {
                        return Err(DubSyncError::Configuration(format!(
                            "scale stage {} outside [{}, {}]",
                            f, MIN_STAGE_FACTOR, MAX_STAGE_FACTOR
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Исполнитель аудио-фильтров
///
/// Одна из операций может запрашиваться без входного клипа (тишина).
/// Отмена и тайм-ауты - ответственность реализации, не движка.
pub trait FilterExecutor {
    /// Выполнить спецификацию и записать результат в `output`
    fn execute(
        &self,
        input: Option<&Path>,
        spec: &FilterSpec,
        sample_rate: u32,
        channels: u16,
        output: &Path,
    ) -> Result<()>;
}

/// Исполнитель фильтров на основе ffmpeg
pub struct FfmpegFilterExecutor;

impl FfmpegFilterExecutor {
    /// Создать новый экземпляр исполнителя
    pub fn new() -> Self {
        Self
    }

    /// Перевести цепочку операций в фильтр ffmpeg
    fn ffmpeg_filter(atoms: &[FilterAtom]) -> String {
        atoms
            .iter()
            .map(|atom| match atom {
                FilterAtom::Scale(f) => format!("atempo={:.6}", f),
                FilterAtom::Pad(d) => format!("apad=pad_dur={:.6}", d),
                FilterAtom::Trim(d) => format!("atrim=duration={:.6}", d),
            })
            .collect::<Vec<_>>()
            .join(",")
    }

    fn channel_layout(channels: u16) -> String {
        match channels {
            1 => "mono".to_string(),
            2 => "stereo".to_string(),
            n => format!("{}c", n),
        }
    }

    fn run_ffmpeg(args: Vec<String>) -> Result<()> {
        let status = Command::new("ffmpeg")
            .args(&args)
            .status()
            .map_err(|e| DubSyncError::Other(anyhow::anyhow!("failed to launch ffmpeg: {}", e)))?;

        if !status.success() {
            return Err(DubSyncError::Other(anyhow::anyhow!(
                "ffmpeg command failed with status: {}",
                status
            )));
        }

        Ok(())
    }
}

impl Default for FfmpegFilterExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterExecutor for FfmpegFilterExecutor {
    fn execute(
        &self,
        input: Option<&Path>,
        spec: &FilterSpec,
        sample_rate: u32,
        channels: u16,
        output: &Path,
    ) -> Result<()> {
        spec.validate()?;

        let args = match spec {
            FilterSpec::Silence {
                sample_rate: rate,
                seconds,
            } => vec![
                "-y".to_string(),
                "-f".to_string(),
                "lavfi".to_string(),
                "-i".to_string(),
                format!(
                    "anullsrc=r={}:cl={}",
                    rate,
                    Self::channel_layout(channels)
                ),
                "-t".to_string(),
                format!("{:.6}", seconds),
                output.to_string_lossy().to_string(),
            ],
            FilterSpec::Chain(atoms) => {
                let input = input.ok_or_else(|| {
                    DubSyncError::Configuration(
                        "filter chain requires an input clip".to_string(),
                    )
                })?;
                vec![
                    "-y".to_string(),
                    "-i".to_string(),
                    input.to_string_lossy().to_string(),
                    "-af".to_string(),
                    Self::ffmpeg_filter(atoms),
                    "-ar".to_string(),
                    sample_rate.to_string(),
                    "-ac".to_string(),
                    channels.to_string(),
                    output.to_string_lossy().to_string(),
                ]
            }
        };

        Self::run_ffmpeg(args)
    }
}

/// Проверка наличия ffmpeg в системе
pub fn check_ffmpeg_installed() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

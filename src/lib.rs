//! Основной файл библиотеки dub-sync с поддержкой системы прогресса
//!
//! Библиотека согласует две независимые шкалы времени, возникающие при
//! дубляже видео: исходный тайминг реплик из транскрипции и фактическую
//! длительность синтезированной речи, которая почти никогда не совпадает
//! с целевым окном. Разбиение длинных сегментов, выбор стратегии
//! синхронизации, разложение коэффициента темпа, сборка дорожки с
//! сохранением пауз и метрики качества - всё в одном движке с режимом
//! в виде явного перечисления.

pub mod audit;
pub mod config;
pub mod error;
pub mod media;
pub mod metrics;
pub mod progress;
pub mod segment;
pub mod sync;
pub mod utils;

use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::audit::AuditLog;
use crate::config::{DubSyncConfig, SyncMode};
use crate::error::{DubSyncError, Result};
use crate::media::filter::{FfmpegFilterExecutor, FilterExecutor, FilterSpec};
use crate::media::probe::{DurationProbe, FfprobeDurationProbe};
use crate::metrics::SyncMetrics;
use crate::progress::{ProcessStep, ProgressObserver, ProgressReporter, ProgressTracker};
use crate::segment::parser::{validate_segments, PauseWindow, Segment};
use crate::sync::planner::{decide, ElasticState, SyncAction, SyncDecision};
use crate::sync::stretch::plan_stages;

/// Минимальная целевая длительность сегмента, сек
const MIN_TARGET_SECONDS: f64 = 0.05;

/// Синтезированный клип одного сегмента
///
/// Принадлежит внешнему этапу синтеза: движок читает длительность только
/// через зонд и запрашивает производные клипы у исполнителя фильтров,
/// сам аудиосемплы не трогает.
#[derive(Debug, Clone)]
pub struct SynthesizedClip {
    /// Индекс сегмента, которому принадлежит клип
    pub segment_index: usize,
    /// Путь к файлу клипа
    pub path: PathBuf,
    /// Длительность по данным этапа синтеза, сек
    pub duration_seconds: f64,
    /// Частота дискретизации клипа
    pub sample_rate: u32,
}

/// Итог согласования таймингов
#[derive(Debug)]
pub struct ReconciliationReport {
    /// Решения по сегментам в хронологическом порядке
    pub decisions: Vec<SyncDecision>,
    /// Сводные метрики качества
    pub metrics: SyncMetrics,
    /// Упорядоченный список клипов для конкатенации (включая тишину)
    pub track: Vec<PathBuf>,
    /// Путь записанного журнала аудита
    pub audit_log_path: PathBuf,
}

/// Основная структура для работы с библиотекой
pub struct DubSync {
    /// Конфигурация библиотеки
    config: DubSyncConfig,
    /// Зонд длительности клипов
    probe: Box<dyn DurationProbe>,
    /// Исполнитель аудио-фильтров
    executor: Box<dyn FilterExecutor>,
    /// Трекер прогресса
    progress_tracker: Option<ProgressTracker>,
}

impl DubSync {
    /// Создать новый экземпляр DubSync с указанной конфигурацией
    ///
    /// Внешние коллабораторы по умолчанию - ffprobe и ffmpeg.
    pub fn new(config: DubSyncConfig) -> Self {
        Self::with_collaborators(
            config,
            Box::new(FfprobeDurationProbe::new()),
            Box::new(FfmpegFilterExecutor::new()),
        )
    }

    /// Создать экземпляр с явными коллабораторами
    pub fn with_collaborators(
        config: DubSyncConfig,
        probe: Box<dyn DurationProbe>,
        executor: Box<dyn FilterExecutor>,
    ) -> Self {
        Self {
            config,
            probe,
            executor,
            progress_tracker: None,
        }
    }

    /// Создать экземпляр с репортером прогресса
    pub fn with_progress_reporter(
        config: DubSyncConfig,
        reporter: Box<dyn ProgressReporter>,
    ) -> Self {
        let mut instance = Self::new(config);
        instance.set_progress_reporter(reporter);
        instance
    }

    /// Установить репортер прогресса
    pub fn set_progress_reporter(&mut self, reporter: Box<dyn ProgressReporter>) {
        if let Some(tracker) = &mut self.progress_tracker {
            tracker.set_reporter(reporter);
        } else {
            self.progress_tracker = Some(ProgressTracker::with_reporter(reporter));
        }
    }

    /// Добавить наблюдателя прогресса
    pub fn add_observer(&mut self, observer: Box<dyn ProgressObserver>) -> Option<usize> {
        self.progress_tracker
            .as_mut()
            .and_then(|tracker| tracker.add_observer(observer))
    }

    /// Разбить длинные сегменты перед синтезом речи
    ///
    /// Интервалы тишины `pauses` приходят от внешнего детектора пауз и
    /// относятся к исходной аудиодорожке.
    pub fn split_segments(
        &self,
        segments: &[Segment],
        pauses: &[PauseWindow],
    ) -> Result<Vec<Segment>> {
        validate_segments(segments)?;

        if let Some(t) = &self.progress_tracker {
            t.set_step(ProcessStep::SegmentSplitting);
            t.update_step_progress(0.0, None);
        }

        let out = segment::splitter::split_long_segments(
            segments,
            self.config.max_segment_duration,
            pauses,
            &self.config.splitter,
        );

        // Окна, которые и после разбиения не вместят речь без сильного
        // ускорения, помечаются заранее
        for analysis in segment::density::analyze_segments(&out, &self.config.density) {
            if analysis.severity > 7 {
                warn!(
                    "Segment {} is overly dense: {:.1} words/s over {:.2}s window",
                    analysis.index, analysis.words_per_second, analysis.duration
                );
            }
        }

        if let Some(t) = &self.progress_tracker {
            t.update_step_progress(100.0, None);
        }

        Ok(out)
    }

    /// Согласовать тайминги синтезированных клипов с исходной шкалой
    ///
    /// `segments` - финальные (после разбиения) сегменты, `clips` -
    /// параллельный им список синтезированных клипов, по одному на сегмент.
    /// Производные клипы и журнал аудита записываются в `workdir`.
    pub fn reconcile(
        &self,
        segments: &[Segment],
        clips: &[SynthesizedClip],
        workdir: &Path,
    ) -> Result<ReconciliationReport> {
        info!("Starting segment timing reconciliation");

        self.config.validate()?;
        validate_segments(segments)?;

        if segments.len() != clips.len() {
            return Err(DubSyncError::SegmentValidation(format!(
                "segment/clip count mismatch: {} segments, {} clips",
                segments.len(),
                clips.len()
            )));
        }

        fs::create_dir_all(workdir)?;

        let tracker_ref = self.progress_tracker.as_ref();
        if let Some(t) = tracker_ref {
            t.set_step(ProcessStep::SyncPlanning);
        }

        // Эластичный аккумулятор принадлежит только этому последовательному
        // циклу; планирование идет строго в хронологическом порядке
        let mut elastic = ElasticState::new();
        let total = segments.len();
        let mut decisions: Vec<SyncDecision> = Vec::with_capacity(total);
        let mut processed: Vec<PathBuf> = Vec::with_capacity(total);

        if let Some(t) = tracker_ref {
            t.set_step(ProcessStep::FilterProcessing);
        }

        for (i, (segment, clip)) in segments.iter().zip(clips).enumerate() {
            if let Some(t) = tracker_ref {
                t.update_step_progress(
                    (i as f32 / total as f32) * 100.0,
                    Some(format!("Сегмент {}/{}", i + 1, total)),
                );
            }

            let raw_target = segment.duration().max(MIN_TARGET_SECONDS);
            let target = if self.config.sync_mode == SyncMode::Elastic {
                elastic.adjusted_target(raw_target).max(MIN_TARGET_SECONDS)
            } else {
                raw_target
            };

            let actual = self.probe.probe(&clip.path);
            if actual <= 0.0 {
                warn!(
                    "Duration unknown for segment {} clip {}, passing through unchanged",
                    i,
                    clip.path.display()
                );
            }

            let (action, ratio) = decide(
                self.config.sync_mode,
                target,
                actual,
                self.config.tolerance,
                self.config.max_stretch,
            );

            if self.config.sync_mode == SyncMode::Elastic && actual > 0.0 {
                elastic.absorb(actual, target, total - i - 1);
            }

            let output = self.apply_action(i, &clip.path, action, ratio, target, actual, workdir)?;

            info!(
                "Segment {}: target {:.3}s, actual {:.3}s, action {}, ratio {:.3}",
                i,
                target,
                actual,
                action.as_str(),
                ratio
            );

            decisions.push(SyncDecision {
                segment_index: i,
                target_seconds: target,
                actual_seconds: actual,
                applied_ratio: ratio,
                action,
            });
            processed.push(output);
        }

        if let Some(t) = tracker_ref {
            t.set_step(ProcessStep::TrackAssembly);
        }

        let track = media::concat::assemble_track(
            &processed,
            segments,
            self.config.preserve_gaps,
            self.config.gap_min_seconds,
            self.config.sample_rate,
            self.config.channels,
            self.executor.as_ref(),
            workdir,
        )?;

        if let Some(t) = tracker_ref {
            t.set_step(ProcessStep::MetricsAggregation);
        }

        let metrics = metrics::summarize(&decisions);
        info!(
            "Reconciliation metrics: avg offset {:.3}s, max offset {:.3}s, {} over tolerance",
            metrics.avg_offset, metrics.max_offset, metrics.segments_over_tolerance
        );

        let audit_log_path = workdir.join("audit.json");
        let log = AuditLog::build(
            self.config.sync_mode.as_str(),
            &decisions,
            segments,
            metrics.clone(),
        );
        log.write(&audit_log_path)?;

        if let Some(t) = tracker_ref {
            t.complete();
        }

        info!("Segment timing reconciliation completed successfully");
        Ok(ReconciliationReport {
            decisions,
            metrics,
            track,
            audit_log_path,
        })
    }

    /// Применить действие синхронизации к клипу одного сегмента
    ///
    /// Блокирующий вызов исполнителя: решение фиксируется только после
    /// его завершения. Сбой исполнителя фатален для всего прогона.
    fn apply_action(
        &self,
        index: usize,
        input: &Path,
        action: SyncAction,
        ratio: f64,
        target: f64,
        actual: f64,
        workdir: &Path,
    ) -> Result<PathBuf> {
        let spec = match action {
            SyncAction::Pass => return Ok(input.to_path_buf()),
            SyncAction::Pad => FilterSpec::pad_to(target, actual),
            SyncAction::Trim => FilterSpec::trim_to(target),
            SyncAction::Stretch => FilterSpec::stretch_to(&plan_stages(ratio), target),
        };

        let output = workdir.join(format!("seg_{:04}_sync.wav", index + 1));
        self.executor
            .execute(
                Some(input),
                &spec,
                self.config.sample_rate,
                self.config.channels,
                &output,
            )
            .map_err(|e| DubSyncError::Executor {
                segment_index: index,
                action: action.as_str().to_string(),
                message: e.to_string(),
            })?;

        Ok(output)
    }
}

/// Публичный API для удобного использования
pub fn reconcile_timeline(
    config: DubSyncConfig,
    segments: &[Segment],
    clips: &[SynthesizedClip],
    workdir: &Path,
) -> Result<ReconciliationReport> {
    let engine = DubSync::new(config);
    engine.reconcile(segments, clips, workdir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    /// Зонд для тестов с заранее известными длительностями
    struct FixedProbe {
        durations: HashMap<PathBuf, f64>,
    }

    impl DurationProbe for FixedProbe {
        fn probe(&self, path: &Path) -> f64 {
            self.durations.get(path).copied().unwrap_or(0.0)
        }
    }

    /// Исполнитель для тестов: записывает спецификации и создает файлы
    struct RecordingExecutor {
        requests: Arc<Mutex<Vec<String>>>,
        fail: bool,
    }

    impl RecordingExecutor {
        fn new() -> Self {
            Self {
                requests: Arc::new(Mutex::new(Vec::new())),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new()
            }
        }

        fn requests(&self) -> Arc<Mutex<Vec<String>>> {
            self.requests.clone()
        }
    }

    impl FilterExecutor for RecordingExecutor {
        fn execute(
            &self,
            _input: Option<&Path>,
            spec: &FilterSpec,
            _sample_rate: u32,
            _channels: u16,
            output: &Path,
        ) -> Result<()> {
            if self.fail {
                return Err(DubSyncError::Other(anyhow::anyhow!("executor exploded")));
            }
            self.requests.lock().unwrap().push(spec.render());
            std::fs::write(output, b"")?;
            Ok(())
        }
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        workdir: PathBuf,
        segments: Vec<Segment>,
        clips: Vec<SynthesizedClip>,
        probe: FixedProbe,
    }

    /// Подготовить сегменты и клипы с заданными фактическими длительностями
    fn fixture(timings: &[(f64, f64, f64)]) -> Fixture {
        let _ = env_logger::builder().is_test(true).try_init();

        let dir = tempfile::tempdir().unwrap();
        let workdir = dir.path().join("dub_work");

        let mut segments = Vec::new();
        let mut clips = Vec::new();
        let mut durations = HashMap::new();

        for (i, (start, end, actual)) in timings.iter().enumerate() {
            segments.push(Segment::new(*start, *end, format!("сегмент {}", i)));

            let clip_path = dir.path().join(format!("tts_{:04}.wav", i + 1));
            std::fs::write(&clip_path, b"").unwrap();
            durations.insert(clip_path.clone(), *actual);

            clips.push(SynthesizedClip {
                segment_index: i,
                path: clip_path,
                duration_seconds: *actual,
                sample_rate: 24000,
            });
        }

        Fixture {
            _dir: dir,
            workdir,
            segments,
            clips,
            probe: FixedProbe { durations },
        }
    }

    fn smart_config() -> DubSyncConfig {
        DubSyncConfig {
            sync_mode: SyncMode::Smart,
            tolerance: 0.15,
            max_stretch: 1.35,
            ..DubSyncConfig::default()
        }
    }

    #[test]
    fn test_smart_mode_decisions() {
        // Короткий, попавший в допуск и слишком длинный клипы
        let fx = fixture(&[(0.0, 2.0, 1.2), (2.0, 4.0, 2.1), (4.0, 6.0, 3.5)]);

        let engine = DubSync::with_collaborators(
            smart_config(),
            Box::new(fx.probe),
            Box::new(RecordingExecutor::new()),
        );
        let report = engine.reconcile(&fx.segments, &fx.clips, &fx.workdir).unwrap();

        assert_eq!(report.decisions.len(), 3);
        assert_eq!(report.decisions[0].action, SyncAction::Pad);
        assert_eq!(report.decisions[1].action, SyncAction::Pass);
        assert_eq!(report.decisions[2].action, SyncAction::Stretch);

        // Желаемый коэффициент 1.75 ограничен максимумом 1.35
        assert!((report.decisions[2].applied_ratio - 1.35).abs() < 1e-9);

        // Пропущенный сегмент остается исходным клипом
        assert_eq!(report.track[1], fx.clips[1].path);
        assert!(report.track[0].ends_with("seg_0001_sync.wav"));
        assert!(report.track[2].ends_with("seg_0003_sync.wav"));
    }

    #[test]
    fn test_executed_filter_specs() {
        let fx = fixture(&[(0.0, 2.0, 1.2), (2.0, 4.0, 3.5)]);

        let executor = RecordingExecutor::new();
        let requests_handle = executor.requests();
        let engine =
            DubSync::with_collaborators(smart_config(), Box::new(fx.probe), Box::new(executor));
        engine.reconcile(&fx.segments, &fx.clips, &fx.workdir).unwrap();

        // Спецификации в словарной нотации: pad с обрезкой точно в цель и
        // цепочка ступеней темпа с финальной обрезкой
        let requests = requests_handle.lock().unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0], "pad=0.800000,trim=2.000000");
        assert_eq!(requests[1], "scale=1.350000,trim=2.000000");
    }

    #[test]
    fn test_probe_failure_passes_through() {
        let fx = fixture(&[(0.0, 2.0, 0.0)]);

        let engine = DubSync::with_collaborators(
            smart_config(),
            Box::new(fx.probe),
            Box::new(RecordingExecutor::new()),
        );
        let report = engine.reconcile(&fx.segments, &fx.clips, &fx.workdir).unwrap();

        assert_eq!(report.decisions[0].action, SyncAction::Pass);
        assert_eq!(report.decisions[0].applied_ratio, 1.0);
        assert_eq!(report.track[0], fx.clips[0].path);
    }

    #[test]
    fn test_count_mismatch_rejected() {
        let fx = fixture(&[(0.0, 2.0, 1.9), (2.0, 4.0, 2.0)]);

        let engine = DubSync::with_collaborators(
            smart_config(),
            Box::new(fx.probe),
            Box::new(RecordingExecutor::new()),
        );
        let result = engine.reconcile(&fx.segments, &fx.clips[..1], &fx.workdir);
        assert!(matches!(result, Err(DubSyncError::SegmentValidation(_))));
    }

    #[test]
    fn test_executor_failure_aborts_run() {
        let fx = fixture(&[(0.0, 2.0, 1.2)]);

        let engine = DubSync::with_collaborators(
            smart_config(),
            Box::new(fx.probe),
            Box::new(RecordingExecutor::failing()),
        );
        let result = engine.reconcile(&fx.segments, &fx.clips, &fx.workdir);

        match result {
            Err(DubSyncError::Executor {
                segment_index,
                action,
                ..
            }) => {
                assert_eq!(segment_index, 0);
                assert_eq!(action, "pad");
            }
            other => panic!("expected executor error, got {:?}", other),
        }
    }

    #[test]
    fn test_elastic_adjusts_future_targets() {
        // Первый клип длиннее окна на 0.9s: дрейф превышает порог и
        // распределяется по двум оставшимся сегментам поровну
        let fx = fixture(&[(0.0, 2.0, 2.9), (2.0, 4.0, 1.55), (4.0, 6.0, 1.55)]);

        let mut config = smart_config();
        config.sync_mode = SyncMode::Elastic;

        let engine = DubSync::with_collaborators(
            config,
            Box::new(fx.probe),
            Box::new(RecordingExecutor::new()),
        );
        let report = engine.reconcile(&fx.segments, &fx.clips, &fx.workdir).unwrap();

        assert_eq!(report.decisions[0].target_seconds, 2.0);
        assert!((report.decisions[1].target_seconds - 1.55).abs() < 1e-9);
        assert!((report.decisions[2].target_seconds - 1.55).abs() < 1e-9);

        // Скорректированные цели совпали с фактом: дальнейший дрейф не копится
        assert_eq!(report.decisions[1].action, SyncAction::Pass);
        assert_eq!(report.decisions[2].action, SyncAction::Pass);
    }

    #[test]
    fn test_gap_preservation_inserts_silence() {
        let fx = fixture(&[(0.0, 2.0, 2.0), (3.0, 5.0, 2.0)]);

        let mut config = smart_config();
        config.preserve_gaps = true;

        let engine = DubSync::with_collaborators(
            config,
            Box::new(fx.probe),
            Box::new(RecordingExecutor::new()),
        );
        let report = engine.reconcile(&fx.segments, &fx.clips, &fx.workdir).unwrap();

        // Два клипа и одна вставка тишины на паузу в 1 секунду
        assert_eq!(report.track.len(), 3);
        assert!(report.track[1].ends_with("sil_0001.wav"));
    }

    #[test]
    fn test_audit_log_written() {
        let fx = fixture(&[(0.0, 2.0, 1.2)]);

        let engine = DubSync::with_collaborators(
            smart_config(),
            Box::new(fx.probe),
            Box::new(RecordingExecutor::new()),
        );
        let report = engine.reconcile(&fx.segments, &fx.clips, &fx.workdir).unwrap();

        let contents = std::fs::read_to_string(&report.audit_log_path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&contents).unwrap();
        assert_eq!(value["sync_mode"], "smart");
        assert_eq!(value["records"].as_array().unwrap().len(), 1);
        assert_eq!(value["records"][0]["text"], "сегмент 0");
    }

    #[test]
    fn test_invalid_config_rejected() {
        let fx = fixture(&[(0.0, 2.0, 2.0)]);

        let mut config = smart_config();
        config.tolerance = 1.5;

        let engine = DubSync::with_collaborators(
            config,
            Box::new(fx.probe),
            Box::new(RecordingExecutor::new()),
        );
        let result = engine.reconcile(&fx.segments, &fx.clips, &fx.workdir);
        assert!(matches!(result, Err(DubSyncError::Configuration(_))));
    }
}

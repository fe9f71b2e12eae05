//! Модуль сборки итоговой дорожки
//!
//! Собирает упорядоченный список клипов для конкатенации. Порядок строго
//! хронологический: перестановки и разрешение перекрытий не выполняются,
//! за хронологически корректную последовательность отвечают предыдущие
//! этапы. При включенном сохранении пауз между соседними клипами
//! вставляется свежесинтезированная тишина той же длительности, что и
//! пауза в исходной дорожке.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::info;

use crate::error::Result;
use crate::media::filter::{FilterExecutor, FilterSpec};
use crate::segment::parser::Segment;

/// Собрать упорядоченный список клипов для конкатенации
///
/// Тишина вставляется между клипами `i` и `i+1`, когда пауза между
/// исходными сегментами не короче `gap_min` и количество клипов совпадает
/// с количеством сегментов один к одному.
pub fn assemble_track(
    clips: &[PathBuf],
    segments: &[Segment],
    preserve_gaps: bool,
    gap_min: f64,
    sample_rate: u32,
    channels: u16,
    executor: &dyn FilterExecutor,
    workdir: &Path,
) -> Result<Vec<PathBuf>> {
    if !preserve_gaps || segments.len() != clips.len() {
        return Ok(clips.to_vec());
    }

    let mut track = Vec::with_capacity(clips.len() * 2);
    let mut silence_count = 0usize;

    for (i, clip) in clips.iter().enumerate() {
        track.push(clip.clone());

        if i + 1 < clips.len() {
            let gap = segments[i + 1].start - segments[i].end;
            if gap >= gap_min {
                let silence_path = workdir.join(format!("sil_{:04}.wav", i + 1));
                executor.execute(
                    None,
                    &FilterSpec::silence(sample_rate, gap),
                    sample_rate,
                    channels,
                    &silence_path,
                )?;
                track.push(silence_path);
                silence_count += 1;
            }
        }
    }

    info!(
        "Собрана дорожка: {} клипов, {} вставок тишины",
        clips.len(),
        silence_count
    );
    Ok(track)
}

/// Записать список клипов в формате concat-демаксера ffmpeg
pub fn write_concat_list(clips: &[PathBuf], list_path: &Path) -> Result<()> {
    let mut file = File::create(list_path)?;
    for clip in clips {
        writeln!(file, "file '{}'", clip.display())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Исполнитель для тестов: записывает запросы и создает пустые файлы
    struct RecordingExecutor {
        requests: Mutex<Vec<String>>,
    }

    impl RecordingExecutor {
        fn new() -> Self {
            Self {
                requests: Mutex::new(Vec::new()),
            }
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
            self.requests.lock().unwrap().push(spec.render());
            std::fs::write(output, b"")?;
            Ok(())
        }
    }

    fn clip_paths(dir: &Path, n: usize) -> Vec<PathBuf> {
        (1..=n).map(|i| dir.join(format!("seg_{:04}.wav", i))).collect()
    }

    #[test]
    fn test_gaps_filled_with_silence() {
        let dir = tempfile::tempdir().unwrap();
        let clips = clip_paths(dir.path(), 3);
        let segments = vec![
            Segment::new(0.0, 2.0, "a"),
            Segment::new(2.5, 4.0, "b"), // пауза 0.5
            Segment::new(4.05, 6.0, "c"), // пауза 0.05 - короче порога
        ];

        let executor = RecordingExecutor::new();
        let track = assemble_track(
            &clips,
            &segments,
            true,
            0.20,
            24000,
            1,
            &executor,
            dir.path(),
        )
        .unwrap();

        assert_eq!(track.len(), 4);
        assert!(track[1].ends_with("sil_0001.wav"));

        let requests = executor.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0], "silence(24000, 0.500000)");
    }

    #[test]
    fn test_disabled_gap_preservation_returns_clips() {
        let dir = tempfile::tempdir().unwrap();
        let clips = clip_paths(dir.path(), 2);
        let segments = vec![
            Segment::new(0.0, 2.0, "a"),
            Segment::new(5.0, 6.0, "b"),
        ];

        let executor = RecordingExecutor::new();
        let track = assemble_track(
            &clips,
            &segments,
            false,
            0.20,
            24000,
            1,
            &executor,
            dir.path(),
        )
        .unwrap();

        assert_eq!(track, clips);
        assert!(executor.requests.lock().unwrap().is_empty());
    }

    #[test]
    fn test_count_mismatch_skips_silence() {
        let dir = tempfile::tempdir().unwrap();
        let clips = clip_paths(dir.path(), 2);
        let segments = vec![Segment::new(0.0, 2.0, "a")];

        let executor = RecordingExecutor::new();
        let track = assemble_track(
            &clips,
            &segments,
            true,
            0.20,
            24000,
            1,
            &executor,
            dir.path(),
        )
        .unwrap();

        assert_eq!(track, clips);
    }

    #[test]
    fn test_write_concat_list() {
        let dir = tempfile::tempdir().unwrap();
        let clips = clip_paths(dir.path(), 2);
        let list_path = dir.path().join("list.txt");

        write_concat_list(&clips, &list_path).unwrap();

        let contents = std::fs::read_to_string(&list_path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("file '"));
        assert!(lines[0].contains("seg_0001.wav"));
    }
}

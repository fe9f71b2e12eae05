//! Модуль рабочей директории прогона
//!
//! Производные клипы, вставки тишины и журнал аудита складываются в одну
//! рабочую директорию. Директория может быть временной (удаляется вместе
//! с объектом) или постоянной, переданной вызывающей стороной.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::error::Result;

enum WorkDirRoot {
    /// Временная директория; удаляется при уничтожении объекта
    Temporary(TempDir),
    /// Постоянная директория вызывающей стороны
    Persistent(PathBuf),
}

/// Рабочая директория прогона синхронизации
pub struct WorkDir {
    root: WorkDirRoot,
}

impl WorkDir {
    /// Создать временную рабочую директорию
    pub fn temporary() -> Result<Self> {
        Ok(Self {
            root: WorkDirRoot::Temporary(tempfile::tempdir()?),
        })
    }

    /// Использовать постоянную директорию, создав ее при необходимости
    pub fn at<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        fs::create_dir_all(&path)?;
        Ok(Self {
            root: WorkDirRoot::Persistent(path),
        })
    }

    /// Путь к рабочей директории
    pub fn path(&self) -> &Path {
        match &self.root {
            WorkDirRoot::Temporary(dir) => dir.path(),
            WorkDirRoot::Persistent(path) => path,
        }
    }

    /// Путь производного клипа сегмента с данным номером (нумерация с 1)
    pub fn derived_clip_path(&self, number: usize) -> PathBuf {
        self.path().join(format!("seg_{:04}_sync.wav", number))
    }

    /// Путь файла журнала аудита
    pub fn audit_log_path(&self) -> PathBuf {
        self.path().join("audit.json")
    }

    /// Путь файла списка конкатенации
    pub fn concat_list_path(&self) -> PathBuf {
        self.path().join("list.txt")
    }
}

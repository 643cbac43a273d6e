use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::thread;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::schema::Placement;
use super::{merge_layers, Settings};
use crate::error::SettingsError;

pub const PROJECT_FILE_NAME: &str = ".dropstack.json";
pub const GLOBAL_FILE_NAME: &str = ".settings.json";

/// Locations of the two settings files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsPaths {
    pub project: PathBuf,
    pub global: PathBuf,
}

impl SettingsPaths {
    pub fn new(project: impl Into<PathBuf>, global: impl Into<PathBuf>) -> Self {
        Self {
            project: project.into(),
            global: global.into(),
        }
    }

    /// Project file in the current directory, global file in the user's
    /// home directory.
    pub fn discover(project_file_name: Option<&str>) -> Result<Self, SettingsError> {
        let cwd = std::env::current_dir().map_err(SettingsError::CurrentDirUnavailable)?;
        let home = dirs::home_dir().ok_or(SettingsError::HomeDirUnavailable)?;
        Ok(Self::new(
            cwd.join(project_file_name.unwrap_or(PROJECT_FILE_NAME)),
            home.join(GLOBAL_FILE_NAME),
        ))
    }
}

/// What [`SettingsStore::load`] found on disk.
#[derive(Debug)]
pub enum LoadOutcome {
    /// At least one settings file was read.
    Loaded(Settings),
    /// Neither file exists; the settings are the overrides plus defaults.
    Defaults(Settings),
    /// A settings file exists but is unreadable or corrupt. `settings` holds
    /// the merge of the files that did read; `errors` names each bad file by
    /// its placement so it is not overwritten with partial data.
    Failed {
        settings: Settings,
        errors: Vec<(Placement, SettingsError)>,
    },
}

impl LoadOutcome {
    pub fn settings(&self) -> &Settings {
        match self {
            LoadOutcome::Loaded(s) | LoadOutcome::Defaults(s) => s,
            LoadOutcome::Failed { settings, .. } => settings,
        }
    }

    pub fn into_settings(self) -> Settings {
        match self {
            LoadOutcome::Loaded(s) | LoadOutcome::Defaults(s) => s,
            LoadOutcome::Failed { settings, .. } => settings,
        }
    }

    /// Files that read cleanly, or do not exist yet, and are safe to write.
    pub fn writable(&self) -> Vec<Placement> {
        let failed: &[(Placement, SettingsError)] = match self {
            LoadOutcome::Failed { errors, .. } => errors,
            _ => &[],
        };
        [Placement::Global, Placement::Project]
            .into_iter()
            .filter(|p| failed.iter().all(|(bad, _)| bad != p))
            .collect()
    }
}

/// Reads and writes the global and project settings files.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    paths: SettingsPaths,
}

impl SettingsStore {
    pub fn new(paths: SettingsPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &SettingsPaths {
        &self.paths
    }

    /// Reads both files and merges them with `overrides`.
    ///
    /// A missing file counts as empty. A file that fails to read or parse is
    /// logged, left out of the merge and reported in
    /// [`LoadOutcome::Failed`]; the other file still contributes.
    pub fn load(&self, overrides: &Settings) -> LoadOutcome {
        let (global, project) = thread::scope(|s| {
            let global = s.spawn(|| read_object(&self.paths.global));
            let project = read_object(&self.paths.project);
            (join(global), project)
        });

        let mut errors = Vec::new();
        let global = readable_layer(global, Placement::Global, &mut errors);
        let project = readable_layer(project, Placement::Project, &mut errors);

        let settings = merge_layers(overrides, global.as_ref(), project.as_ref());
        if !errors.is_empty() {
            LoadOutcome::Failed { settings, errors }
        } else if global.is_none() && project.is_none() {
            LoadOutcome::Defaults(settings)
        } else {
            LoadOutcome::Loaded(settings)
        }
    }

    /// Writes the global and project projections of `settings`.
    ///
    /// Both writes are attempted even if one fails; the first error is
    /// returned. The two files are not updated atomically.
    pub fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        self.save_layers(settings, &[Placement::Global, Placement::Project])
    }

    /// Like [`save`](Self::save), but only writes the files in `layers`.
    pub fn save_layers(
        &self,
        settings: &Settings,
        layers: &[Placement],
    ) -> Result<(), SettingsError> {
        let writes: Vec<_> = layers
            .iter()
            .filter_map(|&layer| {
                self.path_for(layer)
                    .map(|path| (path, settings.projection(layer)))
            })
            .collect();

        let results: Vec<_> = thread::scope(|s| {
            let handles: Vec<_> = writes
                .iter()
                .map(|(path, fields)| s.spawn(move || write_object(path, fields)))
                .collect();
            handles.into_iter().map(join).collect()
        });

        let mut first = Ok(());
        for result in results {
            if let Err(e) = result {
                warn!(error = %e, "failed to save settings");
                if first.is_ok() {
                    first = Err(e);
                }
            }
        }
        first
    }

    fn path_for(&self, layer: Placement) -> Option<&Path> {
        match layer {
            Placement::Global => Some(&self.paths.global),
            Placement::Project => Some(&self.paths.project),
            Placement::Neither => None,
        }
    }

    /// Deletes the project settings file.
    pub fn remove(&self) -> Result<(), SettingsError> {
        self.remove_project_file()
    }

    pub fn remove_project_file(&self) -> Result<(), SettingsError> {
        remove_file(&self.paths.project)
    }

    pub fn remove_global_file(&self) -> Result<(), SettingsError> {
        remove_file(&self.paths.global)
    }
}

fn join<T>(handle: thread::ScopedJoinHandle<'_, T>) -> T {
    handle
        .join()
        .unwrap_or_else(|payload| std::panic::resume_unwind(payload))
}

fn readable_layer(
    read: Result<Option<Map<String, Value>>, SettingsError>,
    layer: Placement,
    errors: &mut Vec<(Placement, SettingsError)>,
) -> Option<Map<String, Value>> {
    match read {
        Ok(map) => map,
        Err(e) => {
            warn!(error = %e, "ignoring unreadable settings file");
            errors.push((layer, e));
            None
        }
    }
}

fn read_object(path: &Path) -> Result<Option<Map<String, Value>>, SettingsError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "settings file not found");
            return Ok(None);
        }
        Err(source) => {
            return Err(SettingsError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let value: Value = serde_json::from_str(&content).map_err(|source| SettingsError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    match value {
        Value::Object(map) => {
            debug!(path = %path.display(), fields = map.len(), "read settings file");
            Ok(Some(map))
        }
        _ => Err(SettingsError::NotAnObject {
            path: path.to_path_buf(),
        }),
    }
}

fn write_object(path: &Path, map: &Map<String, Value>) -> Result<(), SettingsError> {
    let mut content =
        serde_json::to_string_pretty(map).map_err(|source| SettingsError::Serialize {
            path: path.to_path_buf(),
            source,
        })?;
    content.push('\n');

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| SettingsError::Write {
            path: path.to_path_buf(),
            source,
        })?;
    }

    fs::write(path, content).map_err(|source| SettingsError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), fields = map.len(), "wrote settings file");
    Ok(())
}

fn remove_file(path: &Path) -> Result<(), SettingsError> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!(path = %path.display(), "removed settings file");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(SettingsError::Remove {
            path: path.to_path_buf(),
            source,
        }),
    }
}

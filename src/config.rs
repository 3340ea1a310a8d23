use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{PapyrusError, Result};

/// Search engine configuration, loaded from `config.json`
///
/// All entries are paths relative to the directory holding the config file
/// (the "backend" directory), except `json_data` which names the corpus
/// folder inside `data_dir`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchConfig {
    pub data_dir: PathBuf,
    pub indexes_dir: PathBuf,
    pub barrels_dir: PathBuf,
    pub lexicon_file: PathBuf,
    pub inverted_index_file: PathBuf,
    pub forward_index_file: PathBuf,
    pub barrel_lookup: PathBuf,
    pub json_data: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            indexes_dir: PathBuf::from("indexes"),
            barrels_dir: PathBuf::from("barrels"),
            lexicon_file: PathBuf::from("lexicon.json"),
            inverted_index_file: PathBuf::from("inverted_index.txt"),
            forward_index_file: PathBuf::from("forward_index.txt"),
            barrel_lookup: PathBuf::from("barrel_lookup.json"),
            json_data: "pmc-json".to_string(),
        }
    }
}

/// A loaded configuration anchored at the directory where config.json lives
#[derive(Clone, Debug)]
pub struct Settings {
    pub backend_dir: PathBuf,
    pub config: SearchConfig,
}

impl Settings {
    /// Load config.json from an explicit directory
    pub fn from_dir(backend_dir: &Path) -> Result<Self> {
        let path = backend_dir.join("config.json");
        let data = fs::read_to_string(&path).map_err(|_| PapyrusError::IndexMissing {
            path: path.clone(),
        })?;
        let config: SearchConfig = serde_json::from_str(&data)?;
        Ok(Self {
            backend_dir: backend_dir.to_path_buf(),
            config,
        })
    }

    /// Locate config.json by walking upward from the executable's directory,
    /// then from the current working directory
    pub fn discover() -> Result<Self> {
        let mut roots = Vec::new();
        if let Ok(exe) = std::env::current_exe() {
            if let Some(dir) = exe.parent() {
                roots.push(dir.to_path_buf());
            }
        }
        if let Ok(cwd) = std::env::current_dir() {
            roots.push(cwd);
        }

        for root in &roots {
            let mut dir = root.as_path();
            loop {
                if dir.join("config.json").is_file() {
                    return Self::from_dir(dir);
                }
                match dir.parent() {
                    Some(parent) => dir = parent,
                    None => break,
                }
            }
        }

        let origin = roots.into_iter().next().unwrap_or_else(|| PathBuf::from("."));
        Err(PapyrusError::ConfigMissing(origin))
    }

    pub fn data_dir(&self) -> PathBuf {
        self.backend_dir.join(&self.config.data_dir)
    }

    pub fn indexes_dir(&self) -> PathBuf {
        self.backend_dir.join(&self.config.indexes_dir)
    }

    pub fn corpus_dir(&self) -> PathBuf {
        self.data_dir().join(&self.config.json_data)
    }

    pub fn lexicon_path(&self) -> PathBuf {
        self.indexes_dir().join(&self.config.lexicon_file)
    }

    pub fn forward_index_path(&self) -> PathBuf {
        self.indexes_dir().join(&self.config.forward_index_file)
    }

    pub fn inverted_index_path(&self) -> PathBuf {
        self.indexes_dir().join(&self.config.inverted_index_file)
    }

    pub fn barrel_lookup_path(&self) -> PathBuf {
        self.indexes_dir().join(&self.config.barrel_lookup)
    }

    /// Directory holding the JSON barrels produced by the partitioner
    pub fn json_barrels_dir(&self) -> PathBuf {
        self.indexes_dir().join(&self.config.barrels_dir)
    }

    /// Directory holding the binary `.bin`/`.idx` barrel pairs
    pub fn binary_barrels_dir(&self) -> PathBuf {
        self.indexes_dir().join("barrels_binary")
    }

    /// Directory holding the read-only sidecars (embeddings, autocomplete,
    /// authority scores, binary lexicon)
    pub fn sidecar_dir(&self) -> PathBuf {
        self.indexes_dir().join("embeddings")
    }
}

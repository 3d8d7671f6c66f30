use std::path::PathBuf;
use std::process::{Command, Stdio};

use super::model::PoinoError;

/// Turns plain Japanese text into full-context label lines.
pub trait TextAnalyzer: Send + Sync {
    fn analyze(&self, text: &str) -> Result<Vec<String>, PoinoError>;
}

impl<F> TextAnalyzer for F
where
    F: Fn(&str) -> Result<Vec<String>, PoinoError> + Send + Sync,
{
    fn analyze(&self, text: &str) -> Result<Vec<String>, PoinoError> {
        self(text)
    }
}

/// Location of the `openjlabel` binary and its dictionary.
///
/// Either path can be `None`: the binary then comes from PATH and the
/// dictionary from `/dict`.
#[derive(Debug, Clone, Default)]
pub struct OpenJLabelConfig {
    pub bin_path: Option<PathBuf>,
    pub dict_dir: Option<PathBuf>,
}

const DEFAULT_BIN: &str = "openjlabel";
const DEFAULT_DICT_DIR: &str = "/dict";

/// Analyzer backed by the `openjlabel` command-line tool.
///
/// Each call runs `openjlabel -d <dict> -o <file> <text>` and reads the
/// labels back from a temporary file.
#[derive(Debug, Clone, Default)]
pub struct OpenJLabelAnalyzer {
    config: OpenJLabelConfig,
}

impl OpenJLabelAnalyzer {
    pub fn new(config: OpenJLabelConfig) -> Self {
        Self { config }
    }

    fn bin(&self) -> PathBuf {
        self.config
            .bin_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_BIN))
    }

    fn dict_dir(&self) -> PathBuf {
        self.config
            .dict_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DICT_DIR))
    }
}

impl TextAnalyzer for OpenJLabelAnalyzer {
    fn analyze(&self, text: &str) -> Result<Vec<String>, PoinoError> {
        let text = canonicalize_text(text);
        if text.is_empty() {
            return Ok(Vec::new());
        }

        let out_file = tempfile::Builder::new()
            .prefix("poino-")
            .suffix(".lab")
            .tempfile()?;

        let output = Command::new(self.bin())
            .arg("-d")
            .arg(self.dict_dir())
            .arg("-o")
            .arg(out_file.path())
            .arg(&text)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    PoinoError::AnalyzerNotFound
                } else {
                    PoinoError::Io(e)
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PoinoError::AnalyzerFailed(format!(
                "openjlabel exited with code {:?}: {stderr}",
                output.status.code()
            )));
        }

        let labels = std::fs::read_to_string(out_file.path())?;
        log::debug!("openjlabel produced {} bytes for {:?}", labels.len(), text);

        Ok(split_label_lines(&labels))
    }
}

/// Collapse whitespace runs to one space and trim both ends.
pub fn canonicalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn split_label_lines(labels: &str) -> Vec<String> {
    labels
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

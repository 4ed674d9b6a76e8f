//! Local file operations
//!
//! Parses spoken file requests ("move report.txt to documents") and
//! performs them under the user's home directory. Navigation requests
//! return a path marker the dispatcher turns into a spoken status.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

use crate::{Error, Result};

/// Marker prefix for navigation results, kept distinct from operation
/// statuses so the dispatcher can phrase them differently
pub const NAVIGATION_PREFIX: &str = "Navigation path: ";

/// Performs a spoken file operation
#[async_trait::async_trait]
pub trait FileOps: Send + Sync {
    /// Perform the operation described by `request`, returning status text
    ///
    /// # Errors
    ///
    /// Returns error if the request cannot be parsed or the operation
    /// fails
    async fn perform(&self, request: &str) -> Result<String>;
}

/// Parsed file action
#[derive(Debug, PartialEq, Eq)]
enum FileAction {
    Navigate(PathBuf),
    Copy { sources: Vec<String>, dest: String },
    Move { sources: Vec<String>, dest: String },
    Delete(Vec<String>),
    CreateFolder { name: String, dest: Option<String> },
    Rename { from: String, to: String },
}

/// File operations rooted at the user's home directory
#[derive(Debug, Clone)]
pub struct LocalFileOps {
    base_dir: PathBuf,
}

impl Default for LocalFileOps {
    fn default() -> Self {
        let base_dir = directories::BaseDirs::new()
            .map_or_else(|| PathBuf::from("."), |d| d.home_dir().to_path_buf());
        Self { base_dir }
    }
}

impl LocalFileOps {
    /// Root file operations at `base_dir` instead of the home directory
    #[must_use]
    pub fn with_base(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Resolve a spoken location ("downloads", "documents/ai") under the
    /// base directory
    fn resolve(&self, spoken: &str) -> PathBuf {
        let cleaned = spoken
            .trim()
            .trim_end_matches(" directory")
            .trim_end_matches(" folder")
            .trim();

        match cleaned {
            "home" | "" => self.base_dir.clone(),
            "downloads" => self.base_dir.join("Downloads"),
            "documents" => self.base_dir.join("Documents"),
            "desktop" => self.base_dir.join("Desktop"),
            "pictures" => self.base_dir.join("Pictures"),
            "music" => self.base_dir.join("Music"),
            "movies" => self.base_dir.join("Movies"),
            other => self.base_dir.join(other.replace(' ', "")),
        }
    }

    /// Resolve a spoken file reference like "report.txt in downloads"
    fn resolve_file(&self, spoken: &str) -> PathBuf {
        spoken.rsplit_once(" in ").map_or_else(
            || self.base_dir.join(spoken.trim()),
            |(name, location)| self.resolve(location).join(name.trim()),
        )
    }

    fn parse(&self, request: &str) -> Result<FileAction> {
        let patterns = action_patterns();
        let text = request.trim().to_lowercase();

        if let Some(caps) = patterns.navigate.captures(&text) {
            return Ok(FileAction::Navigate(self.resolve(&caps[1])));
        }

        if let Some(caps) = patterns.rename.captures(&text) {
            return Ok(FileAction::Rename {
                from: caps[1].to_string(),
                to: caps[2].to_string(),
            });
        }

        if let Some(caps) = patterns.create.captures(&text) {
            return Ok(FileAction::CreateFolder {
                name: caps[1].to_string(),
                dest: caps.get(2).map(|m| m.as_str().to_string()),
            });
        }

        if let Some(caps) = patterns.transfer.captures(&text) {
            let sources = split_list(&caps[2]);
            let dest = caps[3].to_string();
            return Ok(if &caps[1] == "copy" {
                FileAction::Copy { sources, dest }
            } else {
                FileAction::Move { sources, dest }
            });
        }

        if let Some(caps) = patterns.delete.captures(&text) {
            return Ok(FileAction::Delete(split_list(&caps[1])));
        }

        Err(Error::Automation(format!(
            "could not understand file request: {request}"
        )))
    }

    async fn copy_one(&self, source: &str, dest_dir: &Path) -> Result<()> {
        let from = self.resolve_file(source);
        let name = file_name(&from)?;
        tokio::fs::copy(&from, dest_dir.join(name)).await?;
        Ok(())
    }

    async fn move_one(&self, source: &str, dest_dir: &Path) -> Result<()> {
        let from = self.resolve_file(source);
        let name = file_name(&from)?;
        tokio::fs::rename(&from, dest_dir.join(name)).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl FileOps for LocalFileOps {
    async fn perform(&self, request: &str) -> Result<String> {
        let action = self.parse(request)?;
        tracing::debug!(?action, "file operation");

        match action {
            FileAction::Navigate(path) => {
                if !path.exists() {
                    return Err(Error::NotFound(format!("path {}", path.display())));
                }
                Ok(format!("{NAVIGATION_PREFIX}{}", path.display()))
            }
            FileAction::Copy { sources, dest } => {
                let dest_dir = self.resolve(&dest);
                tokio::fs::create_dir_all(&dest_dir).await?;
                for source in &sources {
                    self.copy_one(source, &dest_dir).await?;
                }
                Ok(format!(
                    "Copied {} item(s) to {}",
                    sources.len(),
                    dest_dir.display()
                ))
            }
            FileAction::Move { sources, dest } => {
                let dest_dir = self.resolve(&dest);
                tokio::fs::create_dir_all(&dest_dir).await?;
                for source in &sources {
                    self.move_one(source, &dest_dir).await?;
                }
                Ok(format!(
                    "Moved {} item(s) to {}",
                    sources.len(),
                    dest_dir.display()
                ))
            }
            FileAction::Delete(sources) => {
                for source in &sources {
                    let path = self.resolve_file(source);
                    if path.is_dir() {
                        tokio::fs::remove_dir_all(&path).await?;
                    } else {
                        tokio::fs::remove_file(&path).await?;
                    }
                }
                Ok(format!("Deleted {} item(s)", sources.len()))
            }
            FileAction::CreateFolder { name, dest } => {
                let parent = dest.map_or_else(|| self.base_dir.clone(), |d| self.resolve(&d));
                let path = parent.join(&name);
                tokio::fs::create_dir_all(&path).await?;
                Ok(format!("Created folder {}", path.display()))
            }
            FileAction::Rename { from, to } => {
                let from_path = self.resolve_file(&from);
                let to_path = from_path.with_file_name(to.trim());
                tokio::fs::rename(&from_path, &to_path).await?;
                Ok(format!("Renamed to {}", to_path.display()))
            }
        }
    }
}

struct ActionPatterns {
    navigate: Regex,
    rename: Regex,
    create: Regex,
    transfer: Regex,
    delete: Regex,
}

fn action_patterns() -> &'static ActionPatterns {
    static PATTERNS: OnceLock<ActionPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let compile = |pattern: &str| {
            Regex::new(pattern)
                .unwrap_or_else(|e| unreachable!("file pattern is valid: {e}"))
        };
        ActionPatterns {
            navigate: compile(r"^(?:go\s+to|navigate\s+to|open)\s+(?:the\s+)?(.+)$"),
            rename: compile(r"^rename\s+(.+?)\s+to\s+(.+)$"),
            create: compile(
                r"^(?:create|make|build)\s+(?:a\s+)?(?:new\s+)?folder\s+(?:called\s+|named\s+)?(\S+)(?:\s+in\s+(.+))?$",
            ),
            transfer: compile(
                r"^(copy|move|transfer|shift|put)\s+(.+?)\s+(?:to|into)\s+(.+)$",
            ),
            delete: compile(r"^(?:delete|remove|erase|trash)\s+(.+)$"),
        }
    })
}

/// Split "a, b and c" into individual file references
fn split_list(spoken: &str) -> Vec<String> {
    spoken
        .split(',')
        .flat_map(|part| part.split(" and "))
        .map(|part| part.trim().to_string())
        .filter(|part| !part.is_empty())
        .collect()
}

fn file_name(path: &Path) -> Result<&std::ffi::OsStr> {
    path.file_name()
        .ok_or_else(|| Error::Automation(format!("not a file path: {}", path.display())))
}

//! PROJ data directory discovery
//!
//! Projection backends look for their support files through `PROJ_DATA`
//! (or the older `PROJ_LIB`). Those variables are frequently unset or
//! stale, e.g. inside conda environments or relocated installs, so we
//! probe the usual install locations and patch the environment for this
//! process when a usable directory turns up.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use log::{debug, info, warn};

/// Environment variables consulted, in priority order
pub const PROJ_ENV_VARS: [&str; 2] = ["PROJ_DATA", "PROJ_LIB"];

static PROJ_DATA_DIR: OnceLock<Option<PathBuf>> = OnceLock::new();

/// Locates PROJ support data on the local machine
pub struct ProjDataLocator;

impl ProjDataLocator {
    /// A directory counts as PROJ data when it holds `proj.db` or an `epsg` init file
    pub fn is_proj_data_dir(dir: &Path) -> bool {
        dir.is_dir() && (dir.join("proj.db").is_file() || dir.join("epsg").is_file())
    }

    /// Candidate directories, environment first, then conventional prefixes
    pub fn candidates() -> Vec<PathBuf> {
        let mut candidates: Vec<PathBuf> = PROJ_ENV_VARS
            .iter()
            .filter_map(|var| env::var_os(var))
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
            .collect();

        if let Some(prefix) = env::var_os("CONDA_PREFIX") {
            let prefix = PathBuf::from(prefix);
            candidates.push(prefix.join("share").join("proj"));
            candidates.push(prefix.join("Library").join("share").join("proj"));
        }

        if let Ok(exe) = env::current_exe() {
            if let Some(bin_dir) = exe.parent() {
                candidates.push(bin_dir.join("..").join("share").join("proj"));
            }
        }

        for system_dir in ["/usr/share/proj", "/usr/local/share/proj", "/opt/homebrew/share/proj", "/opt/local/share/proj"] {
            candidates.push(PathBuf::from(system_dir));
        }

        candidates
    }

    /// First candidate that looks like a PROJ data directory
    pub fn discover() -> Option<PathBuf> {
        let found = Self::candidates().into_iter().find(|dir| Self::is_proj_data_dir(dir));
        match &found {
            Some(dir) => debug!("Using PROJ data directory {}", dir.display()),
            None => debug!("No PROJ data directory found"),
        }
        found
    }

    /// Make sure `PROJ_DATA`/`PROJ_LIB` point at usable data
    ///
    /// Leaves a valid environment untouched. Otherwise patches both
    /// variables with the discovered directory. The check runs once per
    /// process; later calls return the first result without touching the
    /// environment.
    ///
    /// # Returns
    /// The directory in effect, or `None` when nothing could be found
    pub fn ensure_env() -> Option<PathBuf> {
        PROJ_DATA_DIR.get_or_init(Self::patch_env).clone()
    }

    fn patch_env() -> Option<PathBuf> {
        let configured = PROJ_ENV_VARS
            .iter()
            .filter_map(|var| env::var_os(var))
            .map(PathBuf::from)
            .find(|dir| Self::is_proj_data_dir(dir));

        if configured.is_some() {
            return configured;
        }

        match Self::discover() {
            Some(dir) => {
                for var in PROJ_ENV_VARS {
                    env::set_var(var, &dir);
                }
                info!("Patched PROJ_DATA/PROJ_LIB to {}", dir.display());
                Some(dir)
            }
            None => {
                warn!("PROJ data directory not found; only built-in CRS definitions are available");
                None
            }
        }
    }

    /// Look up `code` in the legacy `epsg` init file of `dir`
    pub fn lookup_epsg_init(dir: &Path, code: u32) -> Option<String> {
        let content = fs::read_to_string(dir.join("epsg")).ok()?;
        Self::parse_epsg_init(&content, code)
    }

    /// Find the definition for `code` in `epsg` init file content
    ///
    /// Lines look like `<4326> +proj=longlat +datum=WGS84 +no_defs  <>`;
    /// `#` starts a comment.
    pub fn parse_epsg_init(content: &str, code: u32) -> Option<String> {
        let wanted = format!("<{}>", code);

        content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .find_map(|line| {
                let rest = line.strip_prefix(wanted.as_str())?;
                let definition = rest.trim().trim_end_matches("<>").trim();
                if definition.is_empty() {
                    None
                } else {
                    Some(definition.to_string())
                }
            })
    }
}

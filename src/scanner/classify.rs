use serde::{Deserialize, Serialize};

/// How a discovered game is started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutableKind {
    NativeBinary,
    ScriptPy,
    ScriptSh,
    ScriptBat,
}

impl ExecutableKind {
    /// The `game_type` string persisted for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutableKind::NativeBinary => "exe",
            ExecutableKind::ScriptPy => "py",
            ExecutableKind::ScriptSh => "sh",
            ExecutableKind::ScriptBat => "bat",
        }
    }

    /// Parses a persisted `game_type` string.
    pub fn from_game_type(game_type: &str) -> Option<Self> {
        match game_type.to_ascii_lowercase().as_str() {
            "exe" | "native" => Some(ExecutableKind::NativeBinary),
            "py" => Some(ExecutableKind::ScriptPy),
            "sh" => Some(ExecutableKind::ScriptSh),
            "bat" | "cmd" => Some(ExecutableKind::ScriptBat),
            _ => None,
        }
    }
}

/// Operating system family whose launchers a scan accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Windows,
    Linux,
    MacOs,
}

impl Platform {
    /// The platform this binary was built for.
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::MacOs
        } else {
            Platform::Linux
        }
    }

    fn is_unix(self) -> bool {
        matches!(self, Platform::Linux | Platform::MacOs)
    }
}

/// Classifies a file name by extension, keeping only kinds runnable on `platform`.
///
/// Returns `None` for unknown extensions and for launchers of another platform.
pub fn classify(file_name: &str, platform: Platform) -> Option<ExecutableKind> {
    let (_, ext) = file_name.rsplit_once('.')?;
    let kind = match ext.to_ascii_lowercase().as_str() {
        "exe" if platform == Platform::Windows => ExecutableKind::NativeBinary,
        "x86_64" | "x86" | "appimage" if platform == Platform::Linux => {
            ExecutableKind::NativeBinary
        }
        "sh" if platform.is_unix() => ExecutableKind::ScriptSh,
        "command" if platform == Platform::MacOs => ExecutableKind::ScriptSh,
        "bat" | "cmd" if platform == Platform::Windows => ExecutableKind::ScriptBat,
        "py" => ExecutableKind::ScriptPy,
        _ => return None,
    };
    Some(kind)
}

use std::{collections::HashMap, fmt, path::Path, str::FromStr, time::Duration};

use bytesize::ByteSize;
use serde::{Deserialize, Serialize};

/// Límites mínimos para aceptar un archivo de audio al escanear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionConfig {
    pub min_file_size: ByteSize,
    #[serde(with = "humantime_serde")]
    pub min_duration: Duration,
}

impl ExtensionConfig {
    const MIN_DURATION: Duration = Duration::from_secs(30);

    const fn with_size(min_file_size: ByteSize) -> Self {
        ExtensionConfig {
            min_file_size,
            min_duration: Self::MIN_DURATION,
        }
    }

    /// Deja pasar cualquier archivo. Útil para fixtures pequeños.
    pub const UNLIMITED: ExtensionConfig = ExtensionConfig {
        min_file_size: ByteSize::b(0),
        min_duration: Duration::ZERO,
    };
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum SupportedExtension {
    Mp3,
    Aac,
    M4a,
    Ogg,
    Opus,
    Wav,
    Flac,
    Aiff,
}

impl SupportedExtension {
    pub const ALL: &'static [SupportedExtension] = &[
        SupportedExtension::Mp3,
        SupportedExtension::Aac,
        SupportedExtension::M4a,
        SupportedExtension::Ogg,
        SupportedExtension::Opus,
        SupportedExtension::Wav,
        SupportedExtension::Flac,
        SupportedExtension::Aiff,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SupportedExtension::Mp3 => "mp3",
            SupportedExtension::Aac => "aac",
            SupportedExtension::M4a => "m4a",
            SupportedExtension::Ogg => "ogg",
            SupportedExtension::Opus => "opus",
            SupportedExtension::Wav => "wav",
            SupportedExtension::Flac => "flac",
            SupportedExtension::Aiff => "aiff",
        }
    }

    /// Límites por defecto: los formatos sin pérdida piden archivos más grandes.
    pub fn default_config(&self) -> ExtensionConfig {
        match self {
            SupportedExtension::Mp3
            | SupportedExtension::Aac
            | SupportedExtension::Ogg
            | SupportedExtension::Opus => ExtensionConfig::with_size(ByteSize::kib(300)),
            SupportedExtension::M4a => ExtensionConfig::with_size(ByteSize::kib(500)),
            SupportedExtension::Flac => ExtensionConfig::with_size(ByteSize::mib(1)),
            SupportedExtension::Wav | SupportedExtension::Aiff => {
                ExtensionConfig::with_size(ByteSize::mib(2))
            }
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()?.to_str()?.parse().ok()
    }
}

impl FromStr for SupportedExtension {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        let lower = if lower == "aif" { "aiff".to_string() } else { lower };
        SupportedExtension::ALL
            .iter()
            .copied()
            .find(|ext| ext.as_str() == lower)
            .ok_or_else(|| format!("Extension not supported: {s}"))
    }
}

impl fmt::Display for SupportedExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type ExtensionLimits = HashMap<SupportedExtension, ExtensionConfig>;

pub fn default_extension_config() -> ExtensionLimits {
    SupportedExtension::ALL
        .iter()
        .map(|&ext| (ext, ext.default_config()))
        .collect()
}

/// Límite configurado para la extensión, o el de por defecto si no hay entrada.
pub fn limits_for(limits: &ExtensionLimits, ext: SupportedExtension) -> ExtensionConfig {
    limits
        .get(&ext)
        .copied()
        .unwrap_or_else(|| ext.default_config())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_extensions_case_insensitively() {
        assert_eq!(
            SupportedExtension::from_path(Path::new("/music/a.FLAC")),
            Some(SupportedExtension::Flac)
        );
        assert_eq!(
            SupportedExtension::from_path(Path::new("b.aif")),
            Some(SupportedExtension::Aiff)
        );
        assert_eq!(SupportedExtension::from_path(Path::new("cover.jpg")), None);
        assert_eq!(SupportedExtension::from_path(Path::new("README")), None);
    }

    #[test]
    fn missing_entries_fall_back_to_defaults() {
        let mut limits = ExtensionLimits::new();
        limits.insert(SupportedExtension::Mp3, ExtensionConfig::UNLIMITED);

        assert_eq!(limits_for(&limits, SupportedExtension::Mp3), ExtensionConfig::UNLIMITED);
        assert_eq!(
            limits_for(&limits, SupportedExtension::Wav).min_file_size,
            ByteSize::mib(2)
        );
    }
}

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Which standard stream of the child a chunk came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputSource {
    Stdout,
    Stderr,
}

impl fmt::Display for OutputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputSource::Stdout => f.write_str("stdout"),
            OutputSource::Stderr => f.write_str("stderr"),
        }
    }
}

/// Text encoding used to decode output chunks.
///
/// - `Utf8Lossy` (default) never fails; invalid sequences become U+FFFD.
/// - `Utf8` is strict: a chunk that is not valid UTF-8 is replaced by a
///   placeholder naming its length.
/// - `Latin1` maps every byte to the code point of the same value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Encoding {
    Utf8,
    Utf8Lossy,
    Latin1,
}

impl Default for Encoding {
    fn default() -> Self {
        Encoding::Utf8Lossy
    }
}

impl Encoding {
    /// Decode one chunk, or `None` if it is not valid in this encoding.
    pub fn decode(self, bytes: &[u8]) -> Option<String> {
        match self {
            Encoding::Utf8 => std::str::from_utf8(bytes).ok().map(str::to_owned),
            Encoding::Utf8Lossy => Some(String::from_utf8_lossy(bytes).into_owned()),
            Encoding::Latin1 => Some(bytes.iter().map(|&b| char::from(b)).collect()),
        }
    }
}

impl FromStr for Encoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "utf8" | "utf-8" => Ok(Encoding::Utf8),
            "utf8-lossy" | "utf-8-lossy" => Ok(Encoding::Utf8Lossy),
            "latin1" | "iso-8859-1" | "binary" => Ok(Encoding::Latin1),
            other => Err(format!(
                "invalid encoding: {other} (expected \"utf8\", \"utf8-lossy\" or \"latin1\")"
            )),
        }
    }
}

/// How one standard stream of the child is wired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StdioMode {
    Pipe,
    Inherit,
    Null,
}

impl Default for StdioMode {
    fn default() -> Self {
        StdioMode::Pipe
    }
}

impl StdioMode {
    pub fn to_stdio(self) -> std::process::Stdio {
        match self {
            StdioMode::Pipe => std::process::Stdio::piped(),
            StdioMode::Inherit => std::process::Stdio::inherit(),
            StdioMode::Null => std::process::Stdio::null(),
        }
    }
}

/// Stdio wiring for all three standard streams. Defaults to piping all of them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct StdioConfig {
    #[serde(default)]
    pub stdin: StdioMode,
    #[serde(default)]
    pub stdout: StdioMode,
    #[serde(default)]
    pub stderr: StdioMode,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_utf8_rejects_invalid_bytes() {
        assert_eq!(Encoding::Utf8.decode(b"ok"), Some("ok".to_string()));
        assert_eq!(Encoding::Utf8.decode(&[0xff, 0xfe]), None);
    }

    #[test]
    fn lossy_utf8_never_fails() {
        let text = Encoding::Utf8Lossy.decode(&[b'a', 0xff]).unwrap();
        assert!(text.starts_with('a'));
        assert!(text.contains('\u{fffd}'));
    }

    #[test]
    fn latin1_maps_bytes_to_code_points() {
        assert_eq!(Encoding::Latin1.decode(&[0xe9]), Some("é".to_string()));
    }

    #[test]
    fn encoding_parses_aliases() {
        assert_eq!("UTF-8".parse::<Encoding>(), Ok(Encoding::Utf8));
        assert_eq!("binary".parse::<Encoding>(), Ok(Encoding::Latin1));
        assert!("ebcdic".parse::<Encoding>().is_err());
    }
}

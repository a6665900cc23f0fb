use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Anything that can hand over its content as a sequence of text lines.
///
/// Files are addressed through [`Path`]/[`PathBuf`]; in-memory text through
/// `str`/`String`. A `&str` is always treated as content, never as a path.
pub trait TextSource {
    /// Reads all lines, without their terminators.
    fn read_lines(&self) -> io::Result<Vec<String>>;

    /// Reads the whole content, each line newline-terminated.
    fn read_text(&self) -> io::Result<String> {
        let mut text = String::new();
        for line in self.read_lines()? {
            text.push_str(&line);
            text.push('\n');
        }
        Ok(text)
    }
}

impl TextSource for Path {
    fn read_lines(&self) -> io::Result<Vec<String>> {
        let reader = BufReader::new(File::open(self)?);
        reader.lines().collect()
    }
}

impl TextSource for PathBuf {
    fn read_lines(&self) -> io::Result<Vec<String>> {
        self.as_path().read_lines()
    }
}

impl TextSource for str {
    fn read_lines(&self) -> io::Result<Vec<String>> {
        Ok(self
            .lines()
            .map(|l| l.strip_suffix('\r').unwrap_or(l).to_string())
            .collect())
    }
}

impl TextSource for String {
    fn read_lines(&self) -> io::Result<Vec<String>> {
        self.as_str().read_lines()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn in_memory_text_yields_lines() {
        let lines = "a\nb\r\n\nc".read_lines().unwrap();
        assert_eq!(lines, vec!["a", "b", "", "c"]);
    }

    #[test]
    fn file_and_text_sources_agree() {
        let content = "    3  Water\n     1  O 0.0 0.0 0.0 1\n";
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();

        let from_file = file.path().read_lines().unwrap();
        let from_text = content.to_string().read_lines().unwrap();
        assert_eq!(from_file, from_text);
        assert_eq!(file.path().to_path_buf().read_text().unwrap(), content);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let path = PathBuf::from("/nonexistent/trajectory.arc");
        assert!(path.read_lines().is_err());
    }
}

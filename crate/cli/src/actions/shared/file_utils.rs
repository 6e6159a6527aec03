use std::{
    fs::{self, File},
    io::Read,
    path::{Path, PathBuf},
};

use crate::{
    cli_ensure,
    error::{CliError, result::CliResultHelper},
};

/// Read all bytes from a file
pub(crate) fn read_bytes_from_file(file: &impl AsRef<Path>) -> Result<Vec<u8>, CliError> {
    let mut buffer = Vec::new();
    File::open(file)
        .with_context(|| format!("could not open the file {}", file.as_ref().display()))?
        .read_to_end(&mut buffer)
        .with_context(|| format!("could not read the file {}", file.as_ref().display()))?;

    Ok(buffer)
}

/// Read a file refusing anything larger than `max_len` bytes.
pub(crate) fn read_bounded_file(
    file: &impl AsRef<Path>,
    max_len: usize,
) -> Result<Vec<u8>, CliError> {
    let bytes = read_bytes_from_file(file)?;
    cli_ensure!(
        bytes.len() <= max_len,
        "{} is {} bytes long. This sample supports file of upto {}KB size.",
        file.as_ref().display(),
        bytes.len(),
        max_len / 1024
    );
    Ok(bytes)
}

/// Write all bytes to a file
pub(crate) fn write_bytes_to_file(bytes: &[u8], file: &impl AsRef<Path>) -> Result<(), CliError> {
    fs::write(file, bytes).with_context(|| {
        format!(
            "failed writing {} bytes to {}",
            bytes.len(),
            file.as_ref().display()
        )
    })
}

/// `file` with `extension` appended, `data.txt` becoming `data.txt.sig`.
#[must_use]
pub(crate) fn with_appended_extension(file: &Path, extension: &str) -> PathBuf {
    let mut name = file.as_os_str().to_owned();
    name.push(".");
    name.push(extension);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use tempfile::TempDir;

    use super::{
        read_bounded_file, read_bytes_from_file, with_appended_extension, write_bytes_to_file,
    };

    #[test]
    fn test_write_then_read() {
        let tmp_dir = TempDir::new().unwrap();
        let file = tmp_dir.path().join("wrapped.bin");
        write_bytes_to_file(&[1, 2, 3], &file).unwrap();
        assert_eq!(read_bytes_from_file(&file).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_missing_file() {
        let err = read_bytes_from_file(&"/nonexistent/file.sim").unwrap_err();
        assert!(err.to_string().starts_with("could not open the file /nonexistent/file.sim"));
    }

    #[test]
    fn test_bounded_read() {
        let tmp_dir = TempDir::new().unwrap();
        let file = tmp_dir.path().join("data.txt");
        write_bytes_to_file(&[0_u8; 2048], &file).unwrap();
        assert_eq!(read_bounded_file(&file, 2048).unwrap().len(), 2048);
        let err = read_bounded_file(&file, 1024).unwrap_err();
        assert!(err.to_string().ends_with("supports file of upto 1KB size."));
    }

    #[test]
    fn test_appended_extension() {
        assert_eq!(
            with_appended_extension(Path::new("dir/data.txt"), "sig"),
            Path::new("dir/data.txt.sig")
        );
    }
}

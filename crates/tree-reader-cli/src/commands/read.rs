use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use tree_reader::UrlReader;

pub async fn run(reader: &dyn UrlReader, url: &str, out: Option<&Path>) -> Result<()> {
    let content = reader
        .read(url)
        .await
        .with_context(|| format!("failed to read {url}"))?;

    match out {
        Some(path) => std::fs::write(path, &content)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => std::io::stdout()
            .write_all(&content)
            .context("failed to write to stdout")?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use tree_reader::ReaderError;
    use tree_reader::test_support::InMemoryReader;

    use super::*;

    const URL: &str = "https://bitbucket.org/backstage/mock/src/master/mkdocs.yml";

    #[tokio::test]
    async fn writes_file_to_out_path() {
        let mut reader = InMemoryReader::new();
        reader.add_file(URL, "site_name: Test\n");
        let tmp = tempfile::tempdir().unwrap();
        let out = tmp.path().join("mkdocs.yml");

        run(&reader, URL, Some(&out)).await.unwrap();

        assert_eq!(std::fs::read_to_string(&out).unwrap(), "site_name: Test\n");
    }

    #[tokio::test]
    async fn reader_error_is_kept_as_source() {
        let reader = InMemoryReader::new();

        let err = run(&reader, URL, None).await.unwrap_err();

        let source = err.downcast_ref::<ReaderError>().unwrap();
        assert!(matches!(source, ReaderError::UnknownLocation { .. }));
    }
}

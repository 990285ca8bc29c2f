use std::path::Path;

use anyhow::{Context, Result};
use tree_reader::{DirOptions, ReadTreeOptions, ReaderError, UrlReader};

pub async fn run(
    reader: &dyn UrlReader,
    url: &str,
    etag: Option<&str>,
    out: Option<&Path>,
    list: bool,
) -> Result<()> {
    let options = match etag {
        Some(etag) => ReadTreeOptions::with_etag(etag),
        None => ReadTreeOptions::default(),
    };

    let tree = match reader.read_tree(url, options).await {
        Ok(tree) => tree,
        Err(ReaderError::NotModified) => {
            println!("Not modified: {url} is still at {}", etag.unwrap_or_default());
            return Ok(());
        }
        Err(e) => return Err(e).with_context(|| format!("failed to read tree at {url}")),
    };

    println!("etag:  {}", tree.etag());
    println!("files: {}", tree.files().len());

    if list || out.is_none() {
        for file in tree.files() {
            println!("{:>10}  {}", file.len(), file.path);
        }
    }

    if let Some(target) = out {
        let dir = tree
            .dir(DirOptions::target(target))
            .with_context(|| format!("failed to write tree to {}", target.display()))?;
        println!("Wrote {} files to {}", tree.files().len(), dir.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use tree_reader::test_support::InMemoryReader;
    use tree_reader::{ExtractedFile, TreeResponse};

    use super::*;

    const URL: &str = "https://bitbucket.org/backstage/mock";

    fn reader() -> InMemoryReader {
        let mut reader = InMemoryReader::new();
        reader.add_tree(
            URL,
            TreeResponse::new(
                "12ab34cd56ef",
                vec![
                    ExtractedFile::new("docs/index.md", "# Test\n"),
                    ExtractedFile::new("mkdocs.yml", "site_name: Test\n"),
                ],
            ),
        );
        reader
    }

    #[tokio::test]
    async fn writes_tree_to_out_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tmp.path().join("site");

        run(&reader(), URL, None, Some(&out), false).await.unwrap();

        assert_eq!(
            std::fs::read_to_string(out.join("docs").join("index.md")).unwrap(),
            "# Test\n"
        );
        assert_eq!(
            std::fs::read_to_string(out.join("mkdocs.yml")).unwrap(),
            "site_name: Test\n"
        );
    }

    #[tokio::test]
    async fn current_etag_is_not_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tmp.path().join("site");

        run(&reader(), URL, Some("12ab34cd56ef"), Some(&out), false)
            .await
            .unwrap();

        assert!(!out.exists());
    }

    #[tokio::test]
    async fn unknown_url_is_an_error() {
        let err = run(&reader(), "https://example.com/nope", None, None, true)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("https://example.com/nope"));
    }
}
